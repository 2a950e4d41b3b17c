use std::sync::Arc;

use anyhow::Context;

use stockyard_api::app::{self, AppServices};
use stockyard_auth::Hs256Jwt;
use stockyard_infra::{InMemoryWarehouseStore, PostgresWarehouseStore, Settings, SharedStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load settings")?;
    stockyard_observability::init(settings.log.format);

    if settings.auth.uses_dev_secret() {
        tracing::warn!("auth.jwt_secret not set; using insecure dev default");
    }
    let jwt = Arc::new(Hs256Jwt::new(
        settings.auth.jwt_secret().as_bytes(),
        settings.auth.issuer.clone(),
        chrono::Duration::hours(settings.auth.token_ttl_hours),
    ));

    let store: SharedStore = match &settings.database.url {
        Some(url) => {
            let store = PostgresWarehouseStore::connect(url, settings.database.max_connections)
                .await
                .context("failed to connect to postgres")?;
            store.migrate().await.context("failed to run migrations")?;
            tracing::info!("using postgres store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("database.url not set; using in-memory store");
            Arc::new(InMemoryWarehouseStore::new())
        }
    };

    let services = Arc::new(AppServices::new(store, jwt));
    tokio::task::spawn_blocking(stockyard_auth::password::warm_up)
        .await
        .context("password warm-up panicked")?;

    if let Some(admin) = &settings.auth.bootstrap_admin {
        services
            .bootstrap_admin(&admin.username, &admin.password)
            .await
            .context("failed to seed bootstrap admin")?;
    }

    let app = app::build_app(services, &settings.cors.allowed_origins);

    let addr = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
