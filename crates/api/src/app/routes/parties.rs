//! Suppliers and customers: one set of handlers, parameterised by kind.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use stockyard_parties::PartyKind;

use crate::app::dto::{ListResponse, PartyRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn suppliers_router() -> Router {
    router(PartyKind::Supplier)
}

pub fn customers_router() -> Router {
    router(PartyKind::Customer)
}

fn router(kind: PartyKind) -> Router {
    Router::new()
        .route("/", get(list_parties).post(create_party))
        .route(
            "/:tax_id",
            get(get_party).put(update_party).delete(delete_party),
        )
        .layer(Extension(kind))
}

pub async fn list_parties(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(kind): Extension<PartyKind>,
) -> Result<impl IntoResponse, ApiError> {
    let parties = services.list_parties(principal.principal(), kind).await?;
    Ok(Json(ListResponse::from(parties)))
}

pub async fn get_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(kind): Extension<PartyKind>,
    Path(tax_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.get_party(principal.principal(), kind, &tax_id).await?))
}

pub async fn create_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(kind): Extension<PartyKind>,
    body: Result<Json<PartyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let party = services.create_party(principal.principal(), kind, body).await?;
    Ok((StatusCode::CREATED, Json(party)))
}

pub async fn update_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(kind): Extension<PartyKind>,
    Path(tax_id): Path<String>,
    body: Result<Json<PartyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let party = services
        .update_party(principal.principal(), kind, &tax_id, body)
        .await?;
    Ok(Json(party))
}

pub async fn delete_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Extension(kind): Extension<PartyKind>,
    Path(tax_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    services
        .delete_party(principal.principal(), kind, &tax_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
