use axum::Router;

pub mod auth;
pub mod dashboard;
pub mod deliveries;
pub mod orders;
pub mod parties;
pub mod products;
pub mod reports;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/suppliers", parties::suppliers_router())
        .nest("/customers", parties::customers_router())
        .nest("/deliveries", deliveries::router())
        .nest("/orders", orders::router())
        .nest("/users", users::router())
        .nest("/dashboard", dashboard::router())
        .nest("/reports", reports::router())
}
