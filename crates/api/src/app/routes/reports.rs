use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Query},
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use crate::app::dto::{InteractionQuery, ListResponse, ReportQuery};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/products", get(product_report))
        .route("/customers", get(customer_report))
        .route("/suppliers", get(supplier_report))
}

/// `?from=YYYY-MM-DD&to=YYYY-MM-DD`, both optional and inclusive.
pub async fn product_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let rows = services.product_report(principal.principal(), query).await?;
    Ok(Json(ListResponse::from(rows)))
}

/// Same window as `/products`, plus optional `tax_id` and `barcode` filters.
pub async fn customer_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<InteractionQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let rows = services.customer_report(principal.principal(), query).await?;
    Ok(Json(ListResponse::from(rows)))
}

pub async fn supplier_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    query: Result<Query<InteractionQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let rows = services.supplier_report(principal.principal(), query).await?;
    Ok(Json(ListResponse::from(rows)))
}
