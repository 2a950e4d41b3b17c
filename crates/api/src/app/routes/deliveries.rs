use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};

use crate::app::dto::{DeliveryRequest, ListResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_deliveries).post(create_delivery))
        .route(
            "/:id",
            get(get_delivery).put(update_delivery).delete(delete_delivery),
        )
        .route("/:id/items/:barcode", delete(delete_delivery_item))
}

pub async fn list_deliveries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Result<impl IntoResponse, ApiError> {
    let deliveries = services.list_deliveries(principal.principal()).await?;
    Ok(Json(ListResponse::from(deliveries)))
}

pub async fn get_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(services.get_delivery(principal.principal(), &id).await?))
}

pub async fn create_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<DeliveryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let delivery = services.create_delivery(principal.principal(), body).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

pub async fn update_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<DeliveryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let delivery = services
        .update_delivery(principal.principal(), &id, body)
        .await?;
    Ok(Json(delivery))
}

pub async fn delete_delivery(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    services.delete_delivery(principal.principal(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Answers with the delivery as it reads after the removal.
pub async fn delete_delivery_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path((id, barcode)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let delivery = services
        .delete_delivery_item(principal.principal(), &id, &barcode)
        .await?;
    Ok(Json(delivery))
}
