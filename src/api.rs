use std::{sync::Arc, time::Duration};
use axum::{Router, routing::get, body::Bytes, extract::{Path, Query, State, rejection::QueryRejection}, Json, http::StatusCode};
use tower::ServiceBuilder;
use tower_http::{
    trace::TraceLayer,
    compression::CompressionLayer,
    timeout::TimeoutLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
};
use utoipa::OpenApi;
use crate::{
    db::DbPool,
    error::ApiError,
    model::{NewOrder, NewOrderItem, Order, OrderItem, ProductQuery},
};

const ORDER_NOT_FOUND: &str = "Order not found";
const ITEM_NOT_FOUND: &str = "Order item not found";

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
}

type ApiResult<T> = Result<T, ApiError>;

pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    let shared = Arc::new(state);

    Router::new()
        .route("/healthz", get(health))
        .route("/openapi.json", get(serve_openapi))
        .route("/api/v1/order", get(list_orders).post(create_order))
        // static segment, matched ahead of `/:number`
        .route("/api/v1/order/item", get(list_items_by_product))
        .route("/api/v1/order/:number", get(get_order))
        .route("/api/v1/order/:number/item", get(list_order_items).post(create_order_item))
        .route("/api/v1/order/:number/item/:index", get(get_order_item))
        .with_state(shared)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(request_timeout))
        )
}

#[utoipa::path(get, path = "/healthz", tag = "ops",
    responses((status = 200, description = "Service is ready", body = String)))]
pub async fn health() -> &'static str { "Order API is ready" }

#[utoipa::path(get, path = "/openapi.json", tag = "ops",
    responses((status = 200, description = "OpenAPI document")))]
pub async fn serve_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(crate::openapi::ApiDoc::openapi())
}

/// Duplicate numbers surface as a 500 carrying the engine's constraint message.
/// The body is decoded as JSON whatever its declared content type.
#[utoipa::path(
    post, path = "/api/v1/order", tag = "orders",
    request_body = NewOrder,
    responses(
        (status = 201, description = "Order created", body = Order),
        (status = 400, description = "Malformed body", body = crate::model::ErrorBody),
        (status = 500, description = "Storage failure, including a duplicate number", body = crate::model::ErrorBody)
    )
)]
#[axum::debug_handler]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let new: NewOrder = serde_json::from_slice(&body)?;
    let order = state.db.insert_order(new).await?;
    tracing::info!(id = order.id, number = %order.number, "order created");
    Ok((StatusCode::CREATED, Json(order)))
}

#[utoipa::path(
    get, path = "/api/v1/order/{number}", tag = "orders",
    params(("number" = String, Path, description = "Order number")),
    responses(
        (status = 200, description = "The order", body = Order),
        (status = 404, description = "No such order", body = crate::model::ErrorBody),
        (status = 500, description = "Storage failure", body = crate::model::ErrorBody)
    )
)]
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
) -> ApiResult<Json<Order>> {
    let order = state
        .db
        .get_order_by_number(&number)
        .await
        .map_err(ApiError::lookup(ORDER_NOT_FOUND))?;
    Ok(Json(order))
}

#[utoipa::path(
    get, path = "/api/v1/order", tag = "orders",
    responses(
        (status = 200, description = "All orders", body = [Order]),
        (status = 500, description = "Storage failure", body = crate::model::ErrorBody)
    )
)]
pub async fn list_orders(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.db.list_orders().await?))
}

/// The parent order is not required to exist.
#[utoipa::path(
    post, path = "/api/v1/order/{number}/item", tag = "items",
    params(("number" = String, Path, description = "Parent order number")),
    request_body = NewOrderItem,
    responses(
        (status = 201, description = "Item created", body = OrderItem),
        (status = 400, description = "Malformed body", body = crate::model::ErrorBody),
        (status = 500, description = "Storage failure", body = crate::model::ErrorBody)
    )
)]
pub async fn create_order_item(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<OrderItem>)> {
    let new: NewOrderItem = serde_json::from_slice(&body)?;
    let item = state.db.insert_order_item(&number, new).await?;
    tracing::info!(id = item.id, number = %item.order_number, index = item.index, "order item created");
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get, path = "/api/v1/order/{number}/item/{index}", tag = "items",
    params(
        ("number" = String, Path, description = "Order number"),
        ("index" = i64, Path, description = "Item position within the order")
    ),
    responses(
        (status = 200, description = "The item", body = OrderItem),
        (status = 400, description = "Index is not an integer", body = crate::model::ErrorBody),
        (status = 404, description = "No such item", body = crate::model::ErrorBody),
        (status = 500, description = "Storage failure", body = crate::model::ErrorBody)
    )
)]
pub async fn get_order_item(
    State(state): State<Arc<AppState>>,
    Path((number, index)): Path<(String, String)>,
) -> ApiResult<Json<OrderItem>> {
    let index: i64 = index
        .parse()
        .map_err(|e: std::num::ParseIntError| ApiError::BadRequest(e.to_string()))?;
    let item = state
        .db
        .get_order_item(&number, index)
        .await
        .map_err(ApiError::lookup(ITEM_NOT_FOUND))?;
    Ok(Json(item))
}

#[utoipa::path(
    get, path = "/api/v1/order/{number}/item", tag = "items",
    params(("number" = String, Path, description = "Order number")),
    responses(
        (status = 200, description = "Items of the order", body = [OrderItem]),
        (status = 500, description = "Storage failure", body = crate::model::ErrorBody)
    )
)]
pub async fn list_order_items(
    State(state): State<Arc<AppState>>,
    Path(number): Path<String>,
) -> ApiResult<Json<Vec<OrderItem>>> {
    Ok(Json(state.db.list_order_items(&number).await?))
}

#[utoipa::path(
    get, path = "/api/v1/order/item", tag = "items",
    params(ProductQuery),
    responses(
        (status = 200, description = "Items with exactly this product name", body = [OrderItem]),
        (status = 400, description = "Malformed query string", body = crate::model::ErrorBody),
        (status = 500, description = "Storage failure", body = crate::model::ErrorBody)
    )
)]
pub async fn list_items_by_product(
    State(state): State<Arc<AppState>>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> ApiResult<Json<Vec<OrderItem>>> {
    let Query(pairs) = query?;
    let query = ProductQuery::from_pairs(pairs);
    Ok(Json(state.db.list_order_items_by_product(&query.product).await?))
}
