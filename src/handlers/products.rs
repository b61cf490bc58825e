use super::common::PaginationParams;
use crate::entities::product;
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::products::{CreateProductInput, UpdateProductInput};
use crate::{ApiResponse, PaginatedResponse};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Mechanical keyboard",
    "description": "Tenkeyless, hot-swappable switches",
    "price": "129.99",
    "stock": 25
}))]
pub struct CreateProductRequest {
    /// Product display name
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "Mechanical keyboard")]
    pub name: String,
    /// Optional long-form description
    pub description: Option<String>,
    /// Unit price (non-negative fixed-point decimal)
    #[schema(example = "129.99")]
    pub price: Decimal,
    /// Initial stock level (non-negative)
    #[schema(example = 25)]
    pub stock: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({ "stock": 40 }))]
pub struct SetStockRequest {
    /// Absolute stock level; rejected when negative
    #[schema(example = 40)]
    pub stock: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "129.99")]
    pub price: Decimal,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            stock: model.stock,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = crate::ApiResponse<ProductResponse>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), ServiceError> {
    request.validate()?;

    let product = state
        .services
        .products
        .create_product(CreateProductInput {
            name: request.name,
            description: request.description,
            price: request.price,
            stock: request.stock,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(product.into())),
    ))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product details", body = crate::ApiResponse<ProductResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    let product = state.services.products.get_product(id).await?;
    Ok(Json(ApiResponse::success(product.into())))
}

/// List products with pagination
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams),
    responses(
        (status = 200, description = "Product list", body = crate::ApiResponse<crate::PaginatedResponse<ProductResponse>>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<ProductResponse>>>, ServiceError> {
    let (products, total) = state
        .services
        .products
        .list_products(params.page, params.per_page)
        .await?;

    let response = PaginatedResponse {
        items: products.into_iter().map(ProductResponse::from).collect(),
        total,
        page: params.page,
        limit: params.per_page,
        total_pages: total.div_ceil(params.per_page.max(1)),
    };

    Ok(Json(ApiResponse::success(response)))
}

/// Update a product's name, description or price
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = crate::ApiResponse<ProductResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    request.validate()?;

    let product = state
        .services
        .products
        .update_product(
            id,
            UpdateProductInput {
                name: request.name,
                description: request.description,
                price: request.price,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(product.into())))
}

/// Delete a product (payments referencing it are removed by cascade)
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.products.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Set the absolute stock level for a product
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}/stock",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = SetStockRequest,
    responses(
        (status = 200, description = "Stock updated", body = crate::ApiResponse<ProductResponse>),
        (status = 400, description = "Negative stock rejected", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn set_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SetStockRequest>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    let product = state.services.products.set_stock(id, request.stock).await?;
    Ok(Json(ApiResponse::success(product.into())))
}

/// Product routes
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product).get(list_products))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/:id/stock", put(set_stock))
}
