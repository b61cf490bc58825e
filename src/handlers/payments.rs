use crate::entities::{payment, product, PaymentMethod, PaymentStatus};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::payments::{CreatePaymentInput, PaymentWithProduct};
use crate::ApiResponse;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "product_id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
    "payment_method": "card",
    "user_id": "user-42",
    "idempotency_key": "checkout-42-attempt-1"
}))]
pub struct CreatePaymentRequest {
    /// Product to reserve one unit of
    pub product_id: Uuid,
    /// One of: card, bank_transfer, wallet, cash
    #[schema(example = "card")]
    pub payment_method: PaymentMethod,
    /// Identifier of the purchasing user
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "user-42")]
    pub user_id: String,
    /// Client-chosen key; retries with the same key return the original payment
    #[validate(length(min = 1, max = 255))]
    #[schema(example = "checkout-42-attempt-1")]
    pub idempotency_key: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "status": "user_set" }))]
pub struct UpdatePaymentStatusRequest {
    /// Target status; must be the current status's direct successor
    pub status: PaymentStatus,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PaymentListParams {
    /// Optional exact-match status filter (e.g. `complete`)
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    #[schema(example = "129.99")]
    pub price: Decimal,
    pub stock: i32,
}

impl From<product::Model> for ProductSummary {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            price: model.price,
            stock: model.stock,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    /// Price snapshot taken at creation time
    #[schema(example = "129.99")]
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub user_id: String,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present on read endpoints that join the product
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSummary>,
}

impl From<payment::Model> for PaymentResponse {
    fn from(model: payment::Model) -> Self {
        Self {
            id: model.id,
            product_id: model.product_id,
            amount: model.amount,
            status: model.status,
            payment_method: model.payment_method,
            user_id: model.user_id,
            idempotency_key: model.idempotency_key,
            created_at: model.created_at,
            updated_at: model.updated_at,
            product: None,
        }
    }
}

impl From<PaymentWithProduct> for PaymentResponse {
    fn from((payment, product): PaymentWithProduct) -> Self {
        let mut response = PaymentResponse::from(payment);
        response.product = product.map(ProductSummary::from);
        response
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({ "total": "259.98" }))]
pub struct TotalCompletedResponse {
    /// Sum of `amount` over payments in status `complete`; zero when none
    pub total: Decimal,
}

/// Create a payment, reserving one unit of stock
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment created (or returned unchanged for a repeated idempotency key)", body = crate::ApiResponse<PaymentResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Product out of stock", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentResponse>>), ServiceError> {
    request.validate()?;

    let payment = state
        .services
        .payments
        .create_payment(CreatePaymentInput {
            product_id: request.product_id,
            payment_method: request.payment_method,
            user_id: request.user_id,
            idempotency_key: request.idempotency_key,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(payment.into())),
    ))
}

/// Get a payment with its product
#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment details", body = crate::ApiResponse<PaymentResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PaymentResponse>>, ServiceError> {
    let payment = state
        .services
        .payments
        .get_payment(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", id)))?;

    Ok(Json(ApiResponse::success(payment.into())))
}

/// List payments, most recent first, with an optional status filter
#[utoipa::path(
    get,
    path = "/api/v1/payments",
    params(PaymentListParams),
    responses(
        (status = 200, description = "Payment list", body = crate::ApiResponse<Vec<PaymentResponse>>),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(params): Query<PaymentListParams>,
) -> Result<Json<ApiResponse<Vec<PaymentResponse>>>, ServiceError> {
    let status = params
        .status
        .as_deref()
        .map(|raw| {
            raw.parse::<PaymentStatus>().map_err(|_| {
                ServiceError::ValidationError(format!("unknown payment status '{}'", raw))
            })
        })
        .transpose()?;

    let payments = state.services.payments.list_payments(status).await?;
    let items = payments.into_iter().map(PaymentResponse::from).collect();
    Ok(Json(ApiResponse::success(items)))
}

/// Advance a payment to the next status
#[utoipa::path(
    put,
    path = "/api/v1/payments/{id}/status",
    params(("id" = Uuid, Path, description = "Payment ID")),
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = crate::ApiResponse<PaymentResponse>),
        (status = 400, description = "Invalid transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn update_payment_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePaymentStatusRequest>,
) -> Result<Json<ApiResponse<PaymentResponse>>, ServiceError> {
    let payment = state
        .services
        .payments
        .update_status(id, request.status)
        .await?;

    Ok(Json(ApiResponse::success(payment.into())))
}

/// Cancel an initialized payment and restore its stock unit
#[utoipa::path(
    post,
    path = "/api/v1/payments/{id}/cancel",
    params(("id" = Uuid, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment cancelled; returns the payment as it was before deletion", body = crate::ApiResponse<PaymentResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Payment no longer cancelable", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn cancel_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PaymentResponse>>, ServiceError> {
    let payment = state.services.payments.cancel(id).await?;
    Ok(Json(ApiResponse::success(payment.into())))
}

/// Sum of completed payment amounts
#[utoipa::path(
    get,
    path = "/api/v1/payments/total",
    responses(
        (status = 200, description = "Completed total", body = crate::ApiResponse<TotalCompletedResponse>)
    ),
    tag = "Payments"
)]
pub async fn total_completed(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<TotalCompletedResponse>>, ServiceError> {
    let total = state.services.payments.total_completed().await?;
    Ok(Json(ApiResponse::success(TotalCompletedResponse { total })))
}

/// Payment routes
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment).get(list_payments))
        .route("/total", get(total_completed))
        .route("/:id", get(get_payment))
        .route("/:id/status", put(update_payment_status))
        .route("/:id/cancel", post(cancel_payment))
}
