use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// OpenAPI document for the checkout API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Checkout API",
        version = env!("CARGO_PKG_VERSION"),
        description = "Inventory-backed payment lifecycle service: products with stock, \
                       idempotent payment creation, a fixed status state machine, and \
                       cancellation with stock restoration."
    ),
    paths(
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::list_products,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::products::set_stock,
        crate::handlers::payments::create_payment,
        crate::handlers::payments::get_payment,
        crate::handlers::payments::list_payments,
        crate::handlers::payments::update_payment_status,
        crate::handlers::payments::cancel_payment,
        crate::handlers::payments::total_completed,
        crate::health::health,
        crate::health::liveness,
        crate::health::readiness,
    ),
    components(schemas(
        crate::handlers::products::CreateProductRequest,
        crate::handlers::products::UpdateProductRequest,
        crate::handlers::products::SetStockRequest,
        crate::handlers::products::ProductResponse,
        crate::handlers::payments::CreatePaymentRequest,
        crate::handlers::payments::UpdatePaymentStatusRequest,
        crate::handlers::payments::PaymentResponse,
        crate::handlers::payments::ProductSummary,
        crate::handlers::payments::TotalCompletedResponse,
        crate::entities::PaymentMethod,
        crate::entities::PaymentStatus,
        crate::errors::ErrorResponse,
        crate::health::HealthResponse,
    )),
    tags(
        (name = "Products", description = "Product catalog and stock management"),
        (name = "Payments", description = "Payment lifecycle operations"),
        (name = "Health", description = "Service health probes")
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/swagger-ui`, serving the generated document at
/// `/api-docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
