pub mod common;
pub mod payments;
pub mod products;

use crate::db::Db;
use crate::events::EventSender;
use crate::services::payments::PaymentService;
use crate::services::products::ProductService;
use std::sync::Arc;

pub use crate::AppState;

/// All application services, wired once at startup and shared through
/// [`AppState`].
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<ProductService>,
    pub payments: Arc<PaymentService>,
}

impl AppServices {
    pub fn new(db: Db, event_sender: Arc<EventSender>) -> Self {
        Self {
            products: Arc::new(ProductService::new(db.clone(), event_sender.clone())),
            payments: Arc::new(PaymentService::new(db, event_sender)),
        }
    }
}
