use crate::{
    db::Db,
    entities::{
        payment::{self, Entity as PaymentEntity, PaymentMethod, PaymentStatus},
        product::{self, Entity as ProductEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Payment lifecycle engine.
///
/// Owns every transition that touches stock or payment status: creation
/// (idempotent stock reservation), the status state machine, and cancellation
/// with stock restoration. Each operation runs as exactly one coordinated
/// transaction; cross-step consistency comes from the store's row locking,
/// not from in-memory state.
#[derive(Clone)]
pub struct PaymentService {
    db: Db,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone)]
pub struct CreatePaymentInput {
    pub product_id: Uuid,
    pub payment_method: PaymentMethod,
    pub user_id: String,
    pub idempotency_key: String,
}

/// A payment joined with the product it reserved, for read endpoints.
pub type PaymentWithProduct = (payment::Model, Option<product::Model>);

impl PaymentService {
    pub fn new(db: Db, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a payment, reserving one unit of the product's stock.
    ///
    /// Repeated calls with the same idempotency key return the original
    /// payment without further writes; per unique key either no stock change
    /// or exactly one decrement happens, regardless of retries or concurrent
    /// callers. Concurrent creators targeting the same product serialize on
    /// the product's exclusive row lock.
    #[instrument(skip(self), fields(product_id = %input.product_id))]
    pub async fn create_payment(
        &self,
        input: CreatePaymentInput,
    ) -> Result<payment::Model, ServiceError> {
        if input.idempotency_key.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "idempotency key must not be empty".to_string(),
            ));
        }
        if input.user_id.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "user id must not be empty".to_string(),
            ));
        }

        let key = input.idempotency_key.clone();

        let result = self
            .db
            .transaction(move |txn| {
                Box::pin(async move {
                    // Idempotency check: a payment for this key already
                    // exists, return it untouched.
                    if let Some(existing) = PaymentEntity::find()
                        .filter(payment::Column::IdempotencyKey.eq(input.idempotency_key.as_str()))
                        .one(txn)
                        .await?
                    {
                        return Ok((existing, false));
                    }

                    // Exclusive row lock: concurrent creators of the same
                    // product queue here until this transaction ends.
                    let product = ProductEntity::find_by_id(input.product_id)
                        .lock_exclusive()
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Product {} not found",
                                input.product_id
                            ))
                        })?;

                    if product.stock <= 0 {
                        return Err(ServiceError::OutOfStock(format!(
                            "Product {} is out of stock",
                            product.id
                        )));
                    }

                    // Guarded decrement. Redundant under proper locking, but
                    // the stock > 0 condition catches isolation-level
                    // surprises: zero affected rows means the counter was
                    // drained between the lock and this statement.
                    let updated = ProductEntity::update_many()
                        .col_expr(
                            product::Column::Stock,
                            Expr::col(product::Column::Stock).sub(1),
                        )
                        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(product::Column::Id.eq(product.id))
                        .filter(product::Column::Stock.gt(0))
                        .exec(txn)
                        .await?;
                    if updated.rows_affected == 0 {
                        return Err(ServiceError::StockDepleted(format!(
                            "Stock for product {} was depleted concurrently",
                            product.id
                        )));
                    }

                    let now = Utc::now();
                    let model = payment::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(product.id),
                        // Snapshot of the current price; never re-read later.
                        amount: Set(product.price),
                        status: Set(PaymentStatus::Initialized),
                        payment_method: Set(input.payment_method),
                        user_id: Set(input.user_id),
                        idempotency_key: Set(input.idempotency_key),
                        created_at: Set(now),
                        updated_at: Set(now),
                    };

                    let created = model.insert(txn).await?;
                    Ok((created, true))
                })
            })
            .await;

        let (created_payment, freshly_created) = match result {
            Ok(value) => value,
            Err(ServiceError::DatabaseError(err))
                if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
            {
                // The storage-level unique index fired despite the in-transaction
                // check: another creator committed the same key first. Treat it
                // as "return the now-existing record".
                warn!(
                    "idempotency key race detected, returning existing payment: {}",
                    err
                );
                let existing = PaymentEntity::find()
                    .filter(payment::Column::IdempotencyKey.eq(key.as_str()))
                    .one(self.db.conn())
                    .await?
                    .ok_or(ServiceError::DatabaseError(err))?;
                (existing, false)
            }
            Err(err) => return Err(err),
        };

        if freshly_created {
            self.event_sender
                .send_or_log(Event::PaymentCreated {
                    payment_id: created_payment.id,
                    product_id: created_payment.product_id,
                })
                .await;
            info!(
                "Created payment {} for product {}",
                created_payment.id, created_payment.product_id
            );
        }

        Ok(created_payment)
    }

    /// Advance a payment's status along the fixed transition table.
    ///
    /// Stock is never touched here; the only stock mutations belong to
    /// creation and cancellation.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        payment_id: Uuid,
        new_status: PaymentStatus,
    ) -> Result<payment::Model, ServiceError> {
        let (updated, old_status) = self
            .db
            .transaction(move |txn| {
                Box::pin(async move {
                    let current = PaymentEntity::find_by_id(payment_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Payment {} not found", payment_id))
                        })?;

                    let old_status = current.status;
                    if !old_status.can_transition_to(new_status) {
                        return Err(ServiceError::InvalidTransition(format!(
                            "cannot transition payment {} from '{}' to '{}'; valid next states: [{}]",
                            payment_id,
                            old_status,
                            new_status,
                            old_status.valid_next_display()
                        )));
                    }

                    let mut active: payment::ActiveModel = current.into();
                    active.status = Set(new_status);
                    active.updated_at = Set(Utc::now());
                    let updated = active.update(txn).await?;
                    Ok((updated, old_status))
                })
            })
            .await?;

        self.event_sender
            .send_or_log(Event::PaymentStatusChanged {
                payment_id,
                old_status,
                new_status,
            })
            .await;

        info!(
            "Payment {} status updated from '{}' to '{}'",
            payment_id, old_status, new_status
        );
        Ok(updated)
    }

    /// Cancel an `initialized` payment: restore one unit of stock and delete
    /// the payment row. Returns the payment as it existed immediately before
    /// deletion.
    #[instrument(skip(self))]
    pub async fn cancel(&self, payment_id: Uuid) -> Result<payment::Model, ServiceError> {
        let snapshot = self
            .db
            .transaction(move |txn| {
                Box::pin(async move {
                    let current = PaymentEntity::find_by_id(payment_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Payment {} not found", payment_id))
                        })?;

                    if current.status != PaymentStatus::Initialized {
                        return Err(ServiceError::NotCancelable(format!(
                            "payment {} has status '{}'; only 'initialized' payments can be cancelled",
                            payment_id, current.status
                        )));
                    }

                    // Restore the unit reserved at creation.
                    let restored = ProductEntity::update_many()
                        .col_expr(
                            product::Column::Stock,
                            Expr::col(product::Column::Stock).add(1),
                        )
                        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(product::Column::Id.eq(current.product_id))
                        .exec(txn)
                        .await?;
                    if restored.rows_affected == 0 {
                        // The FK guarantees the product exists while the
                        // payment does; zero rows means the schema contract
                        // was violated elsewhere.
                        return Err(ServiceError::InternalError(format!(
                            "product {} missing while cancelling payment {}",
                            current.product_id, payment_id
                        )));
                    }

                    PaymentEntity::delete_by_id(payment_id).exec(txn).await?;
                    Ok(current)
                })
            })
            .await?;

        self.event_sender
            .send_or_log(Event::PaymentCancelled {
                payment_id,
                product_id: snapshot.product_id,
            })
            .await;

        info!(
            "Cancelled payment {} and restored stock for product {}",
            payment_id, snapshot.product_id
        );
        Ok(snapshot)
    }

    /// Fetch a payment with its product snapshot; `None` when absent.
    #[instrument(skip(self))]
    pub async fn get_payment(
        &self,
        payment_id: Uuid,
    ) -> Result<Option<PaymentWithProduct>, ServiceError> {
        let found = PaymentEntity::find_by_id(payment_id)
            .find_also_related(ProductEntity)
            .one(self.db.conn())
            .await?;
        Ok(found)
    }

    /// List payments with their product snapshots, most recent first, with an
    /// optional exact-match status filter. Plain read-committed reads.
    #[instrument(skip(self))]
    pub async fn list_payments(
        &self,
        status: Option<PaymentStatus>,
    ) -> Result<Vec<PaymentWithProduct>, ServiceError> {
        let mut query = PaymentEntity::find()
            .find_also_related(ProductEntity)
            .order_by_desc(payment::Column::CreatedAt);

        if let Some(status) = status {
            query = query.filter(payment::Column::Status.eq(status));
        }

        let payments = query.all(self.db.conn()).await?;
        Ok(payments)
    }

    /// Sum of `amount` over all `complete` payments; zero when none exist.
    #[instrument(skip(self))]
    pub async fn total_completed(&self) -> Result<Decimal, ServiceError> {
        let total: Option<Option<Decimal>> = PaymentEntity::find()
            .select_only()
            .column_as(payment::Column::Amount.sum(), "total")
            .filter(payment::Column::Status.eq(PaymentStatus::Complete))
            .into_tuple()
            .one(self.db.conn())
            .await?;

        Ok(total.flatten().unwrap_or(Decimal::ZERO))
    }
}
