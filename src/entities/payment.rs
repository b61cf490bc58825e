use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Payment entity for the checkout flow.
///
/// `amount` is a snapshot of the product price taken at creation time and is
/// never re-read afterwards. `idempotency_key` is globally unique; the table
/// carries a unique index as a storage-level backstop to the application
/// check. `product_id` is immutable after creation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub user_id: String,
    #[sea_orm(unique)]
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Payment status enumeration.
///
/// Statuses advance strictly along
/// `initialized -> user_set -> payment_processing -> complete`; `complete` is
/// terminal. There is no `cancelled` status: cancellation deletes the row and
/// is only permitted while the payment is still `initialized`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "initialized")]
    Initialized,
    #[sea_orm(string_value = "user_set")]
    UserSet,
    #[sea_orm(string_value = "payment_processing")]
    PaymentProcessing,
    #[sea_orm(string_value = "complete")]
    Complete,
}

impl PaymentStatus {
    /// The full set of statuses this status may transition to.
    pub fn valid_next(self) -> &'static [PaymentStatus] {
        match self {
            PaymentStatus::Initialized => &[PaymentStatus::UserSet],
            PaymentStatus::UserSet => &[PaymentStatus::PaymentProcessing],
            PaymentStatus::PaymentProcessing => &[PaymentStatus::Complete],
            PaymentStatus::Complete => &[],
        }
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        self.valid_next().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.valid_next().is_empty()
    }

    /// Human-readable list of the valid successors, for error messages.
    pub fn valid_next_display(self) -> String {
        let names: Vec<String> = self.valid_next().iter().map(|s| s.to_string()).collect();
        names.join(", ")
    }
}

/// Payment method enumeration.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "card")]
    Card,
    #[sea_orm(string_value = "bank_transfer")]
    BankTransfer,
    #[sea_orm(string_value = "wallet")]
    Wallet,
    #[sea_orm(string_value = "cash")]
    Cash,
}
