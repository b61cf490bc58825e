use crate::{
    db::Db,
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryOrder, Set};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const MAX_LIMIT: u64 = 100;

/// Inventory management service: product CRUD plus a guarded stock setter.
///
/// This service never participates in payment flows. The lifecycle engine
/// mutates stock exclusively through its own atomic guarded updates; the
/// `set_stock` operation here is an administrative absolute write and is
/// validated non-negative but not safe against concurrent payment traffic.
#[derive(Clone)]
pub struct ProductService {
    db: Db,
    event_sender: Arc<EventSender>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
}

impl ProductService {
    pub fn new(db: Db, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Create a new product
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price must be non-negative".to_string(),
            ));
        }
        if input.stock < 0 {
            return Err(ServiceError::ValidationError(
                "stock must be non-negative".to_string(),
            ));
        }

        let product_id = Uuid::new_v4();
        let now = Utc::now();

        let model = product::ActiveModel {
            id: Set(product_id),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            stock: Set(input.stock),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let product = model.insert(self.db.conn()).await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(product_id))
            .await;

        info!("Created product: {}", product_id);
        Ok(product)
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<product::Model, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(self.db.conn())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// List products with pagination, newest first
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let limit = limit.clamp(1, MAX_LIMIT);
        let page = page.max(1);

        let paginator = ProductEntity::find()
            .order_by_desc(product::Column::CreatedAt)
            .paginate(self.db.conn(), limit);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok((items, total))
    }

    /// Update an existing product's descriptive fields and price
    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        if let Some(price) = input.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "price must be non-negative".to_string(),
                ));
            }
        }

        let product = self.get_product(product_id).await?;
        let mut active: product::ActiveModel = product.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        active.updated_at = Set(Utc::now());

        let product = active.update(self.db.conn()).await?;

        self.event_sender
            .send_or_log(Event::ProductUpdated(product_id))
            .await;

        info!("Updated product: {}", product_id);
        Ok(product)
    }

    /// Delete a product by ID.
    ///
    /// Payments referencing the product are removed by the storage-level
    /// cascade; payment history does not outlive its product.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        let product = self.get_product(product_id).await?;
        product.delete(self.db.conn()).await?;

        self.event_sender
            .send_or_log(Event::ProductDeleted(product_id))
            .await;

        info!("Deleted product: {}", product_id);
        Ok(())
    }

    /// Set the absolute stock level for a product, rejecting negatives.
    #[instrument(skip(self))]
    pub async fn set_stock(
        &self,
        product_id: Uuid,
        stock: i32,
    ) -> Result<product::Model, ServiceError> {
        if stock < 0 {
            return Err(ServiceError::ValidationError(
                "stock must be non-negative".to_string(),
            ));
        }

        let product = self.get_product(product_id).await?;
        let mut active: product::ActiveModel = product.into();
        active.stock = Set(stock);
        active.updated_at = Set(Utc::now());
        let product = active.update(self.db.conn()).await?;

        self.event_sender
            .send_or_log(Event::StockLevelSet { product_id, stock })
            .await;

        info!("Set stock for product {} to {}", product_id, stock);
        Ok(product)
    }
}
