pub mod payment;
pub mod product;

pub use payment::{
    Entity as Payment, Model as PaymentModel, PaymentMethod, PaymentStatus,
};
pub use product::{Entity as Product, Model as ProductModel};
