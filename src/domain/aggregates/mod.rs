//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{DeliveryPrices, Product, ProductError, ProductStatus};
pub use order::{Order, OrderError, OrderLine, OrderStatus};
pub use cart::{Cart, CartError, CartLine};
