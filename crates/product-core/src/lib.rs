pub mod db;
pub mod error;
pub mod memory;
pub mod model;
pub mod store;

pub use db::DynamoStore;
pub use error::CoreError;
pub use memory::MemoryStore;
pub use model::{AttrValue, AttributeName, Decimal, ModelError, PRODUCT_ID_ATTRIBUTE, Product, ProductId};
pub use store::{ProductStore, ScanPage};
