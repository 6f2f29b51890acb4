use std::collections::BTreeMap;
use std::future::Future;

use crate::error::CoreError;
use crate::model::{AttrValue, AttributeName, Product, ProductId};

/// One page of a table scan.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub items: Vec<Product>,
    /// Key to resume from. `None` once the table is exhausted.
    pub last_evaluated_key: Option<ProductId>,
}

/// The table operations the API needs from a key-value store keyed by
/// `productId`.
///
/// Implementations are expected to be cheap to share and safe to call from
/// concurrent invocations.
pub trait ProductStore: Send + Sync {
    /// Fetch a record by exact key.
    fn get_product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<Option<Product>, CoreError>> + Send;

    /// Create or replace a record.
    fn put_product(&self, product: &Product) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Read one page of records, starting after `exclusive_start_key`.
    fn scan_products(
        &self,
        exclusive_start_key: Option<&ProductId>,
    ) -> impl Future<Output = Result<ScanPage, CoreError>> + Send;

    /// Atomically set a single attribute on an existing record.
    ///
    /// Returns the updated attribute values. Fails with
    /// [`CoreError::NotFound`] if no record has the given key.
    fn update_attribute(
        &self,
        id: &ProductId,
        name: &AttributeName,
        value: &AttrValue,
    ) -> impl Future<Output = Result<BTreeMap<String, AttrValue>, CoreError>> + Send;

    /// Remove a record. Removing a missing key is not an error.
    fn delete_product(&self, id: &ProductId) -> impl Future<Output = Result<(), CoreError>> + Send;
}
