use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::CoreError;
use crate::model::{AttrValue, AttributeName, Product, ProductId};
use crate::store::{ProductStore, ScanPage};

/// Default number of records returned per scan page.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// In-process product table with DynamoDB-like paging.
///
/// Clones share the same table. Nothing is persisted.
#[derive(Clone)]
pub struct MemoryStore {
    items: Arc<Mutex<BTreeMap<ProductId, Product>>>,
    page_size: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// A store whose scans return at most `page_size` records per page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            items: Arc::default(),
            page_size: page_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ProductId, Product>> {
        // A panic while holding the lock cannot leave a half-written record.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductStore for MemoryStore {
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, CoreError> {
        Ok(self.lock().get(id).cloned())
    }

    async fn put_product(&self, product: &Product) -> Result<(), CoreError> {
        self.lock().insert(product.id().clone(), product.clone());
        Ok(())
    }

    async fn scan_products(
        &self,
        exclusive_start_key: Option<&ProductId>,
    ) -> Result<ScanPage, CoreError> {
        let items = self.lock();
        let lower = match exclusive_start_key {
            Some(id) => Bound::Excluded(id),
            None => Bound::Unbounded,
        };

        let mut remaining = items.range::<ProductId, _>((lower, Bound::Unbounded));
        let page: Vec<Product> = remaining
            .by_ref()
            .take(self.page_size)
            .map(|(_, product)| product.clone())
            .collect();

        let last_evaluated_key = match remaining.next() {
            Some(_) => page.last().map(|product| product.id().clone()),
            None => None,
        };

        Ok(ScanPage {
            items: page,
            last_evaluated_key,
        })
    }

    async fn update_attribute(
        &self,
        id: &ProductId,
        name: &AttributeName,
        value: &AttrValue,
    ) -> Result<BTreeMap<String, AttrValue>, CoreError> {
        let mut items = self.lock();
        let product = items
            .get_mut(id)
            .ok_or_else(|| CoreError::NotFound(format!("product {id}")))?;

        *product = product.clone().with_attribute(name.clone(), value.clone());

        Ok(BTreeMap::from([(name.to_string(), value.clone())]))
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), CoreError> {
        self.lock().remove(id);
        Ok(())
    }
}
