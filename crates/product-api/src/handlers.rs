use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use axum::http::StatusCode;
use product_core::{AttrValue, AttributeName, CoreError, Product, ProductId, ProductStore};
use serde::Serialize;
use tracing::info;

use crate::errors::ApiError;
use crate::response::Envelope;

#[derive(Serialize)]
pub struct ProductListResponse<'a> {
    pub products: &'a [Product],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaveResponse<'a> {
    pub operation: &'static str,
    pub message: &'static str,
    pub product: &'a Product,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateResponse<'a> {
    pub operation: &'static str,
    pub message: &'static str,
    pub updated_attributes: &'a BTreeMap<String, AttrValue>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteResponse<'a> {
    pub operation: &'static str,
    pub message: &'static str,
    pub product_id: &'a ProductId,
}

/// The product operations, bound to one store client.
///
/// Built once at startup and shared by every invocation. Every store call is
/// bounded by `operation_timeout`.
pub struct ProductService<S> {
    store: S,
    operation_timeout: Duration,
}

impl<S: ProductStore> ProductService<S> {
    pub fn new(store: S, operation_timeout: Duration) -> Self {
        Self {
            store,
            operation_timeout,
        }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        match tokio::time::timeout(self.operation_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CoreError::Timeout(self.operation_timeout)),
        }
    }

    /// `GET /product?productId=<id>`
    pub async fn get_product(&self, id: &ProductId) -> Result<Envelope, ApiError> {
        match self.bounded(self.store.get_product(id)).await? {
            Some(product) => Ok(Envelope::json(StatusCode::OK, &product)),
            None => Err(ApiError::product_not_found(id)),
        }
    }

    /// `GET /products`
    ///
    /// Follows the scan continuation key until the table is exhausted and
    /// returns every page's records together.
    pub async fn get_products(&self) -> Result<Envelope, ApiError> {
        let mut products: Vec<Product> = Vec::new();
        let mut start_key: Option<ProductId> = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .bounded(self.store.scan_products(start_key.as_ref()))
                .await?;
            pages += 1;
            products.extend(page.items);

            match page.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }

        info!(count = products.len(), pages, "listed products");
        Ok(Envelope::json(
            StatusCode::OK,
            &ProductListResponse {
                products: &products,
            },
        ))
    }

    /// `POST /product`
    ///
    /// Creates or replaces the record unconditionally.
    pub async fn save_product(&self, product: Product) -> Result<Envelope, ApiError> {
        self.bounded(self.store.put_product(&product)).await?;

        info!(product_id = %product.id(), "saved product");
        Ok(Envelope::json(
            StatusCode::OK,
            &SaveResponse {
                operation: "Save",
                message: "Success",
                product: &product,
            },
        ))
    }

    /// `PATCH /product`
    ///
    /// Sets one attribute on an existing record. Fails with 404 rather than
    /// creating a partial record when the key is unknown.
    pub async fn modify_product(
        &self,
        id: &ProductId,
        name: &AttributeName,
        value: AttrValue,
    ) -> Result<Envelope, ApiError> {
        let updated = self
            .bounded(self.store.update_attribute(id, name, &value))
            .await
            .map_err(|e| match e {
                CoreError::NotFound(_) => ApiError::product_not_found(id),
                other => other.into(),
            })?;

        info!(product_id = %id, attribute = %name, "modified product");
        Ok(Envelope::json(
            StatusCode::OK,
            &UpdateResponse {
                operation: "UPDATE",
                message: "Success",
                updated_attributes: &updated,
            },
        ))
    }

    /// `DELETE /product`
    ///
    /// Deleting an unknown key succeeds.
    pub async fn delete_product(&self, id: &ProductId) -> Result<Envelope, ApiError> {
        self.bounded(self.store.delete_product(id)).await?;

        info!(product_id = %id, "deleted product");
        Ok(Envelope::json(
            StatusCode::OK,
            &DeleteResponse {
                operation: "Delete",
                message: "Success",
                product_id: id,
            },
        ))
    }
}
