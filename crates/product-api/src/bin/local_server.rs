use product_api::config::{Config, LocalConfig, StoreBackend};
use product_api::{ProductService, local, telemetry};
use product_core::{DynamoStore, MemoryStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = Config::from_env()?;
    let local_config = LocalConfig::from_env()?;
    telemetry::init(config.log_format);

    let addr = local_config.listen_addr;
    let request_timeout = config.operation_timeout * 2;

    match local_config.store_backend {
        StoreBackend::Memory => {
            info!(page_size = local_config.scan_page_size, "using in-memory store");
            let store = MemoryStore::with_page_size(local_config.scan_page_size);
            let service = ProductService::new(store, config.operation_timeout);
            local::serve(service, addr, request_timeout).await?;
        }
        StoreBackend::DynamoDb => {
            let store =
                DynamoStore::new(&config.table_name, config.dynamodb_endpoint.as_deref()).await;
            info!(table = %store.table_name(), "using DynamoDB store");
            let service = ProductService::new(store, config.operation_timeout);
            local::serve(service, addr, request_timeout).await?;
        }
    }

    Ok(())
}
