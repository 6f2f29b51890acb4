#![recursion_limit = "256"]

use aws_lambda_events::event::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use product_api::config::Config;
use product_api::{ProductService, dispatch, telemetry};
use product_core::DynamoStore;
use tracing::{Instrument, info, info_span};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::from_env()?;
    telemetry::init(config.log_format);

    // One client per execution environment, reused across invocations.
    let store = DynamoStore::new(&config.table_name, config.dynamodb_endpoint.as_deref()).await;
    let service = ProductService::new(store, config.operation_timeout);
    let service = &service;

    info!(
        table = %config.table_name,
        timeout = ?config.operation_timeout,
        "product api starting"
    );

    run(service_fn(
        move |event: LambdaEvent<ApiGatewayProxyRequest>| async move {
            let (request, context) = event.into_parts();
            let envelope = dispatch::handle(service, &request)
                .instrument(info_span!("invocation", request_id = %context.request_id))
                .await;
            Ok::<ApiGatewayProxyResponse, Error>(envelope.into())
        },
    ))
    .await
}
