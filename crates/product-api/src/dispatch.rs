use std::collections::HashMap;

use aws_lambda_events::event::apigw::ApiGatewayProxyRequest;
use axum::http::StatusCode;
use product_core::{AttrValue, AttributeName, Product, ProductId, ProductStore};
use serde_json::Value;
use tracing::{Instrument, info, info_span};

use crate::errors::ApiError;
use crate::handlers::ProductService;
use crate::request::{DeleteRequest, ModifyRequest, event_body, parse_body};
use crate::response::Envelope;

pub const HEALTH_PATH: &str = "/health";
pub const PRODUCT_PATH: &str = "/product";
pub const PRODUCTS_PATH: &str = "/products";

const PRODUCT_ID_PARAM: &str = "productId";

/// Handle one API Gateway REST proxy event. Always yields a well-formed
/// envelope.
pub async fn handle<S: ProductStore>(
    service: &ProductService<S>,
    event: &ApiGatewayProxyRequest,
) -> Envelope {
    let method = event.http_method.as_str();
    let path = event.path.as_deref().unwrap_or_default();
    let query: HashMap<String, String> = event
        .query_string_parameters
        .first(PRODUCT_ID_PARAM)
        .map(|id| (PRODUCT_ID_PARAM.to_string(), id.to_string()))
        .into_iter()
        .collect();

    match event_body(event) {
        Ok(body) => route(service, method, path, &query, body.as_deref()).await,
        Err(err) => info_span!("request", method, path).in_scope(|| respond(Err(err))),
    }
}

/// Route a request by method and path to its operation.
///
/// Unknown routes answer 404 with the JSON string `"Not Found"`. Input errors
/// answer 400, store failures 500.
pub async fn route<S: ProductStore>(
    service: &ProductService<S>,
    method: &str,
    path: &str,
    query: &HashMap<String, String>,
    body: Option<&str>,
) -> Envelope {
    let span = info_span!("request", method, path);

    async { respond(dispatch(service, method, path, query, body).await) }
        .instrument(span)
        .await
}

fn respond(result: Result<Envelope, ApiError>) -> Envelope {
    let envelope = result.unwrap_or_else(ApiError::into_envelope);
    info!(status = envelope.status().as_u16(), "request handled");
    envelope
}

async fn dispatch<S: ProductStore>(
    service: &ProductService<S>,
    method: &str,
    path: &str,
    query: &HashMap<String, String>,
    body: Option<&str>,
) -> Result<Envelope, ApiError> {
    match (method, path) {
        ("GET", HEALTH_PATH) => Ok(Envelope::empty(StatusCode::OK)),
        ("GET", PRODUCT_PATH) => {
            let id = query
                .get(PRODUCT_ID_PARAM)
                .ok_or_else(|| ApiError::BadRequest("productId query parameter is required".into()))?;
            service.get_product(&ProductId::new(id.as_str())?).await
        }
        ("GET", PRODUCTS_PATH) => service.get_products().await,
        ("POST", PRODUCT_PATH) => {
            let raw: Value = parse_body(body)?;
            service.save_product(Product::try_from(raw)?).await
        }
        ("PATCH", PRODUCT_PATH) => {
            let req: ModifyRequest = parse_body(body)?;
            let id = ProductId::new(req.product_id)?;
            let name = AttributeName::new(req.update_key)?;
            let value = AttrValue::try_from(req.update_value)?;
            service.modify_product(&id, &name, value).await
        }
        ("DELETE", PRODUCT_PATH) => {
            let req: DeleteRequest = parse_body(body)?;
            service.delete_product(&ProductId::new(req.product_id)?).await
        }
        _ => Ok(Envelope::json(StatusCode::NOT_FOUND, "Not Found")),
    }
}
