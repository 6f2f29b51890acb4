use aws_lambda_events::encodings::Body;
use aws_lambda_events::event::apigw::ApiGatewayProxyResponse;
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;

/// Generic message returned for any server-side failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Response in the API Gateway proxy integration format.
///
/// `body` is omitted from the serialized form when there is no payload, which
/// is distinct from an empty body.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct Envelope(ApiGatewayProxyResponse);

impl Envelope {
    /// A response without a body.
    pub fn empty(status: StatusCode) -> Self {
        let mut response = ApiGatewayProxyResponse::default();
        response.status_code = i64::from(status.as_u16());
        response.headers = default_headers();
        Self(response)
    }

    /// A response whose body is `body` encoded as JSON.
    ///
    /// Store decimals are written as JSON numbers. If encoding fails the
    /// result is a 500 response instead.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(text) => Self::with_raw_body(status, text),
            Err(e) => {
                tracing::error!("failed to encode response body: {e}");
                Self::with_raw_body(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "Message": INTERNAL_ERROR_MESSAGE }).to_string(),
                )
            }
        }
    }

    fn with_raw_body(status: StatusCode, body: String) -> Self {
        let mut envelope = Self::empty(status);
        envelope.0.body = Some(Body::Text(body));
        envelope
    }

    pub fn status(&self) -> StatusCode {
        u16::try_from(self.0.status_code)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.0.headers
    }

    pub fn body(&self) -> Option<&str> {
        match &self.0.body {
            Some(Body::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, Option<String>) {
        let status = self.status();
        let body = match self.0.body {
            Some(Body::Text(text)) => Some(text),
            _ => None,
        };
        (status, self.0.headers, body)
    }
}

impl From<Envelope> for ApiGatewayProxyResponse {
    fn from(envelope: Envelope) -> Self {
        envelope.0
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers
}
