use std::borrow::Cow;

use aws_lambda_events::event::apigw::ApiGatewayProxyRequest;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ApiError;

/// Body of `PATCH /product`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyRequest {
    pub product_id: String,
    pub update_key: String,
    pub update_value: Value,
}

/// Body of `DELETE /product`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub product_id: String,
}

/// The raw body of a gateway event as text. API Gateway base64-encodes
/// bodies it treats as binary and sets `isBase64Encoded`.
pub fn event_body(event: &ApiGatewayProxyRequest) -> Result<Option<Cow<'_, str>>, ApiError> {
    let Some(body) = event.body.as_deref() else {
        return Ok(None);
    };
    if !event.is_base64_encoded {
        return Ok(Some(Cow::Borrowed(body)));
    }

    let bytes = STANDARD
        .decode(body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid base64 body: {e}")))?;
    String::from_utf8(bytes)
        .map(|text| Some(Cow::Owned(text)))
        .map_err(|_| ApiError::BadRequest("Request body is not valid UTF-8".to_string()))
}

/// Decode a JSON request body, treating a missing or blank body as a bad
/// request.
pub fn parse_body<T: DeserializeOwned>(body: Option<&str>) -> Result<T, ApiError> {
    let raw = body
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Request body is required".to_string()))?;

    serde_json::from_str(raw).map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(body: &str, base64: bool) -> ApiGatewayProxyRequest {
        let mut event = ApiGatewayProxyRequest::default();
        event.body = Some(body.to_string());
        event.is_base64_encoded = base64;
        event
    }

    #[test]
    fn plain_body_is_borrowed() {
        let event = event(r#"{"productId": "1"}"#, false);
        let body = event_body(&event).unwrap().unwrap();
        assert!(matches!(body, Cow::Borrowed(_)));
        assert_eq!(body, r#"{"productId": "1"}"#);
    }

    #[test]
    fn base64_body_is_decoded() {
        let event = event("eyJwcm9kdWN0SWQiOiIxIn0=", true);
        let body = event_body(&event).unwrap().unwrap();
        assert_eq!(body, r#"{"productId":"1"}"#);
    }

    #[test]
    fn undecodable_bodies_are_rejected() {
        let garbage = event("not base64!", true);
        assert!(matches!(event_body(&garbage), Err(ApiError::BadRequest(_))));

        // 0xff 0xfe is not UTF-8.
        let binary = event("//4=", true);
        assert!(matches!(event_body(&binary), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn missing_body() {
        let event = ApiGatewayProxyRequest::default();
        assert!(event_body(&event).unwrap().is_none());
    }

    #[test]
    fn modify_request_requires_every_field() {
        let ok: Result<ModifyRequest, _> = parse_body(Some(
            r#"{"productId": "1", "updateKey": "price", "updateValue": 9.99}"#,
        ));
        assert!(ok.is_ok());

        let missing: Result<ModifyRequest, _> =
            parse_body(Some(r#"{"productId": "1", "updateKey": "price"}"#));
        assert!(matches!(missing, Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn blank_or_malformed_bodies_are_rejected() {
        let none: Result<DeleteRequest, _> = parse_body(None);
        assert!(matches!(none, Err(ApiError::BadRequest(_))));

        let blank: Result<DeleteRequest, _> = parse_body(Some("  "));
        assert!(matches!(blank, Err(ApiError::BadRequest(_))));

        let broken: Result<DeleteRequest, _> = parse_body(Some("{\"productId\": "));
        assert!(matches!(broken, Err(ApiError::BadRequest(msg)) if msg.starts_with("Invalid JSON")));
    }
}
