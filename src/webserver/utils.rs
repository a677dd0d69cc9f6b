/// Response helpers shared by the API routes
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// 200 with the payload serialized as-is
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Error body with a machine-readable code when one applies
pub fn error_response(status: StatusCode, message: &str, code: Option<&str>) -> Response {
    let mut body = json!({ "error": message });
    if let Some(code) = code {
        body["code"] = json!(code);
    }
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_response_carries_code() {
        let resp = error_response(StatusCode::UNAUTHORIZED, "nope", Some("invalid_signature"));
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "nope");
        assert_eq!(body["code"], "invalid_signature");
    }

    #[tokio::test]
    async fn test_error_response_omits_absent_code() {
        let resp = error_response(StatusCode::INTERNAL_SERVER_ERROR, "boom", None);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body.get("code").is_none());
    }
}
