//! Response envelope
//!
//! Every dispatch ends in exactly one envelope: the handler's payload or an
//! error body carrying a message.

use crate::logger;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    /// Handler output, passed through untouched
    Success(serde_json::Value),
    Error(ErrorBody),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
}

impl ResponseEnvelope {
    pub const ERROR_CODE: u16 = 500;

    /// Canonical error envelope for a failed dispatch
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_code(Self::ERROR_CODE, message)
    }

    pub fn with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Error(ErrorBody {
            code,
            message: message.into(),
        })
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Success(_) => StatusCode::OK,
            Self::Error(body) => {
                StatusCode::from_u16(body.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// Render as a JSON HTTP response
    pub fn into_response(self, server_name: &str) -> Response<Full<Bytes>> {
        let status = self.status();
        let json = match serde_json::to_string(&self) {
            Ok(j) => j,
            Err(e) => {
                logger::log_error(&format!("Failed to serialize response: {e}"));
                return Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .header("Content-Type", "application/json")
                    .body(Full::new(Bytes::from(
                        r#"{"code":500,"message":"Internal server error"}"#,
                    )))
                    .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Error"))));
            }
        };

        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .header("Server", server_name)
            .body(Full::new(Bytes::from(json)))
            .unwrap_or_else(|e| {
                logger::log_error(&format!("Failed to build response: {e}"));
                Response::new(Full::new(Bytes::from("Error")))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_error_shape() {
        let envelope = ResponseEnvelope::error("boom");
        assert!(envelope.is_error());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            serde_json::json!({"code": 500, "message": "boom"})
        );
    }

    #[test]
    fn test_success_passthrough() {
        let payload = serde_json::json!({"title": "Dune", "year": 1965});
        let envelope = ResponseEnvelope::Success(payload.clone());
        assert_eq!(serde_json::to_value(&envelope).unwrap(), payload);
        assert_eq!(envelope.status(), StatusCode::OK);
    }

    #[test]
    fn test_status_from_code() {
        assert_eq!(
            ResponseEnvelope::with_code(404, "nope").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ResponseEnvelope::with_code(1, "bad").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_into_response() {
        let response = ResponseEnvelope::error("boom").into_response("test");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()["Content-Type"], "application/json");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"code":500,"message":"boom"}"#);
    }
}
