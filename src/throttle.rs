// src/throttle.rs
//! Error payloads of rate-limited HTTP APIs.
//!
//! Chat/bot APIs answer an over-quota request with a body such as
//! `{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 7","parameters":{"retry_after":7}}`.
//! Jobs that call such APIs can turn the body into a [`QueueError`] so the
//! retry wrapper sees a throttle signal instead of an opaque failure.

use crate::{QueueError, Result};
use serde::{Deserialize, Serialize};

pub const TOO_MANY_REQUESTS: i64 = 429;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub ok: bool,
    pub error_code: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseParameters {
    #[serde(default)]
    pub retry_after: Option<i64>,
    #[serde(default)]
    pub migrate_to_chat_id: Option<i64>,
}

impl ApiErrorResponse {
    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn is_throttled(&self) -> bool {
        self.error_code == TOO_MANY_REQUESTS
    }

    pub fn retry_after(&self) -> Option<i64> {
        self.parameters.as_ref().and_then(|p| p.retry_after)
    }

    /// Classify the response: 429 is a throttle signal, everything else is final.
    pub fn into_error(self) -> QueueError {
        if self.is_throttled() {
            return QueueError::rate_limited(self.retry_after());
        }

        let description = self
            .description
            .unwrap_or_else(|| "no description".to_string());
        anyhow::anyhow!("API error {}: {}", self.error_code, description).into()
    }
}

impl From<ApiErrorResponse> for QueueError {
    fn from(response: ApiErrorResponse) -> Self {
        response.into_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_many_requests_is_throttle() {
        let response = ApiErrorResponse::from_json(
            r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 7","parameters":{"retry_after":7}}"#,
        )
        .unwrap();

        assert!(response.is_throttled());
        assert!(matches!(
            response.into_error(),
            QueueError::RateLimited {
                retry_after: Some(7)
            }
        ));
    }

    #[test]
    fn throttle_without_parameters_has_no_hint() {
        let response = ApiErrorResponse::from_json(r#"{"error_code":429}"#).unwrap();
        assert_eq!(response.retry_after(), None);
        assert!(matches!(
            QueueError::from(response),
            QueueError::RateLimited { retry_after: None }
        ));
    }

    #[test]
    fn other_codes_are_not_retryable() {
        let response = ApiErrorResponse::from_json(
            r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#,
        )
        .unwrap();

        let error = response.into_error();
        assert!(!error.is_retryable());
        assert_eq!(
            error.to_string(),
            "Job execution failed: API error 403: Forbidden: bot was blocked by the user"
        );
    }

    #[test]
    fn malformed_body_is_serialization_error() {
        let err = ApiErrorResponse::from_json("<html>").unwrap_err();
        assert!(matches!(err, QueueError::Serialization(_)));
    }
}
