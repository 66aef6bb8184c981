use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

/// JSON body extractor that runs `validator` rules before the handler.
///
/// Unparseable bodies and rule violations are both rejected with 400; the
/// latter carries the per-field error list.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Json parse error: {}", e)))?;

        value.validate()?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::StatusCode, routing::post};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Body1 {
        #[validate(length(min = 1, max = 5))]
        text: String,
    }

    async fn echo(ValidatedJson(body): ValidatedJson<Body1>) -> String {
        body.text
    }

    async fn call(payload: &'static str) -> StatusCode {
        Router::new()
            .route("/", post(echo))
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .body(Body::from(payload))
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        assert_eq!(call(r#"{"text":"hi"}"#).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn rejects_rule_violation_with_400() {
        assert_eq!(call(r#"{"text":""}"#).await, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rejects_malformed_json_with_400() {
        assert_eq!(call(r#"{"text":"#).await, StatusCode::BAD_REQUEST);
    }
}
