use axum::extract::FromRequest;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::AppError;

/// `axum::Json` whose body rejections become `AppError::BadRequest`, so a
/// missing field or a wrong type answers 400 with the usual `{"error": ..}`
/// body. Serializes like `axum::Json` when returned.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    #[allow(dead_code)]
    struct Movement {
        product_id: String,
        quantity: i64,
    }

    async fn reject(body: &'static str) -> Response {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        match Json::<Movement>::from_request(req, &()).await {
            Ok(_) => panic!("body {body} should be rejected"),
            Err(e) => e.into_response(),
        }
    }

    #[tokio::test]
    async fn missing_field_is_bad_request_with_json_body() {
        let resp = reject(r#"{"quantity": 5}"#).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn wrong_type_and_bad_syntax_are_bad_request() {
        assert_eq!(
            reject(r#"{"productId": 5, "quantity": 5}"#).await.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(reject("{not json").await.status(), StatusCode::BAD_REQUEST);
    }
}
