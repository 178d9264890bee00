use actix_web::{
    HttpRequest, HttpResponse, ResponseError,
    error::{JsonPayloadError, PathError},
    http::StatusCode,
};
use derive_more::Display;
use serde_json::json;
use tracing::error;

use crate::{store::RepoError, utils::validation::ValidationErrors};

/// Errors a handler can answer with. The body is always `{"message": ...}`,
/// plus `errors` for validation failures.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "Validation failed")]
    Validation(ValidationErrors),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Validation(errors) => json!({
                "message": self.to_string(),
                "errors": errors.errors(),
            }),
            _ => json!({ "message": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<RepoError> for ApiError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(message) => ApiError::NotFound(message),
            RepoError::Forbidden(message) => ApiError::Forbidden(message),
            RepoError::Database(message) => {
                error!(error = %message, "Data access failed");
                ApiError::Internal
            }
        }
    }
}

// Malformed input from the extractors gets the same 400 payload as handler-side validation.

/// Size limits and payload read errors keep actix's own status (413 and so on).
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    match err {
        JsonPayloadError::Deserialize(_) | JsonPayloadError::ContentType => {
            ApiError::Validation(ValidationErrors::single("body", err.to_string())).into()
        }
        other => other.into(),
    }
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::Validation(ValidationErrors::single("path", err.to_string())).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, body::to_bytes, http::header::ContentType, test, web};

    #[::core::prelude::v1::test]
    fn repo_errors_keep_their_message() {
        let err = ApiError::from(RepoError::employee_not_found(42));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Employee 42 not found");

        let err = ApiError::from(RepoError::leave_not_owned(101, 7));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[::core::prelude::v1::test]
    fn database_errors_are_hidden() {
        let err = ApiError::from(RepoError::Database("connection refused".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[actix_web::test]
    async fn json_errors_split_into_validation_and_size_limits() {
        let app = test::init_service(
            App::new()
                .app_data(
                    web::JsonConfig::default()
                        .limit(32)
                        .error_handler(json_error_handler),
                )
                .route(
                    "/",
                    web::post().to(|_: web::Json<serde_json::Value>| async { HttpResponse::Ok() }),
                ),
        )
        .await;

        let post = |body: &'static str| {
            test::TestRequest::post()
                .uri("/")
                .insert_header(ContentType::json())
                .set_payload(body)
                .to_request()
        };

        let resp = test::call_service(&app, post("{not json")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Validation failed");

        let big = r#"{"note": "far more than thirty-two bytes of payload"}"#;
        let resp = test::call_service(&app, post(big)).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[actix_web::test]
    async fn validation_body_lists_field_errors() {
        let err = ApiError::from(ValidationErrors::single("[0].end_date", "bad range"));
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"][0]["field"], "[0].end_date");
    }
}
