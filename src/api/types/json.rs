//! JSON extractors that reject with the API error envelope

use std::borrow::Cow;

use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json as AxumJson,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use super::error::ApiError;

/// Wrapper around `axum::Json` whose rejections are JSON error bodies
///
/// Malformed and schema-violating bodies are both reported as 400.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match AxumJson::<T>::from_request(req, state).await {
            Ok(AxumJson(value)) => Ok(Json(value)),
            Err(rejection) => Err(rejection_to_error(&rejection)),
        }
    }
}

fn rejection_to_error(rejection: &axum::extract::rejection::JsonRejection) -> ApiError {
    use axum::extract::rejection::JsonRejection::*;

    match rejection {
        JsonDataError(err) => ApiError::bad_request(format!("Invalid JSON data: {}", err.body_text())),
        JsonSyntaxError(err) => {
            ApiError::bad_request(format!("Invalid JSON syntax: {}", err.body_text()))
        }
        MissingJsonContentType(_) => {
            let mut err =
                ApiError::bad_request("Missing Content-Type header. Expected 'application/json'.");
            err.status = StatusCode::UNSUPPORTED_MEDIA_TYPE;
            err
        }
        BytesRejection(err) => {
            ApiError::bad_request(format!("Failed to read request body: {}", err.body_text()))
        }
        _ => ApiError::bad_request("Invalid JSON request"),
    }
}

impl<T> IntoResponse for Json<T>
where
    T: serde::Serialize,
{
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}

/// JSON body that must also pass its `validator` rules
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate().map_err(|errors| validation_error(&errors))?;
        Ok(ValidatedJson(value))
    }
}

/// First violation, by field name, as a 400
pub fn validation_error(errors: &ValidationErrors) -> ApiError {
    let field_errors = errors.field_errors();
    let mut fields: Vec<_> = field_errors.keys().collect();
    fields.sort();

    let Some(field) = fields.first() else {
        return ApiError::bad_request("Invalid request body");
    };

    let constraint = field_errors
        .get(*field)
        .and_then(|errors| errors.first())
        .map(|error| {
            error
                .message
                .clone()
                .unwrap_or_else(|| Cow::Owned(error.code.to_string()))
        })
        .unwrap_or(Cow::Borrowed("is invalid"));

    let name: &str = field;
    let field = match name {
        "__all__" => "body",
        "is_completed" => "isCompleted",
        other => other,
    };

    ApiError::validation(field, constraint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::ValidationError;

    #[test]
    fn test_json_deref() {
        let json = Json("hello".to_string());
        assert_eq!(*json, "hello");
    }

    #[test]
    fn test_json_into_inner() {
        let json = Json(42);
        assert_eq!(json.into_inner(), 42);
    }

    #[test]
    fn test_validation_error_uses_message() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "title",
            ValidationError::new("blank").with_message(Cow::Borrowed("must not be empty")),
        );

        let err = validation_error(&errors);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.response.error.message, "title: must not be empty");
        assert_eq!(err.response.error.field.as_deref(), Some("title"));
    }

    #[test]
    fn test_validation_error_falls_back_to_code() {
        let mut errors = ValidationErrors::new();
        errors.add("title", ValidationError::new("length"));

        let err = validation_error(&errors);
        assert_eq!(err.response.error.message, "title: length");
    }
}
