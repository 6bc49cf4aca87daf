use crate::application_port::*;
use serde::Serialize;
use std::convert::Infallible;
use thiserror::Error;
use tracing::{debug, warn};
use warp::http::StatusCode;
use warp::{Rejection, reject};

/// Turns every rejection into a JSON `{error, message}` body with the status
/// belonging to its code.
pub async fn recover_error(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let api_error = if let Some(err) = err.find::<ApiError>() {
        err.clone()
    } else if let Some(err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        debug!("Rejected request body: {}", err);
        ApiError::validation("malformed request body")
    } else if err.find::<reject::InvalidQuery>().is_some() {
        ApiError::validation("malformed query string")
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        ApiError::validation("expected an application/json body")
    } else if err.find::<reject::LengthRequired>().is_some()
        || err.find::<reject::PayloadTooLarge>().is_some()
    {
        ApiError::validation("request body missing or too large")
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        ApiError::from(ApiErrorCode::MethodNotAllowed)
    } else if err.is_not_found() {
        ApiError::from(ApiErrorCode::NotFound)
    } else {
        warn!("Unhandled rejection: {:?}", err);
        ApiError::from(ApiErrorCode::InternalError)
    };

    let status = api_error.error.status();
    Ok(warp::reply::with_status(
        warp::reply::json(&api_error),
        status,
    ))
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Error, Serialize)]
pub enum ApiErrorCode {
    #[error("Missing or invalid fields")]
    ValidationError,
    #[error("Username already taken")]
    DuplicateUsername,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Token is not valid")]
    InvalidToken,
    #[error("Not allowed to act for another user")]
    Forbidden,
    #[error("Not found")]
    NotFound,
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Concurrent update, please retry")]
    Conflict,
    #[error("Server error")]
    StoreError,
    #[error("Internal error")]
    InternalError,
}

impl ApiErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiErrorCode::ValidationError | ApiErrorCode::DuplicateUsername => {
                StatusCode::BAD_REQUEST
            }
            ApiErrorCode::InvalidCredentials | ApiErrorCode::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::Conflict => StatusCode::CONFLICT,
            ApiErrorCode::StoreError | ApiErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Wire form of every failure. The message is always one we wrote; driver and
/// hashing errors are logged, never echoed.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub error: ApiErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            error: code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::ValidationError, message)
    }

    pub fn internal<E: std::fmt::Display>(code: ApiErrorCode, error: E) -> ApiError {
        warn!("Internal error: {}", error);
        ApiError::from(code)
    }
}

impl reject::Reject for ApiError {}

impl From<ApiErrorCode> for ApiError {
    fn from(code: ApiErrorCode) -> Self {
        ApiError::new(code, code.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::InvalidInput(message) => ApiError::validation(message),
            AuthError::UsernameTaken => ApiErrorCode::DuplicateUsername.into(),
            AuthError::InvalidCredentials => ApiErrorCode::InvalidCredentials.into(),
            AuthError::UserNotFound | AuthError::TokenInvalid | AuthError::TokenExpired => {
                ApiErrorCode::InvalidToken.into()
            }
            AuthError::Store(e) => ApiError::internal(ApiErrorCode::StoreError, e),
            AuthError::InternalError(e) => ApiError::internal(ApiErrorCode::InternalError, e),
        }
    }
}

impl From<CountryStatusError> for ApiError {
    fn from(error: CountryStatusError) -> Self {
        match error {
            CountryStatusError::Validation(message) => ApiError::validation(message),
            CountryStatusError::NotFound => ApiErrorCode::NotFound.into(),
            CountryStatusError::Conflict => ApiErrorCode::Conflict.into(),
            CountryStatusError::Store(e) => ApiError::internal(ApiErrorCode::StoreError, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AuthError::UsernameTaken, ApiErrorCode::DuplicateUsername, 400)]
    #[case(AuthError::InvalidCredentials, ApiErrorCode::InvalidCredentials, 401)]
    #[case(AuthError::TokenExpired, ApiErrorCode::InvalidToken, 401)]
    #[case(AuthError::UserNotFound, ApiErrorCode::InvalidToken, 401)]
    #[case(AuthError::InvalidInput("x".into()), ApiErrorCode::ValidationError, 400)]
    #[case(AuthError::Store("boom".into()), ApiErrorCode::StoreError, 500)]
    fn auth_errors_map_onto_the_taxonomy(
        #[case] error: AuthError,
        #[case] code: ApiErrorCode,
        #[case] status: u16,
    ) {
        let api_error = ApiError::from(error);
        assert_eq!(api_error.error, code);
        assert_eq!(api_error.error.status().as_u16(), status);
    }

    #[rstest]
    #[case(CountryStatusError::NotFound, ApiErrorCode::NotFound, 404)]
    #[case(CountryStatusError::Conflict, ApiErrorCode::Conflict, 409)]
    #[case(CountryStatusError::Validation("x".into()), ApiErrorCode::ValidationError, 400)]
    #[case(CountryStatusError::Store("boom".into()), ApiErrorCode::StoreError, 500)]
    fn country_errors_map_onto_the_taxonomy(
        #[case] error: CountryStatusError,
        #[case] code: ApiErrorCode,
        #[case] status: u16,
    ) {
        let api_error = ApiError::from(error);
        assert_eq!(api_error.error, code);
        assert_eq!(api_error.error.status().as_u16(), status);
    }

    #[test]
    fn store_details_do_not_reach_the_client() {
        let api_error = ApiError::from(CountryStatusError::Store(
            "Duplicate entry '1-JPN' for key 'uq_country_status_user_iso'".to_string(),
        ));
        let body = serde_json::to_value(&api_error).unwrap();

        assert_eq!(
            body,
            serde_json::json!({"error": "StoreError", "message": "Server error"})
        );
    }
}
