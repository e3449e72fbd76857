// Warp error handling and propagation
//
// Handlers return `Result<impl Reply, ApiError>` instead of rejecting: a
// rejection means "some other filter may handle this request", whereas our
// errors are final and we want to bail out with `?`. `ApiError` knows how to
// turn itself into a JSON envelope with the right status code, and
// `into_response` flattens the `Result` into a `Response`:
//
//   .then(my_handler_func)
//   .map(into_response)
//
// Requests that never reach a handler (unknown route, malformed body, body too
// large) are converted into the same envelope by `handle_rejection`.

use std::convert::Infallible;

use serde_json::{json, Value};
use tracing::warn;
use warp::hyper::{Body, Response, StatusCode};
use warp::reject::{
    LengthRequired, MethodNotAllowed, PayloadTooLarge, Reject, Rejection, UnsupportedMediaType,
};
use warp::cors::CorsForbidden;
use warp::Reply;

use crate::catalog::{CatalogError, ErrorKind};

#[derive(Debug)]
pub enum ApiError {
    CatalogError(CatalogError),
    // Missing parameters or a request body of the wrong shape
    InvalidRequest(String),
}

// Wrap catalog errors so that handlers can use the `?` operator
impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::CatalogError(err)
    }
}

/// A multipart form that could not be read
#[derive(Debug)]
pub struct InvalidForm(pub String);

impl Reject for InvalidForm {}

pub fn error_body(message: String) -> Value {
    json!({ "success": false, "message": message })
}

impl ApiError {
    fn status_code_body(self: ApiError) -> (StatusCode, Value) {
        match self {
            ApiError::InvalidRequest(message) => (StatusCode::BAD_REQUEST, error_body(message)),
            ApiError::CatalogError(CatalogError::ValidationFailed { errors }) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "message": errors.join(", "),
                    "errors": errors,
                }),
            ),
            ApiError::CatalogError(e) => {
                let status = match e.kind() {
                    ErrorKind::InvalidInput | ErrorKind::ValidationFailed => {
                        StatusCode::BAD_REQUEST
                    }
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::AlreadyExists => StatusCode::CONFLICT,
                    ErrorKind::StorageFailure => {
                        warn!("Storage failure while serving request: {e}");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, error_body(e.to_string()))
            }
        }
    }
}

impl Reply for ApiError {
    fn into_response(self) -> Response<Body> {
        let (status, body) = self.status_code_body();
        warp::reply::with_status(warp::reply::json(&body), status).into_response()
    }
}

pub fn into_response<S: Reply, E: Reply>(reply_res: Result<S, E>) -> Response<Body> {
    match reply_res {
        Ok(resp) => resp.into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn handle_rejection(rejection: Rejection) -> Result<Response<Body>, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Route not found".to_string())
    } else if let Some(e) = rejection.find::<warp::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {e}"))
    } else if let Some(InvalidForm(e)) = rejection.find::<InvalidForm>() {
        (StatusCode::BAD_REQUEST, format!("Invalid form: {e}"))
    } else if let Some(e) = rejection.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if rejection.find::<PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request body too large".to_string(),
        )
    } else if rejection.find::<LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            "Content-Length header required".to_string(),
        )
    } else if rejection.find::<UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported content type".to_string(),
        )
    } else if let Some(e) = rejection.find::<CorsForbidden>() {
        (StatusCode::FORBIDDEN, e.to_string())
    } else if rejection.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed".to_string(),
        )
    } else {
        warn!("Unhandled rejection: {rejection:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(
        warp::reply::with_status(warp::reply::json(&error_body(message)), status)
            .into_response(),
    )
}
