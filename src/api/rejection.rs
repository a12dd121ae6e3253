use std::convert::Infallible;

use warp::{
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{
        InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType,
    },
    reply::{self, Reply, Response},
    Rejection,
};

use crate::error::ApiError;

fn detail(status: StatusCode, message: &str) -> Response {
    reply::with_status(
        reply::json(&serde_json::json!({ "detail": message })),
        status,
    )
    .into_response()
}

/// Renders every rejection as a JSON error body
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(e) = err.find::<ApiError>() {
        if let ApiError::Internal(info) = e {
            log::error!("internal error: {info}");
        }
        return Ok(reply::with_status(reply::json(&e.body()), e.status()).into_response());
    }

    if err.is_not_found() {
        return Ok(detail(StatusCode::NOT_FOUND, "Not found."));
    }
    if let Some(e) = err.find::<BodyDeserializeError>() {
        return Ok(detail(StatusCode::BAD_REQUEST, &format!("JSON parse error - {e}")));
    }
    if let Some(e) = err.find::<InvalidQuery>() {
        return Ok(detail(StatusCode::BAD_REQUEST, &e.to_string()));
    }
    if err.find::<MethodNotAllowed>().is_some() {
        return Ok(detail(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed."));
    }
    if err.find::<PayloadTooLarge>().is_some() {
        return Ok(detail(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large."));
    }
    if err.find::<LengthRequired>().is_some() {
        return Ok(detail(StatusCode::LENGTH_REQUIRED, "Content-Length header is required."));
    }
    if err.find::<UnsupportedMediaType>().is_some() {
        return Ok(detail(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported media type.",
        ));
    }

    log::error!("unhandled rejection: {err:?}");
    Ok(detail(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error.",
    ))
}
