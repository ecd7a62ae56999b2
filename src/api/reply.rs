use std::convert::Infallible;

use serde::Serialize;
use warp::{
    filters::body::BodyDeserializeError,
    http::{header, StatusCode},
    reject::{
        InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, Rejection,
        UnsupportedMediaType,
    },
    reply::{self, Reply, Response},
};

use crate::error::FoodgramError;

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

pub fn json<T: Serialize>(value: &T, status: StatusCode) -> Response {
    reply::with_status(reply::json(value), status).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Plain text body served as a file download
pub fn attachment(body: String, filename: &str) -> Response {
    let body = reply::with_header(body, header::CONTENT_TYPE, "text/plain; charset=utf-8");
    reply::with_header(
        body,
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{filename}\""),
    )
    .into_response()
}

fn error(status: StatusCode, detail: String) -> Response {
    json(&ErrorBody { detail }, status)
}

/// Turns every rejection into a `{"detail": ...}` body
pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    if let Some(e) = err.find::<FoodgramError>() {
        return Ok(error(e.status(), e.to_string()));
    }

    let (status, detail) = if let Some(e) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Malformed request body: {e}"))
    } else if err.find::<InvalidQuery>().is_some() {
        (StatusCode::BAD_REQUEST, String::from("Malformed query string"))
    } else if err.find::<PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, String::from("Request body is too large"))
    } else if err.find::<LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, String::from("Content-Length is required"))
    } else if err.find::<UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            String::from("Expected an application/json body"),
        )
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, String::from("Not found"))
    } else if err.find::<MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, String::from("Method not allowed"))
    } else {
        log::error!("Unhandled rejection: {err:?}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Internal server error"),
        )
    };

    Ok(error(status, detail))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn foodgram_errors_keep_their_status() {
        let rejection: Rejection = FoodgramError::InvalidSelfReference.into();
        let response = handle_rejection(rejection).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let rejection: Rejection = FoodgramError::not_found("Recipe").into();
        let response = handle_rejection(rejection).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = handle_rejection(warp::reject::not_found()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn attachment_sets_disposition() {
        let response = attachment(String::from("Salt (g) - 8\n"), "shopping_list.txt");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"shopping_list.txt\""
        );
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }
}
