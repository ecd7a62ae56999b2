use warp::{reject::Rejection, Filter};

use crate::error::FoodgramError;

use super::jwt::{SessionData, SessionKey};

const AUTHORIZATION_HEADER: &str = "authorization";

/// Requires a valid session token
pub fn with_session(
    key: SessionKey,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>(AUTHORIZATION_HEADER).and_then(
        move |header: Option<String>| {
            let session = match header {
                Some(header) => key.verify_header(&header),
                None => Err(FoodgramError::Unauthorized(String::from(
                    "Authentication credentials were not provided",
                ))),
            };

            async move { session.map_err(Rejection::from) }
        },
    )
}

/// Anonymous callers pass through as `None`, a present but invalid token is rejected
pub fn with_possible_session(
    key: SessionKey,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>(AUTHORIZATION_HEADER).and_then(
        move |header: Option<String>| {
            let session = header
                .map(|header| key.verify_header(&header))
                .transpose();

            async move { session.map_err(Rejection::from) }
        },
    )
}
