use axum::{
    async_trait,
    extract::FromRequestParts,
    headers,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json, RequestPartsExt, TypedHeader,
};
use rda_core::{
    cookie::{CSRF_COOKIE_NAME, CSRF_HEADER_NAME},
    types::UploadResponse,
};

const TOKEN_LENGTH: usize = 32;
const TOKEN_CHARSET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const REJECTION_MESSAGE: &str = "CSRF verification failed.";

pub fn new_token() -> String {
    random_string::generate(TOKEN_LENGTH, TOKEN_CHARSET)
}

/// The request's token, treating an empty cookie as no cookie.
fn cookie_token(cookies: Option<&headers::Cookie>) -> Option<&str> {
    cookies
        .and_then(|cookies| cookies.get(CSRF_COOKIE_NAME))
        .filter(|token| !token.is_empty())
}

/// The token the page should echo back, plus `Set-Cookie` headers when a
/// fresh one had to be handed out.
pub fn ensure_token(cookies: Option<&headers::Cookie>) -> (String, HeaderMap) {
    let mut headers = HeaderMap::new();
    if let Some(token) = cookie_token(cookies) {
        return (token.to_string(), headers);
    }

    let token = new_token();
    let cookie = format!("{}={}; SameSite=Lax; Path=/", CSRF_COOKIE_NAME, token);
    match cookie.parse() {
        Ok(value) => {
            headers.insert(header::SET_COOKIE, value);
        }
        Err(error) => tracing::error!(%error, "failed to build CSRF cookie"),
    }
    (token, headers)
}

/// Double-submit check: the submitted token must echo the cookie.
pub fn tokens_match(cookie: Option<&str>, submitted: Option<&str>) -> bool {
    match (cookie, submitted) {
        (Some(cookie), Some(submitted))
            if !cookie.is_empty() && cookie.len() == submitted.len() =>
        {
            cookie
                .bytes()
                .zip(submitted.bytes())
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
        }
        _ => false,
    }
}

pub fn verify(cookies: Option<&headers::Cookie>, submitted: Option<&str>) -> bool {
    let cookie = cookie_token(cookies);
    let verified = tokens_match(cookie, submitted);
    if !verified {
        tracing::warn!(
            has_cookie = cookie.is_some(),
            has_token = submitted.is_some(),
            "rejecting request with bad CSRF token"
        );
    }
    verified
}

/// Proof that a state-changing request passed the CSRF check.
pub struct CsrfVerified;

pub struct CsrfRejection;

impl IntoResponse for CsrfRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(UploadResponse::rejected(REJECTION_MESSAGE)),
        )
            .into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CsrfVerified
where
    S: Send + Sync,
{
    type Rejection = CsrfRejection;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let cookies = parts
            .extract::<Option<TypedHeader<headers::Cookie>>>()
            .await
            .unwrap_or_default();
        let header_token = parts
            .headers
            .get(CSRF_HEADER_NAME)
            .and_then(|value| value.to_str().ok());

        if verify(cookies.as_deref(), header_token) {
            Ok(CsrfVerified)
        } else {
            Err(CsrfRejection)
        }
    }
}
