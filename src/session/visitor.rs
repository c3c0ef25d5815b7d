use std::future::{Ready, ready};

use actix_web::{
    Error, FromRequest, HttpMessage, HttpRequest,
    body::MessageBody,
    cookie::{Cookie, SameSite, time::Duration},
    dev::{Payload, ServiceRequest, ServiceResponse},
    middleware::Next,
};

use super::csrf::generate_token;

pub const VISITOR_COOKIE: &str = "funnel_visitor_id";
const VISITOR_COOKIE_DAYS: i64 = 365;

/// Random per-browser identifier used to correlate tracking events across sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorId(pub String);

impl VisitorId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid(id: &str) -> bool {
    id.len() == 64 && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// Middleware that makes a `VisitorId` available to every handler and issues
/// the long-lived cookie the first time a browser shows up.
pub async fn ensure_visitor_id(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let existing = req
        .cookie(VISITOR_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| is_valid(v));
    let (id, fresh) = match existing {
        Some(id) => (id, false),
        None => (generate_token(), true),
    };
    req.extensions_mut().insert(VisitorId(id.clone()));

    let mut res = next.call(req).await?;
    if fresh {
        let cookie = Cookie::build(VISITOR_COOKIE, id)
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(Duration::days(VISITOR_COOKIE_DAYS))
            .finish();
        if let Err(e) = res.response_mut().add_cookie(&cookie) {
            log::warn!("Failed to set visitor cookie: {e}");
        }
    }
    Ok(res)
}

impl FromRequest for VisitorId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let id = req.extensions().get::<VisitorId>().cloned().or_else(|| {
            req.cookie(VISITOR_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|v| is_valid(v))
                .map(VisitorId)
        });
        ready(id.ok_or_else(|| actix_web::error::ErrorInternalServerError("visitor id middleware missing")))
    }
}
