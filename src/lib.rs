pub mod api;
pub mod config;
pub mod engine;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod session;
pub mod state;
pub mod templates_structs;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::Key;

/// Cookie-backed session carrying each visitor's viewer state, CSRF token and toast.
pub fn session_middleware(key: Key, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_secure(secure)
        .cookie_http_only(true)
        .build()
}

/// Fallback for unknown routes.
pub async fn not_found() -> actix_web::HttpResponse {
    let html = include_str!("../templates/errors/404.html");
    actix_web::HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body(html)
}
