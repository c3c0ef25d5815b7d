pub mod actions;
pub mod helpers;
pub mod view;

use actix_web::{HttpResponse, web};

pub use actions::{confirm, step, step_simple};
pub use view::{show, show_simple};

/// GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().content_type("text/plain; charset=utf-8").body("ok")
}

/// Public viewer routes for both the full (`/funnel`) and the simple (`/f`) viewer.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/funnel/{slug}", web::get().to(show))
        .route("/funnel/{slug}/step", web::post().to(step))
        .route("/funnel/{slug}/confirm", web::post().to(confirm))
        .route("/f/{slug}", web::get().to(show_simple))
        .route("/f/{slug}/step", web::post().to(step_simple));
}
