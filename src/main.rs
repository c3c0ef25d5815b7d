use std::sync::Arc;

use actix_web::{App, HttpServer, middleware, web};

use funnelview::api::HttpBackend;
use funnelview::config::AppConfig;
use funnelview::handlers::funnel_handlers;
use funnelview::session::visitor::ensure_visitor_id;
use funnelview::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env();
    let backend = HttpBackend::new(&config.api)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;
    log::info!("Using funnel backend at {}", config.api.base_url);

    let state = web::Data::new(AppState::new(Arc::new(backend)));
    let secret_key = config.session_key();
    let cookie_secure = config.cookie_secure;
    let static_dir = config.static_dir.clone();

    log::info!("Starting server at http://{}", config.bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::from_fn(ensure_visitor_id))
            .wrap(funnelview::session_middleware(secret_key.clone(), cookie_secure))
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .service(actix_files::Files::new("/static", &static_dir))
            .configure(funnel_handlers::configure)
            // Default 404 handler (must be registered last)
            .default_service(web::to(funnelview::not_found))
    })
    .bind(&config.bind_addr)?
    .run()
    .await
}
