//! Application factory
//!
//! Builds the Actix-web application around a shared [`AppState`].

use actix_web::{web, App};
use tracing_actix_web::TracingLogger;

use crate::handlers::json_error_handler;
use crate::middleware::cors::create_cors;
use crate::routes::{health, sessions};
use crate::state::AppState;

/// Create and configure the application with all dependencies
pub fn create_app(
    app_state: web::Data<AppState>,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse<
            impl actix_web::body::MessageBody,
        >,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let cors = create_cors(&app_state.config().cors);
    let json_config = web::JsonConfig::default()
        .limit(app_state.config().server.max_payload_size)
        .error_handler(json_error_handler);

    App::new()
        .app_data(app_state)
        .app_data(json_config)
        // Order matters: CORS answers preflights inside the request span
        .wrap(cors)
        .wrap(TracingLogger::default())
        .route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/api/v1")
                .configure(sessions::configure)
                .route("/", web::get().to(health::api_documentation)),
        )
        .default_service(web::route().to(health::not_found))
}
