use crate::{
    api::{employee, project},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::{json_error_handler, path_error_handler},
    store::Stores,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

/// Registers the data access collaborators and extractor configuration.
pub fn configure_data(cfg: &mut web::ServiceConfig, stores: &Stores) {
    cfg.app_data(web::Data::new(stores.clone()))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler));
}

/// Resource routes below the protected API prefix.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/employee")
            // /employee/{employee_id}/info
            .service(
                web::resource("/{employee_id}/info").route(web::get().to(employee::get_info)),
            )
            // /employee/{employee_id}/leaves
            .service(
                web::resource("/{employee_id}/leaves")
                    .route(web::get().to(employee::get_leaves))
                    .route(web::post().to(employee::add_leaves))
                    .route(web::put().to(employee::update_leaves))
                    .route(web::delete().to(employee::delete_leaves)),
            ),
    )
    .service(
        web::scope("/project")
            // /project
            .service(web::resource("").route(web::get().to(project::list_projects)))
            // /project/{project_id}
            .service(web::resource("/{project_id}").route(web::get().to(project::get_project))),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let per_ms = (60_000 / requests_per_min as u64).max(1);
        let cfg = GovernorConfigBuilder::default()
            .milliseconds_per_request(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("period and burst size are non-zero");
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .configure(api_routes),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token + rotated refresh_token
