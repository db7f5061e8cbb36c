use crate::{
    api::{dashboard, employee, leave_request, leave_type, notification, profile},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    store::Store,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("limiter period and burst are non-zero");
    Governor::new(&cfg)
}

pub fn configure<S: Store>(cfg: &mut web::ServiceConfig, config: &Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login::<S>)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register::<S>)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token::<S>)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout::<S>)),
            )
            .service(
                web::resource("/password-reset")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::password_reset_request::<S>)),
            )
            .service(
                web::resource("/password-reset/{token}")
                    .wrap(register_limiter)
                    .route(web::post().to(handlers::password_reset_confirm::<S>)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .route("/dashboard", web::get().to(dashboard::dashboard::<S>))
            .route("/approvals", web::get().to(leave_request::approval_queue::<S>))
            .service(
                web::resource("/profile")
                    .route(web::get().to(profile::get_profile::<S>))
                    .route(web::put().to(profile::update_profile::<S>)),
            )
            .service(
                web::scope("/leave-types")
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_type::list_leave_types::<S>))
                            .route(web::post().to(leave_type::create_leave_type::<S>)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::put().to(leave_type::update_leave_type::<S>)),
                    ),
            )
            .service(
                web::scope("/leave")
                    // /leave
                    .service(
                        web::resource("")
                            .route(web::get().to(leave_request::my_leaves::<S>))
                            .route(web::post().to(leave_request::apply_leave::<S>)),
                    )
                    // fixed segments before /leave/{id}
                    .service(
                        web::resource("/balances")
                            .route(web::get().to(leave_request::leave_balances::<S>)),
                    )
                    .service(
                        web::resource("/records")
                            .route(web::get().to(leave_request::leave_records::<S>)),
                    )
                    .service(
                        web::resource("/{id}").route(web::get().to(leave_request::get_leave::<S>)),
                    )
                    .service(
                        web::resource("/{id}/approve")
                            .route(web::put().to(leave_request::approve_leave::<S>)),
                    )
                    .service(
                        web::resource("/{id}/reject")
                            .route(web::put().to(leave_request::reject_leave::<S>)),
                    ),
            )
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("").route(web::get().to(employee::list_employees::<S>)),
                    )
                    .service(
                        web::resource("/{user_id}/employment")
                            .route(web::put().to(employee::update_employment::<S>)),
                    )
                    .service(
                        web::resource("/{user_id}/allowances/{leave_type_id}")
                            .route(web::put().to(employee::set_allowance::<S>)),
                    ),
            )
            .service(
                web::resource("/accounts/{user_id}")
                    .route(web::delete().to(employee::delete_account::<S>)),
            )
            .service(
                web::scope("/admin")
                    .route("/dashboard", web::get().to(dashboard::admin_dashboard::<S>))
                    .route("/fix-allowances", web::post().to(employee::fix_allowances::<S>)),
            )
            .service(
                web::scope("/notifications")
                    .service(
                        web::resource("")
                            .route(web::get().to(notification::list_notifications::<S>)),
                    )
                    .service(
                        web::resource("/read-all")
                            .route(web::put().to(notification::mark_all_read::<S>)),
                    )
                    .service(
                        web::resource("/{id}/read")
                            .route(web::put().to(notification::mark_read::<S>)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns a new pair; the old refresh token is revoked
