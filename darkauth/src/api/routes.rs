//! # Route Configuration
//!
//! Defines URL patterns and maps them to handler functions. This process
//! serves two distinct ports from two distinct `ServiceConfig` functions —
//! [`configure_user`] and [`configure_admin`] — bound separately in `main.rs`.
//! The two surfaces share services but never share a route tree: an admin
//! session cookie is never accepted on the user port and vice versa.
//!
//! ## User port
//!
//! ```text
//! /
//! ├── health                                GET  → health_check
//! ├── .well-known/
//! │   ├── openid-configuration              GET  → openid_configuration
//! │   └── jwks.json                         GET  → jwks
//! ├── authorize                             POST → authorize_start
//! ├── authorize/finalize                    POST → authorize_finalize
//! ├── token                                 POST → token
//! ├── session                               GET  → user_session
//! ├── logout                                POST → user_logout
//! ├── opaque/
//! │   ├── register/start                    POST → opaque_register_start
//! │   ├── register/finish                   POST → opaque_register_finish
//! │   ├── login/start                        POST → opaque_login_start
//! │   └── login/finish                       POST → opaque_login_finish
//! ├── crypto/
//! │   ├── wrapped-drk                       GET/PUT → get/put_wrapped_drk
//! │   ├── wrapped-enc-priv                  GET/PUT → get/put_wrapped_enc_priv
//! │   ├── user-enc-pub                      PUT  → put_user_enc_pub
//! │   └── users/{user_sub}/enc-pub          GET  → get_user_enc_pub
//! ├── users                                 GET  → list_users
//! ├── users/{user_sub}                      GET  → get_user
//! ├── otp/
//! │   ├── setup/init                        POST → otp_setup_init
//! │   ├── setup/verify                      POST → otp_setup_verify
//! │   ├── verify                            POST → otp_verify
//! │   └── status                            GET  → otp_status
//! └── install/
//!     ├── status                            GET  → install_status
//!     ├── opaque/register/start             POST → install_opaque_start
//!     ├── opaque/register/finish            POST → install_opaque_finish
//!     └── complete                          POST → install_complete
//! ```
//!
//! ## Admin port
//!
//! ```text
//! /admin/
//! ├── opaque/login/start                    POST → admin_opaque_login_start
//! ├── opaque/login/finish                   POST → admin_opaque_login_finish
//! ├── session                               GET  → admin_session
//! ├── logout                                POST → admin_logout
//! ├── users/{user_sub}/sessions             GET/DELETE → admin_list/revoke_sessions_for_user
//! ├── users                                 GET  → admin_list_users
//! ├── users/{user_sub}                      GET/DELETE → admin_get/delete_user
//! ├── groups                                GET/POST → admin_list/create_group
//! ├── groups/{key}                          PATCH → admin_set_group_flags
//! ├── groups/{key}/users                    POST → admin_add_user_to_group
//! ├── organizations                         GET/POST → admin_list/create_organization
//! ├── roles                                 GET/POST → admin_list/create_role
//! ├── permissions                           GET/POST → admin_list/create_permission
//! ├── clients                               GET/POST → admin_list/create_client
//! ├── clients/{client_id}                   DELETE → admin_delete_client
//! ├── settings                              GET  → admin_list_settings
//! ├── settings/{key}                        PUT/DELETE → admin_set/reset_setting
//! ├── keys/rotate                           POST → admin_rotate_key
//! ├── audit                                 GET  → admin_list_audit
//! └── admins                                GET/POST → admin_list/create_admin
//!     admins/{admin_id}                     PUT/DELETE → admin_update_role/delete_admin
//! ```

use actix_web::web;

use super::handlers;

/// Binds every route this process exposes on the user-facing port.
pub fn configure_user(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check))
        .route("/.well-known/openid-configuration", web::get().to(handlers::openid_configuration))
        .route("/.well-known/jwks.json", web::get().to(handlers::jwks))
        .route("/authorize", web::post().to(handlers::authorize_start))
        .route("/authorize/finalize", web::post().to(handlers::authorize_finalize))
        .route("/token", web::post().to(handlers::token))
        .route("/session", web::get().to(handlers::user_session))
        .route("/logout", web::post().to(handlers::user_logout))
        .service(
            web::scope("/opaque")
                .route("/register/start", web::post().to(handlers::opaque_register_start))
                .route("/register/finish", web::post().to(handlers::opaque_register_finish))
                .route("/login/start", web::post().to(handlers::opaque_login_start))
                .route("/login/finish", web::post().to(handlers::opaque_login_finish)),
        )
        .service(
            web::scope("/crypto")
                .route("/wrapped-drk", web::get().to(handlers::get_wrapped_drk))
                .route("/wrapped-drk", web::put().to(handlers::put_wrapped_drk))
                .route("/wrapped-enc-priv", web::get().to(handlers::get_wrapped_enc_priv))
                .route("/wrapped-enc-priv", web::put().to(handlers::put_wrapped_enc_priv))
                .route("/user-enc-pub", web::put().to(handlers::put_user_enc_pub))
                .route("/users/{user_sub}/enc-pub", web::get().to(handlers::get_user_enc_pub)),
        )
        .route("/users", web::get().to(handlers::list_users))
        .route("/users/{user_sub}", web::get().to(handlers::get_user))
        .service(
            web::scope("/otp")
                .route("/setup/init", web::post().to(handlers::otp_setup_init))
                .route("/setup/verify", web::post().to(handlers::otp_setup_verify))
                .route("/verify", web::post().to(handlers::otp_verify))
                .route("/status", web::get().to(handlers::otp_status)),
        )
        .service(
            web::scope("/install")
                .route("/status", web::get().to(handlers::install_status))
                .route("/opaque/register/start", web::post().to(handlers::install_opaque_start))
                .route("/opaque/register/finish", web::post().to(handlers::install_opaque_finish))
                .route("/complete", web::post().to(handlers::install_complete)),
        );
}

/// Binds every route this process exposes on the administration port.
pub fn configure_admin(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health_check)).service(
        web::scope("/admin")
            .service(
                web::scope("/opaque/login")
                    .route("/start", web::post().to(handlers::admin_opaque_login_start))
                    .route("/finish", web::post().to(handlers::admin_opaque_login_finish)),
            )
            .route("/session", web::get().to(handlers::admin_session))
            .route("/logout", web::post().to(handlers::admin_logout))
            .route("/users", web::get().to(handlers::admin_list_users))
            .route("/users/{user_sub}", web::get().to(handlers::admin_get_user))
            .route("/users/{user_sub}", web::delete().to(handlers::admin_delete_user))
            .route("/users/{user_sub}/sessions", web::get().to(handlers::admin_list_sessions_for_user))
            .route("/users/{user_sub}/sessions", web::delete().to(handlers::admin_revoke_sessions_for_user))
            .route("/groups", web::get().to(handlers::admin_list_groups))
            .route("/groups", web::post().to(handlers::admin_create_group))
            .route("/groups/{key}", web::patch().to(handlers::admin_set_group_flags))
            .route("/groups/{key}/users", web::post().to(handlers::admin_add_user_to_group))
            .route("/organizations", web::get().to(handlers::admin_list_organizations))
            .route("/organizations", web::post().to(handlers::admin_create_organization))
            .route("/roles", web::get().to(handlers::admin_list_roles))
            .route("/roles", web::post().to(handlers::admin_create_role))
            .route("/permissions", web::get().to(handlers::admin_list_permissions))
            .route("/permissions", web::post().to(handlers::admin_create_permission))
            .route("/clients", web::get().to(handlers::admin_list_clients))
            .route("/clients", web::post().to(handlers::admin_create_client))
            .route("/clients/{client_id}", web::delete().to(handlers::admin_delete_client))
            .route("/settings", web::get().to(handlers::admin_list_settings))
            .route("/settings/{key}", web::put().to(handlers::admin_set_setting_value))
            .route("/settings/{key}", web::delete().to(handlers::admin_reset_setting))
            .route("/keys/rotate", web::post().to(handlers::admin_rotate_key))
            .route("/audit", web::get().to(handlers::admin_list_audit))
            .route("/admins", web::get().to(handlers::admin_list_admins))
            .route("/admins", web::post().to(handlers::admin_create_admin))
            .route("/admins/{admin_id}", web::put().to(handlers::admin_update_admin_role))
            .route("/admins/{admin_id}", web::delete().to(handlers::admin_delete_admin)),
    );
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_route_configuration_compiles() {
        assert!(true);
    }
}
