//! Route configuration module.

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::api::handlers::{
    admin, auth, health, messaging, notifications, offers, profiles, requests, reviews, security,
};
use crate::api::middlewares::{jwt_auth, require_admin, require_client, require_provider};
use crate::api::state::AppState;

/// Creates and configures all application routes.
///
/// # Routes
///
/// ## Health Check Routes
/// - `GET /health` - Liveness probe
/// - `GET /ready` - Readiness probe
///
/// ## Public API
/// Registration, login, password reset, the offer catalogue and the
/// provider directory.
///
/// ## Authenticated API
/// Account, messaging, notifications, reviews, reports and blocks. Any role.
///
/// ## Role areas
/// - `/api/provider/*` - provider accounts only
/// - `/api/client/*` - client accounts only
/// - `/api/admin/*` - admins and roles granted `admin.access`
pub fn create_routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password))
        .route("/users/{id}/basic-info", get(auth::basic_info))
        .route("/offers", get(offers::list_offers))
        .route("/offers/{id}", get(offers::show_offer))
        .route("/categories", get(offers::list_categories))
        .route("/providers", get(profiles::list_providers))
        .route("/providers/{id}", get(profiles::show_provider));

    // route_layer: the layer added last runs first, so jwt_auth always goes last.
    let auth_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/password", put(auth::update_password))
        .route("/account", axum::routing::delete(auth::delete_account))
        .route(
            "/conversations",
            get(messaging::list_conversations).post(messaging::start_conversation),
        )
        .route("/conversations/{id}", get(messaging::show_conversation))
        .route("/conversations/{id}/messages", post(messaging::send_message))
        .route("/conversations/{id}/read", post(messaging::mark_read))
        .route("/messages/unread-count", get(messaging::unread_count))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read-all", post(notifications::mark_all_notifications_read))
        .route("/notifications/{id}", axum::routing::delete(notifications::delete_notification))
        .route("/notifications/{id}/read", post(notifications::mark_notification_read))
        .route("/requests/unread-counts", get(requests::unread_counts))
        .route("/requests/{id}/status", put(requests::update_status))
        .route("/reviews", post(reviews::create_review))
        .route(
            "/reviews/{id}",
            put(reviews::update_review).delete(reviews::delete_review),
        )
        .route("/reports", post(security::report_user))
        .route("/blocks", get(security::blocked_list).post(security::block_user))
        .route("/blocks/{id}", axum::routing::delete(security::unblock_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth));

    let provider_routes = Router::new()
        .route(
            "/profile",
            get(profiles::get_profile).put(profiles::update_provider_profile),
        )
        .route("/availability", put(profiles::update_availability))
        .route("/visibility", post(profiles::toggle_visibility))
        .route("/certificate", get(profiles::certificate))
        .route("/requests", get(requests::provider_index).post(requests::apply))
        .route("/reviews", get(reviews::provider_reviews))
        .route_layer(middleware::from_fn(require_provider))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth));

    let client_routes = Router::new()
        .route("/profile", put(profiles::update_client_profile))
        .route("/offers", get(offers::my_offers).post(offers::create_offer))
        .route(
            "/offers/{id}",
            put(offers::update_offer).delete(offers::delete_offer),
        )
        .route("/requests", get(requests::client_index).post(requests::invite))
        .route("/reviews", get(reviews::client_reviews))
        .route_layer(middleware::from_fn(require_client))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth));

    let admin_routes = Router::new()
        // dashboard
        .route("/stats", get(admin::dashboard::stats))
        .route("/analytics", get(admin::dashboard::activity))
        .route("/logs", get(admin::dashboard::logs))
        .route("/alerts", get(admin::dashboard::alerts))
        // users
        .route(
            "/users",
            get(admin::users::list_users).post(admin::users::create_user),
        )
        .route(
            "/users/{id}",
            get(admin::users::show_user)
                .put(admin::users::update_user)
                .delete(admin::users::delete_user),
        )
        .route("/users/{id}/toggle-status", post(admin::users::toggle_user_status))
        .route("/users/{id}/warn", post(admin::users::warn_user))
        // roles
        .route(
            "/roles",
            get(admin::roles::list_roles).post(admin::roles::create_role),
        )
        .route(
            "/roles/{id}",
            put(admin::roles::update_role).delete(admin::roles::delete_role),
        )
        .route("/permissions", get(admin::roles::list_permissions))
        // moderation
        .route("/reports", get(admin::moderation::list_reports))
        .route("/reports/{id}", get(admin::moderation::show_report))
        .route("/reports/{id}/action", post(admin::moderation::report_action))
        .route("/conversations", get(admin::moderation::list_conversations))
        .route("/messages", get(admin::moderation::messages_between))
        // content
        .route("/offers", get(admin::content::list_offers))
        .route("/missions", get(admin::content::list_missions))
        // catalogue
        .route(
            "/settings",
            get(admin::catalogue::list_settings).put(admin::catalogue::update_settings),
        )
        .route("/badges", get(admin::catalogue::list_badges))
        .route("/badges/{id}", put(admin::catalogue::update_badge))
        .route(
            "/categories",
            get(admin::catalogue::list_categories).post(admin::catalogue::create_category),
        )
        .route(
            "/categories/{id}",
            put(admin::catalogue::update_category).delete(admin::catalogue::delete_category),
        )
        // grades
        .route(
            "/grades",
            get(admin::grades::list_grades).post(admin::grades::create_grade),
        )
        .route(
            "/grades/{id}",
            put(admin::grades::update_grade).delete(admin::grades::delete_grade),
        )
        .route("/grades/assign", post(admin::grades::assign_grade))
        .route("/grades/sync", post(admin::grades::sync_grades))
        .route("/grades/revoke", post(admin::grades::revoke_attribution))
        .route("/grades/attributions", get(admin::grades::recent_attributions))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(auth_routes)
        .nest("/provider", provider_routes)
        .nest("/client", client_routes)
        .nest("/admin", admin_routes);

    Router::new()
        // Health check routes (no auth required)
        .route("/health", get(health::health_handler))
        .route("/ready", get(health::readiness_handler))
        .nest("/api", api_routes)
        .with_state(state)
}
