mod handlers;
mod middleware;

pub use middleware::{AccessConfig, Caller, USER_ID_HEADER};

use axum::{
    middleware::from_fn_with_state,
    routing::{get, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::db::Database;

/// Router with access configuration taken from the environment.
pub fn create_router(db: Database) -> Router {
    create_router_with_config(db, AccessConfig::from_env())
}

pub fn create_router_with_config(db: Database, config: AccessConfig) -> Router {
    let admin = Router::new()
        // Features
        .route(
            "/features",
            get(handlers::list_features).post(handlers::create_feature),
        )
        .route("/features/tree", get(handlers::get_feature_tree))
        .route(
            "/features/{id}",
            get(handlers::get_feature)
                .put(handlers::update_feature)
                .delete(handlers::delete_feature),
        )
        .route("/features/{id}/ancestors", get(handlers::get_ancestors))
        .route(
            "/features/{id}/groups/{group_id}",
            put(handlers::enable_feature_for_group).delete(handlers::disable_feature_for_group),
        )
        // Groups
        .route(
            "/groups",
            get(handlers::list_groups).post(handlers::create_group),
        )
        .route(
            "/groups/{id}",
            get(handlers::get_group)
                .put(handlers::update_group)
                .delete(handlers::delete_group),
        )
        // Users
        .route("/users/{user_id}", get(handlers::get_user))
        .route(
            "/users/{user_id}/group/{group_id}",
            put(handlers::move_user_to_group),
        )
        .route_layer(from_fn_with_state(
            config.clone(),
            middleware::admin_middleware,
        ));

    let public = Router::new()
        .route("/features/enabled", get(handlers::list_enabled_features))
        .route("/features/{id}/enabled", get(handlers::is_feature_enabled))
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", admin.merge(public))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(config.cors_layer()),
        )
        .with_state(db)
}
