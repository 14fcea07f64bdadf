use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{error_response, resolve_caller};
use crate::api::middleware::Caller;
use crate::db::Database;
use crate::error::ToggleError;
use crate::models::*;

// ============================================================
// Features (administrator)
// ============================================================

pub async fn list_features(
    State(db): State<Database>,
) -> Result<Json<Vec<Feature>>, (StatusCode, String)> {
    db.get_all_features().map(Json).map_err(error_response)
}

pub async fn get_feature_tree(
    State(db): State<Database>,
) -> Result<Json<Vec<FeatureTreeNode>>, (StatusCode, String)> {
    db.get_feature_tree().map(Json).map_err(error_response)
}

pub async fn get_feature(
    State(db): State<Database>,
    Path(id): Path<i64>,
) -> Result<Json<Feature>, (StatusCode, String)> {
    db.get_feature(id)
        .map_err(error_response)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Feature not found".to_string()))
}

pub async fn get_ancestors(
    State(db): State<Database>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Feature>>, (StatusCode, String)> {
    db.get_ancestor_chain(id).map(Json).map_err(error_response)
}

pub async fn create_feature(
    State(db): State<Database>,
    Json(input): Json<FeatureArgs>,
) -> Result<(StatusCode, Json<Feature>), (StatusCode, String)> {
    db.create_feature(input)
        .map(|f| (StatusCode::CREATED, Json(f)))
        .map_err(error_response)
}

pub async fn update_feature(
    State(db): State<Database>,
    Path(id): Path<i64>,
    Json(input): Json<FeatureArgs>,
) -> Result<Json<Feature>, (StatusCode, String)> {
    db.update_feature(id, input)
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_feature(
    State(db): State<Database>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    db.delete_feature(id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(error_response)
}

pub async fn enable_feature_for_group(
    State(db): State<Database>,
    Path((feature_id, group_id)): Path<(i64, i64)>,
) -> Result<StatusCode, (StatusCode, String)> {
    db.enable_feature_for_group(feature_id, group_id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(error_response)
}

pub async fn disable_feature_for_group(
    State(db): State<Database>,
    Path((feature_id, group_id)): Path<(i64, i64)>,
) -> Result<StatusCode, (StatusCode, String)> {
    db.disable_feature_for_group(feature_id, group_id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(error_response)
}

// ============================================================
// Entitlements (any caller)
// ============================================================

pub async fn is_feature_enabled(
    State(db): State<Database>,
    Caller(user_id): Caller,
    Path(feature_id): Path<i64>,
) -> Result<Json<EnabledResponse>, (StatusCode, String)> {
    // Unknown features are rejected before the caller is registered.
    if db.get_feature(feature_id).map_err(error_response)?.is_none() {
        return Err(error_response(ToggleError::FeatureNotFound(feature_id)));
    }
    let user_id = resolve_caller(&db, user_id).map_err(error_response)?;
    let enabled = db
        .is_effectively_enabled(user_id.as_deref(), feature_id)
        .map_err(error_response)?;
    Ok(Json(EnabledResponse {
        feature_id,
        enabled,
    }))
}

pub async fn list_enabled_features(
    State(db): State<Database>,
    Caller(user_id): Caller,
) -> Result<Json<Vec<Feature>>, (StatusCode, String)> {
    let user_id = resolve_caller(&db, user_id).map_err(error_response)?;
    db.get_effectively_enabled_features(user_id.as_deref())
        .map(Json)
        .map_err(error_response)
}
