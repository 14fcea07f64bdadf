use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::error_response;
use crate::db::Database;
use crate::models::*;

pub async fn list_groups(
    State(db): State<Database>,
) -> Result<Json<Vec<Group>>, (StatusCode, String)> {
    db.get_all_groups().map(Json).map_err(error_response)
}

pub async fn get_group(
    State(db): State<Database>,
    Path(id): Path<i64>,
) -> Result<Json<Group>, (StatusCode, String)> {
    db.get_group(id)
        .map_err(error_response)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Feature group not found".to_string()))
}

pub async fn create_group(
    State(db): State<Database>,
    Json(input): Json<GroupArgs>,
) -> Result<(StatusCode, Json<Group>), (StatusCode, String)> {
    db.create_group(input)
        .map(|g| (StatusCode::CREATED, Json(g)))
        .map_err(error_response)
}

pub async fn update_group(
    State(db): State<Database>,
    Path(id): Path<i64>,
    Json(input): Json<GroupArgs>,
) -> Result<Json<Group>, (StatusCode, String)> {
    db.update_group(id, input).map(Json).map_err(error_response)
}

pub async fn delete_group(
    State(db): State<Database>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    db.delete_group(id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(error_response)
}
