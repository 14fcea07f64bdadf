use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::error_response;
use crate::db::Database;
use crate::models::User;

pub async fn get_user(
    State(db): State<Database>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, (StatusCode, String)> {
    db.get_or_create_user(&user_id)
        .map(Json)
        .map_err(error_response)
}

pub async fn move_user_to_group(
    State(db): State<Database>,
    Path((user_id, group_id)): Path<(String, i64)>,
) -> Result<Json<User>, (StatusCode, String)> {
    db.move_user_to_group(&user_id, group_id)
        .map(Json)
        .map_err(error_response)
}
