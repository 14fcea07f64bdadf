use rusqlite::{Connection, OptionalExtension};

use super::*;

impl Database {
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.read(|tx| find_user(tx, user_id))
    }

    /// Return the user, creating it in the Default group on first contact.
    pub fn get_or_create_user(&self, user_id: &str) -> Result<User> {
        validate_user_id(user_id)?;

        self.write(|tx| {
            if let Some(user) = find_user(tx, user_id)? {
                return Ok(user);
            }

            let group_id = protected_group_id(tx, DEFAULT_GROUP_NAME)?;
            tx.execute(
                "INSERT INTO users (id, group_id) VALUES (?, ?)",
                (user_id, group_id),
            )?;

            tracing::info!(user_id, group_id, "Created user in default group");
            Ok(User {
                id: user_id.to_string(),
                group_id,
            })
        })
    }

    /// Move a user into a group, creating the user there if it is unknown.
    ///
    /// Membership lives in a single column, so the move is one `UPSERT` and the
    /// user is never observed in zero or two groups.
    pub fn move_user_to_group(&self, user_id: &str, group_id: i64) -> Result<User> {
        validate_user_id(user_id)?;

        self.write(|tx| {
            if !group_exists(tx, group_id)? {
                return Err(ToggleError::GroupNotFound(group_id));
            }
            if group_id == protected_group_id(tx, PUBLIC_GROUP_NAME)? {
                return Err(ToggleError::InvalidOperation(format!(
                    "Users can't be assigned to the '{PUBLIC_GROUP_NAME}' group"
                )));
            }

            tx.execute(
                "INSERT INTO users (id, group_id) VALUES (?, ?)
                 ON CONFLICT(id) DO UPDATE SET group_id = excluded.group_id",
                (user_id, group_id),
            )?;

            tracing::info!(user_id, group_id, "Moved user to group");
            Ok(User {
                id: user_id.to_string(),
                group_id,
            })
        })
    }

    /// Ids of the users in a group.
    pub fn get_group_members(&self, group_id: i64) -> Result<Vec<String>> {
        self.read(|tx| {
            super::groups::find_group(tx, group_id)?
                .map(|group| group.members)
                .ok_or(ToggleError::GroupNotFound(group_id))
        })
    }
}

pub(super) fn find_user(conn: &Connection, user_id: &str) -> Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, group_id FROM users WHERE id = ?",
            [user_id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    group_id: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(ToggleError::Invalid("User ID must not be empty".to_string()));
    }
    Ok(())
}
