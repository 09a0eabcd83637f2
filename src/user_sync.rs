use crate::storage;
use miette::{IntoDiagnostic, Result};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Author account definition from JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDefinition {
    /// Username (unique identifier)
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Plain text password (will be hashed); only applied when the account is created
    pub password: String,
    /// Whether the account may log in
    #[serde(default = "default_true")]
    pub active: bool,
    /// Administrative privilege (may manage categories)
    #[serde(default)]
    pub staff: bool,
}

fn default_true() -> bool {
    true
}

/// Root structure of the users JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersFile {
    pub users: Vec<UserDefinition>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Sync authors from a JSON file to the database (idempotent)
pub async fn sync_users_from_file(
    db: &DatabaseConnection,
    file_path: &Path,
) -> Result<SyncSummary> {
    tracing::info!("Loading users from {}", file_path.display());

    let content = fs::read_to_string(file_path).into_diagnostic().map_err(|e| {
        miette::miette!("Failed to read users file at '{}': {}", file_path.display(), e)
    })?;

    let users_file: UsersFile = serde_json::from_str(&content)
        .into_diagnostic()
        .map_err(|e| {
            miette::miette!(
                "Failed to parse users JSON file: {}\n\nExpected format:\n{{\n  \"users\": [\n    {{\n      \"username\": \"alice\",\n      \"email\": \"alice@example.com\",\n      \"password\": \"secure-password\",\n      \"active\": true,\n      \"staff\": false\n    }}\n  ]\n}}",
                e
            )
        })?;

    tracing::info!("Found {} user(s) in file", users_file.users.len());

    let mut summary = SyncSummary::default();
    for user_def in users_file.users {
        match sync_user(db, &user_def).await? {
            SyncResult::Created => summary.created += 1,
            SyncResult::Updated => summary.updated += 1,
            SyncResult::Unchanged => summary.unchanged += 1,
        }
    }

    tracing::info!(
        "User sync complete: {} created, {} updated, {} unchanged",
        summary.created,
        summary.updated,
        summary.unchanged
    );

    Ok(summary)
}

#[derive(Debug)]
enum SyncResult {
    Created,
    Updated,
    Unchanged,
}

/// Sync a single user (idempotent)
async fn sync_user(db: &DatabaseConnection, user_def: &UserDefinition) -> Result<SyncResult> {
    let existing = storage::get_user_by_username(db, &user_def.username)
        .await
        .into_diagnostic()?;

    let result = match existing {
        None => {
            tracing::info!("Creating user: {}", user_def.username);
            storage::create_user(
                db,
                &user_def.username,
                &user_def.password,
                user_def.email.clone(),
                user_def.staff,
            )
            .await
            .into_diagnostic()?;

            if !user_def.active {
                storage::update_user(
                    db,
                    &user_def.username,
                    false,
                    user_def.staff,
                    user_def.email.clone(),
                )
                .await
                .into_diagnostic()?;
            }

            SyncResult::Created
        }
        Some(existing_user) => {
            let unchanged = existing_user.is_active == user_def.active
                && existing_user.is_staff == user_def.staff
                && existing_user.email == user_def.email;

            if unchanged {
                SyncResult::Unchanged
            } else {
                tracing::info!("Updating user: {}", user_def.username);
                storage::update_user(
                    db,
                    &user_def.username,
                    user_def.active,
                    user_def.staff,
                    user_def.email.clone(),
                )
                .await
                .into_diagnostic()?;
                SyncResult::Updated
            }
        }
    };

    Ok(result)
}
