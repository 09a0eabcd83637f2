use crate::entities;
use crate::errors::BlogError;
use crate::settings::Database as DbCfg;
use base64ct::Encoding;
use chrono::Utc;
use rand::RngCore;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use sea_orm_migration::MigratorTrait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: i64,
}

impl From<entities::user::Model> for User {
    fn from(model: entities::user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            password_hash: model.password_hash,
            email: model.email,
            is_staff: model.is_staff == 1,
            is_active: model.is_active == 1,
            date_joined: model.date_joined,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub user_id: i32,
    pub created_at: i64,
    pub expires_at: i64,
    pub user_agent: Option<String>,
}

/// Connect and bring the schema up to date.
pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, BlogError> {
    let db = Database::connect(&cfg.url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn random_id() -> String {
    let mut bytes = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64ct::Base64UrlUnpadded::encode_string(&bytes)
}

fn hash_password(password: &str) -> Result<String, BlogError> {
    use argon2::password_hash::SaltString;
    use argon2::{Argon2, PasswordHasher};

    let salt = SaltString::generate(&mut rand::rngs::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BlogError::Other(format!("Password hashing failed: {}", e)))
}

// User management functions

pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
    email: Option<String>,
    is_staff: bool,
) -> Result<User, BlogError> {
    let password_hash = hash_password(password)?;
    let date_joined = Utc::now().timestamp();

    let user = entities::user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(password_hash),
        email: Set(email),
        is_staff: Set(i64::from(is_staff)),
        is_active: Set(1),
        date_joined: Set(date_joined),
        ..Default::default()
    };

    let model = user.insert(db).await?;
    tracing::debug!(username, user_id = model.id, "created user");

    Ok(model.into())
}

pub async fn get_user_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<User>, BlogError> {
    use entities::user::{Column, Entity};

    Ok(Entity::find()
        .filter(Column::Username.eq(username))
        .one(db)
        .await?
        .map(User::from))
}

pub async fn get_user_by_id(db: &DatabaseConnection, id: i32) -> Result<Option<User>, BlogError> {
    Ok(entities::User::find_by_id(id).one(db).await?.map(User::from))
}

/// Returns the user when the password matches an active account.
pub async fn verify_user_password(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<Option<User>, BlogError> {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let user = match get_user_by_username(db, username).await? {
        Some(u) if u.is_active => u,
        _ => return Ok(None),
    };

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| BlogError::Other(format!("Invalid password hash: {}", e)))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
    {
        Ok(Some(user))
    } else {
        Ok(None)
    }
}

/// Update account flags and email
pub async fn update_user(
    db: &DatabaseConnection,
    username: &str,
    is_active: bool,
    is_staff: bool,
    email: Option<String>,
) -> Result<(), BlogError> {
    use entities::user::{Column, Entity};

    let user = Entity::find()
        .filter(Column::Username.eq(username))
        .one(db)
        .await?
        .ok_or_else(|| BlogError::Other(format!("User not found: {}", username)))?;

    let mut active: entities::user::ActiveModel = user.into();
    active.is_active = Set(i64::from(is_active));
    active.is_staff = Set(i64::from(is_staff));
    active.email = Set(email);
    active.update(db).await?;

    Ok(())
}

pub async fn set_user_password(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<(), BlogError> {
    use entities::user::{Column, Entity};

    let user = Entity::find()
        .filter(Column::Username.eq(username))
        .one(db)
        .await?
        .ok_or_else(|| BlogError::Other(format!("User not found: {}", username)))?;

    let mut active: entities::user::ActiveModel = user.into();
    active.password_hash = Set(hash_password(password)?);
    active.update(db).await?;

    Ok(())
}

// Session management functions

pub async fn create_session(
    db: &DatabaseConnection,
    user_id: i32,
    ttl_secs: i64,
    user_agent: Option<String>,
) -> Result<Session, BlogError> {
    let session_id = random_id();
    let now = Utc::now().timestamp();
    let expires_at = now + ttl_secs;

    let session = entities::session::ActiveModel {
        session_id: Set(session_id.clone()),
        user_id: Set(user_id),
        created_at: Set(now),
        expires_at: Set(expires_at),
        user_agent: Set(user_agent.clone()),
    };

    session.insert(db).await?;

    Ok(Session {
        session_id,
        user_id,
        created_at: now,
        expires_at,
        user_agent,
    })
}

/// Expired sessions read as absent.
pub async fn get_session(
    db: &DatabaseConnection,
    session_id: &str,
) -> Result<Option<Session>, BlogError> {
    use entities::session::{Column, Entity};

    if let Some(model) = Entity::find()
        .filter(Column::SessionId.eq(session_id))
        .one(db)
        .await?
    {
        let now = Utc::now().timestamp();
        if now > model.expires_at {
            return Ok(None);
        }

        Ok(Some(Session {
            session_id: model.session_id,
            user_id: model.user_id,
            created_at: model.created_at,
            expires_at: model.expires_at,
            user_agent: model.user_agent,
        }))
    } else {
        Ok(None)
    }
}

pub async fn delete_session(db: &DatabaseConnection, session_id: &str) -> Result<(), BlogError> {
    use entities::session::{Column, Entity};

    Entity::delete_many()
        .filter(Column::SessionId.eq(session_id))
        .exec(db)
        .await?;

    Ok(())
}

pub async fn cleanup_expired_sessions(db: &DatabaseConnection) -> Result<u64, BlogError> {
    use entities::session::{Column, Entity};

    let now = Utc::now().timestamp();
    let result = Entity::delete_many()
        .filter(Column::ExpiresAt.lt(now))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}
