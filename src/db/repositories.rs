//! Repositories: users and the celebrity follow graph.

use crate::error::{AppError, AppResult};
use crate::models::user::{Role, UserListing, UserProfile, UserRef};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;

// ---- User ----

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    /// Stored role; the column is constrained, so unknown values only come from manual edits.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or_default()
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role(),
            created_at: self.created_at,
        }
    }
}

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at, updated_at";

pub async fn user_create(
    pool: &DbPool,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> AppResult<UserRow> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        r#"
        INSERT INTO users (name, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(name.trim())
    .bind(normalize_email(email))
    .bind(password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("Email already registered".to_string())
        }
        other => AppError::Db(other),
    })?;
    Ok(row)
}

pub async fn user_find_by_email(pool: &DbPool, email: &str) -> AppResult<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(normalize_email(email))
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn user_get_by_id(pool: &DbPool, id: Uuid) -> AppResult<Option<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

#[derive(Debug, FromRow)]
struct UserListingRow {
    id: Uuid,
    name: String,
    email: String,
    role: String,
    followers: Vec<Uuid>,
}

/// Every user except `exclude`, with their follower ids.
pub async fn users_list_except(pool: &DbPool, exclude: Uuid) -> AppResult<Vec<UserListing>> {
    let rows = sqlx::query_as::<_, UserListingRow>(
        r#"
        SELECT u.id, u.name, u.email, u.role,
               COALESCE(array_agg(f.follower_id) FILTER (WHERE f.follower_id IS NOT NULL), '{}') AS followers
        FROM users u
        LEFT JOIN follows f ON f.celebrity_id = u.id
        WHERE u.id <> $1
        GROUP BY u.id
        ORDER BY u.name
        "#,
    )
    .bind(exclude)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| UserListing {
            id: r.id,
            role: r.role.parse().unwrap_or_default(),
            name: r.name,
            email: r.email,
            followers: r.followers,
        })
        .collect())
}

pub async fn celebrities_list(pool: &DbPool) -> AppResult<Vec<UserRef>> {
    let rows = sqlx::query_as::<_, (Uuid, String)>(
        "SELECT id, name FROM users WHERE role = 'celebrity' ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| UserRef { id, name })
        .collect())
}

// ---- Follow graph ----

/// Celebrities followed by `follower_id`: (id, name, email).
pub async fn following_list(
    pool: &DbPool,
    follower_id: Uuid,
) -> AppResult<Vec<(Uuid, String, String)>> {
    let rows = sqlx::query_as::<_, (Uuid, String, String)>(
        r#"
        SELECT u.id, u.name, u.email
        FROM follows f
        JOIN users u ON u.id = f.celebrity_id
        WHERE f.follower_id = $1
        ORDER BY f.created_at
        "#,
    )
    .bind(follower_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns `true` if a new edge was created.
pub async fn follow_insert(pool: &DbPool, follower_id: Uuid, celebrity_id: Uuid) -> AppResult<bool> {
    let r = sqlx::query(
        r#"
        INSERT INTO follows (follower_id, celebrity_id)
        VALUES ($1, $2)
        ON CONFLICT (follower_id, celebrity_id) DO NOTHING
        "#,
    )
    .bind(follower_id)
    .bind(celebrity_id)
    .execute(pool)
    .await?;
    Ok(r.rows_affected() > 0)
}

/// Returns `true` if an edge was removed.
pub async fn follow_delete(pool: &DbPool, follower_id: Uuid, celebrity_id: Uuid) -> AppResult<bool> {
    let r = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND celebrity_id = $2")
        .bind(follower_id)
        .bind(celebrity_id)
        .execute(pool)
        .await?;
    Ok(r.rows_affected() > 0)
}

/// Users following `celebrity_id`; the recipient set for post notifications.
pub async fn follower_ids(pool: &DbPool, celebrity_id: Uuid) -> AppResult<Vec<Uuid>> {
    let rows = sqlx::query_as::<_, (Uuid,)>("SELECT follower_id FROM follows WHERE celebrity_id = $1")
        .bind(celebrity_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn following_ids(pool: &DbPool, follower_id: Uuid) -> AppResult<Vec<Uuid>> {
    let rows = sqlx::query_as::<_, (Uuid,)>("SELECT celebrity_id FROM follows WHERE follower_id = $1")
        .bind(follower_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn profile_hides_password_hash() {
        let row = UserRow {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: "celebrity".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(row.profile()).unwrap();
        assert_eq!(json["role"], "celebrity");
        assert!(json.get("password_hash").is_none());
    }
}
