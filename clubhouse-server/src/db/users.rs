//! User directory queries

use chrono::{DateTime, Utc};
use clubhouse_common::db::{Role, User};
use clubhouse_common::time::{parse_db_timestamp, to_db_timestamp};
use clubhouse_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::is_unique_violation;

/// Fields supplied at signup
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

const USER_COLUMNS: &str = "id, name, email, phone, password_hash, is_verified, \
     reset_token, reset_token_expiry, role, created_at, updated_at";

fn user_from_row(row: &SqliteRow) -> Result<User> {
    let role: String = row.get("role");
    let expiry: Option<String> = row.get("reset_token_expiry");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        password_hash: row.get("password_hash"),
        is_verified: row.get::<i64, _>("is_verified") != 0,
        reset_token: row.get("reset_token"),
        reset_token_expiry: expiry.as_deref().map(parse_db_timestamp).transpose()?,
        role: role.parse()?,
        created_at: parse_db_timestamp(&created_at)?,
        updated_at: parse_db_timestamp(&updated_at)?,
    })
}

/// Insert a user together with an empty skill profile
///
/// Returns `Conflict` when the email is already registered.
pub async fn create_user(pool: &SqlitePool, new_user: NewUser) -> Result<User> {
    let id = Uuid::new_v4().to_string();
    let now = to_db_timestamp(&Utc::now());

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        r#"
        INSERT INTO users (id, name, email, phone, password_hash, is_verified, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&new_user.name)
    .bind(&new_user.email)
    .bind(&new_user.phone)
    .bind(&new_user.password_hash)
    .bind(new_user.role.as_str())
    .bind(&now)
    .bind(&now)
    .execute(&mut *tx)
    .await;

    if let Err(e) = inserted {
        if is_unique_violation(&e) {
            return Err(Error::Conflict("User already exists".to_string()));
        }
        return Err(e.into());
    }

    sqlx::query("INSERT INTO skills (user_id, skills) VALUES (?, '[]')")
        .bind(&id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    get_user(pool, &id)
        .await?
        .ok_or_else(|| Error::Internal(format!("User {} missing after insert", id)))
}

pub async fn get_user(pool: &SqlitePool, id: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

/// Lookup by (already normalized) email
pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
        .bind(email)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(user_from_row).transpose()
}

pub async fn user_exists(pool: &SqlitePool, id: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn mark_verified(pool: &SqlitePool, id: &str) -> Result<()> {
    sqlx::query("UPDATE users SET is_verified = 1, updated_at = ? WHERE id = ?")
        .bind(to_db_timestamp(&Utc::now()))
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_reset_token(
    pool: &SqlitePool,
    id: &str,
    token: &str,
    expiry: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "UPDATE users SET reset_token = ?, reset_token_expiry = ?, updated_at = ? WHERE id = ?",
    )
    .bind(token)
    .bind(to_db_timestamp(&expiry))
    .bind(to_db_timestamp(&Utc::now()))
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Store a new password hash and clear any pending reset
pub async fn update_password(pool: &SqlitePool, id: &str, password_hash: &str) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET password_hash = ?, reset_token = NULL, reset_token_expiry = NULL, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(password_hash)
    .bind(to_db_timestamp(&Utc::now()))
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Promote or demote an account
pub async fn set_role(pool: &SqlitePool, id: &str, role: Role) -> Result<()> {
    let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(role.as_str())
        .bind(to_db_timestamp(&Utc::now()))
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("User {}", id)));
    }
    Ok(())
}

/// Grant the admin role to the account registered under `email`
///
/// Returns `false` when no such account exists yet.
pub async fn promote_by_email(pool: &SqlitePool, email: &str) -> Result<bool> {
    let result = sqlx::query("UPDATE users SET role = 'admin', updated_at = ? WHERE email = ?")
        .bind(to_db_timestamp(&Utc::now()))
        .bind(email)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Remove an account; its skill profile goes with it
pub async fn delete_user(pool: &SqlitePool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("User {}", id)));
    }
    Ok(())
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM users ORDER BY created_at, rowid",
        USER_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    rows.iter().map(user_from_row).collect()
}

/// Escape LIKE wildcards so the query matches literally
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Substring search over name, email and phone
///
/// SQLite LIKE is case-insensitive for ASCII, which covers name and email.
pub async fn search_users(pool: &SqlitePool, query: &str) -> Result<Vec<User>> {
    let pattern = like_pattern(query);

    let rows = sqlx::query(&format!(
        r#"
        SELECT {} FROM users
        WHERE name LIKE ? ESCAPE '\'
           OR email LIKE ? ESCAPE '\'
           OR phone LIKE ? ESCAPE '\'
        ORDER BY created_at, rowid
        "#,
        USER_COLUMNS
    ))
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(pool)
    .await?;

    rows.iter().map(user_from_row).collect()
}

/// Every member's email address, for the weekly fan-out
pub async fn list_member_emails(pool: &SqlitePool) -> Result<Vec<String>> {
    let emails = sqlx::query_scalar("SELECT email FROM users ORDER BY created_at, rowid")
        .fetch_all(pool)
        .await?;
    Ok(emails)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubhouse_common::db::init_memory_database;

    fn new_user(name: &str, email: &str, phone: Option<&str>) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(str::to_string),
            password_hash: "$argon2id$placeholder".to_string(),
            role: Role::User,
        }
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ada"), "%ada%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[tokio::test]
    async fn test_create_user_creates_empty_profile() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, new_user("Ada", "ada@example.com", None))
            .await
            .unwrap();

        assert!(!user.is_verified);
        assert_eq!(user.role, Role::User);

        let skills: String = sqlx::query_scalar("SELECT skills FROM skills WHERE user_id = ?")
            .bind(&user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(skills, "[]");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let pool = init_memory_database().await.unwrap();
        create_user(&pool, new_user("Ada", "ada@example.com", None))
            .await
            .unwrap();

        let err = create_user(&pool, new_user("Other", "ada@example.com", None))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_search_matches_name_email_phone() {
        let pool = init_memory_database().await.unwrap();
        create_user(&pool, new_user("Ada Lovelace", "ada@example.com", Some("555-0100")))
            .await
            .unwrap();
        create_user(&pool, new_user("Grace Hopper", "grace@navy.mil", Some("555-0199")))
            .await
            .unwrap();

        let by_name = search_users(&pool, "LOVE").await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].name, "Ada Lovelace");

        let by_email = search_users(&pool, "navy").await.unwrap();
        assert_eq!(by_email.len(), 1);

        let by_phone = search_users(&pool, "555-01").await.unwrap();
        assert_eq!(by_phone.len(), 2);

        let literal = search_users(&pool, "%").await.unwrap();
        assert!(literal.is_empty());
    }

    #[tokio::test]
    async fn test_update_password_clears_reset_token() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, new_user("Ada", "ada@example.com", None))
            .await
            .unwrap();

        set_reset_token(&pool, &user.id, "tok", Utc::now()).await.unwrap();
        let pending = get_user(&pool, &user.id).await.unwrap().unwrap();
        assert_eq!(pending.reset_token.as_deref(), Some("tok"));
        assert!(pending.reset_token_expiry.is_some());

        update_password(&pool, &user.id, "$argon2id$new").await.unwrap();
        let updated = get_user(&pool, &user.id).await.unwrap().unwrap();
        assert_eq!(updated.password_hash, "$argon2id$new");
        assert!(updated.reset_token.is_none());
        assert!(updated.reset_token_expiry.is_none());
    }

    #[tokio::test]
    async fn test_set_role_unknown_user() {
        let pool = init_memory_database().await.unwrap();
        let err = set_role(&pool, "nobody", Role::Admin).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_promote_by_email() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, new_user("Ada", "ada@example.com", None))
            .await
            .unwrap();

        assert!(promote_by_email(&pool, "ada@example.com").await.unwrap());
        let promoted = get_user(&pool, &user.id).await.unwrap().unwrap();
        assert_eq!(promoted.role, Role::Admin);

        assert!(!promote_by_email(&pool, "nobody@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_user_removes_skill_profile() {
        let pool = init_memory_database().await.unwrap();
        let user = create_user(&pool, new_user("Ada", "ada@example.com", None))
            .await
            .unwrap();

        delete_user(&pool, &user.id).await.unwrap();
        assert!(get_user(&pool, &user.id).await.unwrap().is_none());

        let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM skills WHERE user_id = ?")
            .bind(&user.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(profiles, 0);

        let err = delete_user(&pool, &user.id).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
