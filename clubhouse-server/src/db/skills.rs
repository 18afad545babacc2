//! Skill profile queries
//!
//! The list lives in one JSON array column per user. Additions go through a
//! single conditional UPDATE so two concurrent requests for the same skill
//! cannot both succeed.

use clubhouse_common::db::SkillProfile;
use clubhouse_common::{Error, Result};
use sqlx::SqlitePool;

use super::{decode_string_list, encode_string_list};

/// Profile for `user_id`; an absent record reads as an empty list
pub async fn get_profile(pool: &SqlitePool, user_id: &str) -> Result<SkillProfile> {
    let stored: Option<String> = sqlx::query_scalar("SELECT skills FROM skills WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    match stored {
        Some(json) => Ok(SkillProfile {
            user_id: user_id.to_string(),
            skills: decode_string_list("skills", &json)?,
        }),
        None => Ok(SkillProfile::empty(user_id)),
    }
}

/// Append `skill`, creating the record on first use
///
/// Exact (case-sensitive) duplicates are rejected with `Conflict`.
pub async fn add_skill(pool: &SqlitePool, user_id: &str, skill: &str) -> Result<SkillProfile> {
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT OR IGNORE INTO skills (user_id, skills) VALUES (?, '[]')")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let result = sqlx::query(
        r#"
        UPDATE skills
        SET skills = json_insert(skills, '$[#]', ?)
        WHERE user_id = ?
          AND NOT EXISTS (SELECT 1 FROM json_each(skills) WHERE value = ?)
        "#,
    )
    .bind(skill)
    .bind(user_id)
    .bind(skill)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(Error::Conflict(format!("Skill '{}' already listed", skill)));
    }

    tx.commit().await?;
    get_profile(pool, user_id).await
}

/// Remove `skill` if present; a missing skill or profile is not an error
pub async fn remove_skill(pool: &SqlitePool, user_id: &str, skill: &str) -> Result<SkillProfile> {
    let mut tx = pool.begin().await?;

    let stored: Option<String> = sqlx::query_scalar("SELECT skills FROM skills WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

    let Some(json) = stored else {
        tx.rollback().await?;
        return Ok(SkillProfile::empty(user_id));
    };

    let mut skills = decode_string_list("skills", &json)?;
    let before = skills.len();
    skills.retain(|s| s != skill);

    if skills.len() != before {
        sqlx::query("UPDATE skills SET skills = ? WHERE user_id = ?")
            .bind(encode_string_list("skills", &skills)?)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    Ok(SkillProfile {
        user_id: user_id.to_string(),
        skills,
    })
}
