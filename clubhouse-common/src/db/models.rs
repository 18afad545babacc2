//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Account role carried in session tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(Error::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// Fixed set of catalog genres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Genre {
    Fiction,
    #[serde(rename = "Non-Fiction")]
    NonFiction,
    Fantasy,
    Mystery,
    Biography,
    History,
    #[serde(rename = "Science Fiction")]
    ScienceFiction,
    Romance,
    Other,
}

impl Genre {
    pub const ALL: [Genre; 9] = [
        Genre::Fiction,
        Genre::NonFiction,
        Genre::Fantasy,
        Genre::Mystery,
        Genre::Biography,
        Genre::History,
        Genre::ScienceFiction,
        Genre::Romance,
        Genre::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "Fiction",
            Genre::NonFiction => "Non-Fiction",
            Genre::Fantasy => "Fantasy",
            Genre::Mystery => "Mystery",
            Genre::Biography => "Biography",
            Genre::History => "History",
            Genre::ScienceFiction => "Science Fiction",
            Genre::Romance => "Romance",
            Genre::Other => "Other",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Genre::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown genre: {}", s)))
    }
}

/// Full account record, including credential state
///
/// Never serialized to clients; see [`PublicUser`].
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub is_verified: bool,
    pub reset_token: Option<String>,
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn public_view(&self) -> PublicUser {
        PublicUser {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            role: self.role,
            is_verified: self.is_verified,
            created_at: self.created_at,
        }
    }
}

/// Account fields safe to return from lookup and search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillProfile {
    pub user_id: String,
    pub skills: Vec<String>,
}

impl SkillProfile {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            skills: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub published_year: Option<i32>,
    pub genre: Genre,
    pub votes: i64,
    pub read_count: i64,
    pub created_at: DateTime<Utc>,
}

/// One "book of the month" with its weekly chapter plan
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookClubCycle {
    pub id: String,
    pub title: String,
    pub author: String,
    pub cover_image_ref: Option<String>,
    pub audio_edition_ref: Option<String>,
    pub chapter_plan: Vec<String>,
    /// 0 = not started; otherwise 1-based index into `chapter_plan`
    pub current_week: u32,
    pub start_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// ISO year-week key of the last advance
    pub last_advanced_week: Option<String>,
}

impl BookClubCycle {
    pub fn total_weeks(&self) -> u32 {
        u32::try_from(self.chapter_plan.len()).unwrap_or(u32::MAX)
    }

    pub fn is_exhausted(&self) -> bool {
        self.current_week >= self.total_weeks()
    }

    /// Label assigned to a 1-based week
    pub fn chapter_label(&self, week: u32) -> Option<&str> {
        if week == 0 {
            return None;
        }
        self.chapter_plan
            .get(week as usize - 1)
            .map(String::as_str)
    }

    pub fn current_chapter_label(&self) -> Option<&str> {
        self.chapter_label(self.current_week)
    }
}
