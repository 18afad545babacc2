//! Book-club progression engine
//!
//! Owns the active cycle and its weekly pointer. Reads and admin creation
//! come from HTTP handlers; [`ProgressionEngine::advance_week`] is only
//! driven by the weekly scheduler and the one-shot advance command.
//!
//! Every successful advance moves `current_week` up by exactly one and
//! enqueues exactly one [`Announcement`]. Delivery happens later in the
//! notification worker.

use chrono::{DateTime, FixedOffset, Utc};
use clubhouse_common::api::{require_admin, Claims};
use clubhouse_common::db::BookClubCycle;
use clubhouse_common::time::{self, week_key};
use clubhouse_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use crate::db::cycles::{self, NewCycleRecord};
use crate::notify::{Announcement, NotificationQueue};

/// Admin request body for a new cycle
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCycle {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub cover_image_ref: Option<String>,
    #[serde(default)]
    pub audio_edition_ref: Option<String>,
    pub chapter_plan: Vec<String>,
}

impl NewCycle {
    /// Trim fields and reject blank values or an empty plan
    fn validate(self) -> Result<NewCycleRecord> {
        let title = self.title.trim().to_string();
        let author = self.author.trim().to_string();
        if title.is_empty() {
            return Err(Error::InvalidInput("title is required".to_string()));
        }
        if author.is_empty() {
            return Err(Error::InvalidInput("author is required".to_string()));
        }
        if self.chapter_plan.is_empty() {
            return Err(Error::InvalidInput("chapterPlan must not be empty".to_string()));
        }

        let mut plan = Vec::with_capacity(self.chapter_plan.len());
        for (index, label) in self.chapter_plan.iter().enumerate() {
            let label = label.trim();
            if label.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "chapterPlan[{}] must not be blank",
                    index
                )));
            }
            plan.push(label.to_string());
        }

        Ok(NewCycleRecord {
            title,
            author,
            cover_image_ref: non_blank(self.cover_image_ref),
            audio_edition_ref: non_blank(self.audio_edition_ref),
            chapter_plan: plan,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read model for the active cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentState {
    pub id: String,
    pub title: String,
    pub author: String,
    pub cover_image_ref: Option<String>,
    pub audio_edition_ref: Option<String>,
    pub current_week: u32,
    pub total_weeks: u32,
    pub current_chapter_label: Option<String>,
    pub start_date: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&BookClubCycle> for CurrentState {
    fn from(cycle: &BookClubCycle) -> Self {
        Self {
            id: cycle.id.clone(),
            title: cycle.title.clone(),
            author: cycle.author.clone(),
            cover_image_ref: cycle.cover_image_ref.clone(),
            audio_edition_ref: cycle.audio_edition_ref.clone(),
            current_week: cycle.current_week,
            total_weeks: cycle.total_weeks(),
            current_chapter_label: cycle.current_chapter_label().map(str::to_string),
            start_date: cycle.start_date,
            updated_at: cycle.updated_at,
        }
    }
}

/// Which branch an advance attempt took
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    NoActiveCycle,
    /// Plan finished; the pointer stays on the last week
    Exhausted { cycle_id: String, week: u32 },
    /// This cycle already advanced during the current week
    AlreadyAdvanced { cycle_id: String, week_key: String },
    /// Another writer changed the cycle between read and update
    Superseded { cycle_id: String },
    Advanced {
        cycle_id: String,
        week: u32,
        chapter_label: String,
        notification_queued: bool,
    },
}

pub struct ProgressionEngine {
    db: SqlitePool,
    queue: NotificationQueue,
    offset: FixedOffset,
}

impl ProgressionEngine {
    /// `offset` is the schedule's reference offset, used for week keys
    pub fn new(db: SqlitePool, queue: NotificationQueue, offset: FixedOffset) -> Self {
        Self { db, queue, offset }
    }

    pub async fn current_state(&self) -> Result<CurrentState> {
        cycles::load_active(&self.db)
            .await?
            .as_ref()
            .map(CurrentState::from)
            .ok_or_else(|| Error::NotFound("No active book club cycle".to_string()))
    }

    /// Start a new cycle at week 0 and make it active (admin only)
    pub async fn create_cycle(&self, caller: &Claims, request: NewCycle) -> Result<String> {
        require_admin(caller)?;
        let record = request.validate()?;
        let title = record.title.clone();

        let id = cycles::insert_cycle(&self.db, record, time::now()).await?;
        info!(cycle_id = %id, title = %title, admin = %caller.sub, "Book club cycle created");
        Ok(id)
    }

    pub async fn advance_week(&self) -> Result<AdvanceOutcome> {
        self.advance_week_at(time::now()).await
    }

    /// Advance as if the trigger fired at `now`
    pub async fn advance_week_at(&self, now: DateTime<Utc>) -> Result<AdvanceOutcome> {
        let Some(cycle) = cycles::load_active(&self.db).await? else {
            info!("No active book club cycle; nothing to advance");
            return Ok(AdvanceOutcome::NoActiveCycle);
        };

        if cycle.is_exhausted() {
            info!(
                cycle_id = %cycle.id,
                week = cycle.current_week,
                "Chapter plan finished; week not advanced"
            );
            return Ok(AdvanceOutcome::Exhausted {
                cycle_id: cycle.id,
                week: cycle.current_week,
            });
        }

        let key = week_key(&now, &self.offset);
        if cycle.last_advanced_week.as_deref() == Some(key.as_str()) {
            warn!(cycle_id = %cycle.id, week_key = %key, "Already advanced this week; skipping");
            return Ok(AdvanceOutcome::AlreadyAdvanced {
                cycle_id: cycle.id,
                week_key: key,
            });
        }

        let advanced = cycles::advance(&self.db, &cycle.id, cycle.current_week, &key, now).await?;
        if !advanced {
            warn!(cycle_id = %cycle.id, "Cycle changed concurrently; advance skipped");
            return Ok(AdvanceOutcome::Superseded { cycle_id: cycle.id });
        }

        let week = cycle.current_week + 1;
        let chapter_label = cycle
            .chapter_label(week)
            .map(str::to_string)
            .ok_or_else(|| Error::Internal(format!("No chapter label for week {}", week)))?;

        info!(cycle_id = %cycle.id, week, chapter = %chapter_label, "Book club week advanced");

        let announcement = Announcement {
            cycle_id: cycle.id.clone(),
            title: cycle.title.clone(),
            week,
            chapter_label: chapter_label.clone(),
        };
        let notification_queued = match self.queue.enqueue(announcement) {
            Ok(()) => true,
            Err(e) => {
                error!(cycle_id = %cycle.id, week, error = %e, "Weekly notification not queued");
                false
            }
        };

        Ok(AdvanceOutcome::Advanced {
            cycle_id: cycle.id,
            week,
            chapter_label,
            notification_queued,
        })
    }
}
