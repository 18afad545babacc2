//! Weekly advance trigger
//!
//! Fires once per week at a fixed weekday and wall-clock time in a fixed
//! UTC offset. There is no daylight-saving adjustment; the offset is the
//! reference clock.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, TimeZone, Utc, Weekday};
use clubhouse_common::config::ScheduleConfig;
use clubhouse_common::{Error, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::bookclub::{AdvanceOutcome, ProgressionEngine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySchedule {
    weekday: Weekday,
    time: NaiveTime,
    offset: FixedOffset,
}

impl WeeklySchedule {
    pub fn new(weekday: Weekday, hour: u32, minute: u32, offset: FixedOffset) -> Result<Self> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            Error::Config(format!("Invalid schedule time {:02}:{:02}", hour, minute))
        })?;
        Ok(Self {
            weekday,
            time,
            offset,
        })
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        Self::new(
            config.parsed_weekday()?,
            config.hour,
            config.minute,
            config.offset()?,
        )
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// First firing instant strictly after `now`
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local = now.with_timezone(&self.offset);
        let days_ahead = (self.weekday.num_days_from_monday() + 7
            - local.weekday().num_days_from_monday())
            % 7;

        let date = local.date_naive() + Duration::days(i64::from(days_ahead));
        let mut candidate = self.at_local(date.and_time(self.time));
        if candidate <= now {
            candidate += Duration::weeks(1);
        }
        candidate
    }

    fn at_local(&self, local: chrono::NaiveDateTime) -> DateTime<Utc> {
        let utc = local - Duration::seconds(i64::from(self.offset.local_minus_utc()));
        Utc.from_utc_datetime(&utc)
    }
}

/// Sleep until each firing and advance the book club, until cancelled
pub async fn run_weekly(
    engine: Arc<ProgressionEngine>,
    schedule: WeeklySchedule,
    cancel: CancellationToken,
) {
    loop {
        let now = Utc::now();
        let next = schedule.next_fire_after(now);
        let wait = (next - now).to_std().unwrap_or_default();
        info!(next_fire = %next.with_timezone(&schedule.offset()), "Weekly advance scheduled");

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Weekly scheduler stopped");
                return;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        match engine.advance_week().await {
            Ok(AdvanceOutcome::Advanced { week, notification_queued, .. }) => {
                info!(week, notification_queued, "Scheduled advance complete");
            }
            Ok(outcome) => info!(?outcome, "Scheduled advance made no change"),
            Err(e) => error!(error = %e, "Scheduled advance failed"),
        }
    }
}
