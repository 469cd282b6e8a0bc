//! Check-in window and tournament-local time

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::model::Tournament;

/// Local hour check-in opens on tournament days (5pm)
pub const DEFAULT_CHECK_IN_HOUR: u32 = 17;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckInDecision {
    Open,
    Closed(String),
}

impl CheckInDecision {
    pub fn is_open(&self) -> bool {
        matches!(self, CheckInDecision::Open)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimeInfo {
    pub current_time: String,
    pub timezone: String,
    pub check_in_hour: u32,
}

#[derive(Clone, Copy, Debug)]
pub struct CheckInWindow {
    pub timezone: Tz,
    pub open_hour: u32,
}

impl Default for CheckInWindow {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::America::Chicago,
            open_hour: DEFAULT_CHECK_IN_HOUR,
        }
    }
}

impl CheckInWindow {
    pub fn new(timezone: Tz, open_hour: u32) -> Self {
        Self { timezone, open_hour }
    }

    /// Decide whether players may check themselves in right now
    pub fn evaluate(&self, tournament: Option<&Tournament>, now: DateTime<Utc>) -> CheckInDecision {
        let Some(tournament) = tournament.filter(|t| t.is_open()) else {
            return CheckInDecision::Closed("No active tournament today.".to_string());
        };
        if tournament.check_in_open {
            return CheckInDecision::Open;
        }

        let local = now.with_timezone(&self.timezone);
        if !tournament.is_tournament_day(local.date_naive()) {
            return CheckInDecision::Closed("No active tournament today.".to_string());
        }
        if local.hour() >= self.open_hour {
            CheckInDecision::Open
        } else {
            let minutes_until = (self.open_hour - local.hour()) * 60 - local.minute();
            CheckInDecision::Closed(format!(
                "Check-in opens at {}:00. {} minutes remaining.",
                self.open_hour, minutes_until
            ))
        }
    }

    pub fn time_info(&self, now: DateTime<Utc>) -> TimeInfo {
        TimeInfo {
            current_time: now
                .with_timezone(&self.timezone)
                .format("%Y-%m-%d %H:%M:%S %Z")
                .to_string(),
            timezone: self.timezone.name().to_string(),
            check_in_hour: self.open_hour,
        }
    }

    /// The next local midnight strictly after `now`, in UTC
    pub fn next_local_midnight(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let tomorrow = now.with_timezone(&self.timezone).date_naive() + Duration::days(1);
        let midnight = tomorrow.and_time(NaiveTime::MIN);
        // a DST jump can skip local midnight; fall back to the hour after
        self.timezone
            .from_local_datetime(&midnight)
            .earliest()
            .or_else(|| {
                self.timezone
                    .from_local_datetime(&(midnight + Duration::hours(1)))
                    .earliest()
            })
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| now + Duration::days(1))
    }
}
