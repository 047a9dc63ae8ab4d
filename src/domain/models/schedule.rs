use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use crate::error::AppError;

pub const MINUTES_PER_DAY: u32 = 1440;

/// Parses a 24h `HH:MM` string into minutes since midnight.
pub fn parse_minutes(time: &str) -> Option<u32> {
    let parsed = NaiveTime::parse_from_str(time.trim(), "%H:%M").ok()?;
    Some(parsed.hour() * 60 + parsed.minute())
}

/// Formats a (possibly business-relative) minute count back to wall-clock `HH:MM`.
pub fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", (minutes / 60) % 24, minutes % 60)
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HoursConfig {
    pub open: String,
    pub close: String,
}

/// Opening hours of one business day. A close at or before the open means
/// the day runs past midnight.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "HoursConfig", into = "HoursConfig")]
pub struct BusinessHours {
    open_minute: u32,
    close_minute: u32,
}

impl TryFrom<HoursConfig> for BusinessHours {
    type Error = String;

    fn try_from(raw: HoursConfig) -> Result<Self, Self::Error> {
        BusinessHours::parse(&raw.open, &raw.close)
            .ok_or_else(|| format!("invalid business hours {}-{}", raw.open, raw.close))
    }
}

impl From<BusinessHours> for HoursConfig {
    fn from(hours: BusinessHours) -> Self {
        HoursConfig {
            open: format_minutes(hours.open_minute),
            close: format_minutes(hours.close_minute),
        }
    }
}

impl BusinessHours {
    pub fn parse(open: &str, close: &str) -> Option<Self> {
        let open_minute = parse_minutes(open)?;
        let close_minute = parse_minutes(close)?;
        if open_minute == close_minute {
            return None;
        }
        Some(Self { open_minute, close_minute })
    }

    pub const fn open_minute(&self) -> u32 {
        self.open_minute
    }

    /// Closing minute on the business-relative scale (> open).
    pub const fn relative_close(&self) -> u32 {
        if self.close_minute <= self.open_minute {
            self.close_minute + MINUTES_PER_DAY
        } else {
            self.close_minute
        }
    }

    /// Minutes after midnight of the following calendar day that still belong to this day.
    pub const fn carryover_minutes(&self) -> u32 {
        self.relative_close().saturating_sub(MINUTES_PER_DAY)
    }

    /// Maps a wall-clock time onto the business-relative scale: times before
    /// opening belong to the night after midnight and get 1440 added.
    pub fn to_relative(&self, time: &str) -> Option<u32> {
        let minutes = parse_minutes(time)?;
        Some(self.relative_from_minutes(minutes))
    }

    fn relative_from_minutes(&self, minutes: u32) -> u32 {
        if minutes < self.open_minute { minutes + MINUTES_PER_DAY } else { minutes }
    }

    /// Relative `[start, end)` of a wall-clock window, `None` when either end
    /// is malformed or the window is empty.
    pub fn relative_window(&self, start: &str, end: &str) -> Option<(u32, u32)> {
        let rel_start = self.to_relative(start)?;
        let mut rel_end = self.to_relative(end)?;
        if rel_end == rel_start {
            return None;
        }
        if rel_end < rel_start {
            rel_end += MINUTES_PER_DAY;
        }
        Some((rel_start, rel_end))
    }

    /// Half-open overlap test on the business-relative scale.
    ///
    /// Any malformed input counts as a conflict: an unreadable window must
    /// never let a second booking through.
    pub fn has_time_conflict(&self, start_a: &str, end_a: &str, start_b: &str, end_b: &str) -> bool {
        match (self.relative_window(start_a, end_a), self.relative_window(start_b, end_b)) {
            (Some((a_start, a_end)), Some((b_start, b_end))) => a_start < b_end && a_end > b_start,
            _ => true,
        }
    }

    pub fn ensure_within(&self, start: &str, end: &str) -> Result<(u32, u32), AppError> {
        let (rel_start, rel_end) = self.relative_window(start, end)
            .ok_or_else(|| AppError::InvalidArgument("Invalid time window".into()))?;

        if rel_start < self.open_minute || rel_end > self.relative_close() {
            return Err(AppError::OutOfHours(format!(
                "Bookings must start at or after {} and end by {}",
                format_minutes(self.open_minute),
                format_minutes(self.close_minute)
            )));
        }
        Ok((rel_start, rel_end))
    }

    /// Adds `hours` to a wall-clock start, wrapping past midnight.
    pub fn end_time(start: &str, hours: u32) -> Option<String> {
        let minutes = parse_minutes(start)?;
        Some(format_minutes(minutes + hours * 60))
    }
}

/// Per-weekday opening hours. `None` marks a closed day.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct WeeklySchedule {
    pub monday: Option<BusinessHours>,
    pub tuesday: Option<BusinessHours>,
    pub wednesday: Option<BusinessHours>,
    pub thursday: Option<BusinessHours>,
    pub friday: Option<BusinessHours>,
    pub saturday: Option<BusinessHours>,
    pub sunday: Option<BusinessHours>,
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        let nightly = BusinessHours { open_minute: 18 * 60, close_minute: 2 * 60 };
        Self {
            monday: Some(nightly),
            tuesday: Some(nightly),
            wednesday: Some(nightly),
            thursday: Some(nightly),
            friday: Some(nightly),
            saturday: Some(nightly),
            sunday: Some(nightly),
        }
    }
}

impl WeeklySchedule {
    pub fn hours_for(&self, weekday: Weekday) -> Option<&BusinessHours> {
        match weekday {
            Weekday::Mon => self.monday.as_ref(),
            Weekday::Tue => self.tuesday.as_ref(),
            Weekday::Wed => self.wednesday.as_ref(),
            Weekday::Thu => self.thursday.as_ref(),
            Weekday::Fri => self.friday.as_ref(),
            Weekday::Sat => self.saturday.as_ref(),
            Weekday::Sun => self.sunday.as_ref(),
        }
    }

    pub fn hours_on(&self, date: NaiveDate) -> Option<&BusinessHours> {
        self.hours_for(date.weekday())
    }

    /// Calendar minutes `[0, end)` of `date` that belong to the previous business day.
    pub fn carryover_on(&self, date: NaiveDate) -> Option<(u32, u32)> {
        let previous = date - Duration::days(1);
        let carry = self.hours_on(previous)?.carryover_minutes();
        (carry > 0).then_some((0, carry))
    }

    /// Calendar-minute segments of `date` during which the venue operates,
    /// tagged with the business day each one is booked under.
    pub fn operating_segments(&self, date: NaiveDate) -> Vec<(NaiveDate, u32, u32)> {
        let mut segments = Vec::new();
        if let Some((start, end)) = self.carryover_on(date) {
            segments.push((date - Duration::days(1), start, end));
        }
        if let Some(hours) = self.hours_on(date) {
            segments.push((date, hours.open_minute, hours.relative_close().min(MINUTES_PER_DAY)));
        }
        segments
    }

    /// Wall-clock start times of `date`'s business day where a window of
    /// `duration_minutes` fits before close.
    pub fn slot_starts(&self, date: NaiveDate, duration_minutes: u32, step_minutes: u32) -> Vec<String> {
        let Some(hours) = self.hours_on(date) else {
            return Vec::new();
        };
        if duration_minutes == 0 || step_minutes == 0 {
            return Vec::new();
        }

        let mut slots = Vec::new();
        let mut cursor = hours.open_minute;
        while cursor + duration_minutes <= hours.relative_close() {
            slots.push(format_minutes(cursor));
            cursor += step_minutes;
        }
        slots
    }

    /// Fails when a day's post-midnight carryover runs into the next day's opening.
    pub fn validate(&self) -> Result<(), String> {
        let mut day = Weekday::Mon;
        for _ in 0..7 {
            let next = day.succ();
            if let (Some(today), Some(tomorrow)) = (self.hours_for(day), self.hours_for(next))
                && today.carryover_minutes() > tomorrow.open_minute {
                return Err(format!("{day} closes after {next} opens"));
            }
            day = next;
        }
        Ok(())
    }
}
