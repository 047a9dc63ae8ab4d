use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use crate::domain::models::room::{RoomRegistry, RoomType};
use crate::domain::models::schedule::{parse_minutes, BusinessHours, WeeklySchedule};

/// Units withheld from online booking for walk-ins.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HoldbackRule {
    pub room_ids: Vec<String>,
    pub weekdays: Vec<Weekday>,
    pub start: String,
    pub end: String,
    pub units: u32,
}

impl HoldbackRule {
    pub fn units_for(&self, room_id: &str, date: NaiveDate, hours: &BusinessHours, start: &str, end: &str) -> u32 {
        let applies = self.room_ids.iter().any(|id| id == room_id)
            && self.weekdays.contains(&date.weekday())
            && hours.has_time_conflict(start, end, &self.start, &self.end);
        if applies { self.units } else { 0 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default, rename_all = "camelCase")]
pub struct VenueConfig {
    pub schedule: WeeklySchedule,
    pub rooms: RoomRegistry,
    pub holdbacks: Vec<HoldbackRule>,
    pub notice_window_hours: i64,
    pub max_duration_hours: u32,
    pub slot_step_minutes: u32,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            schedule: WeeklySchedule::default(),
            rooms: RoomRegistry::default(),
            holdbacks: vec![HoldbackRule {
                room_ids: vec!["small".to_string(), "medium".to_string()],
                weekdays: vec![Weekday::Fri, Weekday::Sat],
                start: "21:00".to_string(),
                end: "23:00".to_string(),
                units: 1,
            }],
            notice_window_hours: 48,
            max_duration_hours: 3,
            slot_step_minutes: 30,
        }
    }
}

impl VenueConfig {
    pub fn from_json(raw: &str) -> Result<Self, String> {
        let config: VenueConfig = serde_json::from_str(raw).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.schedule.validate()?;
        if self.max_duration_hours == 0 {
            return Err("maxDurationHours must be positive".into());
        }
        if self.slot_step_minutes == 0 {
            return Err("slotStepMinutes must be positive".into());
        }
        for room in self.rooms.all() {
            if room.min_party_size > room.max_party_size {
                return Err(format!("room {} has min party size above max", room.id));
            }
        }
        Ok(())
    }

    pub fn room(&self, room_id: &str) -> RoomType {
        self.rooms.get(room_id)
    }

    pub fn holdback_units(&self, room_id: &str, date: NaiveDate, start: &str, end: &str) -> u32 {
        let Some(hours) = self.schedule.hours_on(date) else {
            return 0;
        };
        self.holdbacks.iter()
            .map(|rule| rule.units_for(room_id, date, hours, start, end))
            .sum()
    }

    /// Instant a window on business day `date` starts. Times before opening
    /// fall on the following calendar day.
    pub fn local_start(&self, tz: Tz, date: NaiveDate, start_time: &str) -> Option<DateTime<Utc>> {
        let minutes = parse_minutes(start_time)?;
        let calendar_date = match self.schedule.hours_on(date) {
            Some(hours) if minutes < hours.open_minute() => date.succ_opt()?,
            _ => date,
        };
        let time = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)?;
        let local = tz.from_local_datetime(&calendar_date.and_time(time)).earliest()?;
        Some(local.with_timezone(&Utc))
    }
}
