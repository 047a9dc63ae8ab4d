use std::sync::Arc;
use chrono::NaiveDate;
use serde::Serialize;
use crate::domain::models::reservation::Reservation;
use crate::domain::models::schedule::{format_minutes, BusinessHours};
use crate::domain::models::venue::VenueConfig;
use crate::domain::ports::ReservationRepository;
use crate::error::AppError;

/// A candidate window for one room on one business day.
#[derive(Debug, Clone)]
pub struct SlotQuery {
    pub room_id: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub exclude_id: Option<String>,
}

impl SlotQuery {
    /// The window a reservation occupies, not counting the reservation itself.
    pub fn for_reservation(reservation: &Reservation) -> Self {
        Self {
            room_id: reservation.room_id.clone(),
            date: reservation.date,
            start_time: reservation.start_time.clone(),
            end_time: reservation.end_time.clone(),
            exclude_id: Some(reservation.id.clone()),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
    pub start_time: String,
    pub end_time: String,
    pub remaining_units: u32,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoomDayAvailability {
    pub room_id: String,
    pub room_name: String,
    pub inventory_count: u32,
    pub slots: Vec<SlotAvailability>,
}

/// Calendar minutes of a date and the business day they are booked under.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperatingSegment {
    pub business_date: NaiveDate,
    pub from: String,
    pub until: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub open: bool,
    pub segments: Vec<OperatingSegment>,
    pub rooms: Vec<RoomDayAvailability>,
}

/// Counts free units of a room type. Holds no state besides the venue
/// configuration, so the same computation serves previews and the
/// authoritative re-check inside a write transaction.
#[derive(Clone)]
pub struct AvailabilityEngine {
    venue: Arc<VenueConfig>,
}

impl AvailabilityEngine {
    pub fn new(venue: Arc<VenueConfig>) -> Self {
        Self { venue }
    }

    pub fn venue(&self) -> &VenueConfig {
        &self.venue
    }

    /// `max(inventory - overlapping - holdback, 0)`. A closed day has nothing to offer.
    pub fn remaining_units(&self, query: &SlotQuery, reservations: &[Reservation]) -> u32 {
        let Some(hours) = self.venue.schedule.hours_on(query.date) else {
            return 0;
        };
        let room = self.venue.room(&query.room_id);

        let overlapping = count_overlapping(hours, query, reservations);
        let holdback = self.venue.holdback_units(&query.room_id, query.date, &query.start_time, &query.end_time);

        room.inventory_count
            .saturating_sub(overlapping)
            .saturating_sub(holdback)
    }

    /// Non-transactional read; may be briefly stale.
    pub async fn compute_remaining_units(&self, repo: &dyn ReservationRepository, query: &SlotQuery) -> Result<u32, AppError> {
        let active = repo.list_active(&query.room_id, query.date).await?;
        Ok(self.remaining_units(query, &active))
    }

    pub fn unavailable_message(&self, room_id: &str) -> String {
        self.venue.room(room_id).unavailable_message()
    }

    /// One-hour slot grid for every room on the business day `date`.
    pub fn day_grid(&self, date: NaiveDate, reservations: &[Reservation]) -> DayAvailability {
        let schedule = &self.venue.schedule;
        let segments = schedule.operating_segments(date).into_iter()
            .map(|(business_date, from, until)| OperatingSegment {
                business_date,
                from: format_minutes(from),
                until: format_minutes(until),
            })
            .collect();

        let starts = schedule.slot_starts(date, 60, self.venue.slot_step_minutes);
        let rooms = self.venue.rooms.all().iter().map(|room| {
            let slots = starts.iter().filter_map(|start| {
                let end_time = BusinessHours::end_time(start, 1)?;
                let query = SlotQuery {
                    room_id: room.id.clone(),
                    date,
                    start_time: start.clone(),
                    end_time: end_time.clone(),
                    exclude_id: None,
                };
                Some(SlotAvailability {
                    start_time: start.clone(),
                    end_time,
                    remaining_units: self.remaining_units(&query, reservations),
                })
            }).collect();

            RoomDayAvailability {
                room_id: room.id.clone(),
                room_name: room.display_label.clone(),
                inventory_count: room.inventory_count,
                slots,
            }
        }).collect();

        DayAvailability {
            date,
            open: schedule.hours_on(date).is_some(),
            segments,
            rooms,
        }
    }
}

fn count_overlapping(hours: &BusinessHours, query: &SlotQuery, reservations: &[Reservation]) -> u32 {
    reservations.iter()
        .filter(|r| r.is_active())
        .filter(|r| r.room_id == query.room_id && r.date == query.date)
        .filter(|r| query.exclude_id.as_deref() != Some(r.id.as_str()))
        .filter(|r| hours.has_time_conflict(&query.start_time, &query.end_time, &r.start_time, &r.end_time))
        .count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::domain::models::reservation::{STATUS_CANCELLED, STATUS_CONFIRMED};

    fn engine() -> AvailabilityEngine {
        AvailabilityEngine::new(Arc::new(VenueConfig::default()))
    }

    fn booking(id: &str, room_id: &str, date: NaiveDate, start: &str, end: &str, status: &str) -> Reservation {
        let now = Utc::now();
        Reservation {
            id: id.into(),
            room_id: room_id.into(),
            room_name: room_id.into(),
            date,
            start_time: start.into(),
            end_time: end.into(),
            duration_hours: 1,
            party_size: 2,
            customer_first_name: "Test".into(),
            customer_last_name: "Guest".into(),
            customer_email: "guest@example.com".into(),
            customer_phone: String::new(),
            status: status.into(),
            payment_reference: None,
            payment_status: "not_required".into(),
            total_cost: 0,
            deposit_amount: 0,
            remaining_balance: 0,
            base_cost: 0,
            extra_guest_cost: 0,
            required_purchase_cost: 0,
            confirmation_email_sent: false,
            cancellation_email_sent: false,
            sms_sent: false,
            cancelled_at: None,
            cancelled_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn query(room_id: &str, date: NaiveDate, start: &str, end: &str) -> SlotQuery {
        SlotQuery {
            room_id: room_id.into(),
            date,
            start_time: start.into(),
            end_time: end.into(),
            exclude_id: None,
        }
    }

    #[test]
    fn test_full_room_has_no_units_left() {
        let saturday = NaiveDate::from_ymd_opt(2025, 11, 22).unwrap();
        let existing: Vec<_> = (0..4)
            .map(|i| booking(&format!("b{i}"), "small", saturday, "20:00", "22:00", STATUS_CONFIRMED))
            .collect();

        assert_eq!(engine().remaining_units(&query("small", saturday, "20:30", "21:30"), &existing), 0);
    }

    #[test]
    fn test_friday_holdback_reduces_inventory() {
        let friday = NaiveDate::from_ymd_opt(2025, 11, 21).unwrap();
        let existing = vec![
            booking("a", "small", friday, "18:00", "19:00", STATUS_CONFIRMED),
            booking("b", "small", friday, "19:00", "20:00", STATUS_CONFIRMED),
            booking("c", "small", friday, "23:00", "01:00", STATUS_CONFIRMED),
        ];

        assert_eq!(engine().remaining_units(&query("small", friday, "21:30", "22:30"), &existing), 3);
        assert_eq!(engine().remaining_units(&query("small", friday, "18:30", "19:30"), &existing), 2);
    }

    #[test]
    fn test_cancelled_other_rooms_and_excluded_are_ignored() {
        let tuesday = NaiveDate::from_ymd_opt(2025, 11, 18).unwrap();
        let existing = vec![
            booking("mine", "party", tuesday, "19:00", "20:00", STATUS_CONFIRMED),
            booking("gone", "party", tuesday, "19:00", "20:00", STATUS_CANCELLED),
            booking("other", "large", tuesday, "19:00", "20:00", STATUS_CONFIRMED),
        ];

        let mut q = query("party", tuesday, "19:00", "20:00");
        assert_eq!(engine().remaining_units(&q, &existing), 0);
        q.exclude_id = Some("mine".into());
        assert_eq!(engine().remaining_units(&q, &existing), 1);
    }

    #[test]
    fn test_closed_day_and_unknown_room() {
        let mut venue = VenueConfig::default();
        venue.schedule.tuesday = None;
        let engine = AvailabilityEngine::new(Arc::new(venue));
        let tuesday = NaiveDate::from_ymd_opt(2025, 11, 18).unwrap();
        let wednesday = NaiveDate::from_ymd_opt(2025, 11, 19).unwrap();

        assert_eq!(engine.remaining_units(&query("small", tuesday, "19:00", "20:00"), &[]), 0);
        assert_eq!(engine.remaining_units(&query("vip", wednesday, "19:00", "20:00"), &[]), 1);
        assert!(engine.unavailable_message("vip").starts_with("The selected room"));
    }

    #[test]
    fn test_day_grid_marks_booked_slots() {
        let tuesday = NaiveDate::from_ymd_opt(2025, 11, 18).unwrap();
        let existing = vec![booking("p", "party", tuesday, "23:00", "01:00", STATUS_CONFIRMED)];
        let grid = engine().day_grid(tuesday, &existing);

        assert!(grid.open);
        let party = grid.rooms.iter().find(|r| r.room_id == "party").unwrap();
        let remaining = |start: &str| party.slots.iter().find(|s| s.start_time == start).unwrap().remaining_units;
        assert_eq!(remaining("22:00"), 1);
        assert_eq!(remaining("22:30"), 0);
        assert_eq!(remaining("00:30"), 0);
        assert_eq!(remaining("01:00"), 1);
    }
}
