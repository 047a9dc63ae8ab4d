use crate::domain::models::reservation::Reservation;
use chrono::{DateTime, Duration, Utc};
use icalendar::{Calendar, Component, Event as IcalEvent, EventLike};

/// Generates an iCalendar (.ics) invite for a reservation starting at `starts_at`.
pub fn generate_ics(venue_name: &str, reservation: &Reservation, starts_at: DateTime<Utc>) -> String {
    let ends_at = starts_at + Duration::hours(i64::from(reservation.duration_hours));
    let mut calendar = Calendar::new();

    let ical_event = IcalEvent::new()
        .summary(&format!("{} - {}", venue_name, reservation.room_name))
        .description(&format!(
            "Party of {}. Booking reference {}.",
            reservation.party_size, reservation.id
        ))
        .location(venue_name)
        .starts(starts_at)
        .ends(ends_at)
        .uid(&reservation.id)
        .done();

    calendar.push(ical_event);
    calendar.to_string()
}
