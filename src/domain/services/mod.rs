pub mod availability;
pub mod calendar;
pub mod notifications;
pub mod reservation_service;
