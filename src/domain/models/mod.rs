pub mod auth;
pub mod payment;
pub mod reservation;
pub mod room;
pub mod schedule;
pub mod venue;
