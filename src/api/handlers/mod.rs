pub mod admin;
pub mod booking;
pub mod booking_management;
pub mod health;
