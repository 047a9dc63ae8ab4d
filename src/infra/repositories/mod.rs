pub mod sqlite_reservation_repo;
pub mod postgres_reservation_repo;
