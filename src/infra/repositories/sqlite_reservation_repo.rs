use crate::domain::models::reservation::{NotificationFlag, Reservation};
use crate::domain::ports::{ReservationRepository, RescheduleFn};
use crate::domain::services::availability::{AvailabilityEngine, SlotQuery};
use crate::error::{AppError, NOT_FOUND_MESSAGE};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, warn};

const LOCK_SLOT: &str =
    "INSERT INTO slot_locks (room_id, date, version) VALUES (?, ?, 1)
     ON CONFLICT (room_id, date) DO UPDATE SET version = version + 1";

const ACTIVE_FOR_SLOT: &str =
    "SELECT * FROM reservations WHERE room_id = ? AND date = ? AND status IN ('pending', 'confirmed')";

pub struct SqliteReservationRepo {
    pool: SqlitePool,
}

impl SqliteReservationRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The first write of the transaction takes SQLite's write lock, so every
    /// read after it sees all committed competitors.
    async fn lock_slot(tx: &mut Transaction<'_, Sqlite>, room_id: &str, date: NaiveDate) -> Result<Vec<Reservation>, AppError> {
        sqlx::query(LOCK_SLOT).bind(room_id).bind(date).execute(&mut **tx).await.map_err(AppError::Database)?;
        sqlx::query_as::<_, Reservation>(ACTIVE_FOR_SLOT)
            .bind(room_id).bind(date)
            .fetch_all(&mut **tx).await.map_err(AppError::Database)
    }
}

#[async_trait]
impl ReservationRepository for SqliteReservationRepo {
    async fn find_by_id(&self, id: &str) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE customer_email = ? ORDER BY date DESC, start_time ASC")
            .bind(email)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_date(&self, date: NaiveDate) -> Result<Vec<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE date = ? ORDER BY start_time ASC")
            .bind(date)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_active(&self, room_id: &str, date: NaiveDate) -> Result<Vec<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>(ACTIVE_FOR_SLOT)
            .bind(room_id).bind(date)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn insert_if_available(&self, r: &Reservation, engine: &AvailabilityEngine) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let active = Self::lock_slot(&mut tx, &r.room_id, r.date).await?;

        if engine.remaining_units(&SlotQuery::for_reservation(r), &active) == 0 {
            warn!(room_id = %r.room_id, date = %r.date, start_time = %r.start_time, "Slot filled before commit");
            return Err(AppError::NoAvailability(engine.unavailable_message(&r.room_id)));
        }

        let created = sqlx::query_as::<_, Reservation>(
            "INSERT INTO reservations (
                id, room_id, room_name, date, start_time, end_time, duration_hours, party_size,
                customer_first_name, customer_last_name, customer_email, customer_phone,
                status, payment_reference, payment_status,
                total_cost, deposit_amount, remaining_balance, base_cost, extra_guest_cost, required_purchase_cost,
                confirmation_email_sent, cancellation_email_sent, sms_sent, cancelled_at, cancelled_by,
                created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&r.id).bind(&r.room_id).bind(&r.room_name).bind(r.date)
            .bind(&r.start_time).bind(&r.end_time).bind(r.duration_hours).bind(r.party_size)
            .bind(&r.customer_first_name).bind(&r.customer_last_name).bind(&r.customer_email).bind(&r.customer_phone)
            .bind(&r.status).bind(&r.payment_reference).bind(&r.payment_status)
            .bind(r.total_cost).bind(r.deposit_amount).bind(r.remaining_balance)
            .bind(r.base_cost).bind(r.extra_guest_cost).bind(r.required_purchase_cost)
            .bind(r.confirmation_email_sent).bind(r.cancellation_email_sent).bind(r.sms_sent)
            .bind(r.cancelled_at).bind(&r.cancelled_by)
            .bind(r.created_at).bind(r.updated_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        debug!(booking_id = %created.id, "Reservation inserted");
        Ok(created)
    }

    async fn reschedule_if_available(
        &self,
        id: &str,
        room_id: &str,
        date: NaiveDate,
        engine: &AvailabilityEngine,
        apply: &RescheduleFn<'_>,
    ) -> Result<Reservation, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let active = Self::lock_slot(&mut tx, room_id, date).await?;

        let current = sqlx::query_as::<_, Reservation>("SELECT * FROM reservations WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound(NOT_FOUND_MESSAGE.into()))?;

        let updated = apply(&current)?;
        if updated.room_id != room_id || updated.date != date {
            return Err(AppError::InternalWithMsg(format!("Reschedule of {} targeted an unlocked slot", id)));
        }

        if engine.remaining_units(&SlotQuery::for_reservation(&updated), &active) == 0 {
            return Err(AppError::NoAvailability(engine.unavailable_message(room_id)));
        }

        let saved = sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET
                room_id = ?, room_name = ?, date = ?, start_time = ?, end_time = ?, duration_hours = ?, party_size = ?,
                customer_first_name = ?, customer_last_name = ?, customer_email = ?, customer_phone = ?,
                total_cost = ?, remaining_balance = ?, base_cost = ?, extra_guest_cost = ?, required_purchase_cost = ?,
                updated_at = ?
             WHERE id = ?
             RETURNING *"
        )
            .bind(&updated.room_id).bind(&updated.room_name).bind(updated.date)
            .bind(&updated.start_time).bind(&updated.end_time).bind(updated.duration_hours).bind(updated.party_size)
            .bind(&updated.customer_first_name).bind(&updated.customer_last_name)
            .bind(&updated.customer_email).bind(&updated.customer_phone)
            .bind(updated.total_cost).bind(updated.remaining_balance)
            .bind(updated.base_cost).bind(updated.extra_guest_cost).bind(updated.required_purchase_cost)
            .bind(updated.updated_at)
            .bind(id)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        tx.commit().await.map_err(AppError::Database)?;
        Ok(saved)
    }

    async fn mark_cancelled(&self, id: &str, cancelled_by: &str, payment_status: &str, at: DateTime<Utc>) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'cancelled', payment_status = ?, cancelled_at = ?, cancelled_by = ?, updated_at = ?
             WHERE id = ? AND status IN ('pending', 'confirmed')
             RETURNING *"
        )
            .bind(payment_status).bind(at).bind(cancelled_by).bind(at).bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn mark_confirmed(&self, id: &str, payment_status: &str, at: DateTime<Utc>) -> Result<Option<Reservation>, AppError> {
        sqlx::query_as::<_, Reservation>(
            "UPDATE reservations SET status = 'confirmed', payment_status = ?, updated_at = ?
             WHERE id = ? AND status IN ('pending', 'confirmed')
             RETURNING *"
        )
            .bind(payment_status).bind(at).bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn update_payment_status(&self, id: &str, payment_status: &str, at: DateTime<Utc>) -> Result<Reservation, AppError> {
        sqlx::query_as::<_, Reservation>("UPDATE reservations SET payment_status = ?, updated_at = ? WHERE id = ? RETURNING *")
            .bind(payment_status).bind(at).bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound(NOT_FOUND_MESSAGE.into()))
    }

    async fn mark_notification_sent(&self, id: &str, flag: NotificationFlag) -> Result<(), AppError> {
        let sql = format!("UPDATE reservations SET {} = TRUE WHERE id = ?", flag.column());
        sqlx::query(&sql).bind(id).execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }
}
