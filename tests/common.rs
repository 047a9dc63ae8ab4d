#![allow(dead_code)]

use karaoke_booking::{
    api::router::create_router,
    config::Config,
    domain::models::{
        auth::{Claims, ADMIN_AUDIENCE},
        payment::{PaymentIntent, PaymentStatus},
        venue::VenueConfig,
    },
    domain::ports::{Clock, EmailService, PaymentGateway, ReservationRepository, SmsService},
    error::AppError,
    infra::factory::assemble_state,
    infra::repositories::sqlite_reservation_repo::SqliteReservationRepo,
    state::AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::Value;
use sqlx::{sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions}, Pool, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_ISSUER: &str = "test-issuer";

pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// In-memory stand-in for the card processor.
#[derive(Default)]
pub struct MockPaymentGateway {
    intents: Mutex<HashMap<String, PaymentStatus>>,
    voided: Mutex<Vec<String>>,
    refunded: Mutex<Vec<String>>,
    captured: Mutex<Vec<String>>,
    fail_reversal: Mutex<bool>,
    fail_authorization: Mutex<bool>,
}

impl MockPaymentGateway {
    pub fn set_status(&self, id: &str, status: PaymentStatus) {
        self.intents.lock().unwrap().insert(id.to_string(), status);
    }

    pub fn fail_reversals(&self, fail: bool) {
        *self.fail_reversal.lock().unwrap() = fail;
    }

    pub fn fail_authorizations(&self, fail: bool) {
        *self.fail_authorization.lock().unwrap() = fail;
    }

    pub fn voided(&self) -> Vec<String> {
        self.voided.lock().unwrap().clone()
    }

    pub fn refunded(&self) -> Vec<String> {
        self.refunded.lock().unwrap().clone()
    }

    fn ensure_reversal_allowed(&self) -> Result<(), AppError> {
        if *self.fail_reversal.lock().unwrap() {
            return Err(AppError::PaymentError("simulated gateway outage".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn authorize(&self, _amount: i64, _currency: &str, _metadata: &[(&str, String)]) -> Result<PaymentIntent, AppError> {
        if *self.fail_authorization.lock().unwrap() {
            return Err(AppError::PaymentError("card declined".into()));
        }
        let id = format!("pi_test_{}", Uuid::new_v4().simple());
        self.set_status(&id, PaymentStatus::RequiresPaymentMethod);
        Ok(PaymentIntent {
            client_secret: Some(format!("{}_secret", id)),
            id,
            status: PaymentStatus::RequiresPaymentMethod,
        })
    }

    async fn retrieve(&self, id: &str) -> Result<PaymentStatus, AppError> {
        self.intents.lock().unwrap().get(id).cloned()
            .ok_or_else(|| AppError::PaymentError(format!("No such payment intent: {}", id)))
    }

    async fn capture(&self, id: &str) -> Result<PaymentStatus, AppError> {
        self.captured.lock().unwrap().push(id.to_string());
        self.set_status(id, PaymentStatus::Succeeded);
        Ok(PaymentStatus::Succeeded)
    }

    async fn cancel_authorization(&self, id: &str) -> Result<(), AppError> {
        self.ensure_reversal_allowed()?;
        self.voided.lock().unwrap().push(id.to_string());
        self.set_status(id, PaymentStatus::Canceled);
        Ok(())
    }

    async fn refund(&self, id: &str) -> Result<(), AppError> {
        self.ensure_reversal_allowed()?;
        self.refunded.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockEmailService {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: Mutex<bool>,
}

#[async_trait]
impl EmailService for MockEmailService {
    async fn send(
        &self,
        recipient: &str,
        subject: &str,
        _html_body: &str,
        _attachment_name: Option<&str>,
        _attachment_data: Option<&[u8]>,
    ) -> Result<(), AppError> {
        if *self.fail.lock().unwrap() {
            return Err(AppError::InternalWithMsg("mail relay unreachable".into()));
        }
        self.sent.lock().unwrap().push((recipient.to_string(), subject.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MockSmsService {
    pub sent: Mutex<Vec<String>>,
    pub fail: Mutex<bool>,
}

#[async_trait]
impl SmsService for MockSmsService {
    async fn send(&self, to: &str, _body: &str) -> Result<(), AppError> {
        if *self.fail.lock().unwrap() {
            return Err(AppError::InternalWithMsg("sms provider unreachable".into()));
        }
        self.sent.lock().unwrap().push(to.to_string());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub clock: Arc<FixedClock>,
    pub payments: Arc<MockPaymentGateway>,
    pub email: Arc<MockEmailService>,
    pub sms: Arc<MockSmsService>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_repo(|pool| -> Arc<dyn ReservationRepository> { Arc::new(SqliteReservationRepo::new(pool)) }).await
    }

    /// Builds the app around a custom repository, e.g. one that simulates a lost race.
    pub async fn with_repo<F>(make_repo: F) -> Self
    where
        F: FnOnce(Pool<Sqlite>) -> Arc<dyn ReservationRepository>,
    {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let config = Config {
            database_url: db_url,
            port: 0,
            venue_name: "Test Karaoke".to_string(),
            venue_timezone: chrono_tz::UTC,
            venue_config_path: None,
            currency: "usd".to_string(),
            stripe_secret_key: "sk_test".to_string(),
            stripe_api_base: "http://localhost".to_string(),
            mail_service_url: "http://localhost".to_string(),
            mail_service_token: "token".to_string(),
            twilio: None,
            jwt_public_key: include_str!("../tests/keys/test_public.pem").to_string(),
            auth_issuer: TEST_ISSUER.to_string(),
        };

        let clock = Arc::new(FixedClock::at(Utc.with_ymd_and_hms(2025, 11, 1, 12, 0, 0).unwrap()));
        let payments = Arc::new(MockPaymentGateway::default());
        let email = Arc::new(MockEmailService::default());
        let sms = Arc::new(MockSmsService::default());

        let state = Arc::new(assemble_state(
            &config,
            Arc::new(VenueConfig::default()),
            make_repo(pool.clone()),
            payments.clone(),
            email.clone(),
            Some(sms.clone() as Arc<dyn SmsService>),
            clock.clone(),
        ));

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            clock,
            payments,
            email,
            sms,
        }
    }

    pub fn quote(&self, room_id: &str, party_size: u32, duration_hours: u32) -> i64 {
        self.state.venue.room(room_id).quote(party_size, duration_hours).total
    }

    pub fn admin_token(&self, user_id: &str, is_admin: bool) -> String {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            iss: TEST_ISSUER.to_string(),
            sub: user_id.to_string(),
            aud: ADMIN_AUDIENCE.to_string(),
            exp: now + 3600,
            iat: now,
            is_admin,
        };
        let key = EncodingKey::from_ed_pem(include_bytes!("../tests/keys/test_private.pem")).unwrap();
        encode(&Header::new(Algorithm::EdDSA), &claims, &key).unwrap()
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Response {
        self.router.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        ).await.unwrap()
    }

    pub async fn admin_post(&self, token: &str, uri: &str, body: Value) -> Response {
        self.router.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from(body.to_string()))
                .unwrap()
        ).await.unwrap()
    }

    pub async fn admin_get(&self, token: Option<&str>, uri: &str) -> Response {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.router.clone().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    /// Writes a confirmed booking straight to the table, skipping every check.
    pub async fn seed_booking(&self, room_id: &str, date: NaiveDate, start_time: &str, end_time: &str, email: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO reservations (
                id, room_id, room_name, date, start_time, end_time, duration_hours, party_size,
                customer_first_name, customer_last_name, customer_email, customer_phone,
                status, payment_reference, payment_status,
                total_cost, deposit_amount, remaining_balance, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, 1, 4, 'Seed', 'Guest', ?, '', 'confirmed', NULL, 'not_required', 0, 0, 0, ?, ?)"
        )
            .bind(&id).bind(room_id).bind(room_id).bind(date)
            .bind(start_time).bind(end_time).bind(email)
            .bind(now).bind(now)
            .execute(&self.pool)
            .await
            .expect("Failed to seed booking");
        id
    }

    pub async fn status_of(&self, id: &str) -> String {
        sqlx::query_scalar::<_, String>("SELECT status FROM reservations WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .expect("Booking missing")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}

pub async fn parse_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
