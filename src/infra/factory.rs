use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use jsonwebtoken::DecodingKey;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;
use tera::Tera;

use crate::config::Config;
use crate::state::AppState;
use crate::domain::models::venue::VenueConfig;
use crate::domain::ports::{Clock, EmailService, PaymentGateway, ReservationRepository, SmsService, SystemClock};
use crate::domain::services::notifications::NotificationDispatcher;
use crate::domain::services::reservation_service::ReservationService;
use crate::infra::email::http_email_service::HttpEmailService;
use crate::infra::payments::stripe_gateway::StripePaymentGateway;
use crate::infra::sms::twilio_sms_service::TwilioSmsService;
use crate::infra::repositories::{
    postgres_reservation_repo::PostgresReservationRepo,
    sqlite_reservation_repo::SqliteReservationRepo,
};

pub fn load_templates() -> Tera {
    let mut tera = Tera::default();
    tera.add_raw_template("confirmation.html", include_str!("../templates/confirmation.html"))
        .expect("Failed to load confirmation template");
    tera.add_raw_template("reschedule.html", include_str!("../templates/reschedule.html"))
        .expect("Failed to load reschedule template");
    tera.add_raw_template("cancellation.html", include_str!("../templates/cancellation.html"))
        .expect("Failed to load cancellation template");
    tera
}

/// Wires services around already-built adapters. Shared by startup and tests.
pub fn assemble_state(
    config: &Config,
    venue: Arc<VenueConfig>,
    reservation_repo: Arc<dyn ReservationRepository>,
    payments: Arc<dyn PaymentGateway>,
    email_service: Arc<dyn EmailService>,
    sms_service: Option<Arc<dyn SmsService>>,
    clock: Arc<dyn Clock>,
) -> AppState {
    let jwt_decoding_key = DecodingKey::from_ed_pem(config.jwt_public_key.as_bytes())
        .expect("Invalid JWT Public Key PEM");

    let notifier = NotificationDispatcher::new(
        reservation_repo.clone(),
        email_service,
        sms_service,
        Arc::new(load_templates()),
        venue.clone(),
        config.venue_name.clone(),
        config.venue_timezone,
    );

    let reservations = Arc::new(ReservationService::new(
        reservation_repo,
        payments,
        notifier,
        clock,
        venue.clone(),
        config.venue_timezone,
        config.currency.clone(),
    ));

    AppState {
        config: config.clone(),
        venue,
        reservations,
        jwt_decoding_key: Arc::new(jwt_decoding_key),
    }
}

pub async fn bootstrap_state(config: &Config) -> AppState {
    let database_url = &config.database_url;

    let venue = Arc::new(config.load_venue());
    info!(rooms = venue.rooms.all().len(), holdbacks = venue.holdbacks.len(), "Venue configuration loaded");

    let email_service = Arc::new(HttpEmailService::new(
        config.mail_service_url.clone(),
        config.mail_service_token.clone(),
    ));
    let payments = Arc::new(StripePaymentGateway::new(
        config.stripe_api_base.clone(),
        config.stripe_secret_key.clone(),
    ));
    let sms_service: Option<Arc<dyn SmsService>> = match &config.twilio {
        Some(twilio) => Some(Arc::new(TwilioSmsService::new(
            twilio.account_sid.clone(),
            twilio.auth_token.clone(),
            twilio.from_number.clone(),
        ))),
        None => {
            info!("SMS notifications disabled (Twilio not configured)");
            None
        }
    };

    let reservation_repo: Arc<dyn ReservationRepository> =
        if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
            info!("Initializing PostgreSQL connection...");

            let mut opts: PgConnectOptions = database_url.parse().expect("Invalid Postgres URL");
            opts = opts.log_statements(LevelFilter::Debug)
                .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect_with(opts)
                .await
                .expect("Failed to connect to Postgres");

            run_postgres_migrations(&pool).await;
            Arc::new(PostgresReservationRepo::new(pool))
        } else {
            info!("Initializing SQLite connection with WAL Mode...");

            let opts = SqliteConnectOptions::from_str(database_url)
                .expect("Invalid SQLite connection string")
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(Duration::from_secs(5))
                .log_statements(LevelFilter::Debug)
                .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(opts)
                .await
                .expect("Failed to connect to SQLite");

            run_sqlite_migrations(&pool).await;
            Arc::new(SqliteReservationRepo::new(pool))
        };

    assemble_state(
        config,
        venue,
        reservation_repo,
        payments,
        email_service,
        sms_service,
        Arc::new(SystemClock),
    )
}

pub async fn run_postgres_migrations(pool: &PgPool) {
    sqlx::migrate!("./migrations/postgres")
        .run(pool)
        .await
        .expect("Failed to run Postgres migrations");
}

pub async fn run_sqlite_migrations(pool: &SqlitePool) {
    sqlx::migrate!("./migrations/sqlite")
        .run(pool)
        .await
        .expect("Failed to run SQLite migrations");
}
