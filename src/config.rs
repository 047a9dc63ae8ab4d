use std::env;
use std::fs;
use chrono_tz::Tz;
use crate::domain::models::venue::VenueConfig;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub venue_name: String,
    pub venue_timezone: Tz,
    pub venue_config_path: Option<String>,
    pub currency: String,
    pub stripe_secret_key: String,
    pub stripe_api_base: String,
    pub mail_service_url: String,
    pub mail_service_token: String,
    pub twilio: Option<TwilioConfig>,
    pub jwt_public_key: String, // Ed25519 public key (PEM)
    pub auth_issuer: String,
}

#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

impl Config {
    pub fn from_env() -> Self {
        let twilio = match (
            env::var("TWILIO_ACCOUNT_SID"),
            env::var("TWILIO_AUTH_TOKEN"),
            env::var("TWILIO_FROM_NUMBER"),
        ) {
            (Ok(account_sid), Ok(auth_token), Ok(from_number)) => Some(TwilioConfig { account_sid, auth_token, from_number }),
            _ => None,
        };

        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().expect("PORT must be a number"),
            venue_name: env::var("VENUE_NAME").unwrap_or_else(|_| "Neon Lights Karaoke".to_string()),
            venue_timezone: env::var("VENUE_TIMEZONE")
                .unwrap_or_else(|_| "America/Los_Angeles".to_string())
                .parse()
                .expect("VENUE_TIMEZONE must be an IANA time zone"),
            venue_config_path: env::var("VENUE_CONFIG_PATH").ok(),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "usd".to_string()).to_lowercase(),
            stripe_secret_key: env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY must be set"),
            stripe_api_base: env::var("STRIPE_API_BASE").unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            mail_service_url: env::var("MAIL_SERVICE_URL").unwrap_or_else(|_| "http://localhost:8000/api/v1/send".to_string()),
            mail_service_token: env::var("MAIL_SERVICE_TOKEN").unwrap_or_else(|_| "test-token-1".to_string()),
            twilio,
            jwt_public_key: env::var("JWT_PUBLIC_KEY").expect("JWT_PUBLIC_KEY must be set (Ed25519 Public Key)"),
            auth_issuer: env::var("AUTH_ISSUER").unwrap_or_else(|_| "https://auth.karaoke-booking.local".to_string()),
        }
    }

    /// Built-in defaults unless `VENUE_CONFIG_PATH` points at a JSON override.
    pub fn load_venue(&self) -> VenueConfig {
        match &self.venue_config_path {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .unwrap_or_else(|e| panic!("Failed to read venue config {}: {}", path, e));
                VenueConfig::from_json(&raw)
                    .unwrap_or_else(|e| panic!("Invalid venue config {}: {}", path, e))
            }
            None => VenueConfig::default(),
        }
    }
}
