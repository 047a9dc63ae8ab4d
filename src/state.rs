use std::sync::Arc;
use jsonwebtoken::DecodingKey;
use crate::config::Config;
use crate::domain::models::venue::VenueConfig;
use crate::domain::services::reservation_service::ReservationService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub venue: Arc<VenueConfig>,
    pub reservations: Arc<ReservationService>,
    pub jwt_decoding_key: Arc<DecodingKey>,
}
