use serde::{Deserialize, Serialize};

pub const ADMIN_AUDIENCE: &str = "karaoke-booking";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub sub: String,
    pub aud: String,
    pub exp: usize,
    pub iat: usize,

    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
}
