use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

pub const PREMIUM_TIER: &str = "premium";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub tier: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The only entitlement the service knows about: premium unlocks the
    /// full document and cover letter artifacts.
    pub fn is_premium(&self) -> bool {
        self.tier == PREMIUM_TIER
    }
}
