use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::repositories::PlanRecord;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanResponse {
    pub code: String,
    pub title: String,
    pub subheader: String,
    pub fee: f64,
    pub limit: i64,
    pub rate: f64,
    pub validity_days: i32,
    pub status: bool,
    pub last_update: DateTime<Utc>,
}

impl From<PlanRecord> for PlanResponse {
    fn from(p: PlanRecord) -> Self {
        Self {
            code: p.code,
            title: p.title,
            subheader: p.subheader,
            fee: p.fee,
            limit: p.credit_limit,
            rate: p.rate,
            validity_days: p.validity_days,
            status: p.status,
            last_update: p.last_update,
        }
    }
}

/// Catalog insert. `email` must belong to an admin.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanUpsertRequest {
    pub email: String,
    pub code: String,
    pub title: String,
    pub subheader: String,
    pub fee: f64,
    pub limit: i64,
    pub rate: f64,
    #[serde(default = "default_validity_days")]
    pub validity_days: i32,
}

/// Full replace of a catalog entry's mutable fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanUpdateRequest {
    pub email: String,
    pub title: String,
    pub subheader: String,
    pub fee: f64,
    pub limit: i64,
    pub rate: f64,
    #[serde(default = "default_validity_days")]
    pub validity_days: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanDeleteRequest {
    pub email: String,
}

fn default_validity_days() -> i32 {
    30
}
