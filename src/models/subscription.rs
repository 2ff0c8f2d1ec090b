use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::repositories::{AllocationRecord, LedgerRecord};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscribeRequest {
    pub email: String,
    pub code: String,
}

/// Ad-hoc plan terms for enterprise customers; the fee is derived from the
/// credit allotment, not looked up from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EnterpriseSubscribeRequest {
    pub email: String,
    pub plan_title: String,
    pub duration_days: i32,
    pub allocated_credits: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionStatusRequest {
    pub email: String,
}

/// Projection of a single ledger entry; the last entry is the active plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AllocationView {
    pub plan_title: String,
    pub purchased_at: DateTime<Utc>,
    pub fee: f64,
    pub duration_days: i32,
    pub allocated_credits: i64,
    pub current_credits: i64,
}

impl From<AllocationRecord> for AllocationView {
    fn from(a: AllocationRecord) -> Self {
        Self {
            plan_title: a.plan_title,
            purchased_at: a.purchased_at,
            fee: a.fee,
            duration_days: a.duration_days,
            allocated_credits: a.allocated_credits,
            current_credits: a.current_credits,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LedgerResponse {
    pub email: String,
    pub issuer_id: Uuid,
    pub status: bool,
    pub allocations: Vec<AllocationView>,
}

impl From<LedgerRecord> for LedgerResponse {
    fn from(l: LedgerRecord) -> Self {
        Self {
            email: l.email,
            issuer_id: l.issuer_id,
            status: l.status,
            allocations: l.allocations.into_iter().map(AllocationView::from).collect(),
        }
    }
}

/// Derived on every status read, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    Active,
    NearExpiry,
    LapsedAutoRenewed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionStatusResponse {
    pub state: SubscriptionState,
    pub plan: AllocationView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutSessionRequest {
    pub email: String,
    /// Display name of the plan being paid for.
    pub name: String,
    pub fee: f64,
    pub limit: i64,
    pub rate: f64,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    pub session_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentDetailsRequest {
    pub email: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentDetailsResponse {
    pub session_id: String,
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GrievanceRequest {
    pub email: String,
    pub payment_id: String,
}
