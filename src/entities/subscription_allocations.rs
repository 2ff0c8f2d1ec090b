use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// One plan allocation in an issuer's ledger. Rows are immutable once written;
/// the highest `position` is the active allocation.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "subscription_allocations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub ledger_id: i64,
    pub position: i32,
    pub plan_title: String,
    pub purchased_at: DateTime<Utc>,
    pub fee: f64,
    pub duration_days: i32,
    pub allocated_credits: i64,
    pub current_credits: i64,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::subscription_ledgers::Entity",
        from = "Column::LedgerId",
        to = "super::subscription_ledgers::Column::Id"
    )]
    SubscriptionLedgers,
}

impl Related<super::subscription_ledgers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubscriptionLedgers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
