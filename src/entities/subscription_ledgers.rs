use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "subscription_ledgers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub email: String,
    pub issuer_id: Uuid,
    pub status: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::subscription_allocations::Entity")]
    SubscriptionAllocations,
}

impl Related<super::subscription_allocations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubscriptionAllocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
