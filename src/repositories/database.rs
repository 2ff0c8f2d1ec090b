use super::{
    AdminDirectory, AdminRecord, AllocationDraft, AllocationRecord, IssuerDirectory, IssuerRecord,
    LedgerAppend, LedgerCreate, LedgerRecord, LedgerStore, PlanDraft, PlanInsert, PlanRecord,
    PlanStore,
};
use crate::database::DbPool;
use crate::entities::{admin_entity, allocation_entity, issuer_entity, ledger_entity, plan_entity};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
    Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

#[derive(Clone)]
pub struct DbAdminDirectory {
    pool: DbPool,
}

impl DbAdminDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminDirectory for DbAdminDirectory {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<AdminRecord>> {
        let admin = admin_entity::Entity::find()
            .filter(admin_entity::Column::Email.eq(email))
            .one(&self.pool)
            .await?;
        Ok(admin.map(|a| AdminRecord {
            email: a.email,
            name: a.name,
        }))
    }
}

#[derive(Clone)]
pub struct DbIssuerDirectory {
    pool: DbPool,
}

impl DbIssuerDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IssuerDirectory for DbIssuerDirectory {
    async fn find_approved(&self, email: &str) -> AppResult<Option<IssuerRecord>> {
        let issuer = issuer_entity::Entity::find()
            .filter(issuer_entity::Column::Email.eq(email))
            .filter(issuer_entity::Column::Approved.eq(true))
            .one(&self.pool)
            .await?;
        Ok(issuer.map(|i| IssuerRecord {
            issuer_id: i.issuer_id,
            email: i.email,
            name: i.name,
            approved: i.approved,
        }))
    }
}

#[derive(Clone)]
pub struct DbPlanStore {
    pool: DbPool,
}

impl DbPlanStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn plan_record(model: plan_entity::Model) -> PlanRecord {
    PlanRecord {
        code: model.code,
        title: model.title,
        subheader: model.subheader,
        fee: model.fee,
        credit_limit: model.credit_limit,
        rate: model.rate,
        validity_days: model.validity_days,
        status: model.status,
        last_update: model.last_update,
    }
}

#[async_trait]
impl PlanStore for DbPlanStore {
    async fn find_by_code(&self, code: &str) -> AppResult<Option<PlanRecord>> {
        let plan = plan_entity::Entity::find()
            .filter(plan_entity::Column::Code.eq(code))
            .one(&self.pool)
            .await?;
        Ok(plan.map(plan_record))
    }

    async fn list_active(&self) -> AppResult<Vec<PlanRecord>> {
        let plans = plan_entity::Entity::find()
            .filter(plan_entity::Column::Status.eq(true))
            .order_by_asc(plan_entity::Column::Code)
            .all(&self.pool)
            .await?;
        Ok(plans.into_iter().map(plan_record).collect())
    }

    async fn insert_if_absent(&self, code: &str, draft: PlanDraft) -> AppResult<PlanInsert> {
        let model = plan_entity::ActiveModel {
            code: Set(code.to_owned()),
            title: Set(draft.title),
            subheader: Set(draft.subheader),
            fee: Set(draft.fee),
            credit_limit: Set(draft.credit_limit),
            rate: Set(draft.rate),
            validity_days: Set(draft.validity_days),
            status: Set(true),
            last_update: Set(Utc::now()),
            ..Default::default()
        };

        let insert = plan_entity::Entity::insert(model)
            .on_conflict(
                OnConflict::column(plan_entity::Column::Code)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(&self.pool)
            .await;

        match insert {
            Ok(_) => Ok(PlanInsert::Inserted),
            Err(DbErr::RecordNotInserted) => Ok(PlanInsert::CodeExists),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, code: &str, draft: PlanDraft) -> AppResult<Option<PlanRecord>> {
        let Some(existing) = plan_entity::Entity::find()
            .filter(plan_entity::Column::Code.eq(code))
            .one(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let mut model = existing.into_active_model();
        model.title = Set(draft.title);
        model.subheader = Set(draft.subheader);
        model.fee = Set(draft.fee);
        model.credit_limit = Set(draft.credit_limit);
        model.rate = Set(draft.rate);
        model.validity_days = Set(draft.validity_days);
        model.last_update = Set(Utc::now());

        let updated = model.update(&self.pool).await?;
        Ok(Some(plan_record(updated)))
    }

    async fn delete(&self, code: &str) -> AppResult<bool> {
        let result = plan_entity::Entity::delete_many()
            .filter(plan_entity::Column::Code.eq(code))
            .exec(&self.pool)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[derive(Clone)]
pub struct DbLedgerStore {
    pool: DbPool,
}

impl DbLedgerStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(&self, ledger: ledger_entity::Model) -> AppResult<LedgerRecord> {
        let allocations = allocation_entity::Entity::find()
            .filter(allocation_entity::Column::LedgerId.eq(ledger.id))
            .order_by_asc(allocation_entity::Column::Position)
            .all(&self.pool)
            .await?;
        Ok(LedgerRecord {
            id: ledger.id,
            email: ledger.email,
            issuer_id: ledger.issuer_id,
            status: ledger.status,
            allocations: allocations.into_iter().map(allocation_record).collect(),
        })
    }

    async fn load_by_id(&self, ledger_id: i64) -> AppResult<LedgerRecord> {
        let ledger = ledger_entity::Entity::find_by_id(ledger_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::InternalError(format!("ledger {ledger_id} disappeared")))?;
        self.load(ledger).await
    }
}

fn allocation_record(model: allocation_entity::Model) -> AllocationRecord {
    AllocationRecord {
        position: model.position,
        plan_title: model.plan_title,
        purchased_at: model.purchased_at,
        fee: model.fee,
        duration_days: model.duration_days,
        allocated_credits: model.allocated_credits,
        current_credits: model.current_credits,
    }
}

fn allocation_model(ledger_id: i64, position: i32, draft: AllocationDraft) -> allocation_entity::ActiveModel {
    allocation_entity::ActiveModel {
        ledger_id: Set(ledger_id),
        position: Set(position),
        plan_title: Set(draft.plan_title),
        purchased_at: Set(draft.purchased_at),
        fee: Set(draft.fee),
        duration_days: Set(draft.duration_days),
        allocated_credits: Set(draft.allocated_credits),
        current_credits: Set(draft.current_credits),
        ..Default::default()
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait]
impl LedgerStore for DbLedgerStore {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<LedgerRecord>> {
        let ledger = ledger_entity::Entity::find()
            .filter(ledger_entity::Column::Email.eq(email))
            .one(&self.pool)
            .await?;
        match ledger {
            Some(ledger) => Ok(Some(self.load(ledger).await?)),
            None => Ok(None),
        }
    }

    async fn create(
        &self,
        email: &str,
        issuer_id: Uuid,
        first: AllocationDraft,
    ) -> AppResult<LedgerCreate> {
        let txn = self.pool.begin().await?;

        let ledger = match (ledger_entity::ActiveModel {
            email: Set(email.to_owned()),
            issuer_id: Set(issuer_id),
            status: Set(true),
            ..Default::default()
        })
        .insert(&txn)
        .await
        {
            Ok(ledger) => ledger,
            Err(e) if is_unique_violation(&e) => return Ok(LedgerCreate::Conflict),
            Err(e) => return Err(e.into()),
        };

        let allocation = allocation_model(ledger.id, 0, first).insert(&txn).await?;
        txn.commit().await?;

        Ok(LedgerCreate::Created(LedgerRecord {
            id: ledger.id,
            email: ledger.email,
            issuer_id: ledger.issuer_id,
            status: ledger.status,
            allocations: vec![allocation_record(allocation)],
        }))
    }

    async fn append(
        &self,
        ledger_id: i64,
        expected_entries: usize,
        next: AllocationDraft,
    ) -> AppResult<LedgerAppend> {
        let insert = allocation_model(ledger_id, expected_entries as i32, next)
            .insert(&self.pool)
            .await;

        match insert {
            Ok(_) => {
                let touched = ledger_entity::ActiveModel {
                    id: Set(ledger_id),
                    updated_at: Set(Some(Utc::now())),
                    ..Default::default()
                };
                touched.update(&self.pool).await?;
                Ok(LedgerAppend::Appended(self.load_by_id(ledger_id).await?))
            }
            Err(e) if is_unique_violation(&e) => Ok(LedgerAppend::Conflict),
            Err(e) => Err(e.into()),
        }
    }
}
