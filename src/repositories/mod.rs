//! Store access ports. Services depend on these traits; the sea-orm
//! implementations in [`database`] are wired in at process start.

pub mod database;

pub use database::{DbAdminDirectory, DbIssuerDirectory, DbLedgerStore, DbPlanStore};

use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct AdminRecord {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct IssuerRecord {
    pub issuer_id: Uuid,
    pub email: String,
    pub name: String,
    pub approved: bool,
}

#[derive(Debug, Clone)]
pub struct PlanRecord {
    pub code: String,
    pub title: String,
    pub subheader: String,
    pub fee: f64,
    pub credit_limit: i64,
    pub rate: f64,
    pub validity_days: i32,
    pub status: bool,
    pub last_update: DateTime<Utc>,
}

/// Mutable catalog fields; `code` travels separately and never changes.
#[derive(Debug, Clone)]
pub struct PlanDraft {
    pub title: String,
    pub subheader: String,
    pub fee: f64,
    pub credit_limit: i64,
    pub rate: f64,
    pub validity_days: i32,
}

#[derive(Debug, Clone)]
pub struct LedgerRecord {
    pub id: i64,
    pub email: String,
    pub issuer_id: Uuid,
    pub status: bool,
    /// Ordered by position; the last element is the active allocation.
    pub allocations: Vec<AllocationRecord>,
}

#[derive(Debug, Clone)]
pub struct AllocationRecord {
    pub position: i32,
    pub plan_title: String,
    pub purchased_at: DateTime<Utc>,
    pub fee: f64,
    pub duration_days: i32,
    pub allocated_credits: i64,
    pub current_credits: i64,
}

#[derive(Debug, Clone)]
pub struct AllocationDraft {
    pub plan_title: String,
    pub purchased_at: DateTime<Utc>,
    pub fee: f64,
    pub duration_days: i32,
    pub allocated_credits: i64,
    pub current_credits: i64,
}

#[derive(Debug)]
pub enum PlanInsert {
    Inserted,
    CodeExists,
}

#[derive(Debug)]
pub enum LedgerCreate {
    Created(LedgerRecord),
    /// Another writer created the ledger for this email first.
    Conflict,
}

#[derive(Debug)]
pub enum LedgerAppend {
    Appended(LedgerRecord),
    /// The entry count moved since the caller's read; re-read and retry.
    Conflict,
}

#[async_trait]
pub trait AdminDirectory: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<AdminRecord>>;
}

#[async_trait]
pub trait IssuerDirectory: Send + Sync {
    /// Resolves only issuers that exist and are approved.
    async fn find_approved(&self, email: &str) -> AppResult<Option<IssuerRecord>>;
}

#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn find_by_code(&self, code: &str) -> AppResult<Option<PlanRecord>>;

    async fn list_active(&self) -> AppResult<Vec<PlanRecord>>;

    /// Insert-only guard: an existing `code` is reported, never overwritten.
    async fn insert_if_absent(&self, code: &str, draft: PlanDraft) -> AppResult<PlanInsert>;

    /// Full replace of the mutable fields, refreshing `last_update`.
    /// Returns `None` when no entry matches `code`.
    async fn update(&self, code: &str, draft: PlanDraft) -> AppResult<Option<PlanRecord>>;

    /// Returns whether an entry was removed.
    async fn delete(&self, code: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<LedgerRecord>>;

    /// Creates the ledger with its first allocation.
    async fn create(
        &self,
        email: &str,
        issuer_id: Uuid,
        first: AllocationDraft,
    ) -> AppResult<LedgerCreate>;

    /// Conditional append: the new entry lands at `expected_entries` and
    /// collides there if a concurrent writer got in first.
    async fn append(
        &self,
        ledger_id: i64,
        expected_entries: usize,
        next: AllocationDraft,
    ) -> AppResult<LedgerAppend>;
}
