use crate::error::{AppError, AppResult};
use crate::external::{MailerService, PlanNotifier, StripeService};
use crate::models::{
    AllocationView, CheckoutSessionRequest, CheckoutSessionResponse, EnterpriseSubscribeRequest,
    LedgerResponse, PaymentDetailsResponse, SubscriptionState, SubscriptionStatusResponse,
};
use crate::repositories::{
    AllocationDraft, IssuerDirectory, IssuerRecord, LedgerAppend, LedgerCreate, LedgerRecord,
    LedgerStore, PlanStore,
};
use crate::utils::remaining_days;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Catalog plan every lapsed issuer falls back onto.
const FREE_PLAN_CODE: &str = "Free";

/// Enterprise allocations are priced at a flat rate per credit instead of a
/// catalog fee.
const ENTERPRISE_RATE_PER_CREDIT: f64 = 5.0;

/// Expiry warnings cover the last 1..=5 days of a plan's validity.
const NEAR_EXPIRY_WINDOW_DAYS: i64 = 5;

/// Bound on conditional-append retries under write contention.
const MAX_APPEND_ATTEMPTS: usize = 3;

/// The subscription ledger and its expiry arbitration.
///
/// Every operation starts from the issuer directory: unknown or unapproved
/// emails never reach the ledger. Appends are conditional on the entry count
/// read, so two racing allocations cannot silently drop a credit grant.
#[derive(Clone)]
pub struct SubscriptionService {
    issuers: Arc<dyn IssuerDirectory>,
    plans: Arc<dyn PlanStore>,
    ledgers: Arc<dyn LedgerStore>,
    notifier: Arc<dyn PlanNotifier>,
    stripe_service: StripeService,
    mailer_service: MailerService,
}

impl SubscriptionService {
    pub fn new(
        issuers: Arc<dyn IssuerDirectory>,
        plans: Arc<dyn PlanStore>,
        ledgers: Arc<dyn LedgerStore>,
        notifier: Arc<dyn PlanNotifier>,
        stripe_service: StripeService,
        mailer_service: MailerService,
    ) -> Self {
        Self {
            issuers,
            plans,
            ledgers,
            notifier,
            stripe_service,
            mailer_service,
        }
    }

    /// Allocates a catalog plan to the issuer's ledger, creating the ledger on
    /// first purchase. Plan fields are copied by value; later catalog edits do
    /// not rewrite history.
    pub async fn subscribe(
        &self,
        email: &str,
        plan_code: &str,
        now: DateTime<Utc>,
    ) -> AppResult<LedgerResponse> {
        let issuer = self.require_issuer(email).await?;
        let plan = self
            .plans
            .find_by_code(plan_code)
            .await?
            .ok_or_else(|| AppError::PlanNotFound(format!("plan {plan_code} is not available")))?;

        let draft = |prior: i64| AllocationDraft {
            plan_title: plan.title.clone(),
            purchased_at: now,
            fee: plan.fee,
            duration_days: plan.validity_days,
            allocated_credits: plan.credit_limit,
            current_credits: prior + plan.credit_limit,
        };
        let ledger = self.allocate(email, &issuer, &draft).await?;
        self.notify(&issuer, &ledger).await;
        Ok(ledger.into())
    }

    /// Allocates ad-hoc enterprise terms; the fee is derived from the credit
    /// allotment rather than looked up from the catalog.
    pub async fn subscribe_enterprise(
        &self,
        req: &EnterpriseSubscribeRequest,
        now: DateTime<Utc>,
    ) -> AppResult<LedgerResponse> {
        let issuer = self.require_issuer(&req.email).await?;
        let fee = ENTERPRISE_RATE_PER_CREDIT * req.allocated_credits as f64;

        let draft = |prior: i64| AllocationDraft {
            plan_title: req.plan_title.clone(),
            purchased_at: now,
            fee,
            duration_days: req.duration_days,
            allocated_credits: req.allocated_credits,
            current_credits: prior + req.allocated_credits,
        };
        let ledger = self.allocate(&req.email, &issuer, &draft).await?;
        self.notify(&issuer, &ledger).await;
        Ok(ledger.into())
    }

    /// Derives the active-subscription state from the latest ledger entry.
    ///
    /// Inside the warning window this is a pure read. Outside it the issuer is
    /// re-enrolled in the Free plan, whether the plan already lapsed or still
    /// has weeks of runway; tests pin that branch.
    pub async fn subscription_status(
        &self,
        email: &str,
        now: DateTime<Utc>,
    ) -> AppResult<SubscriptionStatusResponse> {
        let issuer = self.require_issuer(email).await?;
        let ledger = self
            .ledgers
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::PlanNotFound(format!("no subscription found for {email}")))?;
        let latest = ledger
            .allocations
            .last()
            .cloned()
            .ok_or_else(|| AppError::PlanNotFound(format!("no subscription found for {email}")))?;

        let remaining = remaining_days(latest.purchased_at, latest.duration_days, now);
        if remaining > 0 && remaining <= NEAR_EXPIRY_WINDOW_DAYS {
            return Ok(SubscriptionStatusResponse {
                state: SubscriptionState::NearExpiry,
                plan: latest.into(),
                remaining_days: Some(remaining),
            });
        }

        let free = self
            .plans
            .find_by_code(FREE_PLAN_CODE)
            .await?
            .ok_or_else(|| {
                AppError::PlanNotFound(format!("plan {FREE_PLAN_CODE} is not available"))
            })?;

        let draft = |prior: i64| AllocationDraft {
            plan_title: free.title.clone(),
            purchased_at: now,
            fee: free.fee,
            duration_days: free.validity_days,
            allocated_credits: free.credit_limit,
            current_credits: prior + free.credit_limit,
        };
        let ledger = self.allocate(email, &issuer, &draft).await?;
        self.notify(&issuer, &ledger).await;

        let renewed = ledger
            .allocations
            .last()
            .cloned()
            .ok_or_else(|| AppError::InternalError("renewed ledger came back empty".to_string()))?;
        Ok(SubscriptionStatusResponse {
            state: SubscriptionState::LapsedAutoRenewed,
            plan: renewed.into(),
            remaining_days: None,
        })
    }

    pub async fn create_checkout_session(
        &self,
        req: &CheckoutSessionRequest,
    ) -> AppResult<CheckoutSessionResponse> {
        self.require_issuer(&req.email).await?;

        let session = self
            .stripe_service
            .create_checkout_session(
                &req.name,
                req.fee,
                req.limit,
                req.rate,
                &req.success_url,
                &req.cancel_url,
            )
            .await?;
        let session_url = session.url.ok_or_else(|| {
            AppError::ExternalApiError("checkout session came back without a URL".to_string())
        })?;
        Ok(CheckoutSessionResponse {
            session_id: session.id,
            session_url,
        })
    }

    pub async fn payment_details(
        &self,
        email: &str,
        session_id: &str,
    ) -> AppResult<PaymentDetailsResponse> {
        self.require_issuer(email).await?;

        let session = self
            .stripe_service
            .retrieve_checkout_session(session_id)
            .await?;
        Ok(PaymentDetailsResponse {
            session_id: session.id,
            status: session.status,
            payment_status: session.payment_status,
            amount_total: session.amount_total,
        })
    }

    pub async fn file_grievance(&self, email: &str, payment_id: &str) -> AppResult<()> {
        let issuer = self.require_issuer(email).await?;
        self.mailer_service
            .send_grievance(email, &issuer.name, payment_id)
            .await?;
        log::info!("Grievance for payment {payment_id} relayed for {email}");
        Ok(())
    }

    async fn require_issuer(&self, email: &str) -> AppResult<IssuerRecord> {
        match self.issuers.find_approved(email).await? {
            Some(issuer) => Ok(issuer),
            None => Err(AppError::InvalidIssuer(email.to_string())),
        }
    }

    /// Conditional append with bounded retry. `draft` receives the running
    /// credit total read in the same attempt, so a retry after a lost race
    /// recomputes the cumulative figure from the fresh tail.
    async fn allocate(
        &self,
        email: &str,
        issuer: &IssuerRecord,
        draft: &dyn Fn(i64) -> AllocationDraft,
    ) -> AppResult<LedgerRecord> {
        for _ in 0..MAX_APPEND_ATTEMPTS {
            match self.ledgers.find_by_email(email).await? {
                None => match self.ledgers.create(email, issuer.issuer_id, draft(0)).await? {
                    LedgerCreate::Created(ledger) => return Ok(ledger),
                    LedgerCreate::Conflict => {
                        log::warn!("Ledger for {email} appeared mid-create, retrying");
                        continue;
                    }
                },
                Some(ledger) => {
                    let prior = ledger
                        .allocations
                        .last()
                        .map(|a| a.current_credits)
                        .unwrap_or(0);
                    let append = self
                        .ledgers
                        .append(ledger.id, ledger.allocations.len(), draft(prior))
                        .await?;
                    match append {
                        LedgerAppend::Appended(ledger) => return Ok(ledger),
                        LedgerAppend::Conflict => {
                            log::warn!("Ledger append for {email} lost a race, retrying");
                            continue;
                        }
                    }
                }
            }
        }
        Err(AppError::InternalError(format!(
            "ledger append for {email} kept conflicting after {MAX_APPEND_ATTEMPTS} attempts"
        )))
    }

    async fn notify(&self, issuer: &IssuerRecord, ledger: &LedgerRecord) {
        if let Some(latest) = ledger.allocations.last() {
            let view = AllocationView::from(latest.clone());
            self.notifier
                .plan_purchased(&ledger.email, &issuer.name, &view)
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MailerConfig, StripeConfig};
    use crate::repositories::{AllocationRecord, PlanDraft, PlanInsert, PlanRecord};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use uuid::Uuid;

    const ISSUER: &str = "a@x.com";

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 8, 30, 0).unwrap() + Duration::days(n)
    }

    struct MockIssuerDirectory {
        approved: Vec<String>,
    }

    #[async_trait]
    impl IssuerDirectory for MockIssuerDirectory {
        async fn find_approved(&self, email: &str) -> AppResult<Option<IssuerRecord>> {
            Ok(self.approved.iter().find(|e| *e == email).map(|e| IssuerRecord {
                issuer_id: Uuid::nil(),
                email: e.clone(),
                name: "Acme Corp".to_string(),
                approved: true,
            }))
        }
    }

    struct StaticPlanStore {
        plans: Vec<PlanRecord>,
    }

    #[async_trait]
    impl PlanStore for StaticPlanStore {
        async fn find_by_code(&self, code: &str) -> AppResult<Option<PlanRecord>> {
            Ok(self.plans.iter().find(|p| p.code == code).cloned())
        }

        async fn list_active(&self) -> AppResult<Vec<PlanRecord>> {
            Ok(self.plans.iter().filter(|p| p.status).cloned().collect())
        }

        async fn insert_if_absent(&self, _code: &str, _draft: PlanDraft) -> AppResult<PlanInsert> {
            Ok(PlanInsert::Inserted)
        }

        async fn update(&self, _code: &str, _draft: PlanDraft) -> AppResult<Option<PlanRecord>> {
            Ok(None)
        }

        async fn delete(&self, _code: &str) -> AppResult<bool> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct MockLedgerStore {
        ledgers: Mutex<HashMap<String, LedgerRecord>>,
        /// Simulated concurrent writer: its draft lands on the next append,
        /// which then reports a conflict.
        race_once: Mutex<Option<AllocationDraft>>,
        /// Appends that fail with a bare conflict before any succeeds.
        forced_conflicts: Mutex<usize>,
    }

    impl MockLedgerStore {
        fn entry_count(&self, email: &str) -> usize {
            self.ledgers
                .lock()
                .unwrap()
                .get(email)
                .map(|l| l.allocations.len())
                .unwrap_or(0)
        }

        fn allocations(&self, email: &str) -> Vec<AllocationRecord> {
            self.ledgers
                .lock()
                .unwrap()
                .get(email)
                .map(|l| l.allocations.clone())
                .unwrap_or_default()
        }
    }

    fn to_record(position: i32, draft: AllocationDraft) -> AllocationRecord {
        AllocationRecord {
            position,
            plan_title: draft.plan_title,
            purchased_at: draft.purchased_at,
            fee: draft.fee,
            duration_days: draft.duration_days,
            allocated_credits: draft.allocated_credits,
            current_credits: draft.current_credits,
        }
    }

    #[async_trait]
    impl LedgerStore for MockLedgerStore {
        async fn find_by_email(&self, email: &str) -> AppResult<Option<LedgerRecord>> {
            Ok(self.ledgers.lock().unwrap().get(email).cloned())
        }

        async fn create(
            &self,
            email: &str,
            issuer_id: Uuid,
            first: AllocationDraft,
        ) -> AppResult<LedgerCreate> {
            let mut ledgers = self.ledgers.lock().unwrap();
            if ledgers.contains_key(email) {
                return Ok(LedgerCreate::Conflict);
            }
            let ledger = LedgerRecord {
                id: ledgers.len() as i64 + 1,
                email: email.to_string(),
                issuer_id,
                status: true,
                allocations: vec![to_record(0, first)],
            };
            ledgers.insert(email.to_string(), ledger.clone());
            Ok(LedgerCreate::Created(ledger))
        }

        async fn append(
            &self,
            ledger_id: i64,
            expected_entries: usize,
            next: AllocationDraft,
        ) -> AppResult<LedgerAppend> {
            {
                let mut forced = self.forced_conflicts.lock().unwrap();
                if *forced > 0 {
                    *forced -= 1;
                    return Ok(LedgerAppend::Conflict);
                }
            }

            let mut ledgers = self.ledgers.lock().unwrap();
            let ledger = ledgers
                .values_mut()
                .find(|l| l.id == ledger_id)
                .expect("append against unknown ledger");

            if let Some(mut racer) = self.race_once.lock().unwrap().take() {
                let prior = ledger.allocations.last().map(|a| a.current_credits).unwrap_or(0);
                racer.current_credits = prior + racer.allocated_credits;
                let position = ledger.allocations.len() as i32;
                ledger.allocations.push(to_record(position, racer));
                return Ok(LedgerAppend::Conflict);
            }

            if ledger.allocations.len() != expected_entries {
                return Ok(LedgerAppend::Conflict);
            }
            ledger.allocations.push(to_record(expected_entries as i32, next));
            Ok(LedgerAppend::Appended(ledger.clone()))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        calls: Mutex<Vec<(String, String, AllocationView)>>,
    }

    impl RecordingNotifier {
        fn calls(&self) -> Vec<(String, String, AllocationView)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlanNotifier for RecordingNotifier {
        async fn plan_purchased(&self, email: &str, issuer_name: &str, latest: &AllocationView) {
            self.calls.lock().unwrap().push((
                email.to_string(),
                issuer_name.to_string(),
                latest.clone(),
            ));
        }
    }

    fn plan(code: &str, title: &str, fee: f64, limit: i64, validity_days: i32) -> PlanRecord {
        PlanRecord {
            code: code.to_string(),
            title: title.to_string(),
            subheader: format!("{title} tier"),
            fee,
            credit_limit: limit,
            rate: if limit > 0 { fee / limit as f64 } else { 0.0 },
            validity_days,
            status: true,
            last_update: day(0),
        }
    }

    fn catalog() -> Vec<PlanRecord> {
        vec![
            plan("BASIC", "Basic", 10.0, 100, 30),
            plan("PRO", "Pro", 49.0, 50, 30),
            plan("Free", "Free", 0.0, 25, 30),
        ]
    }

    struct Harness {
        service: SubscriptionService,
        ledgers: Arc<MockLedgerStore>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness_with_catalog(plans: Vec<PlanRecord>) -> Harness {
        let ledgers = Arc::new(MockLedgerStore::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let service = SubscriptionService::new(
            Arc::new(MockIssuerDirectory {
                approved: vec![ISSUER.to_string()],
            }),
            Arc::new(StaticPlanStore { plans }),
            ledgers.clone(),
            notifier.clone(),
            StripeService::new(StripeConfig::default()),
            MailerService::new(MailerConfig::default()),
        );
        Harness {
            service,
            ledgers,
            notifier,
        }
    }

    fn harness() -> Harness {
        harness_with_catalog(catalog())
    }

    #[tokio::test]
    async fn first_subscription_creates_single_entry_ledger() {
        let h = harness();

        let ledger = h.service.subscribe(ISSUER, "BASIC", day(0)).await.unwrap();

        assert_eq!(ledger.email, ISSUER);
        assert_eq!(ledger.allocations.len(), 1);
        let entry = &ledger.allocations[0];
        assert_eq!(entry.plan_title, "Basic");
        assert_eq!(entry.fee, 10.0);
        assert_eq!(entry.duration_days, 30);
        assert_eq!(entry.allocated_credits, 100);
        assert_eq!(entry.current_credits, 100);

        let calls = h.notifier.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, ISSUER);
        assert_eq!(calls[0].1, "Acme Corp");
        assert_eq!(calls[0].2, *entry);
    }

    #[tokio::test]
    async fn second_subscription_appends_and_accumulates_credits() {
        let h = harness();

        h.service.subscribe(ISSUER, "BASIC", day(0)).await.unwrap();
        let ledger = h.service.subscribe(ISSUER, "PRO", day(3)).await.unwrap();

        assert_eq!(ledger.allocations.len(), 2);
        assert_eq!(ledger.allocations[0].current_credits, 100);
        assert_eq!(ledger.allocations[1].plan_title, "Pro");
        assert_eq!(ledger.allocations[1].allocated_credits, 50);
        assert_eq!(ledger.allocations[1].current_credits, 150);
    }

    #[tokio::test]
    async fn credits_stay_cumulative_over_many_allocations() {
        let h = harness();

        for (code, at) in [("BASIC", 0), ("PRO", 1), ("BASIC", 2), ("Free", 3)] {
            h.service.subscribe(ISSUER, code, day(at)).await.unwrap();
        }

        let allocations = h.ledgers.allocations(ISSUER);
        assert_eq!(allocations.len(), 4);
        assert_eq!(allocations[0].current_credits, allocations[0].allocated_credits);
        for pair in allocations.windows(2) {
            assert_eq!(
                pair[1].current_credits,
                pair[0].current_credits + pair[1].allocated_credits
            );
        }
    }

    #[tokio::test]
    async fn unknown_issuer_is_rejected_before_the_ledger() {
        let h = harness();

        let err = h
            .service
            .subscribe("nobody@x.com", "BASIC", day(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidIssuer(_)));
        assert_eq!(h.ledgers.entry_count("nobody@x.com"), 0);
        assert!(h.notifier.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_plan_code_is_not_found() {
        let h = harness();

        let err = h
            .service
            .subscribe(ISSUER, "PLATINUM", day(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PlanNotFound(_)));
        assert_eq!(h.ledgers.entry_count(ISSUER), 0);
    }

    #[tokio::test]
    async fn enterprise_fee_is_five_per_credit() {
        let h = harness();

        let req = EnterpriseSubscribeRequest {
            email: ISSUER.to_string(),
            plan_title: "Acme Custom".to_string(),
            duration_days: 90,
            allocated_credits: 20,
        };
        let ledger = h.service.subscribe_enterprise(&req, day(0)).await.unwrap();

        let entry = &ledger.allocations[0];
        assert_eq!(entry.plan_title, "Acme Custom");
        assert_eq!(entry.fee, 100.0);
        assert_eq!(entry.duration_days, 90);
        assert_eq!(entry.current_credits, 20);
        assert_eq!(h.notifier.calls().len(), 1);
    }

    #[tokio::test]
    async fn enterprise_allocation_appends_to_existing_ledger() {
        let h = harness();

        h.service.subscribe(ISSUER, "BASIC", day(0)).await.unwrap();
        let req = EnterpriseSubscribeRequest {
            email: ISSUER.to_string(),
            plan_title: "Acme Custom".to_string(),
            duration_days: 90,
            allocated_credits: 20,
        };
        let ledger = h.service.subscribe_enterprise(&req, day(1)).await.unwrap();

        assert_eq!(ledger.allocations.len(), 2);
        assert_eq!(ledger.allocations[1].current_credits, 120);
    }

    #[tokio::test]
    async fn status_in_warning_window_warns_without_mutation() {
        let h = harness();
        h.service.subscribe(ISSUER, "BASIC", day(0)).await.unwrap();
        h.notifier.calls.lock().unwrap().clear();

        // 30-day plan read on day 26: four days left
        let status = h.service.subscription_status(ISSUER, day(26)).await.unwrap();

        assert_eq!(status.state, SubscriptionState::NearExpiry);
        assert_eq!(status.remaining_days, Some(4));
        assert_eq!(status.plan.plan_title, "Basic");
        assert_eq!(h.ledgers.entry_count(ISSUER), 1);
        assert!(h.notifier.calls().is_empty());
    }

    #[tokio::test]
    async fn status_in_warning_window_is_read_idempotent() {
        let h = harness();
        h.service.subscribe(ISSUER, "BASIC", day(0)).await.unwrap();

        let first = h.service.subscription_status(ISSUER, day(26)).await.unwrap();
        let second = h.service.subscription_status(ISSUER, day(26)).await.unwrap();

        assert_eq!(first.state, second.state);
        assert_eq!(first.remaining_days, second.remaining_days);
        assert_eq!(first.plan, second.plan);
        assert_eq!(h.ledgers.entry_count(ISSUER), 1);
    }

    #[tokio::test]
    async fn warning_window_covers_exactly_five_days() {
        let h = harness();
        h.service.subscribe(ISSUER, "BASIC", day(0)).await.unwrap();

        let status = h.service.subscription_status(ISSUER, day(25)).await.unwrap();
        assert_eq!(status.state, SubscriptionState::NearExpiry);
        assert_eq!(status.remaining_days, Some(5));

        // six days out is already outside the window and re-enrolls
        let status = h.service.subscription_status(ISSUER, day(24)).await.unwrap();
        assert_eq!(status.state, SubscriptionState::LapsedAutoRenewed);
        assert_eq!(h.ledgers.entry_count(ISSUER), 2);
    }

    #[tokio::test]
    async fn status_far_from_expiry_still_auto_renews() {
        // Pins the observed fallback policy: a plan with 20 days of runway is
        // re-enrolled in Free anyway. Changing this branch must break here.
        let h = harness();
        h.service.subscribe(ISSUER, "BASIC", day(0)).await.unwrap();

        let status = h.service.subscription_status(ISSUER, day(10)).await.unwrap();

        assert_eq!(status.state, SubscriptionState::LapsedAutoRenewed);
        assert_eq!(status.remaining_days, None);
        assert_eq!(status.plan.plan_title, "Free");
        assert_eq!(status.plan.current_credits, 125);
        assert_eq!(h.ledgers.entry_count(ISSUER), 2);
    }

    #[tokio::test]
    async fn status_after_expiry_auto_renews_onto_free() {
        let h = harness();
        h.service.subscribe(ISSUER, "BASIC", day(0)).await.unwrap();
        h.notifier.calls.lock().unwrap().clear();

        let status = h.service.subscription_status(ISSUER, day(35)).await.unwrap();

        assert_eq!(status.state, SubscriptionState::LapsedAutoRenewed);
        assert_eq!(status.plan.plan_title, "Free");
        assert_eq!(status.plan.allocated_credits, 25);
        assert_eq!(status.plan.current_credits, 125);

        let calls = h.notifier.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].2.plan_title, "Free");
    }

    #[tokio::test]
    async fn status_without_ledger_is_not_found() {
        let h = harness();

        let err = h.service.subscription_status(ISSUER, day(0)).await.unwrap_err();
        assert!(matches!(err, AppError::PlanNotFound(_)));
    }

    #[tokio::test]
    async fn missing_free_plan_surfaces_as_not_found() {
        let h = harness_with_catalog(vec![plan("BASIC", "Basic", 10.0, 100, 30)]);
        h.service.subscribe(ISSUER, "BASIC", day(0)).await.unwrap();

        let err = h.service.subscription_status(ISSUER, day(10)).await.unwrap_err();

        assert!(matches!(err, AppError::PlanNotFound(_)));
        assert_eq!(h.ledgers.entry_count(ISSUER), 1);
    }

    #[tokio::test]
    async fn lost_append_race_retries_from_the_fresh_tail() {
        let h = harness();
        h.service.subscribe(ISSUER, "BASIC", day(0)).await.unwrap();

        // A concurrent enterprise allocation of 40 credits sneaks in under our
        // PRO append; the retry must stack on top of it.
        *h.ledgers.race_once.lock().unwrap() = Some(AllocationDraft {
            plan_title: "Racer".to_string(),
            purchased_at: day(1),
            fee: 200.0,
            duration_days: 30,
            allocated_credits: 40,
            current_credits: 0,
        });

        let ledger = h.service.subscribe(ISSUER, "PRO", day(1)).await.unwrap();

        assert_eq!(ledger.allocations.len(), 3);
        assert_eq!(ledger.allocations[1].plan_title, "Racer");
        assert_eq!(ledger.allocations[1].current_credits, 140);
        assert_eq!(ledger.allocations[2].plan_title, "Pro");
        assert_eq!(ledger.allocations[2].current_credits, 190);
    }

    #[tokio::test]
    async fn unrelenting_contention_is_an_internal_error() {
        let h = harness();
        h.service.subscribe(ISSUER, "BASIC", day(0)).await.unwrap();
        *h.ledgers.forced_conflicts.lock().unwrap() = MAX_APPEND_ATTEMPTS + 1;

        let err = h.service.subscribe(ISSUER, "PRO", day(1)).await.unwrap_err();
        assert!(matches!(err, AppError::InternalError(_)));
    }

    #[tokio::test]
    async fn grievance_and_checkout_require_a_valid_issuer() {
        let h = harness();

        let err = h
            .service
            .file_grievance("nobody@x.com", "pi_123")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidIssuer(_)));

        let req = CheckoutSessionRequest {
            email: "nobody@x.com".to_string(),
            name: "Basic".to_string(),
            fee: 10.0,
            limit: 100,
            rate: 0.1,
            success_url: "https://app.example.com/ok".to_string(),
            cancel_url: "https://app.example.com/cancel".to_string(),
        };
        let err = h.service.create_checkout_session(&req).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidIssuer(_)));
    }
}
