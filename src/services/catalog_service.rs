use crate::error::{AppError, AppResult};
use crate::models::{PlanResponse, PlanUpdateRequest, PlanUpsertRequest};
use crate::repositories::{AdminDirectory, PlanDraft, PlanInsert, PlanStore};
use std::sync::Arc;

/// Admin-gated CRUD over the plan catalog. Reads are open; every mutation
/// requires the caller's email to resolve to an existing admin.
#[derive(Clone)]
pub struct CatalogService {
    admins: Arc<dyn AdminDirectory>,
    plans: Arc<dyn PlanStore>,
}

impl CatalogService {
    pub fn new(admins: Arc<dyn AdminDirectory>, plans: Arc<dyn PlanStore>) -> Self {
        Self { admins, plans }
    }

    pub async fn plan_by_code(&self, code: &str) -> AppResult<PlanResponse> {
        let plan = self
            .plans
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::PlanNotFound(format!("plan {code} is not available")))?;
        Ok(plan.into())
    }

    pub async fn active_plans(&self) -> AppResult<Vec<PlanResponse>> {
        let plans = self.plans.list_active().await?;
        Ok(plans.into_iter().map(PlanResponse::from).collect())
    }

    pub async fn add_plan(&self, req: &PlanUpsertRequest) -> AppResult<()> {
        self.require_admin(&req.email).await?;

        let draft = PlanDraft {
            title: req.title.clone(),
            subheader: req.subheader.clone(),
            fee: req.fee,
            credit_limit: req.limit,
            rate: req.rate,
            validity_days: req.validity_days,
        };

        match self.plans.insert_if_absent(&req.code, draft).await? {
            PlanInsert::Inserted => {
                log::info!("Plan {} added to catalog", req.code);
                Ok(())
            }
            PlanInsert::CodeExists => Err(AppError::PlanCodeExists(req.code.clone())),
        }
    }

    pub async fn update_plan(&self, code: &str, req: &PlanUpdateRequest) -> AppResult<PlanResponse> {
        self.require_admin(&req.email).await?;

        let draft = PlanDraft {
            title: req.title.clone(),
            subheader: req.subheader.clone(),
            fee: req.fee,
            credit_limit: req.limit,
            rate: req.rate,
            validity_days: req.validity_days,
        };

        let updated = self
            .plans
            .update(code, draft)
            .await?
            .ok_or_else(|| AppError::PlanNotFound(format!("plan {code} is not available")))?;
        Ok(updated.into())
    }

    pub async fn remove_plan(&self, admin_email: &str, code: &str) -> AppResult<()> {
        self.require_admin(admin_email).await?;

        if self.plans.delete(code).await? {
            log::info!("Plan {code} removed from catalog");
            Ok(())
        } else {
            Err(AppError::PlanNotFound(format!("plan {code} is not available")))
        }
    }

    async fn require_admin(&self, email: &str) -> AppResult<()> {
        match self.admins.find_by_email(email).await? {
            Some(_) => Ok(()),
            None => Err(AppError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{AdminRecord, PlanRecord};
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::sync::Mutex;

    struct MockAdminDirectory {
        admins: Vec<String>,
    }

    #[async_trait]
    impl AdminDirectory for MockAdminDirectory {
        async fn find_by_email(&self, email: &str) -> AppResult<Option<AdminRecord>> {
            Ok(self.admins.iter().find(|a| *a == email).map(|e| AdminRecord {
                email: e.clone(),
                name: "Ops".to_string(),
            }))
        }
    }

    struct MockPlanStore {
        plans: Mutex<Vec<PlanRecord>>,
    }

    impl MockPlanStore {
        fn with_plans(plans: Vec<PlanRecord>) -> Self {
            Self {
                plans: Mutex::new(plans),
            }
        }

        fn snapshot(&self) -> Vec<PlanRecord> {
            self.plans.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlanStore for MockPlanStore {
        async fn find_by_code(&self, code: &str) -> AppResult<Option<PlanRecord>> {
            Ok(self
                .plans
                .lock()
                .unwrap()
                .iter()
                .find(|p| p.code == code)
                .cloned())
        }

        async fn list_active(&self) -> AppResult<Vec<PlanRecord>> {
            Ok(self
                .plans
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.status)
                .cloned()
                .collect())
        }

        async fn insert_if_absent(&self, code: &str, draft: PlanDraft) -> AppResult<PlanInsert> {
            let mut plans = self.plans.lock().unwrap();
            if plans.iter().any(|p| p.code == code) {
                return Ok(PlanInsert::CodeExists);
            }
            plans.push(PlanRecord {
                code: code.to_string(),
                title: draft.title,
                subheader: draft.subheader,
                fee: draft.fee,
                credit_limit: draft.credit_limit,
                rate: draft.rate,
                validity_days: draft.validity_days,
                status: true,
                last_update: Utc::now(),
            });
            Ok(PlanInsert::Inserted)
        }

        async fn update(&self, code: &str, draft: PlanDraft) -> AppResult<Option<PlanRecord>> {
            let mut plans = self.plans.lock().unwrap();
            let Some(plan) = plans.iter_mut().find(|p| p.code == code) else {
                return Ok(None);
            };
            plan.title = draft.title;
            plan.subheader = draft.subheader;
            plan.fee = draft.fee;
            plan.credit_limit = draft.credit_limit;
            plan.rate = draft.rate;
            plan.validity_days = draft.validity_days;
            plan.last_update = Utc::now();
            Ok(Some(plan.clone()))
        }

        async fn delete(&self, code: &str) -> AppResult<bool> {
            let mut plans = self.plans.lock().unwrap();
            let before = plans.len();
            plans.retain(|p| p.code != code);
            Ok(plans.len() < before)
        }
    }

    fn basic_plan() -> PlanRecord {
        PlanRecord {
            code: "BASIC".to_string(),
            title: "Basic".to_string(),
            subheader: "Starter tier".to_string(),
            fee: 10.0,
            credit_limit: 100,
            rate: 0.1,
            validity_days: 30,
            status: true,
            last_update: Utc::now() - Duration::days(2),
        }
    }

    fn upsert_request(admin: &str, code: &str) -> PlanUpsertRequest {
        PlanUpsertRequest {
            email: admin.to_string(),
            code: code.to_string(),
            title: "Pro".to_string(),
            subheader: "Growth tier".to_string(),
            fee: 49.0,
            limit: 500,
            rate: 0.098,
            validity_days: 30,
        }
    }

    fn service(store: Arc<MockPlanStore>) -> CatalogService {
        let admins = Arc::new(MockAdminDirectory {
            admins: vec!["ops@credforge.io".to_string()],
        });
        CatalogService::new(admins, store)
    }

    #[tokio::test]
    async fn add_plan_requires_admin() {
        let store = Arc::new(MockPlanStore::with_plans(vec![]));
        let svc = service(store.clone());

        let err = svc
            .add_plan(&upsert_request("intruder@mail.com", "PRO"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn add_plan_inserts_new_code() {
        let store = Arc::new(MockPlanStore::with_plans(vec![]));
        let svc = service(store.clone());

        svc.add_plan(&upsert_request("ops@credforge.io", "PRO"))
            .await
            .unwrap();

        let plans = store.snapshot();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].code, "PRO");
        assert_eq!(plans[0].credit_limit, 500);
    }

    #[tokio::test]
    async fn add_plan_existing_code_reports_conflict_and_keeps_values() {
        let store = Arc::new(MockPlanStore::with_plans(vec![basic_plan()]));
        let svc = service(store.clone());

        let err = svc
            .add_plan(&upsert_request("ops@credforge.io", "BASIC"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PlanCodeExists(code) if code == "BASIC"));

        // insert-only guard: the stored entry is untouched
        let plans = store.snapshot();
        assert_eq!(plans[0].title, "Basic");
        assert_eq!(plans[0].fee, 10.0);
        assert_eq!(plans[0].credit_limit, 100);
    }

    #[tokio::test]
    async fn update_plan_replaces_fields_and_refreshes_last_update() {
        let stale = basic_plan().last_update;
        let store = Arc::new(MockPlanStore::with_plans(vec![basic_plan()]));
        let svc = service(store.clone());

        let req = PlanUpdateRequest {
            email: "ops@credforge.io".to_string(),
            title: "Basic v2".to_string(),
            subheader: "Starter tier".to_string(),
            fee: 12.0,
            limit: 120,
            rate: 0.1,
            validity_days: 45,
        };
        let updated = svc.update_plan("BASIC", &req).await.unwrap();

        assert_eq!(updated.title, "Basic v2");
        assert_eq!(updated.fee, 12.0);
        assert_eq!(updated.limit, 120);
        assert_eq!(updated.validity_days, 45);
        assert!(updated.last_update > stale);
    }

    #[tokio::test]
    async fn update_unknown_code_is_not_found() {
        let store = Arc::new(MockPlanStore::with_plans(vec![]));
        let svc = service(store);

        let req = PlanUpdateRequest {
            email: "ops@credforge.io".to_string(),
            title: "Ghost".to_string(),
            subheader: String::new(),
            fee: 1.0,
            limit: 1,
            rate: 1.0,
            validity_days: 30,
        };
        let err = svc.update_plan("GHOST", &req).await.unwrap_err();
        assert!(matches!(err, AppError::PlanNotFound(_)));
    }

    #[tokio::test]
    async fn remove_plan_checks_admin_and_existence() {
        let store = Arc::new(MockPlanStore::with_plans(vec![basic_plan()]));
        let svc = service(store.clone());

        let err = svc.remove_plan("intruder@mail.com", "BASIC").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
        assert_eq!(store.snapshot().len(), 1);

        svc.remove_plan("ops@credforge.io", "BASIC").await.unwrap();
        assert!(store.snapshot().is_empty());

        let err = svc.remove_plan("ops@credforge.io", "BASIC").await.unwrap_err();
        assert!(matches!(err, AppError::PlanNotFound(_)));
    }

    #[tokio::test]
    async fn plan_reads_need_no_admin() {
        let store = Arc::new(MockPlanStore::with_plans(vec![basic_plan()]));
        let svc = service(store);

        let plan = svc.plan_by_code("BASIC").await.unwrap();
        assert_eq!(plan.code, "BASIC");

        let all = svc.active_plans().await.unwrap();
        assert_eq!(all.len(), 1);
    }
}
