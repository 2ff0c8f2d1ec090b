use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::plan::list_plans,
        handlers::plan::get_plan,
        handlers::plan::add_plan,
        handlers::plan::update_plan,
        handlers::plan::delete_plan,
        handlers::subscription::subscribe,
        handlers::subscription::subscribe_enterprise,
        handlers::subscription::subscription_status,
        handlers::subscription::create_checkout_session,
        handlers::subscription::payment_details,
        handlers::subscription::file_grievance,
    ),
    components(
        schemas(
            ApiError,
            PlanResponse,
            PlanUpsertRequest,
            PlanUpdateRequest,
            PlanDeleteRequest,
            SubscribeRequest,
            EnterpriseSubscribeRequest,
            SubscriptionStatusRequest,
            AllocationView,
            LedgerResponse,
            SubscriptionState,
            SubscriptionStatusResponse,
            CheckoutSessionRequest,
            CheckoutSessionResponse,
            PaymentDetailsRequest,
            PaymentDetailsResponse,
            GrievanceRequest,
        )
    ),
    tags(
        (name = "plans", description = "Subscription plan catalog"),
        (name = "subscriptions", description = "Issuer subscription ledger")
    ),
    info(
        title = "Credforge Subscription API",
        description = "Subscription plans, credit ledgers and expiry handling for credential issuers",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}
