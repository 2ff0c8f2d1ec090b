use actix_web::{HttpResponse, ResponseError, Result, web};
use chrono::Utc;
use serde_json::json;

use crate::models::*;
use crate::services::SubscriptionService;

#[utoipa::path(
    post,
    path = "/subscriptions/subscribe",
    tag = "subscriptions",
    request_body = SubscribeRequest,
    responses(
        (status = 200, description = "Plan allocated", body = LedgerResponse),
        (status = 403, description = "Invalid or inactive issuer"),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn subscribe(
    subscriptions: web::Data<SubscriptionService>,
    request: web::Json<SubscribeRequest>,
) -> Result<HttpResponse> {
    match subscriptions
        .subscribe(&request.email, &request.code, Utc::now())
        .await
    {
        Ok(ledger) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": ledger,
            "message": "Plan added successfully"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/enterprise",
    tag = "subscriptions",
    request_body = EnterpriseSubscribeRequest,
    responses(
        (status = 200, description = "Enterprise plan allocated", body = LedgerResponse),
        (status = 403, description = "Invalid or inactive issuer")
    )
)]
pub async fn subscribe_enterprise(
    subscriptions: web::Data<SubscriptionService>,
    request: web::Json<EnterpriseSubscribeRequest>,
) -> Result<HttpResponse> {
    match subscriptions
        .subscribe_enterprise(&request, Utc::now())
        .await
    {
        Ok(ledger) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": ledger,
            "message": "Plan added successfully"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/status",
    tag = "subscriptions",
    request_body = SubscriptionStatusRequest,
    responses(
        (status = 200, description = "Current subscription state", body = SubscriptionStatusResponse),
        (status = 403, description = "Invalid or inactive issuer"),
        (status = 404, description = "Issuer has no subscription, or the Free plan is missing")
    )
)]
pub async fn subscription_status(
    subscriptions: web::Data<SubscriptionService>,
    request: web::Json<SubscriptionStatusRequest>,
) -> Result<HttpResponse> {
    match subscriptions
        .subscription_status(&request.email, Utc::now())
        .await
    {
        Ok(status) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": status
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/create-checkout-session",
    tag = "subscriptions",
    request_body = CheckoutSessionRequest,
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutSessionResponse),
        (status = 403, description = "Invalid or inactive issuer"),
        (status = 502, description = "Payment gateway error")
    )
)]
pub async fn create_checkout_session(
    subscriptions: web::Data<SubscriptionService>,
    request: web::Json<CheckoutSessionRequest>,
) -> Result<HttpResponse> {
    match subscriptions.create_checkout_session(&request).await {
        Ok(session) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": session,
            "message": "Checkout session created"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/payment-details",
    tag = "subscriptions",
    request_body = PaymentDetailsRequest,
    responses(
        (status = 200, description = "Checkout session retrieved", body = PaymentDetailsResponse),
        (status = 403, description = "Invalid or inactive issuer"),
        (status = 502, description = "Payment gateway error")
    )
)]
pub async fn payment_details(
    subscriptions: web::Data<SubscriptionService>,
    request: web::Json<PaymentDetailsRequest>,
) -> Result<HttpResponse> {
    match subscriptions
        .payment_details(&request.email, &request.session_id)
        .await
    {
        Ok(details) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": details
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/grievance",
    tag = "subscriptions",
    request_body = GrievanceRequest,
    responses(
        (status = 200, description = "Grievance relayed to support"),
        (status = 403, description = "Invalid or inactive issuer"),
        (status = 502, description = "Mail API error")
    )
)]
pub async fn file_grievance(
    subscriptions: web::Data<SubscriptionService>,
    request: web::Json<GrievanceRequest>,
) -> Result<HttpResponse> {
    match subscriptions
        .file_grievance(&request.email, &request.payment_id)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "email": request.email, "payment_id": request.payment_id },
            "message": "Grievance request placed successfully"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn subscription_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subscriptions")
            .route("/subscribe", web::post().to(subscribe))
            .route("/enterprise", web::post().to(subscribe_enterprise))
            .route("/status", web::post().to(subscription_status))
            .route(
                "/create-checkout-session",
                web::post().to(create_checkout_session),
            )
            .route("/payment-details", web::post().to(payment_details))
            .route("/grievance", web::post().to(file_grievance)),
    );
}
