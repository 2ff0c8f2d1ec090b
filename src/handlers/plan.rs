use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::models::*;
use crate::services::CatalogService;

#[utoipa::path(
    get,
    path = "/plans",
    tag = "plans",
    responses(
        (status = 200, description = "Active plans fetched", body = [PlanResponse])
    )
)]
pub async fn list_plans(catalog: web::Data<CatalogService>) -> Result<HttpResponse> {
    match catalog.active_plans().await {
        Ok(plans) => Ok(HttpResponse::Ok().json(ApiResponse::success(plans))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/plans/{code}",
    tag = "plans",
    params(
        ("code" = String, Path, description = "Plan code")
    ),
    responses(
        (status = 200, description = "Plan details fetched", body = PlanResponse),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn get_plan(
    catalog: web::Data<CatalogService>,
    code: web::Path<String>,
) -> Result<HttpResponse> {
    match catalog.plan_by_code(&code).await {
        Ok(plan) => Ok(HttpResponse::Ok().json(ApiResponse::success(plan))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/plans",
    tag = "plans",
    request_body = PlanUpsertRequest,
    responses(
        (status = 201, description = "Plan added"),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Plan code exists")
    )
)]
pub async fn add_plan(
    catalog: web::Data<CatalogService>,
    request: web::Json<PlanUpsertRequest>,
) -> Result<HttpResponse> {
    match catalog.add_plan(&request).await {
        Ok(()) => Ok(HttpResponse::Created()
            .json(ApiResponse::message("Plan added successfully".to_string()))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/plans/{code}",
    tag = "plans",
    params(
        ("code" = String, Path, description = "Plan code")
    ),
    request_body = PlanUpdateRequest,
    responses(
        (status = 200, description = "Plan updated", body = PlanResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn update_plan(
    catalog: web::Data<CatalogService>,
    code: web::Path<String>,
    request: web::Json<PlanUpdateRequest>,
) -> Result<HttpResponse> {
    match catalog.update_plan(&code, &request).await {
        Ok(plan) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            plan,
            "Plan updated successfully".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/plans/{code}",
    tag = "plans",
    params(
        ("code" = String, Path, description = "Plan code")
    ),
    request_body = PlanDeleteRequest,
    responses(
        (status = 200, description = "Plan removed"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn delete_plan(
    catalog: web::Data<CatalogService>,
    code: web::Path<String>,
    request: web::Json<PlanDeleteRequest>,
) -> Result<HttpResponse> {
    match catalog.remove_plan(&request.email, &code).await {
        Ok(()) => Ok(HttpResponse::Ok()
            .json(ApiResponse::message("Plan removed successfully".to_string()))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn plan_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/plans")
            .route("", web::get().to(list_plans))
            .route("", web::post().to(add_plan))
            .route("/{code}", web::get().to(get_plan))
            .route("/{code}", web::put().to(update_plan))
            .route("/{code}", web::delete().to(delete_plan)),
    );
}
