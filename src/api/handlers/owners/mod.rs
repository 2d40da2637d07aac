//! Owner account endpoints.
//!
//! Flow Overview:
//! 1) Registration is open; every other route needs an access token.
//! 2) Authorization is decided here from the principal: the owner may act on
//!    its own account, back-office on any account.
//! 3) The owner service enforces data rules and returns views without the
//!    password hash.

pub(crate) mod types;

use axum::{
    Json,
    extract::{Extension, Path, rejection::JsonRejection, rejection::PathRejection},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use self::types::{OwnerView, RegisterRequest, UpdateOwnerRequest};
use crate::{
    api::response::{ApiMessage, ApiResponse, json_body, owner_id},
    auth::Principal,
    error::ServiceError,
    owners::{OwnerService, validation::normalize_nic},
};

fn views(accounts: Vec<crate::store::OwnerAccount>) -> Vec<OwnerView> {
    accounts.into_iter().map(OwnerView::from).collect()
}

#[utoipa::path(
    post,
    path = "/api/owners",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = ApiResponse<OwnerView>),
        (status = 400, description = "Validation failed or NIC/email already exists", body = ApiMessage),
    ),
    tag = "owners"
)]
pub async fn register(
    owners: Extension<Arc<OwnerService>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let request = json_body(payload)?;
    let account = owners.register(request.into()).await?;
    Ok(Json(ApiResponse::ok(
        "EV Owner created successfully",
        OwnerView::from(account),
    ))
    .into_response())
}

#[utoipa::path(
    get,
    path = "/api/owners",
    responses(
        (status = 200, description = "All accounts", body = ApiResponse<Vec<OwnerView>>),
        (status = 401, description = "Authentication required", body = ApiMessage),
        (status = 403, description = "Back-office only", body = ApiMessage),
    ),
    tag = "owners"
)]
pub async fn list_owners(
    principal: Principal,
    owners: Extension<Arc<OwnerService>>,
) -> Result<Response, ServiceError> {
    principal.require_back_office()?;
    let accounts = owners.list_all().await?;
    Ok(Json(ApiResponse::ok(
        "EV Owners retrieved successfully",
        views(accounts),
    ))
    .into_response())
}

#[utoipa::path(
    get,
    path = "/api/owners/deactivated",
    responses(
        (status = 200, description = "Inactive accounts", body = ApiResponse<Vec<OwnerView>>),
        (status = 401, description = "Authentication required", body = ApiMessage),
        (status = 403, description = "Back-office only", body = ApiMessage),
    ),
    tag = "owners"
)]
pub async fn list_deactivated(
    principal: Principal,
    owners: Extension<Arc<OwnerService>>,
) -> Result<Response, ServiceError> {
    principal.require_back_office()?;
    let accounts = owners.list_deactivated().await?;
    Ok(Json(ApiResponse::ok(
        "Deactivated EV Owners retrieved successfully",
        views(accounts),
    ))
    .into_response())
}

#[utoipa::path(
    get,
    path = "/api/owners/nic/{nic}",
    params(("nic" = String, Path, description = "National identity card number")),
    responses(
        (status = 200, description = "Account", body = ApiResponse<OwnerView>),
        (status = 401, description = "Authentication required", body = ApiMessage),
        (status = 403, description = "Not the caller's account", body = ApiMessage),
        (status = 404, description = "No such account", body = ApiMessage),
    ),
    tag = "owners"
)]
pub async fn get_by_nic(
    principal: Principal,
    Path(nic): Path<String>,
    owners: Extension<Arc<OwnerService>>,
) -> Result<Response, ServiceError> {
    let nic = normalize_nic(&nic);
    principal.require_nic_or_back_office(&nic)?;
    let account = owners.get_by_nic(&nic).await?;
    Ok(Json(ApiResponse::ok(
        "EV Owner retrieved successfully",
        OwnerView::from(account),
    ))
    .into_response())
}

#[utoipa::path(
    get,
    path = "/api/owners/{id}",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account", body = ApiResponse<OwnerView>),
        (status = 400, description = "Malformed id", body = ApiMessage),
        (status = 401, description = "Authentication required", body = ApiMessage),
        (status = 403, description = "Not the caller's account", body = ApiMessage),
        (status = 404, description = "No such account", body = ApiMessage),
    ),
    tag = "owners"
)]
pub async fn get_owner(
    principal: Principal,
    path: Result<Path<String>, PathRejection>,
    owners: Extension<Arc<OwnerService>>,
) -> Result<Response, ServiceError> {
    let id = owner_id(path)?;
    principal.require_self_or_back_office(id)?;
    let account = owners.get_by_id(id).await?;
    Ok(Json(ApiResponse::ok(
        "EV Owner retrieved successfully",
        OwnerView::from(account),
    ))
    .into_response())
}

#[utoipa::path(
    put,
    path = "/api/owners/{id}",
    params(("id" = String, Path, description = "Account id")),
    request_body = UpdateOwnerRequest,
    responses(
        (status = 200, description = "Updated account", body = ApiResponse<OwnerView>),
        (status = 400, description = "Validation failed or email already exists", body = ApiMessage),
        (status = 401, description = "Authentication required", body = ApiMessage),
        (status = 403, description = "Not the caller's account", body = ApiMessage),
        (status = 404, description = "No such account", body = ApiMessage),
    ),
    tag = "owners"
)]
pub async fn update_owner(
    principal: Principal,
    path: Result<Path<String>, PathRejection>,
    owners: Extension<Arc<OwnerService>>,
    payload: Result<Json<UpdateOwnerRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let id = owner_id(path)?;
    principal.require_self_or_back_office(id)?;
    let update = json_body(payload)?;
    let account = owners.update_profile(id, update.into()).await?;
    Ok(Json(ApiResponse::ok(
        "EV Owner updated successfully",
        OwnerView::from(account),
    ))
    .into_response())
}

#[utoipa::path(
    patch,
    path = "/api/owners/{id}/deactivate",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account deactivated", body = ApiMessage),
        (status = 401, description = "Authentication required", body = ApiMessage),
        (status = 403, description = "Not the caller's account", body = ApiMessage),
        (status = 404, description = "No such account", body = ApiMessage),
    ),
    tag = "owners"
)]
pub async fn deactivate_owner(
    principal: Principal,
    path: Result<Path<String>, PathRejection>,
    owners: Extension<Arc<OwnerService>>,
) -> Result<Response, ServiceError> {
    let id = owner_id(path)?;
    principal.require_self_or_back_office(id)?;
    owners.set_active(id, false).await?;
    Ok(Json(ApiMessage::ok("EV Owner deactivated successfully")).into_response())
}

#[utoipa::path(
    patch,
    path = "/api/owners/{id}/reactivate",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account reactivated", body = ApiMessage),
        (status = 400, description = "Account is already active", body = ApiMessage),
        (status = 401, description = "Authentication required", body = ApiMessage),
        (status = 403, description = "Back-office only", body = ApiMessage),
        (status = 404, description = "No such account", body = ApiMessage),
    ),
    tag = "owners"
)]
pub async fn reactivate_owner(
    principal: Principal,
    path: Result<Path<String>, PathRejection>,
    owners: Extension<Arc<OwnerService>>,
) -> Result<Response, ServiceError> {
    principal.require_back_office()?;
    let id = owner_id(path)?;
    owners.reactivate(id).await?;
    Ok(Json(ApiMessage::ok("EV Owner reactivated successfully")).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/owners/{id}",
    params(("id" = String, Path, description = "Account id")),
    responses(
        (status = 200, description = "Account deleted", body = ApiMessage),
        (status = 401, description = "Authentication required", body = ApiMessage),
        (status = 403, description = "Not the caller's account", body = ApiMessage),
        (status = 404, description = "No such account", body = ApiMessage),
    ),
    tag = "owners"
)]
pub async fn delete_owner(
    principal: Principal,
    path: Result<Path<String>, PathRejection>,
    owners: Extension<Arc<OwnerService>>,
) -> Result<Response, ServiceError> {
    let id = owner_id(path)?;
    principal.require_self_or_back_office(id)?;
    owners.delete(id).await?;
    Ok(Json(ApiMessage::ok("EV Owner deleted successfully")).into_response())
}
