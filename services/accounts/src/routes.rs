//! Account service routes

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::ApiResult,
    gate::AuthenticatedIdentity,
    middleware::{log_requests, require_auth},
    models::{
        AccountProfile, CreateCollaborationRequest, CreateDocumentRequest, Credentials,
        InviteMemberRequest, RegisterRequest, UpdateProfileRequest,
    },
    state::AppState,
};

const TOKEN_TYPE: &str = "Bearer";

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub expires_at: DateTime<Utc>,
}

/// Query for username search
#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    #[serde(default)]
    pub username: String,
}

/// Create the router for the account service
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route_layer(middleware::from_fn_with_state(state.clone(), log_requests));

    let protected_routes = Router::new()
        .route("/me", get(current_account))
        .route("/users", get(search_users))
        .route(
            "/users/:id",
            get(get_account).put(update_account).delete(delete_account),
        )
        .route("/usernames/:username", get(get_account_by_username))
        .route(
            "/collaborations",
            post(create_collaboration).get(list_collaborations),
        )
        .route("/collaborations/:id", get(get_collaboration))
        .route("/collaborations/:id/members", post(invite_member))
        .route(
            "/collaborations/:id/members/:account_id",
            delete(remove_member),
        )
        .route(
            "/collaborations/:id/documents",
            post(create_document).get(list_documents),
        )
        .route(
            "/projects/:project_id/collaborations",
            get(list_project_collaborations),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "accounts"
    }))
}

/// Register a new account
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let account = state.accounts.register(payload).await?;

    Ok((StatusCode::CREATED, Json(AccountProfile::from(account))))
}

/// Exchange credentials for a bearer token
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(credentials) = payload?;
    let outcome = state.accounts.login(credentials).await?;

    Ok(Json(LoginResponse {
        access_token: outcome.token.token,
        token_type: TOKEN_TYPE.to_string(),
        expires_in: state.accounts.token_ttl().as_secs(),
        expires_at: outcome.token.expires_at,
    }))
}

/// Profile of the authenticated account
pub async fn current_account(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
) -> ApiResult<impl IntoResponse> {
    let account = state.accounts.get(identity.account_id).await?;
    Ok(Json(AccountProfile::from(account)))
}

pub async fn search_users(
    State(state): State<AppState>,
    query: Result<Query<UserSearchQuery>, QueryRejection>,
) -> ApiResult<impl IntoResponse> {
    let Query(query) = query?;
    let accounts = state.accounts.search(&query.username).await?;

    let profiles: Vec<AccountProfile> = accounts.into_iter().map(AccountProfile::from).collect();
    Ok(Json(profiles))
}

pub async fn get_account(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let account = state.accounts.get(id).await?;
    Ok(Json(AccountProfile::from(account)))
}

pub async fn get_account_by_username(
    State(state): State<AppState>,
    username: Result<Path<String>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(username) = username?;
    let account = state.accounts.get_by_username(&username).await?;
    Ok(Json(AccountProfile::from(account)))
}

/// Update display fields of the caller's own account
pub async fn update_account(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let account = state
        .accounts
        .update_profile(identity.account_id, id, payload)
        .await?;
    Ok(Json(AccountProfile::from(account)))
}

/// Delete the caller's own account
pub async fn delete_account(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    state.accounts.delete(identity.account_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_collaboration(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    payload: Result<Json<CreateCollaborationRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(payload) = payload?;
    let collaboration = state
        .collaborations
        .create(identity.account_id, payload)
        .await?;

    Ok((StatusCode::CREATED, Json(collaboration)))
}

pub async fn list_collaborations(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
) -> ApiResult<impl IntoResponse> {
    let collaborations = state
        .collaborations
        .list_for_caller(identity.account_id)
        .await?;
    Ok(Json(collaborations))
}

pub async fn get_collaboration(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let collaboration = state.collaborations.get(identity.account_id, id).await?;
    Ok(Json(collaboration))
}

pub async fn invite_member(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<InviteMemberRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let collaboration = state
        .collaborations
        .invite(identity.account_id, id, payload.account_id)
        .await?;
    Ok(Json(collaboration))
}

pub async fn remove_member(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    ids: Result<Path<(Uuid, Uuid)>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path((id, account_id)) = ids?;
    state
        .collaborations
        .remove_member(identity.account_id, id, account_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_document(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CreateDocumentRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let Json(payload) = payload?;

    let document = state
        .collaborations
        .create_document(identity.account_id, id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn list_documents(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(id) = id?;
    let documents = state
        .collaborations
        .list_documents(identity.account_id, id)
        .await?;
    Ok(Json(documents))
}

pub async fn list_project_collaborations(
    State(state): State<AppState>,
    identity: AuthenticatedIdentity,
    project_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<impl IntoResponse> {
    let Path(project_id) = project_id?;
    let collaborations = state
        .collaborations
        .list_for_project(identity.account_id, project_id)
        .await?;
    Ok(Json(collaborations))
}
