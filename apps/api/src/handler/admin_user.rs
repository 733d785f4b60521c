//! # ユーザー管理 API ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/v1/admin/users` - ユーザー一覧（`?status=active|inactive`）
//! - `POST /api/v1/admin/users` - ユーザー作成
//! - `PATCH /api/v1/admin/users/{id}` - プロフィール更新
//! - `PATCH /api/v1/admin/users/{id}/status` - 有効化・無効化
//!
//! 管理者ロールの検証は `require_role` ミドルウェアが行う。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use leaveflow_domain::user::{User, UserId, UserRole, UserStatus};
use leaveflow_infra::SessionManager;
use leaveflow_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, get_session},
    usecase::{CreateUserInput, UpdateUserInput, UserUseCaseImpl},
};

/// ユーザー管理 API の共有状態
pub struct UserState {
    pub usecase:         UserUseCaseImpl,
    pub session_manager: Arc<dyn SessionManager>,
}

// --- リクエスト/レスポンス型 ---

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email:              String,
    pub name:               String,
    pub department:         String,
    pub role:               String,
    pub annual_entitlement: Option<u16>,
    pub initial_password:   String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name:               Option<String>,
    pub department:         Option<String>,
    pub role:               Option<String>,
    pub annual_entitlement: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserStatusRequest {
    pub status: String,
}

/// ユーザーのレスポンス
#[derive(Debug, Serialize)]
pub struct UserData {
    pub id:                 Uuid,
    pub email:              String,
    pub name:               String,
    pub department:         String,
    pub role:               UserRole,
    pub status:             UserStatus,
    pub annual_entitlement: u16,
    pub created_at:         String,
    pub updated_at:         String,
}

impl From<&User> for UserData {
    fn from(user: &User) -> Self {
        Self {
            id:                 *user.id().as_uuid(),
            email:              user.email().as_str().to_string(),
            name:               user.name().as_str().to_string(),
            department:         user.department().as_str().to_string(),
            role:               user.role(),
            status:             user.status(),
            annual_entitlement: user.annual_entitlement().days(),
            created_at:         user.created_at().to_rfc3339(),
            updated_at:         user.updated_at().to_rfc3339(),
        }
    }
}

// --- ハンドラ ---

/// GET /api/v1/admin/users
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<Arc<UserState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<UserStatus>)
        .transpose()?;

    let users = state.usecase.list_users(status).await?;
    let data: Vec<UserData> = users.iter().map(UserData::from).collect();

    Ok((StatusCode::OK, Json(ApiResponse::new(data))))
}

/// POST /api/v1/admin/users
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<Arc<UserState>>,
    jar: CookieJar,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, actor) = get_session(state.session_manager.as_ref(), &jar).await?;

    let user = state
        .usecase
        .create_user(
            &actor,
            CreateUserInput {
                email:              req.email,
                name:               req.name,
                department:         req.department,
                role:               req.role.parse()?,
                annual_entitlement: req.annual_entitlement,
                initial_password:   req.initial_password,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(UserData::from(&user))),
    ))
}

/// PATCH /api/v1/admin/users/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_user(
    State(state): State<Arc<UserState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, actor) = get_session(state.session_manager.as_ref(), &jar).await?;

    let user = state
        .usecase
        .update_user(
            &actor,
            &UserId::from_uuid(id),
            UpdateUserInput {
                name:               req.name,
                department:         req.department,
                role:               req.role.as_deref().map(str::parse).transpose()?,
                annual_entitlement: req.annual_entitlement,
            },
        )
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(UserData::from(&user)))))
}

/// PATCH /api/v1/admin/users/{id}/status
#[tracing::instrument(skip_all, fields(%id))]
pub async fn update_user_status(
    State(state): State<Arc<UserState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateUserStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, actor) = get_session(state.session_manager.as_ref(), &jar).await?;
    let status: UserStatus = req.status.parse()?;

    let user = state
        .usecase
        .update_user_status(&actor, &UserId::from_uuid(id), status)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(UserData::from(&user)))))
}
