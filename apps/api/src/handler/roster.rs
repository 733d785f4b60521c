//! # カレンダー・ロスター API ハンドラ
//!
//! ## エンドポイント
//!
//! - `GET /api/v1/roster` - 月次カレンダー（`?year=&month=&department=`）
//! - `POST /api/v1/admin/roster` - ロスター登録（管理者）
//! - `DELETE /api/v1/admin/roster/{id}` - ロスター削除（管理者）

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use chrono::NaiveDate;
use leaveflow_domain::{
    roster::{RosterEntry, RosterEntryId},
    user::UserId,
};
use leaveflow_infra::SessionManager;
use leaveflow_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, get_session},
    usecase::{CreateRosterEntryInput, RosterUseCaseImpl},
};

/// ロスター API の共有状態
pub struct RosterState {
    pub usecase:         RosterUseCaseImpl,
    pub session_manager: Arc<dyn SessionManager>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub year:       i32,
    pub month:      u32,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRosterEntryRequest {
    pub user_id:    Uuid,
    pub start_date: NaiveDate,
    pub end_date:   NaiveDate,
    pub note:       Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RosterEntryData {
    pub id:         Uuid,
    pub user_id:    Uuid,
    pub user_name:  String,
    pub department: String,
    pub start_date: NaiveDate,
    pub end_date:   NaiveDate,
    pub note:       Option<String>,
    pub created_by: Uuid,
    pub created_at: String,
}

impl From<&RosterEntry> for RosterEntryData {
    fn from(entry: &RosterEntry) -> Self {
        Self {
            id:         *entry.id().as_uuid(),
            user_id:    *entry.user_id().as_uuid(),
            user_name:  entry.user_name().to_string(),
            department: entry.department().as_str().to_string(),
            start_date: entry.period().start(),
            end_date:   entry.period().end(),
            note:       entry.note().map(str::to_string),
            created_by: *entry.created_by().as_uuid(),
            created_at: entry.created_at().to_rfc3339(),
        }
    }
}

/// GET /api/v1/roster
///
/// 認証済みのユーザーであれば誰でも閲覧できる。
#[tracing::instrument(skip_all)]
pub async fn get_calendar(
    State(state): State<Arc<RosterState>>,
    jar: CookieJar,
    Query(query): Query<CalendarQuery>,
) -> Result<impl IntoResponse, ApiError> {
    get_session(state.session_manager.as_ref(), &jar).await?;

    let calendar = state
        .usecase
        .calendar(query.year, query.month, query.department)
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(calendar))))
}

/// POST /api/v1/admin/roster
#[tracing::instrument(skip_all)]
pub async fn create_roster_entry(
    State(state): State<Arc<RosterState>>,
    jar: CookieJar,
    Json(req): Json<CreateRosterEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, actor) = get_session(state.session_manager.as_ref(), &jar).await?;

    let entry = state
        .usecase
        .create_entry(
            &actor,
            CreateRosterEntryInput {
                user_id:    UserId::from_uuid(req.user_id),
                start_date: req.start_date,
                end_date:   req.end_date,
                note:       req.note,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(RosterEntryData::from(&entry))),
    ))
}

/// DELETE /api/v1/admin/roster/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn delete_roster_entry(
    State(state): State<Arc<RosterState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, actor) = get_session(state.session_manager.as_ref(), &jar).await?;

    state
        .usecase
        .delete_entry(&actor, &RosterEntryId::from_uuid(id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
