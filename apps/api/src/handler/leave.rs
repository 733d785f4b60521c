//! # 休暇申請 API ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/v1/leaves` - 休暇を申請
//! - `GET /api/v1/leaves` - 自分の申請一覧（`?status=`）
//! - `GET /api/v1/leaves/balance` - 年次休暇の残日数（`?year=`）
//! - `GET /api/v1/leaves/{id}` - 申請の詳細
//! - `POST /api/v1/leaves/{id}/cancel` - 取り消し
//! - `POST /api/v1/leaves/{id}/recommend` - 推薦
//! - `POST /api/v1/leaves/{id}/reject` - 却下
//! - `GET /api/v1/approvals` - 自分が判断すべき承認待ち一覧
//! - `GET /api/v1/admin/leaves` - 全申請一覧（管理者）
//!
//! 状態を変える操作は、クライアントが表示しているバージョンを `version` で受け取る。

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
    leave::{
        ApprovalStage,
        Decision,
        LeaveRequest,
        LeaveRequestId,
        LeaveRequestStatus,
        LeaveType,
        Recommendation,
    },
    value_objects::{DepartmentName, Version},
};
use leaveflow_infra::{SessionManager, repository::LeaveRequestFilter};
use leaveflow_shared::ApiResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{ApiError, get_session},
    usecase::{LeaveUseCaseImpl, SubmitLeaveInput},
};

/// 休暇申請 API の共有状態
pub struct LeaveState {
    pub usecase:         LeaveUseCaseImpl,
    pub session_manager: Arc<dyn SessionManager>,
}

// --- リクエスト型 ---

#[derive(Debug, Deserialize)]
pub struct SubmitLeaveRequest {
    pub leave_type:     String,
    pub start_date:     NaiveDate,
    pub end_date:       NaiveDate,
    pub reason:         String,
    pub relief_officer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListLeavesQuery {
    pub status:     Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub version: u32,
}

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub version: u32,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub version: u32,
    pub comment: String,
}

// --- レスポンス型 ---

#[derive(Debug, Serialize)]
pub struct RecommendationData {
    pub stage:         ApprovalStage,
    pub approver_id:   Uuid,
    pub approver_name: String,
    pub decision:      Decision,
    pub comment:       Option<String>,
    pub decided_at:    String,
}

impl From<&Recommendation> for RecommendationData {
    fn from(r: &Recommendation) -> Self {
        Self {
            stage:         r.stage,
            approver_id:   *r.approver_id.as_uuid(),
            approver_name: r.approver_name.clone(),
            decision:      r.decision,
            comment:       r.comment.clone(),
            decided_at:    r.decided_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LeaveRequestData {
    pub id:              Uuid,
    pub employee_id:     Uuid,
    pub employee_name:   String,
    pub department:      String,
    pub leave_type:      LeaveType,
    pub start_date:      NaiveDate,
    pub end_date:        NaiveDate,
    pub working_days:    u32,
    pub reason:          String,
    pub relief_officer:  Option<String>,
    pub status:          LeaveRequestStatus,
    pub current_stage:   Option<ApprovalStage>,
    pub recommendations: Vec<RecommendationData>,
    pub version:         u32,
    pub created_at:      String,
    pub updated_at:      String,
}

impl From<&LeaveRequest> for LeaveRequestData {
    fn from(r: &LeaveRequest) -> Self {
        Self {
            id:              *r.id().as_uuid(),
            employee_id:     *r.employee_id().as_uuid(),
            employee_name:   r.employee_name().to_string(),
            department:      r.department().as_str().to_string(),
            leave_type:      r.leave_type(),
            start_date:      r.period().start(),
            end_date:        r.period().end(),
            working_days:    r.period().working_days(),
            reason:          r.reason().as_str().to_string(),
            relief_officer:  r.relief_officer().map(|o| o.as_str().to_string()),
            status:          r.status(),
            current_stage:   r.current_stage(),
            recommendations: r
                .recommendations()
                .iter()
                .map(RecommendationData::from)
                .collect(),
            version:         r.version().as_u32(),
            created_at:      r.created_at().to_rfc3339(),
            updated_at:      r.updated_at().to_rfc3339(),
        }
    }
}

fn to_data(requests: &[LeaveRequest]) -> Vec<LeaveRequestData> {
    requests.iter().map(LeaveRequestData::from).collect()
}

fn parse_status(status: Option<&str>) -> Result<Option<LeaveRequestStatus>, ApiError> {
    Ok(status.map(str::parse).transpose()?)
}

// --- ハンドラ ---

/// POST /api/v1/leaves
#[tracing::instrument(skip_all)]
pub async fn submit_leave(
    State(state): State<Arc<LeaveState>>,
    jar: CookieJar,
    Json(req): Json<SubmitLeaveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, session) = get_session(state.session_manager.as_ref(), &jar).await?;

    let request = state
        .usecase
        .submit(
            session.user_id(),
            SubmitLeaveInput {
                leave_type:     req.leave_type.parse()?,
                start_date:     req.start_date,
                end_date:       req.end_date,
                reason:         req.reason,
                relief_officer: req.relief_officer,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(LeaveRequestData::from(&request))),
    ))
}

/// GET /api/v1/leaves
#[tracing::instrument(skip_all)]
pub async fn list_my_leaves(
    State(state): State<Arc<LeaveState>>,
    jar: CookieJar,
    Query(query): Query<ListLeavesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, session) = get_session(state.session_manager.as_ref(), &jar).await?;
    let status = parse_status(query.status.as_deref())?;

    let requests = state.usecase.list_mine(session.user_id(), status).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(to_data(&requests)))))
}

/// GET /api/v1/leaves/balance
#[tracing::instrument(skip_all)]
pub async fn get_balance(
    State(state): State<Arc<LeaveState>>,
    jar: CookieJar,
    Query(query): Query<BalanceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, session) = get_session(state.session_manager.as_ref(), &jar).await?;

    let balance = state.usecase.balance(session.user_id(), query.year).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(balance))))
}

/// GET /api/v1/leaves/{id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_leave(
    State(state): State<Arc<LeaveState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, session) = get_session(state.session_manager.as_ref(), &jar).await?;

    let request = state
        .usecase
        .get(session.user_id(), &LeaveRequestId::from_uuid(id))
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(LeaveRequestData::from(&request))),
    ))
}

/// POST /api/v1/leaves/{id}/cancel
#[tracing::instrument(skip_all, fields(%id))]
pub async fn cancel_leave(
    State(state): State<Arc<LeaveState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, session) = get_session(state.session_manager.as_ref(), &jar).await?;

    let request = state
        .usecase
        .cancel(
            session.user_id(),
            &LeaveRequestId::from_uuid(id),
            Version::new(req.version)?,
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(LeaveRequestData::from(&request))),
    ))
}

/// POST /api/v1/leaves/{id}/recommend
#[tracing::instrument(skip_all, fields(%id))]
pub async fn recommend_leave(
    State(state): State<Arc<LeaveState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<RecommendRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, session) = get_session(state.session_manager.as_ref(), &jar).await?;

    let request = state
        .usecase
        .recommend(
            session.user_id(),
            &LeaveRequestId::from_uuid(id),
            Version::new(req.version)?,
            req.comment,
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(LeaveRequestData::from(&request))),
    ))
}

/// POST /api/v1/leaves/{id}/reject
#[tracing::instrument(skip_all, fields(%id))]
pub async fn reject_leave(
    State(state): State<Arc<LeaveState>>,
    jar: CookieJar,
    Path(id): Path<Uuid>,
    Json(req): Json<RejectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, session) = get_session(state.session_manager.as_ref(), &jar).await?;

    let request = state
        .usecase
        .reject(
            session.user_id(),
            &LeaveRequestId::from_uuid(id),
            Version::new(req.version)?,
            req.comment,
        )
        .await?;

    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(LeaveRequestData::from(&request))),
    ))
}

/// GET /api/v1/approvals
#[tracing::instrument(skip_all)]
pub async fn list_pending_approvals(
    State(state): State<Arc<LeaveState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let (_, session) = get_session(state.session_manager.as_ref(), &jar).await?;

    let requests = state
        .usecase
        .list_pending_approvals(session.user_id())
        .await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(to_data(&requests)))))
}

/// GET /api/v1/admin/leaves
#[tracing::instrument(skip_all)]
pub async fn list_all_leaves(
    State(state): State<Arc<LeaveState>>,
    Query(query): Query<ListLeavesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = LeaveRequestFilter {
        status:     parse_status(query.status.as_deref())?,
        department: query
            .department
            .filter(|d| !d.trim().is_empty())
            .map(DepartmentName::new)
            .transpose()?,
    };

    let requests = state.usecase.list_all(&filter).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(to_data(&requests)))))
}
