//! # LeaveRequestRepository
//!
//! 休暇申請の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **推薦記録**: `recommendations` カラムに JSONB 配列で保存する
//! - **楽観的ロック**: 更新は `WHERE version = $expected` で行い、不一致は `Conflict`
//! - **不変条件の検証**: 読み込み時に `LeaveRequest::from_db` で状態を検証し、
//!   不整合な行は `Unexpected` として扱う

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use leaveflow_domain::{
    leave::{
        ApprovalStage,
        LeavePeriod,
        LeaveRequest,
        LeaveRequestId,
        LeaveRequestRecord,
        LeaveRequestStatus,
        LeaveType,
        Recommendation,
    },
    user::UserId,
    value_objects::{DepartmentName, LeaveReason, ReliefOfficer, Version},
};
use sqlx::{PgPool, types::Json};
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// 休暇申請の検索条件（管理者向け一覧）
#[derive(Debug, Default, Clone)]
pub struct LeaveRequestFilter {
    pub status:     Option<LeaveRequestStatus>,
    pub department: Option<DepartmentName>,
}

/// 休暇申請リポジトリトレイト
#[async_trait]
pub trait LeaveRequestRepository: Send + Sync {
    /// 新規申請を保存する
    async fn insert(&self, tx: &mut TxContext, request: &LeaveRequest) -> Result<(), InfraError>;

    /// 楽観的ロック付きで申請を更新する
    ///
    /// `expected_version` と DB 上のバージョンが一致する場合のみ更新する。
    /// 不一致の場合は `Conflict` を返す。
    async fn update_with_version_check(
        &self,
        tx: &mut TxContext,
        request: &LeaveRequest,
        expected_version: Version,
    ) -> Result<(), InfraError>;

    /// ID で申請を検索する
    async fn find_by_id(&self, id: &LeaveRequestId) -> Result<Option<LeaveRequest>, InfraError>;

    /// 申請者の申請一覧を新しい順で取得する
    async fn find_by_employee(
        &self,
        employee_id: &UserId,
        status: Option<LeaveRequestStatus>,
    ) -> Result<Vec<LeaveRequest>, InfraError>;

    /// 申請者の全申請をトランザクション内で取得する（提出時の重複・残日数確認用）
    ///
    /// [`UserRepository::lock_for_update`](super::UserRepository::lock_for_update)
    /// の後に呼ぶと、先行する提出のコミット結果まで含めて読める。
    async fn find_by_employee_in_tx(
        &self,
        tx: &mut TxContext,
        employee_id: &UserId,
    ) -> Result<Vec<LeaveRequest>, InfraError>;

    /// 指定段階で判断待ちの申請を古い順で取得する
    ///
    /// `department` を指定した場合はその部署の申請に限定する。
    async fn find_pending_by_stage(
        &self,
        stage: ApprovalStage,
        department: Option<&DepartmentName>,
    ) -> Result<Vec<LeaveRequest>, InfraError>;

    /// 全申請を新しい順で取得する（管理者向け）
    async fn find_all(&self, filter: &LeaveRequestFilter) -> Result<Vec<LeaveRequest>, InfraError>;

    /// 期間と重なる承認済みの申請を取得する（カレンダー用）
    async fn find_approved_overlapping(
        &self,
        period: &LeavePeriod,
    ) -> Result<Vec<LeaveRequest>, InfraError>;
}

/// DB の leave_requests テーブルの行を表す中間構造体
#[derive(sqlx::FromRow)]
struct LeaveRequestRow {
    id: Uuid,
    employee_id: Uuid,
    employee_name: String,
    department: String,
    leave_type: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    reason: String,
    relief_officer: Option<String>,
    status: String,
    current_stage: Option<String>,
    recommendations: Json<Vec<Recommendation>>,
    version: i32,
    decided_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = InfraError;

    fn try_from(row: LeaveRequestRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let request = LeaveRequest::from_db(LeaveRequestRecord {
            id: LeaveRequestId::from_uuid(id),
            employee_id: UserId::from_uuid(row.employee_id),
            employee_name: row.employee_name,
            department: DepartmentName::new(row.department)?,
            leave_type: row.leave_type.parse::<LeaveType>()?,
            period: LeavePeriod::new(row.start_date, row.end_date)?,
            reason: LeaveReason::new(row.reason)?,
            relief_officer: row.relief_officer.map(ReliefOfficer::new).transpose()?,
            status: row.status.parse::<LeaveRequestStatus>()?,
            current_stage: row
                .current_stage
                .as_deref()
                .map(str::parse::<ApprovalStage>)
                .transpose()?,
            recommendations: row.recommendations.0,
            version: Version::try_from(row.version)?,
            decided_at: row.decided_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .map_err(|e| InfraError::unexpected(format!("休暇申請 {id} の状態が不正です: {e}")))?;

        Ok(request)
    }
}

const LEAVE_REQUEST_COLUMNS: &str = r#"
    id, employee_id, employee_name, department, leave_type, start_date, end_date,
    reason, relief_officer, status, current_stage, recommendations, version,
    decided_at, created_at, updated_at
"#;

/// PostgreSQL 実装
#[derive(Debug, Clone)]
pub struct PostgresLeaveRequestRepository {
    pool: PgPool,
}

impl PostgresLeaveRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeaveRequestRepository for PostgresLeaveRequestRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(id = %request.id()))]
    async fn insert(&self, tx: &mut TxContext, request: &LeaveRequest) -> Result<(), InfraError> {
        let leave_type: &str = request.leave_type().into();
        let status: &str = request.status().into();
        let stage: Option<&str> = request.stored_stage().map(|s| s.into());
        sqlx::query(
            r#"
            INSERT INTO leave_requests (
                id, employee_id, employee_name, department, leave_type, start_date, end_date,
                reason, relief_officer, status, current_stage, recommendations, version,
                decided_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(request.id().as_uuid())
        .bind(request.employee_id().as_uuid())
        .bind(request.employee_name())
        .bind(request.department().as_str())
        .bind(leave_type)
        .bind(request.period().start())
        .bind(request.period().end())
        .bind(request.reason().as_str())
        .bind(request.relief_officer().map(|r| r.as_str()))
        .bind(status)
        .bind(stage)
        .bind(Json(request.recommendations()))
        .bind(request.version().as_i32())
        .bind(request.decided_at())
        .bind(request.created_at())
        .bind(request.updated_at())
        .execute(tx.conn()?)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %request.id(), %expected_version))]
    async fn update_with_version_check(
        &self,
        tx: &mut TxContext,
        request: &LeaveRequest,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        let status: &str = request.status().into();
        let stage: Option<&str> = request.stored_stage().map(|s| s.into());
        let result = sqlx::query(
            r#"
            UPDATE leave_requests SET
                status = $1,
                current_stage = $2,
                recommendations = $3,
                version = $4,
                decided_at = $5,
                updated_at = $6
            WHERE id = $7 AND version = $8
            "#,
        )
        .bind(status)
        .bind(stage)
        .bind(Json(request.recommendations()))
        .bind(request.version().as_i32())
        .bind(request.decided_at())
        .bind(request.updated_at())
        .bind(request.id().as_uuid())
        .bind(expected_version.as_i32())
        .execute(tx.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::conflict(
                "LeaveRequest",
                request.id().as_uuid().to_string(),
            ));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &LeaveRequestId) -> Result<Option<LeaveRequest>, InfraError> {
        let row = sqlx::query_as::<_, LeaveRequestRow>(&format!(
            "SELECT {LEAVE_REQUEST_COLUMNS} FROM leave_requests WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(LeaveRequest::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%employee_id))]
    async fn find_by_employee(
        &self,
        employee_id: &UserId,
        status: Option<LeaveRequestStatus>,
    ) -> Result<Vec<LeaveRequest>, InfraError> {
        let status: Option<&str> = status.map(|s| s.into());
        let rows = sqlx::query_as::<_, LeaveRequestRow>(&format!(
            r#"
            SELECT {LEAVE_REQUEST_COLUMNS}
            FROM leave_requests
            WHERE employee_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(employee_id.as_uuid())
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LeaveRequest::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%employee_id))]
    async fn find_by_employee_in_tx(
        &self,
        tx: &mut TxContext,
        employee_id: &UserId,
    ) -> Result<Vec<LeaveRequest>, InfraError> {
        let rows = sqlx::query_as::<_, LeaveRequestRow>(&format!(
            r#"
            SELECT {LEAVE_REQUEST_COLUMNS}
            FROM leave_requests
            WHERE employee_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(employee_id.as_uuid())
        .fetch_all(tx.conn()?)
        .await?;

        rows.into_iter().map(LeaveRequest::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%stage))]
    async fn find_pending_by_stage(
        &self,
        stage: ApprovalStage,
        department: Option<&DepartmentName>,
    ) -> Result<Vec<LeaveRequest>, InfraError> {
        let stage: &str = stage.into();
        let rows = sqlx::query_as::<_, LeaveRequestRow>(&format!(
            r#"
            SELECT {LEAVE_REQUEST_COLUMNS}
            FROM leave_requests
            WHERE status = 'pending'
              AND current_stage = $1
              AND ($2::TEXT IS NULL OR department = $2)
            ORDER BY created_at ASC, id ASC
            "#
        ))
        .bind(stage)
        .bind(department.map(|d| d.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LeaveRequest::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all(&self, filter: &LeaveRequestFilter) -> Result<Vec<LeaveRequest>, InfraError> {
        let status: Option<&str> = filter.status.map(|s| s.into());
        let rows = sqlx::query_as::<_, LeaveRequestRow>(&format!(
            r#"
            SELECT {LEAVE_REQUEST_COLUMNS}
            FROM leave_requests
            WHERE ($1::TEXT IS NULL OR status = $1)
              AND ($2::TEXT IS NULL OR department = $2)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(status)
        .bind(filter.department.as_ref().map(|d| d.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LeaveRequest::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(start = %period.start(), end = %period.end()))]
    async fn find_approved_overlapping(
        &self,
        period: &LeavePeriod,
    ) -> Result<Vec<LeaveRequest>, InfraError> {
        let rows = sqlx::query_as::<_, LeaveRequestRow>(&format!(
            r#"
            SELECT {LEAVE_REQUEST_COLUMNS}
            FROM leave_requests
            WHERE status = 'approved' AND start_date <= $2 AND end_date >= $1
            ORDER BY start_date ASC, employee_name ASC
            "#
        ))
        .bind(period.start())
        .bind(period.end())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LeaveRequest::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use leaveflow_domain::{leave::Decision, user::UserId};
    use pretty_assertions::assert_eq;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn row(
        status: &str,
        current_stage: Option<&str>,
        recommendations: Vec<Recommendation>,
    ) -> LeaveRequestRow {
        LeaveRequestRow {
            id: Uuid::now_v7(),
            employee_id: Uuid::now_v7(),
            employee_name: "Employee".to_string(),
            department: "Engineering".to_string(),
            leave_type: "annual".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 6).unwrap(),
            reason: "家族旅行".to_string(),
            relief_officer: Some("同僚".to_string()),
            status: status.to_string(),
            current_stage: current_stage.map(str::to_string),
            version: i32::try_from(recommendations.len()).unwrap() + 1,
            recommendations: Json(recommendations),
            decided_at: None,
            created_at: now(),
            updated_at: now(),
        }
    }

    fn recommended(stage: ApprovalStage) -> Recommendation {
        Recommendation {
            stage,
            approver_id: UserId::new(),
            approver_name: "Approver".to_string(),
            decision: Decision::Recommended,
            comment: None,
            decided_at: now(),
        }
    }

    #[test]
    fn test_判断待ちの行を復元できる() {
        let row = row(
            "pending",
            Some("departmental_head"),
            vec![recommended(ApprovalStage::Director)],
        );

        let request = LeaveRequest::try_from(row).unwrap();

        assert_eq!(request.status(), LeaveRequestStatus::Pending);
        assert_eq!(
            request.current_stage(),
            Some(ApprovalStage::DepartmentalHead)
        );
        assert_eq!(request.relief_officer().map(|r| r.as_str()), Some("同僚"));
    }

    #[test]
    fn test_推薦記録と段階が矛盾する行は予期しないエラーになる() {
        let row = row("pending", Some("hr_director"), vec![]);

        let err = LeaveRequest::try_from(row).unwrap_err();

        assert!(matches!(
            err.kind(),
            crate::InfraErrorKind::Unexpected(msg) if msg.contains("状態が不正")
        ));
    }
}
