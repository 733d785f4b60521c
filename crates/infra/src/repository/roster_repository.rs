//! # RosterRepository
//!
//! 管理者が登録する休暇ロスターの永続化を担当するリポジトリ。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use leaveflow_domain::{
    leave::LeavePeriod,
    roster::{RosterEntry, RosterEntryId, RosterEntryRecord},
    user::UserId,
    value_objects::DepartmentName,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

/// ロスターリポジトリトレイト
#[async_trait]
pub trait RosterRepository: Send + Sync {
    async fn insert(&self, tx: &mut TxContext, entry: &RosterEntry) -> Result<(), InfraError>;

    /// ロスターエントリを削除する
    ///
    /// 削除した場合は `true`、対象が存在しなかった場合は `false` を返す。
    async fn delete(&self, tx: &mut TxContext, id: &RosterEntryId) -> Result<bool, InfraError>;

    async fn find_by_id(&self, id: &RosterEntryId) -> Result<Option<RosterEntry>, InfraError>;

    /// 期間と重なるエントリを開始日順で取得する
    async fn find_overlapping(&self, period: &LeavePeriod)
    -> Result<Vec<RosterEntry>, InfraError>;

    /// 指定ユーザーの、期間と重なるエントリをトランザクション内で取得する（重複登録チェック用）
    async fn find_overlapping_for_user(
        &self,
        tx: &mut TxContext,
        user_id: &UserId,
        period: &LeavePeriod,
    ) -> Result<Vec<RosterEntry>, InfraError>;
}

#[derive(sqlx::FromRow)]
struct RosterEntryRow {
    id: Uuid,
    user_id: Uuid,
    user_name: String,
    department: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    note: Option<String>,
    created_by: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<RosterEntryRow> for RosterEntry {
    type Error = InfraError;

    fn try_from(row: RosterEntryRow) -> Result<Self, Self::Error> {
        Ok(RosterEntry::from_db(RosterEntryRecord {
            id:         RosterEntryId::from_uuid(row.id),
            user_id:    UserId::from_uuid(row.user_id),
            user_name:  row.user_name,
            department: DepartmentName::new(row.department)?,
            period:     LeavePeriod::new(row.start_date, row.end_date)?,
            note:       row.note,
            created_by: UserId::from_uuid(row.created_by),
            created_at: row.created_at,
        }))
    }
}

const ROSTER_COLUMNS: &str =
    "id, user_id, user_name, department, start_date, end_date, note, created_by, created_at";

/// PostgreSQL 実装
#[derive(Debug, Clone)]
pub struct PostgresRosterRepository {
    pool: PgPool,
}

impl PostgresRosterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RosterRepository for PostgresRosterRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(id = %entry.id()))]
    async fn insert(&self, tx: &mut TxContext, entry: &RosterEntry) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO roster_entries (
                id, user_id, user_name, department, start_date, end_date, note,
                created_by, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(entry.id().as_uuid())
        .bind(entry.user_id().as_uuid())
        .bind(entry.user_name())
        .bind(entry.department().as_str())
        .bind(entry.period().start())
        .bind(entry.period().end())
        .bind(entry.note())
        .bind(entry.created_by().as_uuid())
        .bind(entry.created_at())
        .execute(tx.conn()?)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn delete(&self, tx: &mut TxContext, id: &RosterEntryId) -> Result<bool, InfraError> {
        let result = sqlx::query("DELETE FROM roster_entries WHERE id = $1")
            .bind(id.as_uuid())
            .execute(tx.conn()?)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &RosterEntryId) -> Result<Option<RosterEntry>, InfraError> {
        let row = sqlx::query_as::<_, RosterEntryRow>(&format!(
            "SELECT {ROSTER_COLUMNS} FROM roster_entries WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(RosterEntry::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_overlapping(
        &self,
        period: &LeavePeriod,
    ) -> Result<Vec<RosterEntry>, InfraError> {
        let rows = sqlx::query_as::<_, RosterEntryRow>(&format!(
            r#"
            SELECT {ROSTER_COLUMNS}
            FROM roster_entries
            WHERE start_date <= $2 AND end_date >= $1
            ORDER BY start_date ASC, user_name ASC
            "#
        ))
        .bind(period.start())
        .bind(period.end())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RosterEntry::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn find_overlapping_for_user(
        &self,
        tx: &mut TxContext,
        user_id: &UserId,
        period: &LeavePeriod,
    ) -> Result<Vec<RosterEntry>, InfraError> {
        let rows = sqlx::query_as::<_, RosterEntryRow>(&format!(
            r#"
            SELECT {ROSTER_COLUMNS}
            FROM roster_entries
            WHERE user_id = $1 AND start_date <= $3 AND end_date >= $2
            ORDER BY start_date ASC
            "#
        ))
        .bind(user_id.as_uuid())
        .bind(period.start())
        .bind(period.end())
        .fetch_all(tx.conn()?)
        .await?;

        rows.into_iter().map(RosterEntry::try_from).collect()
    }
}
