//! # UserRepository
//!
//! ユーザー情報と認証情報（パスワードハッシュ）の永続化を担当するリポジトリ。
//!
//! パスワードハッシュはドメインの [`User`] に含めず、認証用のメソッドでのみ扱う。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leaveflow_domain::{
    password::PasswordHash,
    user::{Email, User, UserId, UserRecord, UserRole, UserStatus},
    value_objects::{AnnualEntitlement, DepartmentName, UserName},
};
use sqlx::PgPool;
use uuid::Uuid;

use super::map_unique_violation;
use crate::{db::TxContext, error::InfraError};

/// ユーザーリポジトリトレイト
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ID でユーザーを検索
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError>;

    /// メールアドレスでユーザーを検索
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError>;

    /// メールアドレスでユーザーとパスワードハッシュを取得する（ログイン用）
    async fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, PasswordHash)>, InfraError>;

    /// ユーザーのパスワードハッシュを取得する（パスワード変更用）
    async fn find_password_hash(&self, id: &UserId) -> Result<Option<PasswordHash>, InfraError>;

    /// ユーザー一覧を名前順で取得する
    async fn find_all(&self, status: Option<UserStatus>) -> Result<Vec<User>, InfraError>;

    /// ユーザーを作成する
    ///
    /// メールアドレスが重複する場合は `Conflict` を返す。
    async fn insert(
        &self,
        tx: &mut TxContext,
        user: &User,
        password_hash: &PasswordHash,
    ) -> Result<(), InfraError>;

    /// プロフィール・ステータスを更新する
    async fn update(&self, tx: &mut TxContext, user: &User) -> Result<(), InfraError>;

    /// パスワードハッシュを更新する
    async fn update_password(
        &self,
        tx: &mut TxContext,
        id: &UserId,
        password_hash: &PasswordHash,
        now: DateTime<Utc>,
    ) -> Result<(), InfraError>;

    /// ユーザー行をトランザクション終了までロックする（`SELECT ... FOR UPDATE`）
    ///
    /// 同じユーザーに対する休暇申請・ロスター登録の
    /// 「重複確認 → 保存」をユーザー単位で直列化する。
    async fn lock_for_update(&self, tx: &mut TxContext, id: &UserId) -> Result<(), InfraError>;
}

/// DB の users テーブルの行を表す中間構造体
///
/// `TryFrom` で `User` への変換ロジックを一箇所に集約する。
#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    department: String,
    role: String,
    status: String,
    annual_entitlement: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

impl TryFrom<UserRow> for User {
    type Error = InfraError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User::from_db(UserRecord {
            id: UserId::from_uuid(row.id),
            email: Email::new(row.email)?,
            name: UserName::new(row.name)?,
            department: DepartmentName::new(row.department)?,
            role: row.role.parse::<UserRole>()?,
            status: row.status.parse::<UserStatus>()?,
            annual_entitlement: AnnualEntitlement::try_from(row.annual_entitlement)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

const USER_COLUMNS: &str = r#"
    id, email, name, department, role, status, annual_entitlement, created_at, updated_at
"#;

/// PostgreSQL 実装の UserRepository
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, PasswordHash)>, InfraError> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user = User::try_from(row.user)?;
        Ok(Some((user, PasswordHash::new(row.password_hash))))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_password_hash(&self, id: &UserId) -> Result<Option<PasswordHash>, InfraError> {
        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;

        Ok(hash.map(PasswordHash::new))
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_all(&self, status: Option<UserStatus>) -> Result<Vec<User>, InfraError> {
        let status: Option<&str> = status.map(|s| s.into());
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY name ASC, id ASC
            "#
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %user.id()))]
    async fn insert(
        &self,
        tx: &mut TxContext,
        user: &User,
        password_hash: &PasswordHash,
    ) -> Result<(), InfraError> {
        let role: &str = user.role().into();
        let status: &str = user.status().into();
        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, name, department, role, status, annual_entitlement,
                password_hash, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id().as_uuid())
        .bind(user.email().as_str())
        .bind(user.name().as_str())
        .bind(user.department().as_str())
        .bind(role)
        .bind(status)
        .bind(i32::from(user.annual_entitlement().days()))
        .bind(password_hash.as_str())
        .bind(user.created_at())
        .bind(user.updated_at())
        .execute(tx.conn()?)
        .await
        .map_err(map_unique_violation("User", user.email().as_str()))?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(id = %user.id()))]
    async fn update(&self, tx: &mut TxContext, user: &User) -> Result<(), InfraError> {
        let role: &str = user.role().into();
        let status: &str = user.status().into();
        let result = sqlx::query(
            r#"
            UPDATE users SET
                name = $1,
                department = $2,
                role = $3,
                status = $4,
                annual_entitlement = $5,
                updated_at = $6
            WHERE id = $7
            "#,
        )
        .bind(user.name().as_str())
        .bind(user.department().as_str())
        .bind(role)
        .bind(status)
        .bind(i32::from(user.annual_entitlement().days()))
        .bind(user.updated_at())
        .bind(user.id().as_uuid())
        .execute(tx.conn()?)
        .await?;

        if result.rows_affected() == 0 {
            return Err(InfraError::unexpected(format!(
                "更新対象のユーザーが存在しません: {}",
                user.id()
            )));
        }

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn update_password(
        &self,
        tx: &mut TxContext,
        id: &UserId,
        password_hash: &PasswordHash,
        now: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        sqlx::query("UPDATE users SET password_hash = $1, updated_at = $2 WHERE id = $3")
            .bind(password_hash.as_str())
            .bind(now)
            .bind(id.as_uuid())
            .execute(tx.conn()?)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn lock_for_update(&self, tx: &mut TxContext, id: &UserId) -> Result<(), InfraError> {
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(tx.conn()?)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn row() -> UserRow {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        UserRow {
            id: Uuid::now_v7(),
            email: "user@example.com".to_string(),
            name: "Test User".to_string(),
            department: "Engineering".to_string(),
            role: "departmental_head".to_string(),
            status: "active".to_string(),
            annual_entitlement: 25,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_行からユーザーに変換できる() {
        let user = User::try_from(row()).unwrap();

        assert_eq!(user.role(), UserRole::DepartmentalHead);
        assert_eq!(user.annual_entitlement().days(), 25);
        assert!(user.is_active());
    }

    #[test]
    fn test_不正なロールの行は予期しないエラーになる() {
        let mut row = row();
        row.role = "manager".to_string();

        assert!(User::try_from(row).is_err());
    }

    #[test]
    fn test_リポジトリはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresUserRepository>();
    }
}
