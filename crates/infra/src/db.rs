//! # PostgreSQL 接続とトランザクション
//!
//! 参照系のリポジトリはプール（[`PgPool`]）から直接読み、
//! 申請の状態遷移や監査ログの記録といった書き込みは必ず [`TxContext`] を受け取る。
//! 「推薦で申請を更新し、同じトランザクションで監査ログを追加する」ことを
//! 型で強制するためで、`TxContext` なしの書き込みメソッドは存在しない。

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction, postgres::PgPoolOptions};

use crate::error::InfraError;

/// プールから接続を取り出すまでの待ち時間の上限
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// 接続プールを作る（起動時に 1 回）
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .connect(database_url)
        .await
}

/// `migrations/` の SQL を未適用のものから順に流す
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// 書き込み用のトランザクション
///
/// [`commit`](Self::commit) せずにドロップするとロールバックされる。
pub struct TxContext {
    tx:         Option<Transaction<'static, Postgres>>,
    /// モックの行ロック（`SELECT ... FOR UPDATE` 相当）。コミットかドロップで解放される
    #[cfg(any(test, feature = "test-utils"))]
    mock_locks: Vec<tokio::sync::OwnedMutexGuard<()>>,
}

impl TxContext {
    fn new(tx: Option<Transaction<'static, Postgres>>) -> Self {
        Self {
            tx,
            #[cfg(any(test, feature = "test-utils"))]
            mock_locks: Vec::new(),
        }
    }

    /// インメモリのモックリポジトリ向け（DB 接続を持たない）
    #[cfg(any(test, feature = "test-utils"))]
    pub fn mock() -> Self {
        Self::new(None)
    }

    /// モックリポジトリが取得したロックをトランザクション終了まで保持する
    #[cfg(any(test, feature = "test-utils"))]
    pub(crate) fn hold_mock_lock(&mut self, guard: tokio::sync::OwnedMutexGuard<()>) {
        self.mock_locks.push(guard);
    }

    pub async fn commit(self) -> Result<(), InfraError> {
        if let Some(tx) = self.tx {
            tx.commit().await?;
        }
        Ok(())
    }

    /// リポジトリが SQL を発行するための接続
    pub(crate) fn conn(&mut self) -> Result<&mut PgConnection, InfraError> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| InfraError::unexpected("DB 接続を持たない TxContext で SQL を実行しようとしました"))
    }
}

/// ユースケースがトランザクションを開始する窓口
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> Result<TxContext, InfraError>;

    /// `GET /health/ready` 用の疎通確認
    async fn ping(&self) -> Result<(), InfraError>;
}

pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        let tx = self.pool.begin().await?;
        Ok(TxContext::new(Some(tx)))
    }

    async fn ping(&self) -> Result<(), InfraError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
