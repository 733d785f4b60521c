//! # LeaveFlow インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! リポジトリトレイトとその PostgreSQL 実装、Redis セッション、
//! パスワードハッシュを提供する。外部システムの詳細をカプセル化し、
//! ドメイン層をインフラの変更から保護する。
//!
//! ## 依存関係
//!
//! ```text
//! api → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL 接続プール・マイグレーション・トランザクション
//! - [`error`] - インフラ層エラー定義
//! - [`password`] - Argon2id によるパスワードのハッシュ化と検証
//! - [`repository`] - リポジトリ実装
//! - [`session`] - Redis セッション管理
//! - `mock` - テスト用インメモリ実装（`test-utils` feature）
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use leaveflow_infra::{db, repository::PostgresUserRepository};
//!
//! async fn setup() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::create_pool("postgres://localhost/leaveflow", 10).await?;
//!     db::run_migrations(&pool).await?;
//!     let users = PostgresUserRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod password;
pub mod repository;
pub mod session;

pub use error::{InfraError, InfraErrorKind};
pub use password::{Argon2PasswordChecker, PasswordChecker};
pub use session::{RedisSessionManager, SessionData, SessionManager};
