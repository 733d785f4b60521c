//! # ユースケース層
//!
//! LeaveFlow のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリ・セッション・時計を `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは入力の変換とレスポンスの組み立てのみを行う
//! - **監査と配信は事後処理**: コミット後に監査ログを記録し、ライブ更新を配信する。
//!   監査ログの失敗は業務操作を失敗させない
//!
//! ## モジュール構成
//!
//! - `auth`: ログイン・ログアウト・パスワード変更
//! - `user`: 管理者によるユーザー管理
//! - `leave`: 休暇申請と承認チェーン
//! - `roster`: ロスターとカレンダー
//! - `audit_log`: 監査ログの閲覧

pub(crate) mod helpers;

pub mod audit_log;
pub mod auth;
pub mod leave;
pub mod roster;
pub mod user;

pub use audit_log::{AuditLogQuery, AuditLogUseCaseImpl};
pub use auth::{AuthUseCaseImpl, LoginOutcome};
pub use leave::{LeaveDeps, LeaveUseCaseImpl, SubmitLeaveInput};
pub use roster::{CreateRosterEntryInput, RosterDeps, RosterUseCaseImpl};
pub use user::{CreateUserInput, UpdateUserInput, UserDeps, UserUseCaseImpl};
