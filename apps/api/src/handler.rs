//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュールで re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ビジネスロジックはユースケース層に委譲
//!
//! ## ハンドラ一覧
//!
//! - `health`: ヘルスチェック
//! - `auth`: 認証関連（ログイン、ログアウト、パスワード変更）
//! - `leave`: 休暇申請と承認
//! - `roster`: カレンダーとロスター
//! - `admin_user`: ユーザー管理（管理者）
//! - `audit_log`: 監査ログ閲覧（管理者）
//! - `ws`: ライブ更新（WebSocket）

pub mod admin_user;
pub mod audit_log;
pub mod auth;
pub mod health;
pub mod leave;
pub mod roster;
pub mod ws;

pub use admin_user::{UserState, create_user, list_users, update_user, update_user_status};
pub use audit_log::{AuditLogState, list_audit_logs};
pub use auth::{AuthState, change_password, login, logout, me};
pub use health::{ReadinessState, health_check, readiness_check};
pub use leave::{
    LeaveState,
    cancel_leave,
    get_balance,
    get_leave,
    list_all_leaves,
    list_my_leaves,
    list_pending_approvals,
    recommend_leave,
    reject_leave,
    submit_leave,
};
pub use roster::{RosterState, create_roster_entry, delete_roster_entry, get_calendar};
pub use ws::{LiveState, live_updates};
