//! # 業務イベントとエラーの構造化ログ
//!
//! JSON ログ（`LOG_FORMAT=json`）を後から `jq` で絞り込めるよう、フィールド名を揃える。
//!
//! 休暇申請が承認されたときの出力例:
//!
//! ```json
//! {"event.kind":"business_event","event.category":"leave","event.action":"leave.approved",
//!  "event.entity_type":"leave_request","event.entity_id":"0195...","event.result":"success"}
//! ```
//!
//! 障害調査では `error.category` と `error.kind`（[`error`] の定数）を `tracing::error!` に付ける。

/// `event.kind = "business_event"` を付けて INFO で出力する
///
/// `event.category` / `event.action` / `event.result` は [`event`] の定数で指定する。
/// 対象があれば `event.entity_type` / `event.entity_id` / `event.actor_id` も付ける。
///
/// ```ignore
/// log_business_event!(
///     event.category = event::category::ROSTER,
///     event.action = event::action::ROSTER_ENTRY_DELETED,
///     event.entity_type = event::entity_type::ROSTER_ENTRY,
///     event.entity_id = %entry_id,
///     event.result = event::result::SUCCESS,
///     "ロスターを削除しました"
/// );
/// ```
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// `event.*` フィールドの値
pub mod event {
    pub mod category {
        pub const LEAVE: &str = "leave";
        pub const AUTH: &str = "auth";
        pub const ROSTER: &str = "roster";
        pub const USER: &str = "user";
    }

    pub mod action {
        // 休暇申請
        pub const LEAVE_SUBMITTED: &str = "leave.submitted";
        pub const LEAVE_RECOMMENDED: &str = "leave.recommended";
        pub const LEAVE_APPROVED: &str = "leave.approved";
        pub const LEAVE_REJECTED: &str = "leave.rejected";
        pub const LEAVE_CANCELLED: &str = "leave.cancelled";

        // 認証
        pub const LOGIN_SUCCESS: &str = "auth.login_success";
        pub const LOGIN_FAILURE: &str = "auth.login_failure";
        pub const LOGOUT: &str = "auth.logout";
        pub const PASSWORD_CHANGED: &str = "auth.password_changed";

        // ロスター
        pub const ROSTER_ENTRY_CREATED: &str = "roster.entry_created";
        pub const ROSTER_ENTRY_DELETED: &str = "roster.entry_deleted";
    }

    pub mod entity_type {
        pub const LEAVE_REQUEST: &str = "leave_request";
        pub const ROSTER_ENTRY: &str = "roster_entry";
        pub const USER: &str = "user";
        pub const SESSION: &str = "session";
    }

    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// `error.*` フィールドの値
pub mod error {
    pub mod category {
        /// PostgreSQL・Redis・ブロードキャストなど業務ロジックの外側
        pub const INFRASTRUCTURE: &str = "infrastructure";
    }

    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const SESSION: &str = "session";
        pub const INTERNAL: &str = "internal";
        pub const AUDIT_LOG: &str = "audit_log";
        pub const PASSWORD_VERIFICATION: &str = "password_verification";
        pub const LIVE_UPDATE: &str = "live_update";
    }
}
