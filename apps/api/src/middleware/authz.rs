//! # 認可ミドルウェア
//!
//! DB 上のユーザーのロールを検証し、管理者専用ルートへのアクセスを制御する。
//!
//! ## 使い方
//!
//! ```rust,ignore
//! use axum::middleware::from_fn_with_state;
//!
//! let authz_state = AuthzState {
//!     session_manager: session_manager.clone(),
//!     user_repo:       user_repo.clone(),
//!     required_role:   UserRole::Admin,
//! };
//!
//! Router::new()
//!     .route("/api/v1/admin/users", get(list_users))
//!     .layer(from_fn_with_state(authz_state, require_role))
//! ```
//!
//! セッションのロールはログイン時点のスナップショットで、ロール変更時の
//! セッション破棄が失敗すると古いまま残る。そのため判定はリクエストごとに
//! DB から読み直したユーザーで行い、セッションは本人確認にだけ使う。

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use leaveflow_domain::user::UserRole;
use leaveflow_infra::{SessionManager, repository::UserRepository};

use crate::{
    error::{ApiError, get_session},
    usecase::helpers::load_active_actor,
};

/// 認可ミドルウェアの状態
#[derive(Clone)]
pub struct AuthzState {
    pub session_manager: Arc<dyn SessionManager>,
    pub user_repo:       Arc<dyn UserRepository>,
    pub required_role:   UserRole,
}

/// 認可ミドルウェア
///
/// セッションが存在しない、またはユーザーが削除されている場合は 401 Unauthorized を返す。
/// 無効化されている、またはロールが一致しない場合は 403 Forbidden を返す。
pub async fn require_role(
    State(state): State<AuthzState>,
    jar: CookieJar,
    request: Request<Body>,
    next: Next,
) -> Response {
    let (_, session) = match get_session(state.session_manager.as_ref(), &jar).await {
        Ok(s) => s,
        Err(e) => return e.into_response(),
    };

    let user = match load_active_actor(state.user_repo.as_ref(), session.user_id()).await {
        Ok(user) => user,
        Err(e) => return e.into_response(),
    };

    if user.role() != state.required_role {
        tracing::debug!(
            user_id = %user.id(),
            role = %user.role(),
            session_role = %session.role(),
            required = %state.required_role,
            "ロール不足のためアクセスを拒否"
        );
        return ApiError::Forbidden("この操作を実行する権限がありません".to_string())
            .into_response();
    }

    next.run(request).await
}
