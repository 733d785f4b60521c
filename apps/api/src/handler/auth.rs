//! # 認証ハンドラ
//!
//! ## エンドポイント
//!
//! - `POST /api/v1/auth/login` - ログイン
//! - `POST /api/v1/auth/logout` - ログアウト
//! - `GET /api/v1/auth/me` - 現在のユーザー情報を取得
//! - `PUT /api/v1/auth/password` - パスワード変更
//!
//! セッション ID は HttpOnly Cookie（`session_id`）で受け渡す。

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use leaveflow_infra::{SessionManager, session::SESSION_TTL_SECONDS};
use leaveflow_shared::ApiResponse;
use serde::Deserialize;

use super::admin_user::UserData;
use crate::{
    error::{ApiError, SESSION_COOKIE_NAME, get_session},
    usecase::AuthUseCaseImpl,
};

/// 認証 API の共有状態
pub struct AuthState {
    pub usecase:         AuthUseCaseImpl,
    pub session_manager: Arc<dyn SessionManager>,
    /// Cookie に Secure 属性を付けるか（本番環境）
    pub secure_cookie:   bool,
}

// --- リクエスト型 ---

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email:    String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password:     String,
}

// --- ハンドラ ---

/// POST /api/v1/auth/login
///
/// 成功時はセッション Cookie を設定し、ユーザー情報を返す。
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state.usecase.login(&req.email, &req.password).await?;
    let user = state.usecase.me(outcome.session.user_id()).await?;

    let jar = jar.add(build_session_cookie(
        &outcome.session_id,
        state.secure_cookie,
    ));

    Ok((
        jar,
        (StatusCode::OK, Json(ApiResponse::new(UserData::from(&user)))),
    ))
}

/// POST /api/v1/auth/logout
///
/// セッションが既に失効していても 204 を返し、Cookie をクリアする。
#[tracing::instrument(skip_all)]
pub async fn logout(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        let session_id = cookie.value().to_string();
        let user_id = state
            .session_manager
            .get(&session_id)
            .await
            .ok()
            .flatten()
            .map(|s| s.user_id().clone());

        if let Err(e) = state.usecase.logout(&session_id, user_id.as_ref()).await {
            tracing::warn!("セッション削除に失敗（無視）: {}", e);
        }
    }

    let jar = jar.add(build_clear_cookie(state.secure_cookie));
    Ok((jar, StatusCode::NO_CONTENT))
}

/// GET /api/v1/auth/me
#[tracing::instrument(skip_all)]
pub async fn me(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let (_, session) = get_session(state.session_manager.as_ref(), &jar).await?;
    let user = state.usecase.me(session.user_id()).await?;

    Ok((StatusCode::OK, Json(ApiResponse::new(UserData::from(&user)))))
}

/// PUT /api/v1/auth/password
#[tracing::instrument(skip_all)]
pub async fn change_password(
    State(state): State<Arc<AuthState>>,
    jar: CookieJar,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_, session) = get_session(state.session_manager.as_ref(), &jar).await?;

    state
        .usecase
        .change_password(session.user_id(), &req.current_password, &req.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// セッション Cookie を構築する
fn build_session_cookie(session_id: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id.to_string()))
        .path("/")
        .max_age(time::Duration::seconds(SESSION_TTL_SECONDS as i64))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Cookie をクリアするための Cookie を構築する
fn build_clear_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .max_age(time::Duration::seconds(0))
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}
