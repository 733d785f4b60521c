//! # ルーター構築
//!
//! 依存を受け取り、全エンドポイントを束ねた [`Router`] を組み立てる。
//! `main` からは本番の実装を、結合テストからはモックを渡す。
//!
//! ## ルートグループ
//!
//! - 公開: ヘルスチェック、認証
//! - セッション必須: 休暇申請、承認、カレンダー、ライブ更新（各ハンドラでセッションを検証）
//! - 管理者専用: `/api/v1/admin/*`（[`require_role`] ミドルウェアで検証）

use std::sync::Arc;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put},
};
use leaveflow_domain::{clock::Clock, leave::LeavePolicy, user::UserRole};
use leaveflow_infra::{
    PasswordChecker,
    SessionManager,
    db::TransactionManager,
    repository::{AuditLogRepository, LeaveRequestRepository, RosterRepository, UserRepository},
};
use leaveflow_shared::observability::make_request_span;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    handler::{
        AuditLogState,
        AuthState,
        LeaveState,
        LiveState,
        ReadinessState,
        RosterState,
        UserState,
        cancel_leave,
        change_password,
        create_roster_entry,
        create_user,
        delete_roster_entry,
        get_balance,
        get_calendar,
        get_leave,
        health_check,
        list_all_leaves,
        list_audit_logs,
        list_my_leaves,
        list_pending_approvals,
        list_users,
        live_updates,
        login,
        logout,
        me,
        readiness_check,
        recommend_leave,
        reject_leave,
        submit_leave,
        update_user,
        update_user_status,
    },
    live::EventHub,
    middleware::{AuthzState, require_role},
    usecase::{
        AuditLogUseCaseImpl,
        AuthUseCaseImpl,
        LeaveDeps,
        LeaveUseCaseImpl,
        RosterDeps,
        RosterUseCaseImpl,
        UserDeps,
        UserUseCaseImpl,
    },
};

/// ルーター構築に必要な依存
#[derive(Clone)]
pub struct AppDeps {
    pub user_repo:        Arc<dyn UserRepository>,
    pub leave_repo:       Arc<dyn LeaveRequestRepository>,
    pub roster_repo:      Arc<dyn RosterRepository>,
    pub audit_log_repo:   Arc<dyn AuditLogRepository>,
    pub tx_manager:       Arc<dyn TransactionManager>,
    pub session_manager:  Arc<dyn SessionManager>,
    pub password_checker: Arc<dyn PasswordChecker>,
    pub clock:            Arc<dyn Clock>,
    pub hub:              EventHub,
    pub policy:           LeavePolicy,
    /// セッション Cookie に Secure 属性を付けるか
    pub secure_cookie:    bool,
}

/// アプリケーションのルーターを構築する
pub fn build_app(deps: AppDeps) -> Router {
    let readiness_state = Arc::new(ReadinessState {
        tx_manager:      deps.tx_manager.clone(),
        session_manager: deps.session_manager.clone(),
    });
    let auth_state = Arc::new(AuthState {
        usecase:         AuthUseCaseImpl::new(
            deps.user_repo.clone(),
            deps.tx_manager.clone(),
            deps.session_manager.clone(),
            deps.password_checker.clone(),
            deps.clock.clone(),
        ),
        session_manager: deps.session_manager.clone(),
        secure_cookie:   deps.secure_cookie,
    });
    let leave_state = Arc::new(LeaveState {
        usecase:         LeaveUseCaseImpl::new(LeaveDeps {
            user_repo:      deps.user_repo.clone(),
            leave_repo:     deps.leave_repo.clone(),
            tx_manager:     deps.tx_manager.clone(),
            audit_log_repo: deps.audit_log_repo.clone(),
            hub:            deps.hub.clone(),
            policy:         deps.policy,
            clock:          deps.clock.clone(),
        }),
        session_manager: deps.session_manager.clone(),
    });
    let roster_state = Arc::new(RosterState {
        usecase:         RosterUseCaseImpl::new(RosterDeps {
            user_repo:      deps.user_repo.clone(),
            leave_repo:     deps.leave_repo.clone(),
            roster_repo:    deps.roster_repo.clone(),
            tx_manager:     deps.tx_manager.clone(),
            audit_log_repo: deps.audit_log_repo.clone(),
            hub:            deps.hub.clone(),
            clock:          deps.clock.clone(),
        }),
        session_manager: deps.session_manager.clone(),
    });
    let user_state = Arc::new(UserState {
        usecase:         UserUseCaseImpl::new(UserDeps {
            user_repo:        deps.user_repo.clone(),
            tx_manager:       deps.tx_manager.clone(),
            audit_log_repo:   deps.audit_log_repo.clone(),
            session_manager:  deps.session_manager.clone(),
            password_checker: deps.password_checker.clone(),
            hub:              deps.hub.clone(),
            clock:            deps.clock.clone(),
        }),
        session_manager: deps.session_manager.clone(),
    });
    let audit_log_state = Arc::new(AuditLogState {
        usecase: AuditLogUseCaseImpl::new(deps.audit_log_repo.clone()),
    });
    let live_state = Arc::new(LiveState {
        hub:             deps.hub.clone(),
        session_manager: deps.session_manager.clone(),
    });

    let admin_authz = AuthzState {
        session_manager: deps.session_manager.clone(),
        user_repo:       deps.user_repo.clone(),
        required_role:   UserRole::Admin,
    };

    Router::new()
        .route("/health", get(health_check))
        .merge(
            Router::new()
                .route("/health/ready", get(readiness_check))
                .with_state(readiness_state),
        )
        // 認証
        .merge(
            Router::new()
                .route("/api/v1/auth/login", post(login))
                .route("/api/v1/auth/logout", post(logout))
                .route("/api/v1/auth/me", get(me))
                .route("/api/v1/auth/password", put(change_password))
                .with_state(auth_state),
        )
        // 休暇申請・承認
        .merge(
            Router::new()
                .route("/api/v1/leaves", get(list_my_leaves).post(submit_leave))
                .route("/api/v1/leaves/balance", get(get_balance))
                .route("/api/v1/leaves/{id}", get(get_leave))
                .route("/api/v1/leaves/{id}/cancel", post(cancel_leave))
                .route("/api/v1/leaves/{id}/recommend", post(recommend_leave))
                .route("/api/v1/leaves/{id}/reject", post(reject_leave))
                .route("/api/v1/approvals", get(list_pending_approvals))
                .with_state(leave_state.clone()),
        )
        .merge(
            Router::new()
                .route("/api/v1/roster", get(get_calendar))
                .with_state(roster_state.clone()),
        )
        .merge(
            Router::new()
                .route("/api/v1/ws", get(live_updates))
                .with_state(live_state),
        )
        // 管理者専用
        .merge(
            Router::new()
                .route("/api/v1/admin/users", get(list_users).post(create_user))
                .route("/api/v1/admin/users/{id}", patch(update_user))
                .route("/api/v1/admin/users/{id}/status", patch(update_user_status))
                .layer(from_fn_with_state(admin_authz.clone(), require_role))
                .with_state(user_state),
        )
        .merge(
            Router::new()
                .route("/api/v1/admin/leaves", get(list_all_leaves))
                .layer(from_fn_with_state(admin_authz.clone(), require_role))
                .with_state(leave_state),
        )
        .merge(
            Router::new()
                .route("/api/v1/admin/roster", post(create_roster_entry))
                .route("/api/v1/admin/roster/{id}", delete(delete_roster_entry))
                .layer(from_fn_with_state(admin_authz.clone(), require_role))
                .with_state(roster_state),
        )
        .merge(
            Router::new()
                .route("/api/v1/admin/audit-logs", get(list_audit_logs))
                .layer(from_fn_with_state(admin_authz, require_role))
                .with_state(audit_log_state),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
