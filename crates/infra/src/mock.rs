//! # テスト用モックリポジトリ
//!
//! ユースケーステストで使用するインメモリモックリポジトリ。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! leaveflow-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leaveflow_domain::{
    audit_log::AuditLog,
    leave::{ApprovalStage, LeavePeriod, LeaveRequest, LeaveRequestId, LeaveRequestStatus},
    password::PasswordHash,
    roster::{RosterEntry, RosterEntryId},
    user::{Email, User, UserId, UserStatus},
    value_objects::{DepartmentName, Version},
};
use uuid::Uuid;

use crate::{
    db::{TransactionManager, TxContext},
    error::InfraError,
    repository::{
        AuditLogCursor,
        AuditLogFilter,
        AuditLogPage,
        AuditLogRepository,
        LeaveRequestFilter,
        LeaveRequestRepository,
        RosterRepository,
        UserRepository,
        audit_log_repository::into_page,
    },
    session::{SessionData, SessionManager},
};

// ===== MockTransactionManager =====

#[derive(Clone, Default)]
pub struct MockTransactionManager;

#[async_trait]
impl TransactionManager for MockTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        Ok(TxContext::mock())
    }

    async fn ping(&self) -> Result<(), InfraError> {
        Ok(())
    }
}

// ===== MockUserRepository =====

#[derive(Clone, Default)]
pub struct MockUserRepository {
    users:     Arc<Mutex<Vec<(User, PasswordHash)>>>,
    row_locks: Arc<Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User, password_hash: PasswordHash) {
        self.users.lock().unwrap().push((user, password_hash));
    }

    pub fn users(&self) -> Vec<User> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .map(|(u, _)| u.clone())
            .collect()
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u.id() == id)
            .map(|(u, _)| u.clone()))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u.email() == email)
            .map(|(u, _)| u.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<(User, PasswordHash)>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u.email() == email)
            .cloned())
    }

    async fn find_password_hash(&self, id: &UserId) -> Result<Option<PasswordHash>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u.id() == id)
            .map(|(_, h)| h.clone()))
    }

    async fn find_all(&self, status: Option<UserStatus>) -> Result<Vec<User>, InfraError> {
        let mut users: Vec<User> = self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| status.is_none_or(|s| u.status() == s))
            .map(|(u, _)| u.clone())
            .collect();
        users.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
        Ok(users)
    }

    async fn insert(
        &self,
        _tx: &mut TxContext,
        user: &User,
        password_hash: &PasswordHash,
    ) -> Result<(), InfraError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|(u, _)| u.email() == user.email()) {
            return Err(InfraError::conflict("User", user.email().as_str()));
        }
        users.push((user.clone(), password_hash.clone()));
        Ok(())
    }

    async fn update(&self, _tx: &mut TxContext, user: &User) -> Result<(), InfraError> {
        let mut users = self.users.lock().unwrap();
        let Some(entry) = users.iter_mut().find(|(u, _)| u.id() == user.id()) else {
            return Err(InfraError::unexpected(format!(
                "更新対象のユーザーが存在しません: {}",
                user.id()
            )));
        };
        entry.0 = user.clone();
        Ok(())
    }

    async fn update_password(
        &self,
        _tx: &mut TxContext,
        id: &UserId,
        password_hash: &PasswordHash,
        _now: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        let mut users = self.users.lock().unwrap();
        if let Some(entry) = users.iter_mut().find(|(u, _)| u.id() == id) {
            entry.1 = password_hash.clone();
        }
        Ok(())
    }

    async fn lock_for_update(&self, tx: &mut TxContext, id: &UserId) -> Result<(), InfraError> {
        let row_lock = self
            .row_locks
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_default()
            .clone();
        tx.hold_mock_lock(row_lock.lock_owned().await);
        Ok(())
    }
}

// ===== MockLeaveRequestRepository =====

#[derive(Clone, Default)]
pub struct MockLeaveRequestRepository {
    requests:   Arc<Mutex<Vec<LeaveRequest>>>,
    read_delay: Arc<Mutex<Option<Duration>>>,
}

impl MockLeaveRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 申請者単位の読み込みを、結果を確定させたあと指定時間だけ遅らせる
    ///
    /// 並行する提出が読み込みと保存の間に割り込む状況を再現する。
    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    async fn delay_read(&self) {
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn add_request(&self, request: LeaveRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

fn newest_first(mut requests: Vec<LeaveRequest>) -> Vec<LeaveRequest> {
    requests.sort_by_key(|r| std::cmp::Reverse(r.created_at()));
    requests
}

#[async_trait]
impl LeaveRequestRepository for MockLeaveRequestRepository {
    async fn insert(&self, _tx: &mut TxContext, request: &LeaveRequest) -> Result<(), InfraError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn update_with_version_check(
        &self,
        _tx: &mut TxContext,
        request: &LeaveRequest,
        expected_version: Version,
    ) -> Result<(), InfraError> {
        let mut requests = self.requests.lock().unwrap();
        let Some(stored) = requests
            .iter_mut()
            .find(|r| r.id() == request.id() && r.version() == expected_version)
        else {
            return Err(InfraError::conflict(
                "LeaveRequest",
                request.id().to_string(),
            ));
        };
        *stored = request.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: &LeaveRequestId) -> Result<Option<LeaveRequest>, InfraError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .cloned())
    }

    async fn find_by_employee(
        &self,
        employee_id: &UserId,
        status: Option<LeaveRequestStatus>,
    ) -> Result<Vec<LeaveRequest>, InfraError> {
        let requests = self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.employee_id() == employee_id)
            .filter(|r| status.is_none_or(|s| r.status() == s))
            .cloned()
            .collect();
        self.delay_read().await;
        Ok(newest_first(requests))
    }

    async fn find_by_employee_in_tx(
        &self,
        _tx: &mut TxContext,
        employee_id: &UserId,
    ) -> Result<Vec<LeaveRequest>, InfraError> {
        self.find_by_employee(employee_id, None).await
    }

    async fn find_pending_by_stage(
        &self,
        stage: ApprovalStage,
        department: Option<&DepartmentName>,
    ) -> Result<Vec<LeaveRequest>, InfraError> {
        let mut requests: Vec<LeaveRequest> = self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.current_stage() == Some(stage))
            .filter(|r| department.is_none_or(|d| r.department() == d))
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at());
        Ok(requests)
    }

    async fn find_all(&self, filter: &LeaveRequestFilter) -> Result<Vec<LeaveRequest>, InfraError> {
        let requests = self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.status.is_none_or(|s| r.status() == s))
            .filter(|r| filter.department.as_ref().is_none_or(|d| r.department() == d))
            .cloned()
            .collect();
        Ok(newest_first(requests))
    }

    async fn find_approved_overlapping(
        &self,
        period: &LeavePeriod,
    ) -> Result<Vec<LeaveRequest>, InfraError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status() == LeaveRequestStatus::Approved && r.period().overlaps(period))
            .cloned()
            .collect())
    }
}

// ===== MockRosterRepository =====

#[derive(Clone, Default)]
pub struct MockRosterRepository {
    entries:    Arc<Mutex<Vec<RosterEntry>>>,
    read_delay: Arc<Mutex<Option<Duration>>>,
}

impl MockRosterRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// ユーザー単位の重複確認の読み込みを指定時間だけ遅らせる
    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    pub fn entries(&self) -> Vec<RosterEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RosterRepository for MockRosterRepository {
    async fn insert(&self, _tx: &mut TxContext, entry: &RosterEntry) -> Result<(), InfraError> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn delete(&self, _tx: &mut TxContext, id: &RosterEntryId) -> Result<bool, InfraError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.id() != id);
        Ok(entries.len() < before)
    }

    async fn find_by_id(&self, id: &RosterEntryId) -> Result<Option<RosterEntry>, InfraError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.id() == id)
            .cloned())
    }

    async fn find_overlapping(
        &self,
        period: &LeavePeriod,
    ) -> Result<Vec<RosterEntry>, InfraError> {
        let mut entries: Vec<RosterEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.period().overlaps(period))
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.period().start());
        Ok(entries)
    }

    async fn find_overlapping_for_user(
        &self,
        _tx: &mut TxContext,
        user_id: &UserId,
        period: &LeavePeriod,
    ) -> Result<Vec<RosterEntry>, InfraError> {
        let entries: Vec<RosterEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_id() == user_id && e.period().overlaps(period))
            .cloned()
            .collect();
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(entries)
    }
}

// ===== MockAuditLogRepository =====

#[derive(Clone, Default)]
pub struct MockAuditLogRepository {
    logs: Arc<Mutex<Vec<AuditLog>>>,
}

impl MockAuditLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 記録済みの監査ログ（記録順）
    pub fn recorded(&self) -> Vec<AuditLog> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditLogRepository for MockAuditLogRepository {
    async fn record(&self, log: &AuditLog) -> Result<(), InfraError> {
        self.logs.lock().unwrap().push(log.clone());
        Ok(())
    }

    async fn find(
        &self,
        cursor: Option<&str>,
        limit: u32,
        filter: &AuditLogFilter,
    ) -> Result<AuditLogPage, InfraError> {
        let cursor = cursor.map(AuditLogCursor::decode).transpose()?;

        let mut logs: Vec<AuditLog> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| filter.matches(log))
            .filter(|log| cursor.as_ref().is_none_or(|c| c.is_after(log)))
            .cloned()
            .collect();
        logs.sort_by_key(|log| std::cmp::Reverse((log.created_at, log.id)));
        logs.truncate(limit as usize + 1);

        Ok(into_page(logs, limit as usize))
    }
}

// ===== MockSessionManager =====

#[derive(Clone, Default)]
pub struct MockSessionManager {
    sessions: Arc<Mutex<HashMap<String, SessionData>>>,
}

impl MockSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 有効なセッション ID の一覧
    pub fn session_ids(&self) -> HashSet<String> {
        self.sessions.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl SessionManager for MockSessionManager {
    async fn create(&self, data: &SessionData) -> Result<String, InfraError> {
        let session_id = Uuid::new_v4().to_string();
        self.sessions
            .lock()
            .unwrap()
            .insert(session_id.clone(), data.clone());
        Ok(session_id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionData>, InfraError> {
        Ok(self.sessions.lock().unwrap().get(session_id).cloned())
    }

    async fn delete(&self, session_id: &str) -> Result<(), InfraError> {
        self.sessions.lock().unwrap().remove(session_id);
        Ok(())
    }

    async fn delete_all_for_user(&self, user_id: &UserId) -> Result<(), InfraError> {
        self.sessions
            .lock()
            .unwrap()
            .retain(|_, data| data.user_id() != user_id);
        Ok(())
    }

    async fn ping(&self) -> Result<(), InfraError> {
        Ok(())
    }
}
