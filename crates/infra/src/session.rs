//! # セッション
//!
//! ログイン中のユーザーを Redis 上のセッションで表す。値は [`SessionData`] の JSON。
//!
//! | キー | 値 |
//! |-----|-----|
//! | `session:{session_id}` | [`SessionData`] |
//! | `user_sessions:{user_id}` | そのユーザーのセッション ID 集合 |
//!
//! どちらも [`SESSION_TTL_SECONDS`] で失効し、ログインのたびに集合側の期限を延ばす。
//! 管理者がユーザーを無効化したときは集合を引いて全セッションを消す。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leaveflow_domain::user::{User, UserId, UserRole};
use redis::{AsyncCommands, aio::ConnectionManager};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::InfraError;

/// セッションの寿命（8 時間）
pub const SESSION_TTL_SECONDS: u64 = 8 * 60 * 60;

/// 承認の振り分けに必要なユーザー属性のスナップショット
///
/// ロールや部署が変わっても既存セッションには反映されないため、
/// 管理者の更新時はそのユーザーのセッションを破棄する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    user_id:    UserId,
    name:       String,
    department: String,
    role:       UserRole,
    logged_in:  DateTime<Utc>,
}

impl SessionData {
    pub fn for_user(user: &User, now: DateTime<Utc>) -> Self {
        Self {
            user_id:    user.id().clone(),
            name:       user.name().as_str().to_string(),
            department: user.department().as_str().to_string(),
            role:       user.role(),
            logged_in:  now,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// 監査ログの `actor_name` に記録する表示名
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn department(&self) -> &str {
        &self.department
    }

    pub fn role(&self) -> UserRole {
        self.role
    }
}

#[async_trait]
pub trait SessionManager: Send + Sync {
    /// 新しいセッション ID（UUID v4）を払い出して保存する
    async fn create(&self, data: &SessionData) -> Result<String, InfraError>;

    /// 未知・失効済みの ID は `None`
    async fn get(&self, session_id: &str) -> Result<Option<SessionData>, InfraError>;

    /// 冪等（存在しなくても成功）
    async fn delete(&self, session_id: &str) -> Result<(), InfraError>;

    async fn delete_all_for_user(&self, user_id: &UserId) -> Result<(), InfraError>;

    /// `GET /health/ready` 用
    async fn ping(&self) -> Result<(), InfraError>;
}

#[derive(Clone)]
pub struct RedisSessionManager {
    conn: ConnectionManager,
}

impl RedisSessionManager {
    /// `redis://host:port` に接続する
    pub async fn new(redis_url: &str) -> Result<Self, InfraError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            conn: ConnectionManager::new(client).await?,
        })
    }
}

fn session_key(session_id: &str) -> String {
    format!("session:{session_id}")
}

fn user_sessions_key(user_id: &UserId) -> String {
    format!("user_sessions:{}", user_id.as_uuid())
}

#[async_trait]
impl SessionManager for RedisSessionManager {
    #[tracing::instrument(skip_all, level = "debug", fields(user_id = %data.user_id()))]
    async fn create(&self, data: &SessionData) -> Result<String, InfraError> {
        let session_id = Uuid::new_v4().to_string();
        let index = user_sessions_key(data.user_id());
        let payload = serde_json::to_string(data)?;

        // 本体と索引を同時に書き、片方だけ残る状態を作らない
        let _: () = redis::pipe()
            .atomic()
            .set_ex(session_key(&session_id), payload, SESSION_TTL_SECONDS)
            .sadd(&index, &session_id)
            .expire(&index, SESSION_TTL_SECONDS as i64)
            .query_async(&mut self.conn.clone())
            .await?;

        Ok(session_id)
    }

    async fn get(&self, session_id: &str) -> Result<Option<SessionData>, InfraError> {
        let payload: Option<String> = self.conn.clone().get(session_key(session_id)).await?;
        Ok(payload
            .map(|json| serde_json::from_str(&json))
            .transpose()?)
    }

    async fn delete(&self, session_id: &str) -> Result<(), InfraError> {
        let _: () = self.conn.clone().del(session_key(session_id)).await?;
        Ok(())
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%user_id))]
    async fn delete_all_for_user(&self, user_id: &UserId) -> Result<(), InfraError> {
        let mut conn = self.conn.clone();
        let index = user_sessions_key(user_id);

        let session_ids: Vec<String> = conn.smembers(&index).await?;
        let keys: Vec<String> = session_ids
            .iter()
            .map(|id| session_key(id))
            .chain(std::iter::once(index))
            .collect();

        let _: () = conn.del(keys).await?;
        tracing::debug!(count = session_ids.len(), "ユーザーのセッションを破棄");
        Ok(())
    }

    async fn ping(&self) -> Result<(), InfraError> {
        let _: String = redis::cmd("PING").query_async(&mut self.conn.clone()).await?;
        Ok(())
    }
}
