//! # ヘルスチェックのレスポンス
//!
//! - `GET /health`: [`HealthResponse`]（プロセスが応答できるか）
//! - `GET /health/ready`: [`ReadinessResponse`]（PostgreSQL と Redis に届くか）

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Liveness のレスポンス
///
/// ```
/// use leaveflow_shared::HealthResponse;
///
/// let response = HealthResponse::healthy("0.1.0");
/// assert_eq!(response.status, "healthy");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status:  String,
    pub version: String,
}

impl HealthResponse {
    pub fn healthy(version: impl Into<String>) -> Self {
        Self {
            status:  "healthy".to_string(),
            version: version.into(),
        }
    }
}

/// 依存先ごとの疎通結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessStatus {
    Ready,
    NotReady,
}

/// Readiness のレスポンス（`checks` は依存先名の昇順）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: ReadinessStatus,
    pub checks: BTreeMap<String, CheckStatus>,
}

impl ReadinessResponse {
    /// 1 件でも `Error` があれば `NotReady`
    pub fn from_checks<'a>(checks: impl IntoIterator<Item = (&'a str, CheckStatus)>) -> Self {
        let checks: BTreeMap<String, CheckStatus> = checks
            .into_iter()
            .map(|(name, status)| (name.to_string(), status))
            .collect();
        let status = if checks.values().all(|c| *c == CheckStatus::Ok) {
            ReadinessStatus::Ready
        } else {
            ReadinessStatus::NotReady
        };
        Self { status, checks }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ReadinessStatus::Ready
    }
}
