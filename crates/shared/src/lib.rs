//! # LeaveFlow 共有ユーティリティ
//!
//! API・インフラ・ドメインのどの層からも使う、業務ルールを含まない部品を置く。
//!
//! - [`envelope`]: `{ "data": ... }` 形式のレスポンスとカーソルページ
//! - [`error_response`]: RFC 9457 形式のエラーボディ
//! - [`health`]: liveness / readiness のレスポンス
//! - [`event_log`]: 業務イベントの構造化ログ
//! - [`observability`]: トレーシングの初期化とリクエストスパン（`observability` feature）

pub mod envelope;
pub mod error_response;
pub mod event_log;
pub mod health;
pub mod observability;

pub use envelope::{ApiResponse, PaginatedResponse};
pub use error_response::ErrorResponse;
pub use health::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
