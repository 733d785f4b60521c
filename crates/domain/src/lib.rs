//! # LeaveFlow ドメイン層
//!
//! 休暇申請・承認ワークフローの中核を担うドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! このクレートは DDD（ドメイン駆動設計）の原則に従い、以下を提供する:
//!
//! - **エンティティ**: 一意の識別子を持つオブジェクト（例: User, LeaveRequest）
//! - **値オブジェクト**: 識別子を持たない不変オブジェクト（例: LeavePeriod, Version）
//! - **ドメインサービス**: エンティティに属さないビジネスロジック（例: LeavePolicy）
//! - **ドメインエラー**: ビジネスルール違反を表現するエラー型
//!
//! ## 依存関係の方向
//!
//! ```text
//! api → infra → domain → shared
//! ```
//!
//! ドメイン層はインフラ層（DB、外部サービス）には一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメイン層で発生するエラーの定義
//! - [`user`] - ユーザー・ロール・部署
//! - [`leave`] - 休暇申請と承認チェーン（ADT ステートマシン）
//! - [`roster`] - 休暇ロスターとカレンダー表示
//! - [`audit_log`] - 監査ログ
//!
//! ## 使用例
//!
//! ```rust
//! use leaveflow_domain::{DomainError, leave::ApprovalStage};
//!
//! // 承認チェーンは Director → DepartmentalHead → HRDirector の固定順
//! assert_eq!(ApprovalStage::Director.next(), Some(ApprovalStage::DepartmentalHead));
//!
//! let error = DomainError::NotFound {
//!     entity_type: "LeaveRequest",
//!     id:          "lr-123".to_string(),
//! };
//! assert!(error.to_string().contains("LeaveRequest"));
//! ```

#[macro_use]
mod macros;

pub mod audit_log;
pub mod clock;
pub mod error;
pub mod leave;
pub mod password;
pub mod roster;
pub mod user;
pub mod value_objects;

pub use error::DomainError;
