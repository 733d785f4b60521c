//! # 休暇申請
//!
//! 休暇申請と承認チェーンのドメインモデルを定義する。
//!
//! ## 承認の流れ
//!
//! ```text
//! submit ──► Pending(Director) ──► Pending(DepartmentalHead) ──► Pending(HrDirector) ──► Approved
//!                 │                          │                            │
//!                 └──────── reject ──────────┴────────────────────────────┴──────► Rejected
//!                 └──────── cancel（申請者のみ）─────────────────────────────────► Cancelled
//! ```
//!
//! 状態は [`LeaveRequestState`] の ADT でのみ表現し、
//! 全体ステータスは常にそこから導出する。
//!
//! ## モジュール構成
//!
//! - [`period`] - 休暇期間と営業日計算
//! - [`stage`] - 承認段階と推薦記録
//! - [`request`] - 休暇申請エンティティ（ステートマシン）
//! - [`policy`] - 申請時のルール
//! - [`balance`] - 年次休暇の残日数

pub mod balance;
pub mod period;
pub mod policy;
pub mod request;
pub mod stage;

pub use balance::AnnualLeaveBalance;
pub use period::LeavePeriod;
pub use policy::LeavePolicy;
pub use request::{
    ApprovedState,
    CancelledState,
    LeaveRequest,
    LeaveRequestId,
    LeaveRequestRecord,
    LeaveRequestState,
    LeaveRequestStatus,
    LeaveType,
    NewLeaveRequest,
    PendingState,
    RejectedState,
};
pub use stage::{ApprovalStage, Decision, Recommendation};
