//! # ライブ更新ハブ
//!
//! 休暇申請・ロスター・ユーザーの変更を WebSocket クライアントへ配信する。
//!
//! プロセス全体で 1 つの [`EventHub`] が `tokio::sync::broadcast` チャネルを持ち、
//! 各接続は購読したイベントのうち [`LiveEvent::is_visible_to`] が真のものだけを送る。
//!
//! ## 配信ルール
//!
//! | イベント | 受信者 |
//! |---------|--------|
//! | `leave_submitted` / `leave_updated` | 管理者、申請者本人、現在の段階を判断できる承認者 |
//! | `roster_updated` | 全員 |
//! | `user_updated` | 管理者、対象ユーザー本人 |

use leaveflow_domain::{
    leave::{ApprovalStage, LeaveRequest, LeaveRequestStatus},
    roster::RosterEntryId,
    user::{UserId, UserRole, UserStatus},
};
use leaveflow_infra::SessionData;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// 休暇申請イベントのペイロード
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaveEventPayload {
    pub leave_id:      Uuid,
    pub employee_id:   UserId,
    pub department:    String,
    pub status:        LeaveRequestStatus,
    pub current_stage: Option<ApprovalStage>,
    pub version:       u32,
}

impl LeaveEventPayload {
    pub fn of(request: &LeaveRequest) -> Self {
        Self {
            leave_id:      *request.id().as_uuid(),
            employee_id:   request.employee_id().clone(),
            department:    request.department().as_str().to_string(),
            status:        request.status(),
            current_stage: request.current_stage(),
            version:       request.version().as_u32(),
        }
    }
}

/// ロスターの変更種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterChange {
    Created,
    Deleted,
}

/// クライアントに配信するイベント
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    LeaveSubmitted(LeaveEventPayload),
    LeaveUpdated(LeaveEventPayload),
    RosterUpdated {
        entry_id: Uuid,
        change:   RosterChange,
    },
    UserUpdated {
        user_id: UserId,
        status:  UserStatus,
    },
}

impl LiveEvent {
    pub fn roster_updated(entry_id: &RosterEntryId, change: RosterChange) -> Self {
        Self::RosterUpdated {
            entry_id: *entry_id.as_uuid(),
            change,
        }
    }

    /// 接続中のユーザーがこのイベントを受け取るか
    pub fn is_visible_to(&self, viewer: &Viewer) -> bool {
        if viewer.role == UserRole::Admin {
            return true;
        }

        match self {
            Self::LeaveSubmitted(leave) | Self::LeaveUpdated(leave) => {
                if leave.employee_id == viewer.user_id {
                    return true;
                }
                leave.current_stage.is_some_and(|stage| {
                    viewer.role == stage.required_role()
                        && (!stage.requires_same_department()
                            || leave.department == viewer.department)
                })
            }
            Self::RosterUpdated { .. } => true,
            Self::UserUpdated { user_id, .. } => user_id == &viewer.user_id,
        }
    }
}

/// WebSocket 接続の閲覧者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id:    UserId,
    pub role:       UserRole,
    pub department: String,
}

impl From<&SessionData> for Viewer {
    fn from(session: &SessionData) -> Self {
        Self {
            user_id:    session.user_id().clone(),
            role:       session.role(),
            department: session.department().to_string(),
        }
    }
}

/// 遅延したクライアントに送る再同期メッセージ
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename = "resync")]
pub struct ResyncNotice {
    pub missed: u64,
}

/// ライブ更新のブロードキャストハブ
#[derive(Debug, Clone)]
pub struct EventHub {
    sender: broadcast::Sender<LiveEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// イベントを配信する
    ///
    /// 購読者がいない場合も成功として扱う。
    pub fn publish(&self, event: LiveEvent) {
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(receivers, "ライブ更新を配信しました"),
            Err(_) => tracing::debug!("ライブ更新の購読者がいません"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.sender.subscribe()
    }
}

/// イベントを WebSocket のテキストフレームに変換する
pub fn render_frame<T: Serialize>(message: &T) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!(
                error.category = leaveflow_shared::event_log::error::category::INFRASTRUCTURE,
                error.kind = leaveflow_shared::event_log::error::kind::LIVE_UPDATE,
                "ライブ更新のシリアライズに失敗: {}",
                e
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn viewer(role: UserRole, department: &str) -> Viewer {
        Viewer {
            user_id: UserId::new(),
            role,
            department: department.to_string(),
        }
    }

    fn leave_event(employee_id: UserId, stage: Option<ApprovalStage>) -> LiveEvent {
        LiveEvent::LeaveUpdated(LeaveEventPayload {
            leave_id: Uuid::now_v7(),
            employee_id,
            department: "Engineering".to_string(),
            status: if stage.is_some() {
                LeaveRequestStatus::Pending
            } else {
                LeaveRequestStatus::Approved
            },
            current_stage: stage,
            version: 2,
        })
    }

    #[rstest]
    #[case(UserRole::Director, "Engineering", Some(ApprovalStage::Director), true)]
    #[case(UserRole::Director, "Sales", Some(ApprovalStage::Director), false)]
    #[case(UserRole::DepartmentalHead, "Engineering", Some(ApprovalStage::Director), false)]
    #[case(UserRole::HrDirector, "Sales", Some(ApprovalStage::HrDirector), true)]
    #[case(UserRole::Employee, "Engineering", Some(ApprovalStage::Director), false)]
    #[case(UserRole::Admin, "Sales", None, true)]
    #[case(UserRole::HrDirector, "Engineering", None, false)]
    fn test_休暇イベントは判断できる承認者と管理者に届く(
        #[case] role: UserRole,
        #[case] department: &str,
        #[case] stage: Option<ApprovalStage>,
        #[case] expected: bool,
    ) {
        let event = leave_event(UserId::new(), stage);

        assert_eq!(event.is_visible_to(&viewer(role, department)), expected);
    }

    #[test]
    fn test_申請者本人は自分の休暇イベントを受け取る() {
        let me = viewer(UserRole::Employee, "Engineering");
        let event = leave_event(me.user_id.clone(), None);

        assert!(event.is_visible_to(&me));
    }

    #[test]
    fn test_ユーザー更新は本人にのみ届く() {
        let me = viewer(UserRole::Employee, "Engineering");
        let event = LiveEvent::UserUpdated {
            user_id: me.user_id.clone(),
            status:  UserStatus::Inactive,
        };

        assert!(event.is_visible_to(&me));
        assert!(!event.is_visible_to(&viewer(UserRole::Director, "Engineering")));
    }

    #[test]
    fn test_イベントはtypeタグ付きのjsonになる() {
        let entry_id = RosterEntryId::new();
        let event = LiveEvent::roster_updated(&entry_id, RosterChange::Deleted);

        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "roster_updated",
                "entry_id": entry_id.as_uuid(),
                "change": "deleted",
            })
        );
        assert_eq!(
            render_frame(&ResyncNotice { missed: 3 }).unwrap(),
            r#"{"type":"resync","missed":3}"#
        );
    }

    #[tokio::test]
    async fn test_購読者がいなくても配信できる() {
        let hub = EventHub::new(4);
        hub.publish(LiveEvent::roster_updated(
            &RosterEntryId::new(),
            RosterChange::Created,
        ));

        let mut rx = hub.subscribe();
        let event = LiveEvent::roster_updated(&RosterEntryId::new(), RosterChange::Created);
        hub.publish(event.clone());

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_バッファを超えた購読者は遅延を検知する() {
        let hub = EventHub::new(1);
        let mut rx = hub.subscribe();

        for _ in 0..3 {
            hub.publish(LiveEvent::roster_updated(
                &RosterEntryId::new(),
                RosterChange::Created,
            ));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
    }
}
