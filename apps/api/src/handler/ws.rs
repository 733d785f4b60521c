//! # ライブ更新ハンドラ（WebSocket）
//!
//! `GET /api/v1/ws` でセッションを検証したうえで WebSocket にアップグレードし、
//! [`EventHub`] のイベントのうち接続ユーザーが受け取るべきものを JSON で送る。
//!
//! 受信が追いつかずにイベントを取りこぼした場合は
//! `{"type":"resync","missed":n}` を送り、クライアントに再取得を促す。

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use axum_extra::extract::CookieJar;
use futures::StreamExt;
use leaveflow_infra::SessionManager;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};

use crate::{
    error::{ApiError, get_session},
    live::{EventHub, LiveEvent, ResyncNotice, Viewer, render_frame},
};

/// ライブ更新の共有状態
pub struct LiveState {
    pub hub:             EventHub,
    pub session_manager: Arc<dyn SessionManager>,
}

/// GET /api/v1/ws
#[tracing::instrument(skip_all)]
pub async fn live_updates(
    State(state): State<Arc<LiveState>>,
    jar: CookieJar,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let (_, session) = get_session(state.session_manager.as_ref(), &jar).await?;
    let viewer = Viewer::from(&session);
    // アップグレード前に購読し、接続直後のイベントを取りこぼさない
    let receiver = state.hub.subscribe();

    tracing::info!(user_id = %viewer.user_id, "ライブ更新の接続を開始");
    Ok(ws.on_upgrade(move |socket| forward_events(socket, receiver, viewer)))
}

/// 接続が閉じるまでイベントを転送する
async fn forward_events(
    mut socket: WebSocket,
    receiver: broadcast::Receiver<LiveEvent>,
    viewer: Viewer,
) {
    let mut events = BroadcastStream::new(receiver);

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            event = events.next() => {
                let Some(event) = event else { break };
                let Some(text) = frame_for(&viewer, event) else { continue };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    tracing::info!(user_id = %viewer.user_id, "ライブ更新の接続を終了");
}

/// 受信結果を送信するフレームに変換する（対象外のイベントは `None`）
fn frame_for(
    viewer: &Viewer,
    event: Result<LiveEvent, BroadcastStreamRecvError>,
) -> Option<String> {
    match event {
        Ok(event) if event.is_visible_to(viewer) => render_frame(&event),
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            tracing::warn!(user_id = %viewer.user_id, missed, "ライブ更新が遅延したため再同期を要求");
            render_frame(&ResyncNotice { missed })
        }
    }
}

#[cfg(test)]
mod tests {
    use leaveflow_domain::{
        roster::RosterEntryId,
        user::{UserId, UserRole, UserStatus},
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::live::RosterChange;

    fn viewer(role: UserRole) -> Viewer {
        Viewer {
            user_id: UserId::new(),
            role,
            department: "Engineering".to_string(),
        }
    }

    #[test]
    fn test_遅延時は再同期メッセージを送る() {
        let frame = frame_for(
            &viewer(UserRole::Employee),
            Err(BroadcastStreamRecvError::Lagged(3)),
        );

        assert_eq!(frame.as_deref(), Some(r#"{"type":"resync","missed":3}"#));
    }

    #[test]
    fn test_対象外のイベントは送らない() {
        let other = LiveEvent::UserUpdated {
            user_id: UserId::new(),
            status:  UserStatus::Inactive,
        };

        assert_eq!(frame_for(&viewer(UserRole::Employee), Ok(other.clone())), None);
        assert!(frame_for(&viewer(UserRole::Admin), Ok(other)).is_some());
    }

    #[test]
    fn test_ロスター更新は全員に送る() {
        let event = LiveEvent::roster_updated(&RosterEntryId::new(), RosterChange::Deleted);

        let frame = frame_for(&viewer(UserRole::Employee), Ok(event)).unwrap();

        let json: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(json["type"], "roster_updated");
        assert_eq!(json["change"], "deleted");
    }
}
