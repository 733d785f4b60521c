//! # レスポンスエンベロープ
//!
//! LeaveFlow の JSON レスポンスはすべて `data` キーで包む。
//! 監査ログのようにカーソルで辿る一覧は `next_cursor` を併せて返す。
//!
//! ```json
//! { "data": { "id": "...", "status": "pending" } }
//! { "data": [ ... ], "next_cursor": "MjAyNi0wMy0wMlQ..." }
//! ```

use serde::{Deserialize, Serialize};

/// 単一リソースまたは一覧を返すエンベロープ
///
/// ```
/// use leaveflow_shared::ApiResponse;
///
/// let response = ApiResponse::new(vec!["annual", "short"]);
/// assert_eq!(response.data.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// カーソルページネーション付きの一覧
///
/// `next_cursor` が `null` なら最終ページ。カーソルの中身はクライアントから見て不透明。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data:        Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> PaginatedResponse<T> {
    /// 任意の要素列からページを作る
    pub fn from_page<I>(items: I, next_cursor: Option<String>) -> Self
    where
        I: IntoIterator,
        I::Item: Into<T>,
    {
        Self {
            data: items.into_iter().map(Into::into).collect(),
            next_cursor,
        }
    }

    pub fn is_last_page(&self) -> bool {
        self.next_cursor.is_none()
    }
}
