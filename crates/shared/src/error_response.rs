//! # エラーレスポンス（RFC 9457 Problem Details）
//!
//! ```json
//! {
//!   "type": "https://leaveflow.example.com/problems/conflict",
//!   "title": "Conflict",
//!   "status": 409,
//!   "detail": "休暇申請は他の操作で更新されています"
//! }
//! ```
//!
//! HTTP への変換（`IntoResponse`）は API クレートで行う。

use serde::{Deserialize, Serialize};

const PROBLEM_TYPE_BASE: &str = "https://leaveflow.example.com/problems";

/// LeaveFlow が返す問題の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ProblemKind {
    pub fn status(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Internal => 500,
        }
    }

    fn slug_and_title(self) -> (&'static str, &'static str) {
        match self {
            Self::BadRequest => ("bad-request", "Bad Request"),
            Self::Unauthorized => ("unauthorized", "Unauthorized"),
            Self::Forbidden => ("forbidden", "Forbidden"),
            Self::NotFound => ("not-found", "Not Found"),
            Self::Conflict => ("conflict", "Conflict"),
            Self::Internal => ("internal-error", "Internal Server Error"),
        }
    }
}

/// エラーレスポンスのボディ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title:        String,
    pub status:       u16,
    pub detail:       String,
}

impl ErrorResponse {
    pub fn of(kind: ProblemKind, detail: impl Into<String>) -> Self {
        let (slug, title) = kind.slug_and_title();
        Self {
            problem_type: format!("{PROBLEM_TYPE_BASE}/{slug}"),
            title:        title.to_string(),
            status:       kind.status(),
            detail:       detail.into(),
        }
    }

    /// 500 応答。内部の詳細はクライアントに返さない
    pub fn internal_error() -> Self {
        Self::of(ProblemKind::Internal, "内部エラーが発生しました")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_競合はrfc9457形式で出力される() {
        let body = ErrorResponse::of(ProblemKind::Conflict, "休暇申請は他の操作で更新されています");

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({
                "type": "https://leaveflow.example.com/problems/conflict",
                "title": "Conflict",
                "status": 409,
                "detail": "休暇申請は他の操作で更新されています",
            })
        );
    }

    #[rstest]
    #[case(ProblemKind::BadRequest, 400)]
    #[case(ProblemKind::Unauthorized, 401)]
    #[case(ProblemKind::Forbidden, 403)]
    #[case(ProblemKind::NotFound, 404)]
    #[case(ProblemKind::Internal, 500)]
    fn test_種類ごとのステータス(#[case] kind: ProblemKind, #[case] status: u16) {
        assert_eq!(ErrorResponse::of(kind, "").status, status);
    }

    #[test]
    fn test_内部エラーは固定の文言を返す() {
        let body = ErrorResponse::internal_error();

        assert_eq!(body.status, 500);
        assert_eq!(body.detail, "内部エラーが発生しました");
    }
}
