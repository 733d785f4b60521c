//! # LeaveFlow API サーバー
//!
//! 休暇申請と多段承認、ロスター管理を提供する REST / WebSocket API。
//!
//! ## モジュール構成
//!
//! - [`config`] - アプリケーション設定（環境変数からの読み込み）
//! - [`error`] - API エラー定義と HTTP レスポンスへの変換
//! - [`handler`] - HTTP / WebSocket リクエストハンドラ
//! - [`middleware`] - 管理者ロールの認可
//! - [`usecase`] - ビジネスロジック
//! - [`live`] - ライブ更新イベントの配信
//! - [`app_builder`] - ルーターの組み立て
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use leaveflow_api::app_builder::{AppDeps, build_app};
//!
//! let app = build_app(deps);
//! axum::serve(listener, app).await?;
//! ```

pub mod app_builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod live;
pub mod middleware;
pub mod usecase;
