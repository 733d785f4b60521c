//! # ミドルウェア
//!
//! API サーバー用のミドルウェアを提供する。

mod authz;

pub use authz::{AuthzState, require_role};
