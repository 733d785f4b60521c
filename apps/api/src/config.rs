//! # アプリケーション設定
//!
//! 環境変数からアプリケーション設定を読み込む。
//!
//! ## 環境変数一覧
//!
//! | 変数名 | 必須 | デフォルト | 説明 |
//! |--------|------|------------|------|
//! | `API_HOST` | No | `0.0.0.0` | バインドアドレス |
//! | `API_PORT` | No | `3000` | ポート番号 |
//! | `DATABASE_URL` | **Yes** | - | PostgreSQL 接続 URL |
//! | `DATABASE_MAX_CONNECTIONS` | No | `10` | 接続プールの最大接続数 |
//! | `REDIS_URL` | No | `redis://localhost:6379` | Redis 接続 URL |
//! | `ENVIRONMENT` | No | `development` | `production` で Cookie に Secure を付与 |
//! | `SHORT_LEAVE_MAX_DAYS` | No | `5` | 短期休暇の上限営業日数 |
//! | `LIVE_EVENT_CAPACITY` | No | `256` | ライブ更新のブロードキャストバッファ |
//!
//! ログ出力形式（`LOG_FORMAT`）は [`leaveflow_shared::observability`] が読む。

use std::{env, str::FromStr};

use leaveflow_domain::leave::LeavePolicy;

/// アプリケーション全体の設定
///
/// 起動時に一度だけ構築し、各コンポーネントに渡す。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    /// 実行環境（`development`, `staging`, `production`）
    pub environment: String,
    pub short_leave_max_days: u32,
    pub live_event_capacity: usize,
}

impl AppConfig {
    /// 環境変数から設定を読み込む
    ///
    /// `DATABASE_URL` が未設定の場合はエラーを返す。
    /// 数値の環境変数が不正な値の場合は起動を中断する。
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_or("API_PORT", 3000),
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10),
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            short_leave_max_days: parse_or(
                "SHORT_LEAVE_MAX_DAYS",
                LeavePolicy::DEFAULT_SHORT_LEAVE_MAX_DAYS,
            ),
            live_event_capacity: parse_or("LIVE_EVENT_CAPACITY", 256),
        })
    }

    /// 本番環境か（Cookie の Secure 属性の判定に使う）
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn leave_policy(&self) -> LeavePolicy {
        LeavePolicy::new(self.short_leave_max_days)
    }
}

fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => parse_value(name, &value),
        Err(_) => default,
    }
}

fn parse_value<T: FromStr>(name: &str, value: &str) -> T {
    value
        .trim()
        .parse()
        .unwrap_or_else(|_| panic!("{name} の値が不正です: {value:?}"))
}
