//! # トレーシングの初期化
//!
//! | 環境変数 | 既定 | 内容 |
//! |---|---|---|
//! | `LOG_FORMAT` | `pretty` | `json` で 1 行 1 JSON の出力 |
//! | `RUST_LOG` | `info,leaveflow=debug` | `EnvFilter` の指定 |
//!
//! HTTP リクエストは [`make_request_span`] のスパンで囲まれ、
//! 同じ `request_id` を持つログを辿れる。

/// `RUST_LOG` 未設定時のフィルタ
pub const DEFAULT_FILTER: &str = "info,leaveflow=debug";

/// リクエスト ID を運ぶヘッダー
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// `LOG_FORMAT` の値を解釈する
    ///
    /// 未設定は `Pretty`。知らない値も `Pretty` にして stderr に警告する
    /// （この時点ではまだ subscriber が無い）。
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None | Some("pretty") => Self::Pretty,
            Some("json") => Self::Json,
            Some(other) => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub service_name: String,
    pub log_format:   LogFormat,
}

impl TracingConfig {
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            log_format:   LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref()),
        }
    }
}

/// グローバル subscriber を登録する（プロセスで 1 回だけ呼ぶ）
#[cfg(feature = "observability")]
pub fn init_tracing(config: TracingConfig) {
    use tracing_subscriber::{EnvFilter, Layer as _, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let output = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .with(tracing_error::ErrorLayer::default())
        .init();

    tracing::debug!(
        service = %config.service_name,
        format = ?config.log_format,
        "トレーシングを初期化しました"
    );
}

/// `TraceLayer::make_span_with` に渡すスパン生成関数
///
/// `SetRequestIdLayer` が採番した ID が無い場合は `-` を記録する。
#[cfg(feature = "observability")]
pub fn make_request_span<B>(request: &http::Request<B>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}
