use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const CRATE_TARGET: &str = "sku_waterfall";

/// `RUST_LOG` wins; otherwise this crate logs at info, or debug when verbose.
fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(format!("{}=debug,info", CRATE_TARGET))
        } else {
            EnvFilter::new(format!("{}=info", CRATE_TARGET))
        }
    })
}

/// 終端機用的精簡格式
pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// JSON 格式日誌，供排程或日誌收集系統使用
pub fn init_json_logger() {
    tracing_subscriber::registry()
        .with(env_filter(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .json()
                .with_current_span(false),
        )
        .init();
}
