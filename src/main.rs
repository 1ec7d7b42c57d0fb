use projectdesk_lib::config::{self, LogFormat};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "projectdesk=info,projectdesk_lib=info,tower_http=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = config::command().get_matches();
    let (config, log_format) = config::from_matches(&matches)?;
    init_tracing(log_format);

    tracing::info!(
        bind = %config.bind,
        demo_data = config.demo_data,
        preview_timeout_secs = ?config.preview_timeout_secs,
        "starting projectdesk"
    );
    projectdesk_lib::run(config).await
}
