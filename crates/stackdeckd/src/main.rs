use clap::{Parser, ValueEnum};
use stackdeck_config::{SettingsOverrides, load_settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stackdeckd")]
#[command(version, about = "docker compose サービスのステータスを配信するデーモン", long_about = None)]
struct Cli {
    /// モノレポのルートディレクトリ
    #[arg(long)]
    root: Option<PathBuf>,
    /// 待ち受けホスト
    #[arg(long)]
    host: Option<String>,
    /// 待ち受けポート
    #[arg(short, long)]
    port: Option<u16>,
    /// 設定ファイル (stackdeck.kdl)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// ログの出力形式
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let overrides = SettingsOverrides {
        config: cli.config,
        root: cli.root,
        host: cli.host,
        port: cli.port,
    };
    let settings = load_settings(&overrides)?;

    stackdeckd::run(settings, shutdown_signal()).await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
