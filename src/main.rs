use clap::Parser;

use pageview_history::cli::Cli;
use pageview_history::config::{StaticConfig, init_config_with};
use pageview_history::interfaces::cli::run_cli_command;
use pageview_history::system::init_logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = match cli.config.as_deref() {
        Some(path) => StaticConfig::load_from(path),
        None => StaticConfig::load(),
    };
    if let Some(url) = cli.database {
        config.database.database_url = url;
    }

    // 日志初始化失败不影响命令执行
    let guard = match init_logging(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{}", e.format_simple());
            None
        }
    };

    init_config_with(config);

    let result = run_cli_command(cli.command).await;
    drop(guard);

    if let Err(e) = result {
        eprintln!("{}", e.format_colored());
        std::process::exit(1);
    }
}
