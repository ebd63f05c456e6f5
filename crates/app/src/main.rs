mod args;
mod commands;
mod prompt;

use args::{Args, Command, print_usage};
use services::{AppConfig, AppServices, Clock};

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1)).map_err(|e| {
        print_usage();
        e
    })?;

    if args.command == Command::Help {
        print_usage();
        return Ok(());
    }

    let mut config = AppConfig::from_env();
    args.apply(&mut config);
    log::debug!(
        "api={} db={} offline={}",
        config.api_url,
        config.db_url,
        config.offline
    );

    let app = AppServices::from_config(&config, Clock::system()).await?;

    if args.command.needs_session() && !config.offline && !app.auth().is_signed_in() {
        return Err("not signed in; run `tutor login` first".into());
    }

    commands::dispatch(&app, args.command).await
}

#[tokio::main]
async fn main() {
    // A missing .env file is fine.
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
