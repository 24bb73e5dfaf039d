use clap::Parser;

mod cli;
mod config;
mod ingest;
mod store;
mod sync;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = cli::Cli::parse();

    let code = match cli.command {
        cli::Commands::Sync(args) => cli::commands::sync::handle_sync_command(args).await,
    };

    std::process::exit(code);
}
