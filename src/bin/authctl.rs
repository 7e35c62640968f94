use auth_template_api::cli::{self, Cli, Commands};
use auth_template_api::logging;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let default_filter = match cli.command {
        Commands::Serve(_) => "info",
        _ => "warn",
    };
    logging::init_tracing(default_filter);

    if let Err(e) = cli::run(cli).await {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }

    Ok(())
}
