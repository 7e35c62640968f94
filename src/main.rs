use auth_template_api::cli::commands::serve::{self, ServeArgs};
use auth_template_api::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, AUTH_SECRET, etc.
    let _ = dotenvy::dotenv();

    logging::init_tracing("info");

    serve::handle(ServeArgs {
        memory: false,
        port: None,
        host: None,
    })
    .await
}
