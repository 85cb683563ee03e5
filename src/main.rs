use clap::{Parser, Subcommand};

use recipe_api::{
    app,
    auth::services::{self, NewAccount},
    state::AppState,
};

#[derive(Parser)]
#[command(name = "recipe-api", version, about = "Recipe management API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Create a staff superuser account
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, default_value = "")]
        name: String,
    },
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipe_api=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    let app_state = AppState::init().await?;
    sqlx::migrate!("./migrations").run(&app_state.db).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let (host, port) = (app_state.config.host.clone(), app_state.config.port);
            let app = app::build_app(app_state);
            app::serve(app, &host, port).await?;
        }
        Command::CreateSuperuser {
            email,
            password,
            name,
        } => {
            let account = NewAccount::validate(Some(&email), Some(&password), Some(&name))
                .map_err(|e| anyhow::anyhow!("invalid superuser: {:?}", e))?;
            let user = services::create_superuser(&app_state.db, account)
                .await
                .map_err(|e| anyhow::anyhow!("create superuser failed: {:?}", e))?;
            tracing::info!(user_id = user.id, email = %user.email, "superuser created");
        }
    }

    Ok(())
}
