use std::path::PathBuf;

use blogger::{jobs, settings, storage, user_sync, web};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "blogger",
    version,
    about = "Blog with categories, articles and authors"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the web server (default)
    Serve,
    /// Create or update authors from a JSON file, then exit
    SyncUsers {
        /// Path to the users JSON file
        file: PathBuf,
    },
    /// Delete expired login sessions, then exit
    CleanupSessions,
    /// Replace an author's password, then exit
    SetPassword {
        username: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // logging
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // load settings
    let settings = settings::Settings::load(&cli.config)?;
    tracing::info!(
        server = ?settings.server,
        database = ?settings.database,
        "Loaded configuration"
    );

    // init storage (database + migrations)
    let db = storage::init(&settings.database).await?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::SyncUsers { file } => {
            user_sync::sync_users_from_file(&db, &file).await?;
        }
        Command::CleanupSessions => {
            jobs::run_job(&db, jobs::CLEANUP_EXPIRED_SESSIONS).await?;
        }
        Command::SetPassword { username, password } => {
            storage::set_user_password(&db, &username, &password).await?;
            tracing::info!(%username, "Password updated");
        }
        Command::Serve => {
            ensure_admin_user(&db, &settings.bootstrap).await?;

            if let Some(users_file) = &settings.bootstrap.users_file {
                user_sync::sync_users_from_file(&db, users_file).await?;
            }

            // keep the scheduler alive for the lifetime of the server
            let _scheduler = jobs::init_scheduler(db.clone()).await?;

            web::serve(settings, db).await?;
        }
    }

    Ok(())
}

async fn ensure_admin_user(
    db: &sea_orm::DatabaseConnection,
    bootstrap: &settings::Bootstrap,
) -> Result<()> {
    let Some(password) = &bootstrap.admin_password else {
        return Ok(());
    };

    if storage::get_user_by_username(db, &bootstrap.admin_username)
        .await
        .into_diagnostic()?
        .is_none()
    {
        storage::create_user(db, &bootstrap.admin_username, password, None, true)
            .await
            .into_diagnostic()?;
        tracing::info!(
            username = %bootstrap.admin_username,
            "Created bootstrap admin user"
        );
    }
    Ok(())
}
