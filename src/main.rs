use std::{error::Error, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use foodgram::{
    actions::{import::load_ingredients_file, tokens::purge_expired_tokens, users},
    config::{AppConfig, DEFAULT_CONFIG_FILE},
    connection::{connect, migrate},
    context::Context,
    cryptography::generate_secret,
    error::ApiError,
    form::Form,
    logging::setup_logging,
    routes::start_server,
    schema::UserRole,
};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(version, about = "Recipe sharing API server")]
struct CliOpts {
    /// Configuration file, FOODGRAM__* environment variables take precedence
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply migrations and serve the HTTP API
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Import ingredients from a `name,measurement_unit` CSV file
    LoadIngredients { path: PathBuf },
    /// Create a user with the admin role
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "Admin")]
        first_name: String,
        #[arg(long, default_value = "Admin")]
        last_name: String,
        /// Generated and printed when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

async fn run(cli: CliOpts) -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load_from(&cli.config)?;
    let pool = connect(&config.database).await.map_err(ApiError::from)?;

    match cli.command {
        Command::Serve => {
            migrate(&pool).await.map_err(ApiError::from)?;
            let purged = purge_expired_tokens(&pool).await?;
            if purged > 0 {
                log::info!("purged {purged} expired token revocations");
            }
            start_server(Context::new(pool, config)).await?;
        }
        Command::Migrate => {
            migrate(&pool).await.map_err(ApiError::from)?;
            log::info!("migrations applied");
        }
        Command::LoadIngredients { path } => {
            migrate(&pool).await.map_err(ApiError::from)?;
            let report = load_ingredients_file(&path, &pool).await?;
            println!(
                "Loaded {} ingredients ({} already present)",
                report.inserted, report.skipped
            );
        }
        Command::CreateAdmin {
            email,
            username,
            first_name,
            last_name,
            password,
        } => {
            migrate(&pool).await.map_err(ApiError::from)?;
            let generated = password.is_none();
            let password = password.unwrap_or_else(|| generate_secret(16));

            let form = Form::from_data(serde_json::from_value(json!({
                "email": email,
                "username": username,
                "first_name": first_name,
                "last_name": last_name,
                "password": password,
            }))?);
            let user = users::NewUser::from_form(&form)?;
            let admin = users::register_user(&user, UserRole::Admin, &pool).await?;

            println!("Created admin {} (id {})", admin.username, admin.id);
            if generated {
                println!("Password: {password}");
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    setup_logging();

    let cli = CliOpts::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
