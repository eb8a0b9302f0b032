//! Storefront Application CLI

use std::process;

use clap::{Args, Parser, Subcommand};
use storefront::{
    auth::{GoogleTokenInfoClient, GoogleVerifierConfig, PgAuthService, SmsGatewayClient, SmsGatewayConfig},
    database,
    domain::settings::{PgSettingsService, SettingsService, models::SiteSettingsUpdate},
};

use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "storefront", about = "Storefront CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run pending database migrations.
    Migrate(DatabaseArgs),
    Admin(AdminCommand),
    Settings(SettingsCommand),
}

#[derive(Debug, Args)]
struct DatabaseArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
}

#[derive(Debug, Args)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Debug, Subcommand)]
enum AdminSubcommand {
    /// Grant the admin role to an existing account.
    Promote(PromoteArgs),
}

#[derive(Debug, Args)]
struct PromoteArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    /// Email of the account to promote
    #[arg(long)]
    email: String,
}

#[derive(Debug, Args)]
struct SettingsCommand {
    #[command(subcommand)]
    command: SettingsSubcommand,
}

#[derive(Debug, Subcommand)]
enum SettingsSubcommand {
    /// Print the site settings singleton.
    Show(DatabaseArgs),
    /// Patch site settings; omitted fields keep their value.
    Set(SetSettingsArgs),
}

#[derive(Debug, Args)]
struct SetSettingsArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    #[arg(long)]
    footer_text: Option<String>,

    #[arg(long)]
    contact_email: Option<String>,

    #[arg(long)]
    phone: Option<String>,

    /// Telegram chat that receives order alerts
    #[arg(long)]
    telegram_chat_id: Option<String>,
}

#[tokio::main]
pub async fn main() {
    let _env = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(error) = run(cli).await {
        eprintln!("{error}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Migrate(args) => migrate(args).await,
        Commands::Admin(AdminCommand {
            command: AdminSubcommand::Promote(args),
        }) => promote(args).await,
        Commands::Settings(SettingsCommand { command }) => match command {
            SettingsSubcommand::Show(args) => show_settings(args).await,
            SettingsSubcommand::Set(args) => set_settings(args).await,
        },
    }
}

async fn migrate(args: DatabaseArgs) -> Result<(), String> {
    let pool = connect(&args.database_url).await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|error| format!("migration failed: {error}"))?;

    println!("migrations are up to date");

    Ok(())
}

async fn promote(args: PromoteArgs) -> Result<(), String> {
    let pool = connect(&args.database.database_url).await?;

    // The promote path never touches the sign-in providers; defaults
    // from the environment are enough to construct the service.
    let auth = PgAuthService::new(
        pool,
        Arc::new(GoogleTokenInfoClient::new(GoogleVerifierConfig {
            endpoint: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            client_id: std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
        })),
        Arc::new(SmsGatewayClient::new(SmsGatewayConfig {
            endpoint: std::env::var("SMS_API_URL").unwrap_or_default(),
            api_key: std::env::var("SMS_API_KEY").unwrap_or_default(),
            sender: std::env::var("SMS_SENDER").unwrap_or_default(),
        })),
    );

    let user = auth
        .promote_to_admin(&args.email)
        .await
        .map_err(|error| format!("failed to promote account: {error}"))?;

    println!("user_uuid: {}", user.uuid);
    println!("username: {}", user.username);
    println!("role: {}", user.role);

    Ok(())
}

async fn show_settings(args: DatabaseArgs) -> Result<(), String> {
    let settings = settings_service(&args.database_url).await?
        .get_settings()
        .await
        .map_err(|error| format!("failed to read settings: {error}"))?;

    println!("footer_text: {}", display(settings.footer_text.as_deref()));
    println!(
        "contact_email: {}",
        display(settings.contact_email.as_deref())
    );
    println!("phone: {}", display(settings.phone.as_deref()));
    println!(
        "telegram_chat_id: {}",
        display(settings.telegram_chat_id.as_deref())
    );

    Ok(())
}

async fn set_settings(args: SetSettingsArgs) -> Result<(), String> {
    let settings = settings_service(&args.database.database_url)
        .await?
        .update_settings(SiteSettingsUpdate {
            footer_text: args.footer_text,
            contact_email: args.contact_email,
            phone: args.phone,
            telegram_chat_id: args.telegram_chat_id,
        })
        .await
        .map_err(|error| format!("failed to update settings: {error}"))?;

    println!("telegram_chat_id: {}", display(settings.telegram_chat_id.as_deref()));
    println!("settings updated");

    Ok(())
}

async fn settings_service(database_url: &str) -> Result<PgSettingsService, String> {
    let pool = connect(database_url).await?;

    Ok(PgSettingsService::new(storefront::database::Db::new(pool)))
}

async fn connect(database_url: &str) -> Result<sqlx::PgPool, String> {
    database::connect(database_url)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))
}

fn display(value: Option<&str>) -> &str {
    value.unwrap_or("(unset)")
}
