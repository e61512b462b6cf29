use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sqlx::PgPool;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use toptier::auth::{AuthService, UserRole};
use toptier::config::{run_migrations, DatabaseSeeder, Settings};
use toptier::services::{
    prelaunch_campaigns, EbookService, EmailTemplateService, FacebookAdsClient, Mailer,
    MollieClient, PackageService,
};

/// One-shot seed and fix scripts for the Top Tier database
#[derive(Parser)]
#[command(name = "toptier-seed")]
#[command(about = "Seed and repair the Top Tier database", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations
    Migrate,

    /// Admin account, nutrition plans, training schemas, groups and template flags
    Demo {
        #[arg(long, env = "SEED_ADMIN_EMAIL", default_value = "admin@toptiermen.local")]
        admin_email: String,

        #[arg(long, env = "SEED_ADMIN_PASSWORD")]
        admin_password: String,
    },

    /// Import every *.html file of a directory as ebook chapters
    Ebooks {
        #[arg(long)]
        dir: PathBuf,

        /// CSS selector of the chapter body
        #[arg(long)]
        selector: Option<String>,
    },

    /// Create the prelaunch Facebook campaigns
    AdCampaigns {
        /// Validate and print the campaigns without calling the ads API
        #[arg(long)]
        dry_run: bool,

        #[arg(long, default_value = "2")]
        delay_secs: u64,
    },

    /// Re-run webhook handling for one Mollie payment
    SyncPayment {
        payment_id: String,
    },

    /// Change the role of an existing user
    SetRole {
        email: String,

        /// member, coach or admin
        role: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    let default_level = if cli.verbose { "debug" } else { settings.app.log_level.as_str() };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Migrate => {
            let pool = connect(&settings).await?;
            run_migrations(&pool).await?;
            tracing::info!("Migrations applied");
        }
        Commands::Demo {
            admin_email,
            admin_password,
        } => {
            let pool = connect(&settings).await?;
            run_migrations(&pool).await?;
            DatabaseSeeder::new(pool, &settings.app.jwt_secret)
                .seed_all(&admin_email, &admin_password)
                .await?;
        }
        Commands::Ebooks { dir, selector } => {
            let pool = connect(&settings).await?;
            let report = EbookService::new(pool)
                .import_directory(&dir, selector.as_deref())
                .await?;

            println!("Imported {} chapter(s)", report.imported.len());
            for (path, reason) in &report.failed {
                println!("  failed {}: {}", path.display(), reason);
            }
            if !report.failed.is_empty() {
                bail!("{} file(s) could not be imported", report.failed.len());
            }
        }
        Commands::AdCampaigns {
            dry_run,
            delay_secs,
        } => {
            let landing_url = format!("{}/prelaunch", settings.app.public_base_url);
            let campaigns = prelaunch_campaigns(&landing_url);

            for campaign in &campaigns {
                if let Err(reason) = campaign.validate() {
                    bail!("Invalid campaign template: {}", reason);
                }
            }

            if dry_run {
                println!("{}", serde_json::to_string_pretty(&campaigns)?);
                return Ok(());
            }

            let client = FacebookAdsClient::new(settings.facebook.clone())?;
            let outcomes = client
                .launch_sequence(&campaigns, Duration::from_secs(delay_secs))
                .await;

            let mut failed = 0;
            for outcome in &outcomes {
                match (&outcome.result, &outcome.error) {
                    (Some(result), _) => {
                        println!("{}: campaign {}", outcome.name, result.campaign_id);
                        for error in &result.errors {
                            println!("  warning: {}", error);
                        }
                    }
                    (None, Some(error)) => {
                        failed += 1;
                        println!("{}: FAILED {}", outcome.name, error);
                    }
                    (None, None) => {}
                }
            }
            if failed > 0 {
                bail!("{} of {} campaigns failed", failed, outcomes.len());
            }
        }
        Commands::SyncPayment { payment_id } => {
            let pool = connect(&settings).await?;
            let mailer = Mailer::new(settings.smtp.clone(), EmailTemplateService::new(pool.clone()))?;
            let mollie = MollieClient::new(&settings.mollie)?;
            let packages = PackageService::new(pool, mollie, mailer, &settings.app.public_base_url);

            match packages.handle_webhook(&payment_id).await? {
                Some(package) => println!(
                    "Package {} is now {}",
                    package.id,
                    package.payment_status.as_str()
                ),
                None => println!("No package found for payment {}", payment_id),
            }
        }
        Commands::SetRole { email, role } => {
            let role = UserRole::parse(&role)
                .with_context(|| format!("Unknown role '{}', use member, coach or admin", role))?;

            let pool = connect(&settings).await?;
            let auth = AuthService::new(pool, &settings.app.jwt_secret);
            let user = auth
                .get_user_by_email(&email)
                .await?
                .with_context(|| format!("No user with email {}", email))?;

            auth.set_user_role(user.id, &role).await?;
            println!("{} is now {}", email, role.as_str());
        }
    }

    Ok(())
}

async fn connect(settings: &Settings) -> Result<PgPool> {
    settings
        .database
        .create_pool()
        .await
        .context("Failed to connect to the database")
}
