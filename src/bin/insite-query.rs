use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use insite::analytics::AnalyticsService;
use insite::auth::AccessGuard;
use insite::config::Config;
use insite::models::fields;
use insite::query::Query;
use serde::Serialize;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "insite-query")]
#[command(about = "Run insite analytics reads from the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Average response time of an application
    ResponseTime(Target),
    /// Referrer distribution (beforeUrl)
    Referrer(Target),
    /// Current page distribution (currentUrl)
    Pages(Target),
    /// Whether the latest session was flagged abnormal
    Abnormal(Target),
    /// Print the Flux text of a read without running it
    Flux {
        kind: ReadKind,
        #[arg(long)]
        token: String,
    },
    /// Check that the time-series store is reachable
    Health,
}

#[derive(clap::Args)]
struct Target {
    /// Application token
    #[arg(long)]
    token: String,
    /// Member id passed to the access check
    #[arg(long, default_value_t = 0)]
    member_id: i64,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReadKind {
    ResponseTime,
    Referrer,
    Pages,
    Abnormal,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize result")?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    insite::init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let bucket = config.influx.bucket.clone();

    if let Commands::Flux { kind, token } = &cli.command {
        let query = match kind {
            ReadKind::ResponseTime => Query::response_time(&bucket, token),
            ReadKind::Referrer => Query::distribution(&bucket, token, fields::BEFORE_URL),
            ReadKind::Pages => Query::distribution(&bucket, token, fields::CURRENT_URL),
            ReadKind::Abnormal => Query::abnormal(&bucket, token),
        };
        println!("{}", query.to_flux());
        return Ok(());
    }

    let store = insite::build_store(&config)?;
    let guard = Arc::new(AccessGuard::from_config(&config.validation)?);
    let analytics = AnalyticsService::new(Arc::clone(&store), guard, bucket);

    match cli.command {
        Commands::ResponseTime(t) => {
            print_json(&analytics.response_time(t.member_id, &t.token).await?)?;
        }
        Commands::Referrer(t) => {
            print_json(&analytics.referrer_distribution(t.member_id, &t.token).await?)?;
        }
        Commands::Pages(t) => {
            print_json(&analytics.page_distribution(t.member_id, &t.token).await?)?;
        }
        Commands::Abnormal(t) => {
            print_json(&analytics.abnormal_flag(t.member_id, &t.token).await?)?;
        }
        Commands::Health => {
            store.health().await?;
            println!("✓ Time-series store is reachable");
        }
        Commands::Flux { .. } => {}
    }

    Ok(())
}
