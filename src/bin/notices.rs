//! Security Notices CLI
//!
//! Runs the GraphQL security notification policies for a project before a
//! deployment. Declining a notice stops the deployment with exit code 0.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use graphql_notices::flags::{
    SECURITY_ENHANCEMENT_NOTIFICATION, SHOW_FIELD_AUTH_NOTIFICATION, TRANSFORMER_VERSION,
};
use graphql_notices::{
    FeatureFlags, NoticeConfig, NoticeOutcome, ProjectStore, SecurityNotices, TerminalPrompter,
    TracingTelemetry,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "security-notices")]
#[command(about = "Show one-time GraphQL security notices before a deployment")]
struct Cli {
    /// Project directory (defaults to the project containing the current directory)
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Config file to load (optional)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Field-level auth notice
    FieldAuth,

    /// List query filter notice
    ListQuery,

    /// Auth on primary keys notice
    PrimaryKey,

    /// Run every notice in deployment order
    All,

    /// Show the notification flag values
    Flags,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(NoticeOutcome::Declined) => {
            println!("Deployment cancelled.");
            std::process::exit(0);
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<NoticeOutcome> {
    let config = NoticeConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    let start = match cli.project {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    let project = ProjectStore::discover(&start, &config);
    let flags = FeatureFlags::load(&config.features.area, &project)?;

    let mut notices = SecurityNotices::new(
        project,
        flags,
        TerminalPrompter::stdio(),
        TracingTelemetry,
    );

    let outcome = match cli.command {
        Commands::FieldAuth => notices.notify_field_auth_security_change()?,
        Commands::ListQuery => notices.notify_list_query_security_change()?,
        Commands::PrimaryKey => notices.notify_security_enhancement()?,
        Commands::All => notices.notify_all()?,
        Commands::Flags => {
            print_flags(notices.project(), notices.flags());
            return Ok(NoticeOutcome::Unchanged);
        }
    };

    match outcome {
        NoticeOutcome::SchemaModified => println!("✅ Schema marked as changed, resolvers will be regenerated"),
        NoticeOutcome::Unchanged => println!("✅ No security notice required"),
        NoticeOutcome::Declined => {}
    }

    Ok(outcome)
}

fn print_flags(project: &ProjectStore, flags: &FeatureFlags) {
    let area = flags.area();
    println!("📋 Notification flags ({})\n", project.root().display());
    println!(
        "  {TRANSFORMER_VERSION}: {:?}",
        flags.get_number(&format!("{area}.{TRANSFORMER_VERSION}"))
    );
    for name in [SHOW_FIELD_AUTH_NOTIFICATION, SECURITY_ENHANCEMENT_NOTIFICATION] {
        println!("  {name}: {}", flags.get_boolean(&format!("{area}.{name}")));
    }
}
