//! teardown: remove Azure resources by type, honouring each type's
//! deletion preconditions

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use teardown::arm::ArmClient;
use teardown::config::{self, OutputFormat};
use teardown::orchestrator::{
    ActionStatus, ExecutionMode, Orchestrator, RecipeRegistry, RemovalError, RemovalOptions,
    RemovalOutcome, RemovalReport, SubscriptionDecommission,
};
use teardown::wait::RetryPolicy;
use teardown_common::defaults::{
    DEFAULT_ARM_ENDPOINT, DEFAULT_DECOMMISSION_MANAGEMENT_GROUP, DEFAULT_POLL_INTERVAL,
    DEFAULT_POLL_MAX_ATTEMPTS, DEFAULT_SUBSCRIPTION_GUARD, NETWORK_WATCHER_RESOURCE_GROUP,
};
use teardown_common::{ResourceId, ResourceType};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "teardown")]
#[command(about = "Remove Azure resources with per-type deletion recipes")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Arguments for the remove command
#[derive(clap::Args, Debug)]
struct RemoveArgs {
    /// Full resource id
    #[arg(long)]
    resource_id: String,

    /// Resource type, e.g. "Microsoft.Insights/diagnosticSettings"
    #[arg(long)]
    resource_type: String,

    /// Report what would be done without changing anything
    #[arg(long)]
    what_if: bool,

    /// Do not ask for confirmation before each change
    #[arg(long)]
    force: bool,

    /// Resource Manager endpoint
    #[arg(long, env = "AZURE_RESOURCE_MANAGER_ENDPOINT", default_value = DEFAULT_ARM_ENDPOINT)]
    endpoint: String,

    /// Bearer token (default: ask the Azure CLI)
    #[arg(long, env = "AZURE_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Seconds between provider state checks
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    poll_interval_secs: u64,

    /// Maximum provider state checks
    #[arg(long, default_value_t = DEFAULT_POLL_MAX_ATTEMPTS)]
    poll_max_attempts: u32,

    /// Subscription aliases are only decommissioned if their name contains this
    #[arg(long, default_value = DEFAULT_SUBSCRIPTION_GUARD)]
    subscription_guard: String,

    /// Management group decommissioned subscriptions are moved to
    #[arg(long, default_value = DEFAULT_DECOMMISSION_MANAGEMENT_GROUP)]
    decommission_management_group: String,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl From<RemoveArgs> for config::TeardownConfig {
    fn from(args: RemoveArgs) -> Self {
        let mode = if args.what_if {
            ExecutionMode::WhatIf
        } else {
            ExecutionMode::Execute
        };
        Self {
            resource_id: args.resource_id,
            resource_type: args.resource_type,
            arm: config::ArmConfig {
                endpoint: args.endpoint,
                access_token: args.access_token,
            },
            removal: RemovalOptions {
                mode,
                force: args.force,
                poll: RetryPolicy::new(
                    Duration::from_secs(args.poll_interval_secs),
                    args.poll_max_attempts,
                ),
                subscription: SubscriptionDecommission {
                    name_guard: args.subscription_guard,
                    management_group: args.decommission_management_group,
                    network_watcher_group: NETWORK_WATCHER_RESOURCE_GROUP.to_string(),
                },
                ..RemovalOptions::default()
            },
            output: config::OutputConfig {
                format: args.format,
            },
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remove one resource
    Remove(Box<RemoveArgs>),

    /// Show how a resource id decomposes
    ParseId {
        /// Full resource id
        id: String,

        /// Resource type, to show which recipe would run
        #[arg(long)]
        resource_type: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&e);
        std::process::exit(1);
    }
}

/// Print error in a user-friendly way
fn print_error(e: &anyhow::Error) {
    use std::io::Write;

    let mut stderr = std::io::stderr();

    let _ = writeln!(stderr, "\n\x1b[1;31mError:\x1b[0m {e}");

    let mut source = e.source();
    while let Some(cause) = source {
        let _ = writeln!(stderr, "  \x1b[33mCaused by:\x1b[0m {cause}");
        source = cause.source();
    }

    if let Some(suggestion) = e
        .downcast_ref::<RemovalError>()
        .and_then(RemovalError::provider_error)
        .and_then(|p| p.suggestion())
    {
        let _ = writeln!(stderr, "\n\x1b[36mHint:\x1b[0m {suggestion}");
    }

    if std::env::var("RUST_BACKTRACE").is_err() {
        let _ = writeln!(
            stderr,
            "\n\x1b[2mSet RUST_BACKTRACE=1 for a detailed backtrace\x1b[0m"
        );
    } else {
        let backtrace = e.backtrace();
        if backtrace.status() == std::backtrace::BacktraceStatus::Captured {
            let _ = writeln!(stderr, "\n\x1b[2mBacktrace:\x1b[0m\n{backtrace}");
        }
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Remove(remove_args) => {
            let config: config::TeardownConfig = (*remove_args).into();
            handle_remove(config).await?;
        }
        Command::ParseId { id, resource_type } => {
            handle_parse_id(&id, resource_type.as_deref())?;
        }
    }

    Ok(())
}

/// Handle the remove command
async fn handle_remove(config: config::TeardownConfig) -> Result<()> {
    info!(
        resource_id = %config.resource_id,
        resource_type = %config.resource_type,
        endpoint = %config.arm.endpoint,
        what_if = config.removal.mode == ExecutionMode::WhatIf,
        force = config.removal.force,
        "Starting teardown"
    );

    let client = ArmClient::new(&config.arm.endpoint, config.arm.token_source())
        .context("Failed to create Resource Manager client")?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling pending waits");
            on_interrupt.cancel();
        }
    });

    let orchestrator = Orchestrator::builder(Arc::new(client))
        .options(config.removal)
        .cancellation(cancel)
        .build();

    let report = orchestrator
        .remove(&config.resource_id, &config.resource_type)
        .await
        .with_context(|| format!("Failed to remove '{}'", config.resource_id))?;

    match config.output.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &RemovalReport) {
    println!("Resource: {}", report.resource_id);
    println!("Type:     {} (recipe: {})", report.resource_type, report.recipe);
    for lock in &report.locks {
        println!("  lock removed: {}", lock);
    }
    for action in &report.actions {
        let marker = match action.status {
            ActionStatus::Planned => "would",
            ActionStatus::Performed => "done ",
        };
        println!("  [{}] {}", marker, action.description);
    }
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }
    let outcome = match &report.outcome {
        RemovalOutcome::Removed => "removed".to_string(),
        RemovalOutcome::AlreadyAbsent => "already absent".to_string(),
        RemovalOutcome::Skipped(reason) => format!("skipped ({})", reason),
        RemovalOutcome::Planned => "planned (what-if)".to_string(),
    };
    println!("Outcome:  {}", outcome);
}

/// Handle the parse-id command
fn handle_parse_id(id: &str, resource_type: Option<&str>) -> Result<()> {
    let id = ResourceId::parse(id).context("Invalid resource id")?;

    println!("{:<16} {}", "ID", id);
    println!(
        "{:<16} {}",
        "SUBSCRIPTION",
        id.subscription_id().unwrap_or("-")
    );
    println!(
        "{:<16} {}",
        "RESOURCE GROUP",
        id.resource_group().unwrap_or("-")
    );
    println!("{:<16} {}", "NAME", id.name());
    match id.parent_scope(4) {
        Ok(scope) => println!("{:<16} {}", "ROLE SCOPE", scope),
        Err(_) => println!("{:<16} -", "ROLE SCOPE"),
    }
    if let Some(resource_type) = resource_type {
        let resource_type = ResourceType::parse(resource_type);
        let registry = RecipeRegistry::builtin();
        let recipe = registry.recipe_for(&resource_type);
        let kind = resource_type
            .kind()
            .map_or("unrecognised type".to_string(), |k| k.to_string());
        println!("{:<16} {} ({})", "RECIPE", recipe.name(), kind);
    }
    Ok(())
}
