use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use shardperm::{ClusterFixture, GrantError, GrantValidator, ValidationReport, ValidatorConfig};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shardperm")]
#[command(about = "Grant consistency checks for sharded database clusters")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the (redacted) grant tables of one node
    GetPermissions {
        #[arg(long)]
        fixture: PathBuf,
        #[arg(long)]
        node: String,
    },
    /// Compare every node of a keyspace against its shard primary
    ValidateKeyspace {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        keyspace: String,
        /// Restrict validation to these shards (repeatable)
        #[arg(long = "shard")]
        shards: Vec<String>,
    },
    /// Compare every node of one shard against its primary
    ValidateShard {
        #[command(flatten)]
        run: RunArgs,
        #[arg(long)]
        keyspace: String,
        #[arg(long)]
        shard: String,
    },
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    fixture: PathBuf,
    #[arg(long)]
    timeout_ms: Option<u64>,
    #[arg(long)]
    retry_delay_ms: Option<u64>,
    #[arg(long)]
    max_concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::GetPermissions { fixture, node } => {
            let validator = build_validator(&fixture, None).await?;
            let snapshot = validator
                .get_permissions(&node)
                .await
                .with_context(|| format!("Failed to fetch grants of node '{}'", node))?;
            print!("{}", snapshot.render_redacted());
            Ok(ExitCode::SUCCESS)
        }
        Command::ValidateKeyspace {
            run,
            keyspace,
            shards,
        } => {
            let validator = build_validator(&run.fixture, Some(&run)).await?;
            print_outcome(validator.validate_keyspace(&keyspace, &shards).await)
        }
        Command::ValidateShard {
            run,
            keyspace,
            shard,
        } => {
            let validator = build_validator(&run.fixture, Some(&run)).await?;
            print_outcome(validator.validate_shard(&keyspace, &shard).await)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn build_validator(fixture: &Path, overrides: Option<&RunArgs>) -> Result<GrantValidator> {
    let cluster = ClusterFixture::load(fixture)?
        .into_cluster()
        .await
        .with_context(|| format!("Invalid cluster fixture '{}'", fixture.display()))?;

    let mut config = cluster.validator.clone().unwrap_or_else(ValidatorConfig::default);
    if let Some(run) = overrides {
        if let Some(timeout_ms) = run.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(retry_delay_ms) = run.retry_delay_ms {
            config.retry_delay_ms = retry_delay_ms;
        }
        if let Some(max_concurrency) = run.max_concurrency {
            config.max_concurrency = max_concurrency;
        }
    }

    Ok(GrantValidator::new(cluster.topology, cluster.nodes, config)?)
}

fn print_outcome(outcome: shardperm::Result<ValidationReport>) -> Result<ExitCode> {
    match outcome {
        Ok(report) => {
            println!("Grants: OK");
            println!("{}", report);
            Ok(ExitCode::SUCCESS)
        }
        Err(GrantError::Inconsistent(report)) => {
            println!("Grants: FAILED");
            for finding in report.findings() {
                println!("- {}", finding);
            }
            Ok(ExitCode::from(2))
        }
        Err(err) => Err(err.into()),
    }
}
