use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use timelock_cluster::{ClusterConfig, ElectionPolicy, TimelockCluster};

#[derive(Parser)]
#[command(name = "timelock-drill")]
#[command(about = "Leadership and failover drills against a simulated timelock cluster")]
struct Cli {
    /// JSON cluster configuration file
    #[arg(long, conflicts_with = "nodes")]
    config: Option<PathBuf>,

    /// Comma-separated node ids, used when no config file is given
    #[arg(long, value_delimiter = ',')]
    nodes: Vec<String>,

    #[arg(long, value_enum, default_value_t = Election::Rotate)]
    election_policy: Election,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Election {
    Rotate,
    Sticky,
    Stalled,
}

impl From<Election> for ElectionPolicy {
    fn from(election: Election) -> Self {
        match election {
            Election::Rotate => ElectionPolicy::Rotate,
            Election::Sticky => ElectionPolicy::Sticky,
            Election::Stalled => ElectionPolicy::Stalled,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print which nodes claim each namespace
    Leaders {
        #[arg(required = true)]
        namespaces: Vec<String>,
    },
    /// Print every node except the leader, per namespace
    NonLeaders {
        #[arg(required = true)]
        namespaces: Vec<String>,
    },
    /// Force a namespace onto a new leader
    Failover { namespace: String },
    /// Fetch fresh timestamps through the namespace router
    Timestamps {
        namespace: String,
        #[arg(long, default_value_t = 3)]
        count: usize,
    },
}

fn load_config(cli: &Cli) -> Result<ClusterConfig> {
    if let Some(path) = &cli.config {
        return ClusterConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }
    if cli.nodes.is_empty() {
        bail!("either --config or --nodes is required");
    }
    let config = ClusterConfig::new(cli.nodes.iter().cloned());
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let (cluster, _network) = TimelockCluster::in_memory(config, cli.election_policy.into())?;

    let output = match cli.command {
        Command::Leaders { namespaces } => {
            let snapshot = cluster.current_leaders(namespaces).await?;
            json!({
                "outcome": snapshot.outcome().to_string(),
                "claims": snapshot.claims(),
            })
        }
        Command::NonLeaders { namespaces } => {
            let non_leaders = cluster.non_leaders(namespaces).await?;
            json!(non_leaders)
        }
        Command::Failover { namespace } => {
            let report = cluster.failover_to_new_leader(&namespace).await?;
            serde_json::to_value(report)?
        }
        Command::Timestamps { namespace, count } => {
            let client = cluster.client(&namespace)?;
            let mut timestamps = Vec::with_capacity(count);
            for _ in 0..count {
                timestamps.push(client.fresh_timestamp().await?);
            }
            json!({
                "namespace": namespace,
                "served_by": client.preferred_node(),
                "timestamps": timestamps,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
