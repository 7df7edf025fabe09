use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use strand_core::config::AppConfig;
use strand_graph::{Graph, GraphDefinition, RunContext, RunResult};

#[derive(Parser)]
#[command(name = "strand", version, about = "Run cyclic, conditionally routed step graphs")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "strand.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a graph definition and print the final output
    Run {
        /// Graph definition file
        graph: PathBuf,
        /// Initial input for the start node
        #[arg(short, long, default_value = "")]
        input: String,
        /// Print the full run result as JSON
        #[arg(long)]
        json: bool,
        /// Abort the run after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Print a graph definition as Graphviz DOT
    Dot {
        /// Graph definition file
        graph: PathBuf,
    },
    /// Build a graph definition and report its shape
    Validate {
        /// Graph definition file
        graph: PathBuf,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "strand", &mut std::io::stdout());
        return Ok(());
    }

    let config = AppConfig::load_or_default(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            graph,
            input,
            json,
            timeout,
        } => {
            let graph = load_graph(&graph, &config)?;

            let cancel = tokio_util::sync::CancellationToken::new();
            let cancel_clone = cancel.clone();
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                warn!("Interrupted, cancelling run...");
                cancel_clone.cancel();
            });

            let mut ctx = RunContext::new().with_cancel(cancel);
            if let Some(secs) = timeout.or(config.run.timeout_secs) {
                ctx = ctx.with_timeout(Duration::from_secs(secs));
            }

            let result = graph.run_with(&ctx, input).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(&result);
            }
        }
        Commands::Dot { graph } => {
            let graph = load_graph(&graph, &config)?;
            print!("{}", graph.to_dot());
        }
        Commands::Validate { graph } => {
            let graph = load_graph(&graph, &config)?;
            println!(
                "{}: ok (start: {}, {} nodes, {} edges, max_iterations: {})",
                graph.name(),
                graph.start_node(),
                graph.nodes().len(),
                graph.edges().len(),
                graph.options().max_iterations
            );
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}

fn load_graph(path: &Path, config: &AppConfig) -> anyhow::Result<Graph> {
    let definition = GraphDefinition::load(path)?;
    info!(path = %path.display(), graph = %definition.name, "Loaded graph definition");
    Ok(definition.build(config.run.options)?)
}

fn print_summary(result: &RunResult) {
    println!("{}", result.final_output);
    eprintln!();
    eprintln!(
        "{} visits in {}ms, {} tokens, cost {:.4}",
        result.total_visits(),
        result.total_elapsed_ms,
        result.total_usage.total_tokens,
        result.total_cost
    );
    eprintln!("path: {}", result.path.join(" -> "));
}
