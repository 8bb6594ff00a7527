mod config;

use agentic_openapi_tools::RequestPlan;
use agentic_origin_adapter::{OriginAdapterConfig, OriginResolver, ResolvedOrigin};
use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "agentic-origin",
    version,
    about = "Resolve origin adapter configs into MCP tools and routing tables"
)]
struct Cli {
    /// CLI config file (default: $XDG_CONFIG_HOME/agentic/origin-cli.json).
    #[arg(long, global = true, env = "AGENTIC_ORIGIN_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `agentic_openapi_tools=debug`. `RUST_LOG` wins when set.
    #[arg(long, global = true, env = "AGENTIC_ORIGIN_LOG")]
    log_level: Option<String>,

    #[command(flatten)]
    limits: Limits,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Limits {
    #[arg(long, global = true, env = "AGENTIC_SPEC_FETCH_TIMEOUT_SECS")]
    spec_fetch_timeout_secs: Option<u64>,
    #[arg(long, global = true, env = "AGENTIC_MAX_SPEC_BYTES")]
    max_spec_bytes: Option<usize>,
    #[arg(long, global = true, env = "AGENTIC_MCP_TIMEOUT_SECS")]
    mcp_timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve an origin config (`openapi`, `mcp` or `raw`) and print the result as JSON
    Resolve {
        /// Origin config JSON file, or `-` for stdin
        origin: PathBuf,
        #[arg(long)]
        pretty: bool,
        /// Write the result here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Plan the HTTP request a tool call maps to, from a resolved `openapi` origin
    Plan {
        /// Output of `resolve`
        resolved: PathBuf,
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
        /// Overrides the origin url
        #[arg(long)]
        base_url: Option<String>,
    },
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        return std::io::read_to_string(std::io::stdin()).context("read stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn emit(value: &Value, pretty: bool, out: Option<&Path>) -> anyhow::Result<()> {
    let mut text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    text.push('\n');
    match out {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("write {}", path.display()))
        }
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let mut cfg = config::load_config(&config_path)?;
    if cli.log_level.is_some() {
        cfg.log_level = cli.log_level;
    }
    cfg.spec_fetch_timeout_secs = cli.limits.spec_fetch_timeout_secs.or(cfg.spec_fetch_timeout_secs);
    cfg.max_spec_bytes = cli.limits.max_spec_bytes.or(cfg.max_spec_bytes);
    cfg.mcp_timeout_secs = cli.limits.mcp_timeout_secs.or(cfg.mcp_timeout_secs);

    // stdout carries the JSON result.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cfg.log_level.as_deref().unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Resolve {
            origin,
            pretty,
            out,
        } => {
            let origin = OriginAdapterConfig::from_json_str(&read_input(&origin)?)
                .with_context(|| format!("invalid origin config {}", origin.display()))?;
            let options = cfg.resolve_options();
            tracing::debug!(
                fetch_timeout = ?options.spec.fetch_timeout,
                mcp_timeout = ?options.mcp_timeout,
                "Resolve options"
            );
            let resolved = OriginResolver::new(options).resolve(origin).await?;
            emit(&serde_json::to_value(&resolved)?, pretty, out.as_deref())?;
        }
        Command::Plan {
            resolved,
            tool,
            args,
            base_url,
        } => {
            let resolved: ResolvedOrigin = serde_json::from_str(&read_input(&resolved)?)
                .with_context(|| format!("parse resolved origin {}", resolved.display()))?;
            let Some(map) = resolved.tool_to_operation_map() else {
                bail!("only openapi origins carry a tool routing table");
            };
            let Some(descriptor) = map.get(&tool) else {
                bail!("unknown tool '{tool}'");
            };
            let arguments: Value = serde_json::from_str(&args).context("parse --args")?;

            let plan = RequestPlan::build(&tool, descriptor, &arguments)?;
            let base_url = base_url.unwrap_or_else(|| resolved.url().to_string());
            let url = plan.url(&base_url)?;
            let request = serde_json::to_value(&plan)?;
            emit(&json!({ "url": url.as_str(), "request": request }), true, None)?;
        }
    }

    Ok(())
}
