// ABOUTME: Operator front end for switchboard - one request with -c or an interactive REPL.
// ABOUTME: Wires the Azure OpenAI oracle, YAML rules and domain tools into a session manager.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rustyline::DefaultEditor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use switchboard::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "switchboard")]
#[command(about = "Route operator requests to cloud, build and file agents")]
#[command(version)]
struct Cli {
    /// Run a single request and exit
    #[arg(short, long)]
    command: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory of rule YAML files
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Rule environment (defaults to $ENVIRONMENT, then development)
    #[arg(long)]
    environment: Option<String>,

    /// Root directory for the file tools
    #[arg(long, default_value = ".")]
    base_dir: PathBuf,

    /// Orchestrator budgets as YAML
    #[arg(long)]
    orchestrator_config: Option<PathBuf>,
}

fn rules(cli: &Cli) -> Result<Arc<dyn RuleStore>> {
    let Some(dir) = &cli.config_dir else {
        tracing::warn!("no --config-dir given, running without rules");
        return Ok(Arc::new(StaticRuleStore::default()));
    };
    let store = match &cli.environment {
        Some(env) => YamlRuleStore::load(dir, env.as_str()),
        None => YamlRuleStore::from_env(dir),
    }
    .with_context(|| format!("loading rules from {}", dir.display()))?;
    for name in store.names() {
        if let Err(e) = store.validate(name) {
            tracing::warn!(document = name, error = %e, "rule document failed validation");
        }
    }
    tracing::info!(environment = store.environment(), documents = ?store.names(), "rules loaded");
    Ok(Arc::new(store))
}

fn sessions(cli: &Cli) -> Result<Sessions> {
    let config = match &cli.orchestrator_config {
        Some(path) => OrchestratorConfig::from_yaml_file(path)?,
        None => OrchestratorConfig::default(),
    };

    let client = AzureOpenAIClient::from_env()?;
    tracing::info!(model = client.model(), "oracle configured");
    let oracle: Arc<dyn Oracle> = Arc::new(
        RetryingOracle::new(Arc::new(client))
            .with_timeout(config.oracle_timeout())
            .with_retries(config.oracle_retries),
    );

    let ctx = DomainContext {
        rules: rules(cli)?,
        inventory: Arc::new(StaticInventory::sample()),
        history: Arc::new(StaticBuildHistory::sample()),
        blobs: Arc::new(StaticBlobStore::sample()),
        files: FileScope::new(&cli.base_dir),
    };
    let registry = Arc::new(domain_registry(&ctx)?);
    let roster = standard_roster(Arc::clone(&oracle), registry)?;
    let manager = Manager::new(roster, Arc::new(OracleJudge::new(oracle))).with_config(config);
    Ok(Sessions::new(manager))
}

fn render(session: &TaskSession) -> String {
    match &session.outcome {
        Ok(result) => {
            let marker = if result.partial { "\n[partial result]" } else { "" };
            format!("{}{marker}", result.answer)
        }
        Err(failure) => {
            let hint = if failure.retryable { " (retry may succeed)" } else { "" };
            let mut out = format!("Failed: {}{hint}", failure.reason);
            if let Some(partial) = failure.partial.as_ref().filter(|p| !p.answer.is_empty()) {
                out.push_str(&format!("\n\nPartial findings:\n{}", partial.answer));
            }
            out
        }
    }
}

async fn handle(sessions: &Sessions, request: &str) -> Result<()> {
    let task_id = sessions.submit(request).await;
    tracing::debug!(task_id = %task_id, "request submitted");
    let session = sessions.wait(&task_id).await?;
    println!("\n{}\n", render(&session));
    Ok(())
}

async fn repl(sessions: &Sessions) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("Switchboard - Type 'quit' to exit.\n");

    loop {
        let line = match rl.readline("> ") {
            Ok(line) => line,
            Err(_) => break,
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }

        let _ = rl.add_history_entry(line);
        if let Err(e) = handle(sessions, line).await {
            eprintln!("Error: {e:#}");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "switchboard=debug" } else { "switchboard=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let sessions = sessions(&cli)?;

    match &cli.command {
        Some(request) => handle(&sessions, request).await,
        None => repl(&sessions).await,
    }
}
