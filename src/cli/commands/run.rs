//! `cogpid run` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use console::style;

use crate::adapters::{
    ChatAgentRunner, CompositeMeasure, FsCheckpointStore, MockAgentRunner, WorkspacePatchApplier,
};
use crate::application::IterationOrchestrator;
use crate::domain::models::RunSummary;
use crate::domain::ports::AgentRunner;
use crate::infrastructure::{ConfigLoader, JsonlIterationLog, DEFAULT_CONFIG_PATH};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Project goal the loop drives toward
    pub setpoint: String,

    /// Configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Override the workspace directory
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Override the checkpoint directory
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,

    /// Override the iteration cap
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Use scripted mock agents instead of the API (no key needed)
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(args: RunArgs) -> Result<()> {
    let mut config = ConfigLoader::load(&args.config)?;
    if let Some(workspace) = &args.workspace {
        config.repository.base_path = workspace.display().to_string();
    }
    if let Some(dir) = &args.checkpoint_dir {
        config.repository.checkpoint_path = dir.display().to_string();
    }
    if let Some(max) = args.max_iterations {
        config.safety.max_iterations = max;
    }

    let log_dir = PathBuf::from(&config.repository.log_path);
    let _guard = crate::infrastructure::logging::init(&config.logging, &log_dir)?;

    std::fs::create_dir_all(&config.repository.base_path)
        .context("failed to create workspace directory")?;

    let agents: Arc<dyn AgentRunner> = if args.dry_run {
        Arc::new(MockAgentRunner::default())
    } else {
        Arc::new(ChatAgentRunner::new(
            &config.models.keeper,
            &config.models.developer,
            &config.models.qa,
        )?)
    };
    let measure = Arc::new(CompositeMeasure::new(&config.metrics));
    let checkpoints = Arc::new(FsCheckpointStore::new(
        config.repository.checkpoint_path.clone(),
    ));
    let patcher = Arc::new(WorkspacePatchApplier::new());
    let sink = Arc::new(JsonlIterationLog::open(&log_dir)?);

    let mut orchestrator =
        IterationOrchestrator::new(config, agents, measure, checkpoints, patcher, sink);
    let summary = orchestrator.run(&args.setpoint).await?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        Cell::new("Iterations"),
        Cell::new("Best PV"),
        Cell::new("Best iter"),
        Cell::new("Final PV"),
        Cell::new("Cost (USD)"),
        Cell::new("Tasks merged"),
    ]);
    table.add_row(vec![
        Cell::new(summary.iterations),
        Cell::new(format!("{:.3}", summary.best_pv)),
        Cell::new(summary.best_iteration),
        Cell::new(format!("{:.3}", summary.final_pv)),
        Cell::new(format!("{:.4}", summary.total_cost_usd)),
        Cell::new(summary.completed_tasks.len()),
    ]);

    println!("{table}");
    for task in &summary.completed_tasks {
        println!("  {} {task}", style("merged").green());
    }
    match &summary.halt_reason {
        Some(reason) => println!("{} {reason}", style("halted:").yellow().bold()),
        None => println!("{}", style("run completed").green().bold()),
    }
}
