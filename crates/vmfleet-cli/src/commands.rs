use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use crate::logging::{self, LogFormat, LogHandle};
use crate::ui;

use vmfleet_core::allocator::VmIdAllocator;
use vmfleet_core::config::{DEFAULT_BATCH_SIZE, DEFAULT_CONFIG_PATH, DEFAULT_SAMPLE_SIZE, Settings};
use vmfleet_core::node::NodeInventory;
use vmfleet_core::report::summarize;
use vmfleet_core::template::TemplateCatalog;
use vmfleet_core::user::{User, load_roster};
use vmfleet_deploy::descriptors::DescriptorWriter;
use vmfleet_deploy::pipeline::DeploymentPipeline;
use vmfleet_deploy::render::Renderer;
use vmfleet_deploy::report::write_report;
use vmfleet_deploy::run::{deploy_all, dry_run};
use vmfleet_runtime::preflight;
use vmfleet_runtime::tools::RuntimeTools;

#[derive(Parser, Debug)]
#[command(
    name = "vmfleet",
    version,
    about = "Deploy per-user VM sets onto a Proxmox cluster in batches (Terraform + Ansible)"
)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// User roster CSV with columns username, email, full_name[, department]
    #[arg(long)]
    users_csv: PathBuf,

    /// Users per deployment batch
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_batch_size)]
    batch_size: usize,

    /// Plan and render sample descriptors without provisioning anything
    #[arg(long)]
    dry_run: bool,

    /// Users rendered by --dry-run
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
    sample_size: usize,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Human)]
    log_format: LogFormat,
}

fn parse_batch_size(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("batch size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Everything loaded before any batch runs.
struct Loaded {
    settings: Settings,
    users: Vec<User>,
    catalog: TemplateCatalog,
    nodes: NodeInventory,
    renderer: Renderer,
}

fn load(cli: &Cli, log: &LogHandle) -> Result<Loaded> {
    let settings = Settings::load(&cli.config)?;
    log.set_level(&settings.logging.level)?;
    info!(config = %cli.config.display(), "settings loaded");

    let users = load_roster(&cli.users_csv)?;
    let catalog = settings.catalog()?;
    let nodes = settings.inventory()?;
    let renderer = Renderer::with_overrides(settings.paths.templates_dir.as_deref())
        .context("Failed to load descriptor templates")?;
    Ok(Loaded {
        settings,
        users,
        catalog,
        nodes,
        renderer,
    })
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let log = logging::init(cli.log_format);

    let loaded = load(&cli, &log)?;
    ui::info(&format!(
        "{} users, {} templates, {} nodes",
        loaded.users.len(),
        loaded.catalog.len(),
        loaded.nodes.len()
    ));

    if cli.dry_run {
        cmd_dry_run(&cli, loaded)
    } else {
        cmd_deploy(&cli, loaded)
    }
}

fn cmd_dry_run(cli: &Cli, mut l: Loaded) -> Result<()> {
    ui::warn("Dry run: nothing will be provisioned or configured");
    let tools = RuntimeTools::from_settings(&l.settings.tools);
    let mut allocator =
        VmIdAllocator::new(&tools.lookup, &l.nodes).strict(l.settings.ids.strict_query);
    let writer = DescriptorWriter::new(&l.settings, &l.catalog, &l.renderer);

    let summary = dry_run(
        &writer,
        &mut l.users,
        &l.nodes,
        &l.catalog,
        cli.batch_size,
        cli.sample_size,
        &mut allocator,
    )?;

    println!();
    ui::summary_line("Users", &summary.total_users.to_string());
    ui::summary_line("VMs", &summary.total_vms.to_string());
    ui::summary_line(
        "Batches",
        &format!("{} (size {})", summary.planned_batches, cli.batch_size),
    );
    ui::summary_line("Declared cores", &l.nodes.total_cores().to_string());
    for load in &summary.loads {
        ui::summary_line(
            &format!("Node {}", load.node),
            &format!("{} users, {} VMs", load.users.len(), load.vms),
        );
    }
    ui::success(&format!(
        "Sample descriptors for {} users ({} VMs) written to {}",
        summary.sample_users,
        summary.sample_vms,
        summary.sample_dir.display()
    ));
    Ok(())
}

fn cmd_deploy(cli: &Cli, mut l: Loaded) -> Result<()> {
    ui::step(1, 3, "Checking external tools");
    preflight::ensure_tools(&preflight::check_tools(&l.settings.tools))?;

    ui::step(
        2,
        3,
        &format!("Deploying {} users in batches of {}", l.users.len(), cli.batch_size),
    );
    let tools = RuntimeTools::from_settings(&l.settings.tools);
    let mut allocator =
        VmIdAllocator::new(&tools.lookup, &l.nodes).strict(l.settings.ids.strict_query);
    let pipeline = DeploymentPipeline::new(
        &l.settings,
        &l.catalog,
        &l.renderer,
        &tools.provisioner,
        &tools.configurator,
    );
    let run = deploy_all(
        &pipeline,
        &mut l.users,
        &l.nodes,
        &l.catalog,
        cli.batch_size,
        &mut allocator,
    )?;

    ui::step(3, 3, "Writing deployment report");
    let report = summarize(&run, chrono::Utc::now());
    let path = write_report(&l.renderer, &report, &l.settings.paths.reports_dir)?;

    for line in &report.lines {
        let detail = if line.detail.is_empty() {
            String::new()
        } else {
            format!(" ({})", line.detail)
        };
        ui::summary_line(&line.batch_id, &format!("{}{}", ui::outcome(line.succeeded), detail));
    }
    if report.not_started_batches > 0 {
        ui::warn(&format!("{} batch(es) not started", report.not_started_batches));
    }
    ui::info(&format!("Report: {}", path.display()));

    let totals = format!(
        "{}/{} batches succeeded",
        report.successful_batches, report.planned_batches
    );
    if report.succeeded() {
        ui::banner(&["Deployment complete", totals.as_str()], true);
        Ok(())
    } else {
        ui::error("Deployment failed, see the report for details");
        ui::banner(&["Deployment FAILED", totals.as_str()], false);
        let failed = run
            .first_failure()
            .map(|r| r.batch_id.as_str())
            .unwrap_or("unknown batch");
        anyhow::bail!("Deployment stopped after {} failed", failed)
    }
}
