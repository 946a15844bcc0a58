use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;
use vmfleet_core::report::DeploymentReport;
use vmfleet_core::time::file_stamp;

use crate::render::{REPORT, Renderer};

pub fn render_report(renderer: &Renderer, report: &DeploymentReport) -> Result<String> {
    let ctx = tera::Context::from_serialize(report).context("Failed to build report context")?;
    renderer.render(REPORT, &ctx)
}

/// Write `deployment_report_<stamp>.md` into `dir`, creating it if needed.
pub fn write_report(renderer: &Renderer, report: &DeploymentReport, dir: &Path) -> Result<PathBuf> {
    let body = render_report(renderer, report)?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create reports directory {}", dir.display()))?;
    let path = dir.join(format!(
        "deployment_report_{}.md",
        file_stamp(&report.generated_at)
    ));
    std::fs::write(&path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), "wrote deployment report");
    Ok(path)
}
