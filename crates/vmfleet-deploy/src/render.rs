use std::path::Path;

use anyhow::{Context, Result};
use tera::Tera;
use tracing::debug;

pub const MAIN_TF: &str = "main.tf";
pub const VARIABLES_TF: &str = "variables.tf";
pub const TFVARS: &str = "terraform.tfvars";
pub const INVENTORY: &str = "inventory.yml";
pub const REPORT: &str = "deployment_report.md";

/// Bundled templates, keyed by the name they render under.
const BUNDLED: [(&str, &str); 5] = [
    (MAIN_TF, include_str!("../resources/main.tf.tera")),
    (VARIABLES_TF, include_str!("../resources/variables.tf.tera")),
    (TFVARS, include_str!("../resources/terraform.tfvars.tera")),
    (INVENTORY, include_str!("../resources/inventory.yml.tera")),
    (REPORT, include_str!("../resources/deployment_report.md.tera")),
];

/// Tera renderer for descriptors, inventories and reports.
///
/// Every template is bundled into the binary. A `<name>.tera` file in the
/// override directory replaces the bundled template of the same name.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    pub fn bundled() -> Result<Self> {
        Self::with_overrides(None)
    }

    pub fn with_overrides(dir: Option<&Path>) -> Result<Self> {
        let mut tera = Tera::default();
        for (name, bundled) in BUNDLED {
            let source = match dir.map(|d| d.join(format!("{}.tera", name))) {
                Some(path) if path.exists() => {
                    debug!(template = name, path = %path.display(), "using template override");
                    std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?
                }
                _ => bundled.to_string(),
            };
            tera.add_raw_template(name, &source)
                .with_context(|| format!("Failed to parse template {}", name))?;
        }
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, ctx: &tera::Context) -> Result<String> {
        self.tera
            .render(name, ctx)
            .with_context(|| format!("Failed to render {}", name))
    }

    /// Render `name` and write it into `dir` under the same file name.
    pub fn render_to(&self, name: &str, ctx: &tera::Context, dir: &Path) -> Result<()> {
        let rendered = self.render(name, ctx)?;
        let path = dir.join(name);
        std::fs::write(&path, rendered)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
