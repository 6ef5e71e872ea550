//! Conversion of source CI pipeline definitions into GitHub Actions
//! workflow documents.
//!
//! The translation is pure and deterministic: the same definition always
//! yields the same document. Constructs that have no workflow equivalent
//! (multi-phase designer pipelines, disabled queues) are preserved as
//! comments rather than dropped.

use std::collections::HashSet;

use crate::naming::workflow_stem;
use crate::types::PipelineDef;

/// A translated pipeline, ready to be committed to the target repository.
#[derive(Debug, Clone)]
pub struct ConvertedWorkflow {
    pub pipeline_id: u64,
    pub pipeline_name: String,
    /// Repository-relative path, e.g. `.github/workflows/nightly-build.yml`.
    pub path: String,
    pub content: String,
}

/// Stateless translator from [`PipelineDef`] to workflow YAML.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineTranslator;

impl PipelineTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Render one definition as a workflow document.
    pub fn translate(&self, pipeline: &PipelineDef) -> String {
        let mut doc = String::new();
        doc.push_str(&format!(
            "# Converted from Azure DevOps pipeline \"{}\" (definition {})\n",
            pipeline.name, pipeline.id
        ));
        if let Some(folder) = pipeline.folder.as_deref().filter(|f| !f.is_empty() && *f != "\\") {
            doc.push_str(&format!("# Source folder: {folder}\n"));
        }
        if pipeline.is_disabled() {
            doc.push_str("# The source pipeline was disabled; review before enabling.\n");
        }
        if let Some(phases) = pipeline.phase_count.filter(|&n| n > 1) {
            doc.push_str(&format!(
                "# The original definition has {phases} agent phases; only a single job is generated.\n"
            ));
        }
        doc.push('\n');

        doc.push_str(&format!("name: {}\n\n", yaml_string(&pipeline.name)));
        doc.push_str(
            "on:\n  push:\n    branches: [main]\n  pull_request:\n    branches: [main]\n\n",
        );
        doc.push_str("jobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n");
        doc.push_str("      - uses: actions/checkout@v4\n\n");
        doc.push_str("      # Port the build steps from the original definition here.\n");
        doc.push_str("      - name: Build\n");
        doc.push_str("        run: echo \"pipeline steps not yet ported\"\n");
        doc
    }

    /// Translate a batch of definitions, deriving collision-free workflow
    /// filenames. Disabled definitions are skipped unless `include_disabled`.
    pub fn convert_batch(
        &self,
        pipelines: &[PipelineDef],
        include_disabled: bool,
    ) -> Vec<ConvertedWorkflow> {
        let mut taken = HashSet::new();
        pipelines
            .iter()
            .filter(|p| include_disabled || !p.is_disabled())
            .map(|pipeline| {
                let stem = workflow_stem(&pipeline.name, &mut taken);
                ConvertedWorkflow {
                    pipeline_id: pipeline.id,
                    pipeline_name: pipeline.name.clone(),
                    path: format!(".github/workflows/{stem}.yml"),
                    content: self.translate(pipeline),
                }
            })
            .collect()
    }
}

/// Quote a string for use as a YAML scalar value.
fn yaml_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
