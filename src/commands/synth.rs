//! `synth` - write the provisioning template

use anyhow::{Context as AnyhowContext, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::Context;
use crate::cli::SynthArgs;
use crate::stack::NotebookStack;
use crate::ui;

use declarative::Template;

/// Manifest file written next to the template
pub const MANIFEST_FILE: &str = "manifest.json";

/// Describes one synthesized template on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub stack_name: String,
    pub template_file: String,
    /// blake3 of the compact template JSON
    pub fingerprint: String,
    pub resource_count: usize,
    pub synthesized_at: DateTime<Utc>,
}

/// Template file name for a stack
pub fn template_file_name(stack_name: &str) -> String {
    format!("{}.template.json", stack_name)
}

pub fn run(ctx: &Context, args: &SynthArgs) -> Result<()> {
    let loaded = super::load_stack(ctx, &args.build)?;
    let template = loaded.stack.template();

    match &args.out {
        None => {
            let json = if args.compact {
                template.to_json_compact()?
            } else {
                template.to_json_pretty()?
            };
            println!("{}", json);
        }
        Some(dir) => {
            let manifest = write_output(dir, &loaded.stack, &template, args.compact)?;
            if !ctx.quiet {
                ui::success(&format!(
                    "Synthesized {} ({})",
                    manifest.stack_name,
                    ui::plural(manifest.resource_count, "resource")
                ));
                ui::kv("Template", &dir.join(&manifest.template_file).display().to_string());
                ui::kv("Fingerprint", ui::short_digest(&manifest.fingerprint));
                ui::kv("Bucket", &loaded.stack.bucket_name);
            }
        }
    }

    Ok(())
}

/// Write the template and its manifest into `dir`
pub fn write_output(
    dir: &Path,
    stack: &NotebookStack,
    template: &Template,
    compact: bool,
) -> Result<Manifest> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let template_file = template_file_name(&stack.name);
    let template_path = dir.join(&template_file);
    if compact {
        let mut json = template.to_json_compact()?;
        json.push('\n');
        fs::write(&template_path, json)
            .with_context(|| format!("Failed to write {}", template_path.display()))?;
    } else {
        template.write(&template_path)?;
    }
    log::info!("Wrote template to {}", template_path.display());

    let manifest = Manifest {
        stack_name: stack.name.clone(),
        template_file,
        fingerprint: template.fingerprint()?,
        resource_count: template.resources.len(),
        synthesized_at: Utc::now(),
    };

    let manifest_path: PathBuf = dir.join(MANIFEST_FILE);
    let content = serde_json::to_string_pretty(&manifest)?;
    fs::write(&manifest_path, content + "\n")
        .with_context(|| format!("Failed to write {}", manifest_path.display()))?;

    Ok(manifest)
}
