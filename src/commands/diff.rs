//! `diff` - compare a fresh synthesis against a template on disk

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;

use crate::Context;
use crate::cli::DiffArgs;
use crate::ui;

use declarative::{ChangeKind, DiffSummary, ResourceDiff, Template, changed_outputs, compute_diffs};

pub fn run(ctx: &Context, args: &DiffArgs) -> Result<()> {
    let previous = Template::load(&args.against)
        .with_context(|| format!("Failed to load template: {}", args.against.display()))?;
    let loaded = super::load_stack(ctx, &args.build)?;
    let current = loaded.stack.template();

    let diffs = compute_diffs(&previous, &current);
    let outputs = changed_outputs(&previous, &current);

    display_diff(&diffs);
    if !outputs.is_empty() {
        ui::section("Outputs");
        for name in &outputs {
            println!("  {} {}", "~".yellow(), name);
        }
    }

    if args.text {
        show_text_diff(&previous.to_json_pretty()?, &current.to_json_pretty()?);
    }

    Ok(())
}

/// One-line summary of what changed in a resource
pub fn change_detail(diff: &ResourceDiff) -> String {
    match &diff.change {
        ChangeKind::Added => "(new)".to_string(),
        ChangeKind::Removed => "(will remove)".to_string(),
        ChangeKind::TypeChanged { from, to } => format!("{} → {} (replacement)", from, to),
        ChangeKind::Modified {
            properties,
            metadata,
        } => {
            let mut parts = properties.clone();
            if *metadata {
                parts.push("dependencies/policies".to_string());
            }
            parts.join(", ")
        }
    }
}

fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes to resources", "✓".green());
        return;
    }

    let groups = declarative::group_by_type(diffs);
    let mut types: Vec<&String> = groups.keys().collect();
    types.sort();

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Stack Diff".bold()
    );
    println!("│");

    for resource_type in types {
        println!("│ {}", resource_type.bold());

        for diff in &groups[resource_type] {
            let symbol = match diff.change {
                ChangeKind::Added => "+".green(),
                ChangeKind::Removed => "-".red(),
                ChangeKind::Modified { .. } => "~".yellow(),
                ChangeKind::TypeChanged { .. } => "±".red(),
            };
            println!(
                "│   {} {:<40} {}",
                symbol,
                diff.logical_id,
                change_detail(diff).dimmed()
            );
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to add, {} to change, {} to remove, {} to replace)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.modifications.to_string().yellow(),
        summary.removals.to_string().red(),
        summary.replacements.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

/// Line diff of two template texts using the `similar` crate
fn show_text_diff(old: &str, new: &str) {
    ui::section("Template");

    let diff = similar::TextDiff::from_lines(old, new);
    let mut has_changes = false;

    for change in diff.iter_all_changes() {
        match change.tag() {
            similar::ChangeTag::Delete => {
                has_changes = true;
                print!("    {}", format!("- {change}").red());
            }
            similar::ChangeTag::Insert => {
                has_changes = true;
                print!("    {}", format!("+ {change}").green());
            }
            similar::ChangeTag::Equal => {}
        }
    }

    if !has_changes {
        println!("    {}", "(templates are identical)".dimmed());
    }
}
