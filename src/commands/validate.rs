//! `validate` - build the stack and report on it

use anyhow::Result;

use crate::Context;
use crate::cli::BuildArgs;
use crate::ui;

pub fn run(ctx: &Context, args: &BuildArgs) -> Result<()> {
    let loaded = super::load_stack(ctx, args)?;
    let stack = &loaded.stack;
    let config = &loaded.config;

    ui::header(&format!("Stack {}", stack.name));
    ui::kv(
        "Config",
        &super::config_origin(loaded.config_path.as_deref()),
    );
    ui::kv("Resources", &stack.graph.len().to_string());
    ui::kv("Outputs", &stack.graph.outputs().len().to_string());
    ui::kv("Bucket", &stack.bucket_name);
    ui::kv(
        "Notebook",
        &format!(
            "{} ({}, {})",
            config.notebook.name,
            config.notebook.instance_type,
            stack.notebook.id()
        ),
    );
    ui::kv(
        "Startup script",
        &format!(
            "{} [{}]",
            config.notebook.script.display(),
            ui::short_digest(&stack.script_digest)
        ),
    );
    ui::kv(
        "Repository",
        stack.repository.as_deref().unwrap_or("(none)"),
    );

    if ctx.verbose > 0 {
        ui::section("Effective config");
        println!("{}", config.to_toml()?);
    }

    let open = config.security_group.unreviewed_open_ingress();
    if !open.is_empty() {
        ui::section("Warnings");
        for rule in open {
            ui::warn(&format!("Ingress {} is open to every address", rule));
        }
        ui::dim("Set security_group.ingress_reviewed = true once this is intended");
    }

    let plan = stack.plan();
    if !ctx.quiet {
        println!();
    }
    ui::success(&format!(
        "Stack is valid ({}, {})",
        ui::plural(stack.graph.len(), "resource"),
        ui::plural(plan.waves.len(), "deployment wave")
    ));

    Ok(())
}
