//! `resources` - list what the stack declares

use anyhow::{Result, bail};
use colored::Colorize;
use std::collections::HashSet;

use crate::Context;
use crate::cli::ResourcesArgs;
use crate::ui;

use declarative::{LogicalId, ResourceExt, ResourceGraph, select};

pub fn run(ctx: &Context, args: &ResourcesArgs) -> Result<()> {
    let loaded = super::load_stack(ctx, &args.build)?;
    let graph = &loaded.stack.graph;
    let plan = loaded.stack.plan();

    let selected: HashSet<&LogicalId> = select(graph, args.target.as_deref())
        .into_iter()
        .map(|r| r.logical_id())
        .collect();
    if selected.is_empty() {
        bail!(
            "No resources match '{}'",
            args.target.as_deref().unwrap_or_default()
        );
    }

    if args.waves {
        ui::header(&format!("{} - deployment waves", loaded.stack.name));
        for (i, wave) in plan.waves.iter().enumerate() {
            let members: Vec<&LogicalId> = wave.iter().filter(|id| selected.contains(id)).collect();
            if members.is_empty() {
                continue;
            }
            ui::section(&format!("Wave {}", i + 1));
            for id in members {
                print_resource(ctx, graph, id);
            }
        }
        return Ok(());
    }

    let (title, order) = if args.teardown {
        ("teardown order", plan.teardown())
    } else {
        ("creation order", plan.creation.clone())
    };

    ui::header(&format!("{} - {}", loaded.stack.name, title));
    for id in order.iter().filter(|id| selected.contains(id)) {
        print_resource(ctx, graph, id);
    }

    if !ctx.quiet {
        println!();
        ui::dim(&ui::plural(selected.len(), "resource"));
    }

    Ok(())
}

fn print_resource(ctx: &Context, graph: &ResourceGraph, id: &LogicalId) {
    let Some(resource) = graph.get(id) else {
        return;
    };

    println!(
        "  {:<50} {}",
        id.as_str().bold(),
        resource.resource_type().dimmed()
    );

    if ctx.verbose > 0 {
        ui::dim(&format!("  {}", resource.description()));
        let deps = resource.all_dependencies();
        if !deps.is_empty() {
            let names: Vec<&str> = deps.iter().map(LogicalId::as_str).collect();
            ui::dim(&format!("  depends on: {}", names.join(", ")));
        }
    }
}
