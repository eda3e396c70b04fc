//! Command implementations
//!
//! Every command starts the same way: find and load the config, pick a
//! script source, build the stack. [`load_stack`] does that once for all.

pub mod diff;
pub mod resources;
pub mod synth;
pub mod validate;

use anyhow::{Context as AnyhowContext, Result};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::Context;
use crate::cli::BuildArgs;
use crate::config::StackConfig;
use crate::paths;
use crate::script::{FsScriptSource, InMemoryScriptSource, ScriptSource};
use crate::stack::{self, NotebookStack, StackParams};

/// A built stack together with where its config came from
pub struct LoadedStack {
    pub config: StackConfig,
    pub config_path: Option<PathBuf>,
    pub stack: NotebookStack,
}

/// Load config, resolve the startup script, and build the stack
pub fn load_stack(ctx: &Context, args: &BuildArgs) -> Result<LoadedStack> {
    let config_path = paths::discover_config(ctx.config.as_deref());
    let mut config = StackConfig::load_or_default(config_path.as_deref())?;

    let scripts: Box<dyn ScriptSource> = match args.script.as_deref() {
        Some(path) if path == Path::new("-") => {
            let mut content = Vec::new();
            io::stdin()
                .read_to_end(&mut content)
                .context("Failed to read startup script from stdin")?;
            Box::new(
                InMemoryScriptSource::new().with_script(config.notebook.script.clone(), content),
            )
        }
        Some(path) => {
            // Command-line paths are relative to the working directory
            config.notebook.script = path.to_path_buf();
            Box::new(FsScriptSource::new())
        }
        None => Box::new(FsScriptSource::relative_to(paths::config_base_dir(
            config_path.as_deref(),
        ))),
    };

    let params = StackParams::new(args.repo.as_deref());
    let stack = stack::build(&config, &params, scripts.as_ref())
        .with_context(|| format!("Failed to build stack {}", config.stack_name))?;

    Ok(LoadedStack {
        config,
        config_path,
        stack,
    })
}

/// Human-readable config origin
pub fn config_origin(path: Option<&Path>) -> String {
    path.map_or_else(
        || "built-in defaults".to_string(),
        |p| p.display().to_string(),
    )
}
