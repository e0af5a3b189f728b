use anyhow::Result;
use std::sync::Arc;

use super::{Context, Task, TaskResult, process_resources};
use crate::resources::directory::DirectoryResource;

/// Create the configured `directories` before anything is linked into them.
#[derive(Debug)]
pub struct CreateDirectories;

impl Task for CreateDirectories {
    fn name(&self) -> &'static str {
        "Create directories"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.directories.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let resources = ctx
            .config
            .directories
            .iter()
            .map(|d| DirectoryResource::new(Arc::clone(&ctx.fs_ops), ctx.resolve_target(d)));
        process_resources(ctx, resources, "create")
    }
}
