use anyhow::Result;
use std::sync::Arc;

use super::{Context, Task, TaskResult, process_resources};
use crate::resources::template::TemplateResource;

/// Seed machine-local files from `[[templates]]`. Existing files are never
/// touched, so these are not recorded for rollback.
#[derive(Debug)]
pub struct GenerateTemplates;

impl Task for GenerateTemplates {
    fn name(&self) -> &'static str {
        "Generate templates"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        !ctx.config.templates.is_empty()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let resources = ctx.config.templates.iter().map(|t| {
            TemplateResource::new(
                Arc::clone(&ctx.fs_ops),
                ctx.paths().resolve_source(&t.source),
                ctx.resolve_target(&t.target),
            )
        });
        process_resources(ctx, resources, "create")
    }
}
