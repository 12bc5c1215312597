use std::fs;
use std::io::ErrorKind;

use tracing::info;

use super::{Task, TaskError, TaskResult};
use crate::changelog::{iso_date_today, prepend, render_section, select_entries};
use crate::context::Context;

/// Render a changelog section and prepend it to the changelog file.
pub struct UpdateChangelog;

impl Task for UpdateChangelog {
    fn describe(&self) -> String {
        "update changelog".to_string()
    }

    fn skip(&self, ctx: &Context) -> bool {
        let prerelease = ctx
            .next_version
            .as_ref()
            .is_some_and(|v| !v.prerelease().is_empty());
        ctx.no_version_changed || ctx.changelog.skip || (ctx.changelog.skip_prerelease && prerelease)
    }

    fn run(&self, ctx: &mut Context) -> TaskResult<()> {
        let next = ctx
            .next_version
            .as_ref()
            .ok_or_else(|| TaskError::Precondition("next version not calculated".into()))?;

        let entries = select_entries(&ctx.commits, &ctx.changelog);
        let section = render_section(next, &iso_date_today(), &entries);
        info!(entries = entries.len(), "rendered changelog section");

        if ctx.changelog.diff_only || ctx.dry_run {
            ctx.changelog_section = Some(section);
            return Ok(());
        }

        let path = ctx.root.join(&ctx.changelog.path);
        let existing = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(source) => return Err(TaskError::Io { path, source }),
        };
        fs::write(&path, prepend(&existing, &section))
            .map_err(|source| TaskError::Io { path: path.clone(), source })?;
        info!(%path, "updated changelog");

        let file = ctx.changelog.path.to_string();
        if !ctx.modified_files.contains(&file) {
            ctx.modified_files.push(file);
        }
        ctx.changelog_section = Some(section);
        Ok(())
    }
}
