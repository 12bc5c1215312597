use tracing::info;

use super::{Task, TaskResult};
use crate::context::Context;
use crate::version::calculate::VersionCalculator;

/// Calculate the next version and record it on the context.
///
/// Every later task consults `no_version_changed` before acting.
pub struct NextVersion;

impl Task for NextVersion {
    fn describe(&self) -> String {
        "calculate next version".to_string()
    }

    fn run(&self, ctx: &mut Context) -> TaskResult<()> {
        let calculation = VersionCalculator::new(ctx.repo.as_ref(), &ctx.version).calculate()?;

        ctx.no_version_changed = !calculation.changed();
        ctx.increment = calculation.increment;
        ctx.current_version = calculation.current;
        ctx.current_tag = calculation.current_tag;
        ctx.next_version = Some(calculation.next);
        ctx.commits = calculation.commits;

        if ctx.no_version_changed {
            info!(current = %ctx.current_version, "no version change");
        } else {
            info!(
                current = %ctx.current_version,
                next = ?ctx.next_tag(),
                increment = %ctx.increment,
                "next version"
            );
        }
        Ok(())
    }
}
