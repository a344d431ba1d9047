//! CLI workflows. Each one checks its gates, then runs one pipeline.

pub mod golive;
pub mod init_dev;
pub mod init_git;
pub mod install;
pub mod manifest;
pub mod pull;
pub mod push;
pub mod update;

use crate::context::ProjectContext;
use crate::executor::CommandSpec;

fn tool<I, S>(ctx: &ProjectContext, program: &str, args: I) -> CommandSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    CommandSpec::new(program).args(args).current_dir(ctx.root())
}

pub(crate) fn drush<I, S>(ctx: &ProjectContext, args: I) -> CommandSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tool(ctx, &ctx.config().tools.drush, args)
}

pub(crate) fn git<I, S>(ctx: &ProjectContext, args: I) -> CommandSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tool(ctx, &ctx.config().tools.git, args)
}

pub(crate) fn composer<I, S>(ctx: &ProjectContext, args: I) -> CommandSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tool(ctx, &ctx.config().tools.composer, args)
}

pub(crate) fn chmod<I, S>(ctx: &ProjectContext, args: I) -> CommandSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tool(ctx, &ctx.config().tools.chmod, args)
}

/// `<sites_dir>/<file>`, relative to the project root.
pub(crate) fn sites_path(ctx: &ProjectContext, file: &str) -> String {
    format!(
        "{}/{}",
        ctx.config().install.sites_dir.trim_end_matches('/'),
        file
    )
}
