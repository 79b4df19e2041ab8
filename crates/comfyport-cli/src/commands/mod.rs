//! Command dispatch and handler modules.

mod build;
mod release;

use miette::Result;

use comfyport_util::errors::PortableError;

use crate::cli::Cli;

/// Route a parsed CLI invocation to the build or release handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir().map_err(PortableError::Io)?;
    let project_dir = comfyport_ops::find_project_dir(cli.project_dir.as_deref(), &cwd)?;

    if cli.publish_release {
        return release::exec(&project_dir, cli.dist.as_deref());
    }
    build::exec(&project_dir, &cli)
}
