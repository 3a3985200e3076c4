//! CLI argument parsing.

use std::path::PathBuf;

use argh::FromArgs;

#[derive(Clone, Debug, FromArgs)]
#[argh(description = "hodlock overlay service daemon")]
pub(crate) struct Args {
    #[argh(option, short = 'c', description = "path to configuration")]
    pub config: PathBuf,

    /// Data directory path that will override the path in the config toml.
    #[argh(option, short = 'd', description = "datadir path for the lock registry")]
    pub datadir: Option<PathBuf>,
}
