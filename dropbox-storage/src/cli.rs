use clap::{Parser, Subcommand, ValueEnum};
use dropbox_storage::AccessPolicy;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub(crate) struct Args {
    /// Storage backend type
    #[arg(
        short,
        long,
        value_enum,
        env = "STORAGE_BACKEND",
        default_value_t = Backend::Dropbox
    )]
    pub(crate) backend: Backend,

    /// Dropbox app key, used with the app secret to refresh the session
    #[arg(long, env = "DROPBOX_APP_KEY")]
    pub(crate) app_key: Option<String>,

    /// Dropbox app secret
    #[arg(long, env = "DROPBOX_APP_SECRET", hide_env_values = true)]
    pub(crate) app_secret: Option<String>,

    /// Long-lived refresh token issued to the app
    #[arg(long, env = "DROPBOX_REFRESH_TOKEN", hide_env_values = true)]
    pub(crate) refresh_token: Option<String>,

    /// Ready access token, used instead of the refresh flow when set
    #[arg(long, env = "DROPBOX_ACCESS_TOKEN", hide_env_values = true)]
    pub(crate) access_token: Option<String>,

    /// Who may open returned urls: `private` or `public_read`
    #[arg(long, env = "DROPBOX_ACCESS_POLICY", default_value = "private")]
    pub(crate) access_policy: AccessPolicy,

    /// Dropbox folder all paths are placed under
    #[arg(long, env = "DROPBOX_ROOT", default_value = "")]
    pub(crate) dropbox_root: String,

    /// Request timeout in seconds
    #[arg(long, env = "DROPBOX_TIMEOUT_SECS", default_value_t = 30)]
    pub(crate) timeout_secs: u64,

    /// Root directory of the filesystem backend
    #[arg(
        long,
        env = "STORAGE_ROOTDIR",
        default_value = "/var/lib/dropbox-storage"
    )]
    pub(crate) root_dir: String,

    /// Base url the filesystem backend serves files from
    #[arg(long, env = "STORAGE_PUBLIC_URL", default_value = "http://127.0.0.1:8080")]
    pub(crate) public_url: String,

    #[clap(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Backend {
    Dropbox,
    Filesystem,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Upload a local file to PATH.
    Put { local: PathBuf, path: String },
    /// Download PATH to a file, or to stdout.
    Get {
        path: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete PATH. Missing files are not an error.
    Rm { path: String },
    /// Print a direct url for PATH.
    Url { path: String },
    /// Show the Dropbox account the credentials belong to.
    Whoami,
}
