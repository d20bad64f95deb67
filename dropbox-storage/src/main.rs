use clap::Parser;
use cli::{Args, Backend, Command};
use dropbox_storage::{
    DropboxConfig, DropboxStorage, FileStorage, Storage, UploadContext, UploadTarget,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    run(args).await
}

async fn run(args: Args) -> anyhow::Result<()> {
    match &args.command {
        Command::Put { local, path } => {
            let storage = open_storage(&args, path)?;
            let file = storage.store(local).await?;
            println!("stored {}", file.path());
        }
        Command::Get { path, output } => {
            let data = open_storage(&args, path)?.retrieve().read().await?;
            match output {
                Some(out) => tokio::fs::write(out, &data).await?,
                None => {
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&data).await?;
                    stdout.flush().await?;
                }
            }
        }
        Command::Rm { path } => {
            open_storage(&args, path)?.retrieve().delete().await?;
            println!("removed {path}");
        }
        Command::Url { path } => {
            let url = open_storage(&args, path)?.retrieve().url().await?;
            println!("{url}");
        }
        Command::Whoami => {
            if args.backend != Backend::Dropbox {
                anyhow::bail!("`whoami` needs the dropbox backend");
            }
            let storage = DropboxStorage::new(dropbox_config(&args), uploader(""))?;
            let account = storage.validate_session().await?;
            println!(
                "{} <{}> ({})",
                account.name.display_name,
                account.email.as_deref().unwrap_or("no email"),
                account.account_id
            );
        }
    }
    Ok(())
}

fn uploader(path: &str) -> Arc<dyn UploadContext> {
    Arc::new(UploadTarget::new(path))
}

fn dropbox_config(args: &Args) -> DropboxConfig {
    let mut config = DropboxConfig::default()
        .with_access_policy(args.access_policy)
        .with_root(&args.dropbox_root)
        .with_timeout(Duration::from_secs(args.timeout_secs));
    config.credentials.app_key = args.app_key.clone();
    config.credentials.app_secret = args.app_secret.clone();
    config.credentials.refresh_token = args.refresh_token.clone();
    config.credentials.access_token = args.access_token.clone();
    config
}

fn open_storage(args: &Args, path: &str) -> anyhow::Result<Arc<dyn Storage>> {
    let storage: Arc<dyn Storage> = match args.backend {
        Backend::Dropbox => Arc::new(DropboxStorage::new(dropbox_config(args), uploader(path))?),
        Backend::Filesystem => Arc::new(FileStorage::new(
            &args.root_dir,
            &args.public_url,
            uploader(path),
        )),
    };
    tracing::debug!(backend = ?args.backend, path, "opened storage");
    Ok(storage)
}
