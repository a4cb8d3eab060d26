use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use trailer_scraper::core::Storage;
use trailer_scraper::utils::logger::{self, LogFormat};
use trailer_scraper::utils::validation::Validate;
use trailer_scraper::{ObjectStoreConfig, S3ObjectStore, ScraperConfig, ScraperError};

#[derive(Parser)]
#[command(name = "archive")]
#[command(about = "Upload, fetch and delete downloaded files in an S3-compatible bucket")]
struct Args {
    /// Key prefix placed before the date folders
    #[arg(long, default_value = "trailers")]
    prefix: String,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: ArchiveCommand,
}

#[derive(Subcommand)]
enum ArchiveCommand {
    /// Upload one file under a date-prefixed key
    Put { file: PathBuf },
    /// Download an object to a local file
    Get { key: String, output: PathBuf },
    /// Delete an object
    Delete { key: String },
    /// Upload every file in the download directory
    Sync {
        /// Path to TOML configuration file (for download.dir)
        #[arg(short, long)]
        config: Option<String>,
        /// Override the directory to upload
        #[arg(long)]
        dir: Option<String>,
    },
}

async fn sync_dir(store: &S3ObjectStore, dir: &Path, prefix: &str) -> Result<(usize, usize), ScraperError> {
    let mut uploaded = 0;
    let mut failed = 0;

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_partial = path.extension().is_some_and(|ext| ext == "part");
        if !entry.file_type().await?.is_file() || is_partial {
            continue;
        }

        match store.upload_file(&path, prefix).await {
            Ok(result) => {
                println!("✅ {} -> {}", path.display(), result.public_url);
                uploaded += 1;
            }
            Err(e) => {
                tracing::error!("❌ Upload of {} failed: {}", path.display(), e);
                failed += 1;
            }
        }
    }

    Ok((uploaded, failed))
}

async fn run(args: &Args) -> Result<(), ScraperError> {
    let store_config = ObjectStoreConfig::from_env()?;
    store_config.validate()?;
    let store = S3ObjectStore::connect(&store_config).await;
    tracing::info!("🪣 Using bucket {}", store.bucket());

    match &args.command {
        ArchiveCommand::Put { file } => {
            let result = store.upload_file(file, &args.prefix).await?;
            println!("✅ Uploaded {} bytes", result.size);
            println!("🔑 {}", result.key);
            println!("🌐 {}", result.public_url);
        }
        ArchiveCommand::Get { key, output } => {
            let data = store.read_file(key).await?;
            if let Some(parent) = output.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(output, &data).await?;
            println!("✅ Saved {} ({} bytes)", output.display(), data.len());
        }
        ArchiveCommand::Delete { key } => {
            if !store.exists(key).await? {
                println!("Nothing to delete: {}", store.display_path(key));
                return Ok(());
            }
            store.delete_file(key).await?;
            println!("🗑️ Deleted {}", store.display_path(key));
        }
        ArchiveCommand::Sync { config, dir } => {
            let dir = match dir {
                Some(dir) => PathBuf::from(dir),
                None => ScraperConfig::load(config.as_deref())?.download_dir(),
            };
            let (uploaded, failed) = sync_dir(&store, &dir, &args.prefix).await?;
            println!("✨ Uploaded: {}, failed: {}", uploaded, failed);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose, args.log_format);

    if let Err(e) = run(&args).await {
        tracing::error!(
            "❌ Archive command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code().max(1));
    }
}
