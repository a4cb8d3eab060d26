use clap::Parser;
use std::time::Duration;
use trailer_scraper::core::PageDriver;
use trailer_scraper::utils::logger::{self, LogFormat};
use trailer_scraper::utils::validation::{validate_url, Validate};
use trailer_scraper::{
    BrowserManager, LedgerStore, LinkHarvester, LocalStorage, PageProcessor, ScraperConfig,
    ScraperError,
};

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Collect links from a list page into the per-domain ledger")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// List page to harvest (defaults to harvest.list_url)
    #[arg(long)]
    url: Option<String>,

    /// Selector for list items, e.g. "#list > li > a"
    #[arg(long)]
    item_selector: Option<String>,

    #[arg(long)]
    attribute: Option<String>,

    /// Maximum number of items to read
    #[arg(long)]
    limit: Option<usize>,

    #[arg(long)]
    ledger_dir: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Visit and process the newly added links after the merge
    #[arg(long)]
    process_new: bool,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,
}

impl Args {
    fn apply(&self, config: &mut ScraperConfig) -> Result<(), ScraperError> {
        if let Some(url) = &self.url {
            config.harvest.list_url = Some(url.clone());
        }
        if let Some(selector) = &self.item_selector {
            config.harvest.item_selector =
                selector
                    .parse()
                    .map_err(|reason| ScraperError::InvalidConfigValueError {
                        field: "item_selector".to_string(),
                        value: selector.clone(),
                        reason,
                    })?;
        }
        if let Some(attribute) = &self.attribute {
            config.harvest.attribute = attribute.clone();
        }
        if let Some(limit) = self.limit {
            config.harvest.limit = limit;
        }
        if let Some(dir) = &self.ledger_dir {
            config.ledger.dir = dir.clone();
        }
        if let Some(port) = self.port {
            config.browser.port = port;
        }
        Ok(())
    }
}

async fn run(args: &Args) -> Result<(), ScraperError> {
    let mut config = ScraperConfig::load(args.config.as_deref())?;
    config.dev_mode = trailer_scraper::config::is_dev_env();
    args.apply(&mut config)?;
    config.validate()?;

    let list_url = config
        .harvest
        .list_url
        .clone()
        .ok_or_else(|| ScraperError::MissingConfigError {
            field: "harvest.list_url (or --url)".to_string(),
        })?;
    validate_url("harvest.list_url", &list_url)?;

    let session = BrowserManager::new(&config)?.create_or_attach().await?;
    let driver = session.driver();

    tracing::info!("🌐 Opening list page {}", list_url);
    driver.goto(&list_url).await?;
    tokio::time::sleep(Duration::from_millis(config.wait.page_load_ms)).await;

    let ledger = LedgerStore::new(LocalStorage::new(config.ledger_dir()));
    let harvester = LinkHarvester::new(&config.harvest, ledger);
    let report = harvester.harvest(&driver).await?;

    println!("📒 Ledger: {}", report.ledger_path);
    println!(
        "🔗 {} new link(s), {} total for {}",
        report.new_added_count(),
        report.total_count,
        report.domain
    );
    for href in &report.added {
        println!("  + {}", href);
    }

    if args.process_new && !report.added.is_empty() {
        let processor = PageProcessor::new(driver, &config);
        let stats = processor.visit_and_process(&report.added).await;
        println!(
            "Total: {}, downloaded: {}, skipped: {}, errors: {}",
            stats.total, stats.downloaded, stats.skipped, stats.errors
        );
    }

    session.disconnect();
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    logger::init_cli_logger(
        trailer_scraper::config::debug_logging(args.verbose, false),
        args.log_format,
    );

    if let Err(e) = run(&args).await {
        tracing::error!(
            "❌ Harvest failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.exit_code().max(1));
    }
}
