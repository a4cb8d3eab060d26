use clap::Parser;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use trailer_scraper::core::commands::{Command, CommandFlow};
use trailer_scraper::utils::{logger, validation::Validate};
use trailer_scraper::{
    BrowserManager, CliConfig, CommandHandler, LedgerStore, LinkHarvester, LocalStorage,
    PageProcessor, ScraperError,
};

fn fail(context: &str, e: &ScraperError) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(
        trailer_scraper::config::debug_logging(cli.verbose, cli.dev),
        cli.log_format,
    );
    tracing::info!("Starting trailer-scraper");

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => fail("Failed to load configuration", &e),
    };
    if let Err(e) = config.validate() {
        fail("Configuration validation failed", &e);
    }
    tracing::debug!("Resolved config: {:?}", config);

    let manager = match BrowserManager::new(&config) {
        Ok(manager) => manager,
        Err(e) => fail("Failed to prepare browser manager", &e),
    };
    let session = match manager.create_or_attach().await {
        Ok(session) => session,
        Err(e) => fail("Could not open a browser session", &e),
    };
    if session.is_existing() {
        println!("🔌 Attached to the running browser on port {}", config.browser.port);
    } else {
        println!("🚀 Started a new browser on port {}", config.browser.port);
    }

    let processor = PageProcessor::new(session.driver(), &config);
    let ledger = LedgerStore::new(LocalStorage::new(config.ledger_dir()));
    let harvester = LinkHarvester::new(&config.harvest, ledger);
    let mut handler = CommandHandler::new(processor, harvester, config.targets_file());

    // 非互動模式：執行單一指令後結束
    if let Some(run) = &cli.run {
        match run.parse::<Command>() {
            Ok(command) => {
                handler.run(command).await;
            }
            Err(e) => {
                eprintln!("❌ {}. Available commands: {}", e, Command::available());
                session.disconnect();
                std::process::exit(2);
            }
        }
        session.disconnect();
        return Ok(());
    }

    println!("{}", Command::menu());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("Enter a command (number or name): ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        if handler.execute(&line).await == CommandFlow::Exit {
            break;
        }
    }

    session.disconnect();
    tracing::info!("Bye");
    Ok(())
}
