use crate::core::harvest::LinkHarvester;
use crate::core::processor::PageProcessor;
use crate::core::targets::load_targets;
use crate::core::{Locator, PageDriver, ProcessOutcome, RunStats, Storage};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Title,
    Count,
    Login,
    LoginBtn,
    Agree,
    AgreeBtn,
    Main,
    Trailer,
    DoProcess,
    DoAll,
    Harvest,
    ProcessNew,
    Quit,
}

impl Command {
    pub const ALL: [Command; 13] = [
        Command::Title,
        Command::Count,
        Command::Login,
        Command::LoginBtn,
        Command::Agree,
        Command::AgreeBtn,
        Command::Main,
        Command::Trailer,
        Command::DoProcess,
        Command::DoAll,
        Command::Harvest,
        Command::ProcessNew,
        Command::Quit,
    ];

    pub fn number(self) -> usize {
        match self {
            Command::Quit => 0,
            other => Self::ALL.iter().position(|c| *c == other).map_or(0, |i| i + 1),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Title => "title",
            Command::Count => "count",
            Command::Login => "login",
            Command::LoginBtn => "loginbtn",
            Command::Agree => "agree",
            Command::AgreeBtn => "agreebtn",
            Command::Main => "main",
            Command::Trailer => "trailer",
            Command::DoProcess => "do_process",
            Command::DoAll => "do_all",
            Command::Harvest => "harvest",
            Command::ProcessNew => "process_new",
            Command::Quit => "quit",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Command::Title => "Print the current page title",
            Command::Count => "Count elements matching the probe selector",
            Command::Login => "Click the login link by its text",
            Command::LoginBtn => "Click the login link by selector",
            Command::Agree => "Click the consent button by its text",
            Command::AgreeBtn => "Click the consent button by selector",
            Command::Main => "Click the main content (fallback chain)",
            Command::Trailer => "Read the trailer source and download it",
            Command::DoProcess => "Run the full process on the current page",
            Command::DoAll => "Process every site in the target list, then exit",
            Command::Harvest => "Harvest links on the current page into the ledger",
            Command::ProcessNew => "Process links added by the last harvest",
            Command::Quit => "Exit",
        }
    }

    pub fn menu() -> String {
        let mut lines = Vec::with_capacity(Self::ALL.len());
        for command in Self::ALL {
            lines.push(format!(
                "{:>3}) {:<12} {}",
                command.number(),
                command.name(),
                command.description()
            ));
        }
        lines.join("\n")
    }

    pub fn available() -> String {
        Self::ALL
            .iter()
            .map(|c| c.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let input = s.trim().to_lowercase();
        if let Ok(number) = input.parse::<usize>() {
            return Self::ALL
                .into_iter()
                .find(|c| c.number() == number)
                .ok_or_else(|| format!("Unknown command number: {}", number));
        }
        Self::ALL
            .into_iter()
            .find(|c| c.name() == input)
            .ok_or_else(|| format!("Unknown command: {}", input))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFlow {
    Continue,
    Exit,
}

pub struct CommandHandler<D: PageDriver, S: Storage> {
    processor: PageProcessor<D>,
    harvester: LinkHarvester<S>,
    targets_file: String,
    last_added: Vec<String>,
}

impl<D: PageDriver, S: Storage> CommandHandler<D, S> {
    pub fn new(
        processor: PageProcessor<D>,
        harvester: LinkHarvester<S>,
        targets_file: impl Into<String>,
    ) -> Self {
        Self {
            processor,
            harvester,
            targets_file: targets_file.into(),
            last_added: Vec::new(),
        }
    }

    pub fn processor(&self) -> &PageProcessor<D> {
        &self.processor
    }

    /// 上一次 harvest 新增、尚未處理的連結
    pub fn pending(&self) -> &[String] {
        &self.last_added
    }

    /// 解析使用者輸入並執行；無法辨識時列出可用指令
    pub async fn execute(&mut self, input: &str) -> CommandFlow {
        match input.parse::<Command>() {
            Ok(command) => self.run(command).await,
            Err(_) => {
                println!("Unknown command. Available commands: {}", Command::available());
                CommandFlow::Continue
            }
        }
    }

    pub async fn run(&mut self, command: Command) -> CommandFlow {
        tracing::debug!("Running command: {}", command);
        match command {
            Command::Title => self.handle_title().await,
            Command::Count => self.handle_count().await,
            Command::Login => {
                let locator = self.processor.selectors().login_text.clone();
                self.handle_click(&locator, "login link").await
            }
            Command::LoginBtn => {
                let locator = self.processor.selectors().login_button.clone();
                self.handle_click(&locator, "login link").await
            }
            Command::Agree => {
                let locator = self.processor.selectors().agree_text.clone();
                self.handle_click(&locator, "consent button").await
            }
            Command::AgreeBtn => {
                let locator = self.processor.selectors().agree_button.clone();
                self.handle_click(&locator, "consent button").await
            }
            Command::Main => match self.processor.click_main_content().await {
                Ok(locator) => println!("Clicked main content ({})", locator),
                Err(e) => println!("Main content not found: {}", e),
            },
            Command::Trailer => self.handle_trailer().await,
            Command::DoProcess => {
                let outcome = self.processor.do_process().await;
                print_outcome(&outcome);
            }
            Command::DoAll => {
                // 目標清單讀取失敗時留在選單
                if self.handle_do_all().await {
                    return CommandFlow::Exit;
                }
            }
            Command::Harvest => self.handle_harvest().await,
            Command::ProcessNew => self.handle_process_new().await,
            Command::Quit => return CommandFlow::Exit,
        }
        CommandFlow::Continue
    }

    async fn handle_title(&self) {
        match self.processor.driver().title().await {
            Ok(Some(title)) => println!("Current page title: {}", title),
            Ok(None) => println!("Current page has no title"),
            Err(e) => println!("Could not read the title: {}", e),
        }
    }

    async fn handle_count(&self) {
        let probe = &self.processor.selectors().probe;
        match self.processor.driver().count(probe).await {
            Ok(0) => println!("No elements match {}", probe),
            Ok(count) => println!("Found {} element(s) matching {}", count, probe),
            Err(e) => println!("Could not query {}: {}", probe, e),
        }
    }

    async fn handle_click(&self, locator: &Locator, what: &str) {
        match self.processor.driver().click(locator).await {
            Ok(()) => println!("Clicked the {} ({})", what, locator),
            Err(e) => println!("Could not click the {}: {}", what, e),
        }
    }

    async fn handle_trailer(&self) {
        match self.processor.trailer_source().await {
            Ok(Some(src)) => {
                println!("Trailer source URL: {}", src);
                let outcome = self.processor.fetch_media(&src).await;
                print_outcome(&outcome);
            }
            Ok(None) => println!("Trailer element has no src attribute"),
            Err(e) => println!("Could not read the trailer source: {}", e),
        }
    }

    /// 批次有執行時回傳 true
    async fn handle_do_all(&self) -> bool {
        let urls = match load_targets(&self.targets_file) {
            Ok(urls) => urls,
            Err(e) => {
                tracing::error!("❌ Could not load {}: {}", self.targets_file, e);
                eprintln!("❌ {}", e.user_friendly_message());
                return false;
            }
        };

        tracing::info!("Processing {} sites from {}", urls.len(), self.targets_file);
        let stats = self.processor.visit_and_process(&urls).await;
        print_stats(&stats);
        true
    }

    async fn handle_harvest(&mut self) {
        match self.harvester.harvest(self.processor.driver()).await {
            Ok(report) => {
                println!(
                    "Ledger {} updated: {} new, {} total ({})",
                    report.domain,
                    report.new_added_count(),
                    report.total_count,
                    report.ledger_path
                );
                self.last_added = report.added;
            }
            Err(e) => {
                tracing::error!("❌ Harvest failed: {}", e);
                println!("Harvest failed: {}", e.user_friendly_message());
            }
        }
    }

    async fn handle_process_new(&mut self) {
        if self.last_added.is_empty() {
            println!("Nothing new to process. Run 'harvest' first.");
            return;
        }

        let urls = std::mem::take(&mut self.last_added);
        let stats = self.processor.visit_and_process(&urls).await;
        print_stats(&stats);
    }
}

fn print_outcome(outcome: &ProcessOutcome) {
    match outcome {
        ProcessOutcome::Downloaded(path) => println!("Downloaded: {}", path.display()),
        ProcessOutcome::Skipped(reason) => println!("Skipped: {}", reason),
        ProcessOutcome::Failed(message) => println!("Failed: {}", message),
    }
}

fn print_stats(stats: &RunStats) {
    println!(
        "Total: {}, downloaded: {}, skipped: {}, errors: {}",
        stats.total, stats.downloaded, stats.skipped, stats.errors
    );
}
