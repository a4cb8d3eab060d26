mod common;

use common::*;
use httpmock::prelude::*;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};
use trailer_scraper::core::commands::CommandFlow;
use trailer_scraper::core::{PageDriver, ProcessOutcome, SkipReason};
use trailer_scraper::{CommandHandler, LedgerStore, LinkHarvester, LocalStorage, PageProcessor};

const PAGE: &str = "https://site.example.com/scenes/1";

#[tokio::test]
async fn test_do_process_with_consent_dialog() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let media = server.mock(|when, then| {
        when.method(GET).path("/media/scene1_720p.mp4");
        then.status(200).body("video bytes");
    });

    let driver = FakeDriver::new()
        .page(
            PAGE,
            FakePage::titled("Scene 1")
                .with(agree_button())
                .with(hero_image())
                .with_attr(trailer_source(), "src", &server.url("/media/scene1_720p.mp4")),
        )
        .opened_at(PAGE);

    let processor = PageProcessor::new(driver, &test_config(temp_dir.path()));
    let outcome = processor.do_process().await;

    media.assert();
    assert_eq!(
        outcome,
        ProcessOutcome::Downloaded(temp_dir.path().join("scene1_720p.mp4"))
    );
    assert_eq!(processor.driver().clicks(), vec![agree_button(), hero_image()]);
}

#[tokio::test]
async fn test_consent_falls_back_to_button_text() {
    let temp_dir = TempDir::new().unwrap();
    let driver = FakeDriver::new()
        .page(PAGE, FakePage::titled("Scene 1").with(agree_text()))
        .opened_at(PAGE);

    let processor = PageProcessor::new(driver, &test_config(temp_dir.path()));
    assert!(processor.dismiss_consent().await.unwrap());
    assert_eq!(processor.driver().clicks(), vec![agree_text()]);
}

#[tokio::test]
async fn test_no_consent_dialog_and_main_content_fallback() {
    let temp_dir = TempDir::new().unwrap();
    let driver = FakeDriver::new()
        .page(
            PAGE,
            FakePage::titled("Scene 1")
                .with(picture_image())
                .with_attr(trailer_source(), "src", "https://cdn.example.com/a.webm"),
        )
        .opened_at(PAGE);

    let processor = PageProcessor::new(driver, &test_config(temp_dir.path()));
    assert!(!processor.dismiss_consent().await.unwrap());

    let outcome = processor.do_process().await;
    assert_eq!(
        outcome,
        ProcessOutcome::Skipped(SkipReason::NotWantedMedia(
            "https://cdn.example.com/a.webm".to_string()
        ))
    );
    // 第一個主要內容選擇器不存在，改點第二個
    assert_eq!(processor.driver().clicks(), vec![picture_image()]);
}

#[tokio::test]
async fn test_missing_trailer_is_a_failure() {
    let temp_dir = TempDir::new().unwrap();
    let driver = FakeDriver::new()
        .page(PAGE, FakePage::titled("Scene 1").with(hero_image()))
        .opened_at(PAGE);

    let processor = PageProcessor::new(driver, &test_config(temp_dir.path()));
    assert!(matches!(processor.do_process().await, ProcessOutcome::Failed(_)));
}

#[tokio::test]
async fn test_trailer_without_src_is_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let driver = FakeDriver::new()
        .page(PAGE, FakePage::titled("Scene 1").with(trailer_source()))
        .opened_at(PAGE);

    let processor = PageProcessor::new(driver, &test_config(temp_dir.path()));
    assert_eq!(
        processor.do_process().await,
        ProcessOutcome::Skipped(SkipReason::EmptySource)
    );
}

#[tokio::test]
async fn test_visit_and_process_counts_every_site() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/a.mp4");
        then.status(200).body("a");
    });

    let good = "https://site.example.com/a";
    let webm = "https://site.example.com/b";
    let unreachable = "https://down.example.com/c";

    let driver = FakeDriver::new()
        .page(
            good,
            FakePage::default().with_attr(trailer_source(), "src", &server.url("/a.mp4")),
        )
        .page(
            webm,
            FakePage::default().with_attr(trailer_source(), "src", "https://cdn.example.com/b.webm"),
        );

    let processor = PageProcessor::new(driver, &test_config(temp_dir.path()));
    let urls = vec![good.to_string(), unreachable.to_string(), webm.to_string()];
    let stats = processor.visit_and_process(&urls).await;

    assert_eq!(stats.total, 3);
    assert_eq!(stats.downloaded, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.downloaded + stats.skipped + stats.errors, stats.total);
    // 無法開啟的網址不影響後續網址
    assert_eq!(processor.driver().visits(), vec![good.to_string(), webm.to_string()]);
}

#[tokio::test]
async fn test_harvest_then_process_new() {
    let download_dir = TempDir::new().unwrap();
    let ledger_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/v1.mp4");
        then.status(200).body("1");
    });

    let list = "https://list.example.com/videos";
    let driver = FakeDriver::new()
        .page(
            list,
            FakePage::titled("Videos")
                .with_attr(list_item(), "href", "/v/1")
                .with_attr(list_item(), "href", "#top")
                .with_attr(list_item(), "href", "https://list.example.com/v/2")
                .with_attr(list_item(), "href", "/v/1"),
        )
        .page(
            "https://list.example.com/v/1",
            FakePage::default().with_attr(trailer_source(), "src", &server.url("/v1.mp4")),
        )
        .page("https://list.example.com/v/2", FakePage::default())
        .opened_at(list);

    let config = test_config(download_dir.path());
    let processor = PageProcessor::new(driver, &config);
    let harvester = LinkHarvester::new(
        &config.harvest,
        LedgerStore::new(LocalStorage::new(ledger_dir.path())),
    );
    let mut handler = CommandHandler::new(processor, harvester, "missing-targets.json");

    assert_eq!(handler.execute("11").await, CommandFlow::Continue);
    assert_eq!(
        handler.pending(),
        &[
            "https://list.example.com/v/1".to_string(),
            "https://list.example.com/v/2".to_string()
        ]
    );
    assert!(ledger_dir.path().join("list.example.com.json").exists());

    assert_eq!(handler.execute("process_new").await, CommandFlow::Continue);
    assert!(handler.pending().is_empty());
    assert_eq!(
        handler.processor().driver().visits(),
        vec![
            "https://list.example.com/v/1".to_string(),
            "https://list.example.com/v/2".to_string()
        ]
    );
    assert!(download_dir.path().join("v1.mp4").exists());

    // 再 harvest 一次不會有新的連結
    handler
        .processor()
        .driver()
        .goto(list)
        .await
        .unwrap();
    handler.execute("harvest").await;
    assert!(handler.pending().is_empty());
}

#[tokio::test]
async fn test_do_all_processes_targets_then_exits() {
    let temp_dir = TempDir::new().unwrap();
    let mut targets = NamedTempFile::new().unwrap();
    targets
        .write_all(br#"{"sites": ["https://a.example.com/1", "https://b.example.com/2"]}"#)
        .unwrap();

    let driver = FakeDriver::new()
        .page("https://a.example.com/1", FakePage::default())
        .page("https://b.example.com/2", FakePage::default());

    let config = test_config(temp_dir.path());
    let processor = PageProcessor::new(driver, &config);
    let harvester = LinkHarvester::new(
        &config.harvest,
        LedgerStore::new(LocalStorage::new(temp_dir.path().join("ledger"))),
    );
    let mut handler =
        CommandHandler::new(processor, harvester, targets.path().display().to_string());

    assert_eq!(handler.execute("do_all").await, CommandFlow::Exit);
    assert_eq!(handler.processor().driver().visits().len(), 2);
}

#[tokio::test]
async fn test_unknown_and_quit_commands() {
    let temp_dir = TempDir::new().unwrap();
    let driver = FakeDriver::new()
        .page(PAGE, FakePage::titled("Scene 1"))
        .opened_at(PAGE);
    let config = test_config(temp_dir.path());
    let harvester = LinkHarvester::new(
        &config.harvest,
        LedgerStore::new(LocalStorage::new(temp_dir.path())),
    );
    let mut handler =
        CommandHandler::new(PageProcessor::new(driver, &config), harvester, "target.json");

    assert_eq!(handler.execute("dance").await, CommandFlow::Continue);
    assert_eq!(handler.execute("title").await, CommandFlow::Continue);
    assert_eq!(handler.execute("agreebtn").await, CommandFlow::Continue);
    assert!(handler.processor().driver().clicks().is_empty());
    assert_eq!(handler.execute("0").await, CommandFlow::Exit);
}

fn handler_with_targets(
    driver: FakeDriver,
    download_dir: &std::path::Path,
    targets: &str,
) -> CommandHandler<FakeDriver, LocalStorage> {
    let config = test_config(download_dir);
    let harvester = LinkHarvester::new(
        &config.harvest,
        LedgerStore::new(LocalStorage::new(download_dir.join("ledger"))),
    );
    CommandHandler::new(PageProcessor::new(driver, &config), harvester, targets)
}

#[tokio::test]
async fn test_do_all_continues_past_invalid_entries() {
    let temp_dir = TempDir::new().unwrap();
    let mut targets = NamedTempFile::new().unwrap();
    targets
        .write_all(
            br#"{"sites": ["https://a.example.com/1", "a.example.com/2", "https://b.example.com/3"]}"#,
        )
        .unwrap();

    let driver = FakeDriver::new()
        .page("https://a.example.com/1", FakePage::default())
        .page("https://b.example.com/3", FakePage::default());
    let mut handler =
        handler_with_targets(driver, temp_dir.path(), &targets.path().display().to_string());

    assert_eq!(handler.execute("do_all").await, CommandFlow::Exit);
    assert_eq!(
        handler.processor().driver().visits(),
        vec![
            "https://a.example.com/1".to_string(),
            "https://b.example.com/3".to_string()
        ]
    );
}

#[tokio::test]
async fn test_invalid_url_counts_as_error_without_navigation() {
    let temp_dir = TempDir::new().unwrap();
    let driver = FakeDriver::new().page(
        "https://site.example.com/a",
        FakePage::default().with_attr(trailer_source(), "src", "https://cdn.example.com/a.webm"),
    );

    let processor = PageProcessor::new(driver, &test_config(temp_dir.path()));
    let urls = vec![
        "site.example.com/a".to_string(),
        "https://site.example.com/a".to_string(),
    ];
    let stats = processor.visit_and_process(&urls).await;

    assert_eq!(stats.total, 2);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(processor.driver().visits().len(), 1);
}

#[tokio::test]
async fn test_do_all_with_missing_target_list_stays_in_menu() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope").join("target.json");
    let mut handler = handler_with_targets(
        FakeDriver::new(),
        temp_dir.path(),
        &missing.display().to_string(),
    );

    assert_eq!(handler.execute("do_all").await, CommandFlow::Continue);
    assert!(handler.processor().driver().visits().is_empty());
    assert_eq!(handler.execute("quit").await, CommandFlow::Exit);
}

#[tokio::test]
async fn test_menu_click_commands_on_matching_page() {
    let temp_dir = TempDir::new().unwrap();
    let driver = FakeDriver::new()
        .page(
            PAGE,
            FakePage::titled("Scene 1")
                .with(probe())
                .with(probe())
                .with(login_button())
                .with(login_text())
                .with(agree_button())
                .with(agree_text())
                .with(picture_image()),
        )
        .opened_at(PAGE);
    let mut handler = handler_with_targets(driver, temp_dir.path(), "target.json");

    for input in ["count", "3", "loginbtn", "agree", "6", "main"] {
        assert_eq!(handler.execute(input).await, CommandFlow::Continue);
    }

    assert_eq!(
        handler.processor().driver().clicks(),
        vec![
            login_text(),
            login_button(),
            agree_text(),
            agree_button(),
            picture_image()
        ]
    );
}

#[tokio::test]
async fn test_trailer_command_downloads_wanted_media() {
    let temp_dir = TempDir::new().unwrap();
    let server = MockServer::start();
    let media = server.mock(|when, then| {
        when.method(GET).path("/t/scene_1080p.mp4");
        then.status(200).body("trailer");
    });

    let driver = FakeDriver::new()
        .page(
            PAGE,
            FakePage::titled("Scene 1").with_attr(
                trailer_source(),
                "src",
                &server.url("/t/scene_1080p.mp4"),
            ),
        )
        .opened_at(PAGE);
    let mut handler = handler_with_targets(driver, temp_dir.path(), "target.json");

    assert_eq!(handler.execute("trailer").await, CommandFlow::Continue);
    media.assert();
    assert!(temp_dir.path().join("scene_1080p.mp4").exists());
    // 主要內容與同意按鈕不在 trailer 指令的範圍
    assert!(handler.processor().driver().clicks().is_empty());
}
