//! Trigger-driven job against a local HTTP server and a fake renderer.

mod common;

use common::{capture_logs, refused_url, FakeRenderer, TestServer};
use pib_pdfs::{
    run_job, run_job_without_webhook, ConversionMode, FetchError, FetchMethod, IfNoFilesFound,
    JobConfig, TriggerPayload,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn config(root: &Path, mode: ConversionMode) -> JobConfig {
    JobConfig::builder()
        .output_dir(root.join("pdfs"))
        .artifact_root(root.join("artifacts"))
        .conversion_mode(mode)
        .renderer(Arc::new(FakeRenderer))
        .run_id("4242")
        .build()
        .unwrap()
}

fn payload(links: Vec<String>, webhook: String, count: Option<u64>) -> TriggerPayload {
    TriggerPayload {
        links,
        n8n_webhook: webhook,
        timestamp: json!("2025-06-01T10:00:00Z"),
        count,
    }
}

fn pdfs_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| {
            rd.filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|n| n.ends_with(".pdf"))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn every_link_converts_and_is_reported() {
    let server = TestServer::spawn().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), ConversionMode::Render);
    let links = vec![
        server.url("/page/a?PRID=101"),
        server.url("/page/b?PRID=102"),
        server.url("/page/c?PRID=103"),
    ];

    let output = run_job(&payload(links, server.url("/hook"), Some(5)), &config)
        .await
        .unwrap();

    assert_eq!(output.batch.stats.succeeded, 3);
    assert_eq!(
        pdfs_in(&tmp.path().join("pdfs")),
        vec!["pib_101.pdf", "pib_102.pdf", "pib_103.pdf"]
    );
    assert_eq!(output.artifact.files.len(), 3);
    assert!(tmp.path().join("artifacts/pib-pdfs/pib_102.pdf").exists());

    let hooks = server.hooks();
    assert_eq!(hooks.len(), 1);
    let meta = &hooks[0]["metadata"];
    assert_eq!(meta["successful_pdfs"], json!(3));
    assert_eq!(meta["processed_urls"], json!(5), "declared count is echoed");
    assert_eq!(meta["run_id"], json!("4242"));
    assert_eq!(meta["timestamp"], json!("2025-06-01T10:00:00Z"));
    assert_eq!(hooks[0]["details"][0]["filename"], json!("pib_101.pdf"));

    let webhook = output.webhook.unwrap();
    assert!(webhook.delivered);
    assert_eq!(webhook.status, 200);
}

#[tokio::test]
async fn auto_mode_saves_pdfs_and_renders_pages() {
    let server = TestServer::spawn().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), ConversionMode::Auto);
    let links = vec![server.url("/pdf/release?PRID=7"), server.url("/page/html")];

    let output = run_job_without_webhook(&payload(links, String::new(), None), &config)
        .await
        .unwrap();

    assert!(output.webhook.is_none());
    assert_eq!(output.batch.items[0].method, Some(FetchMethod::Downloaded));
    assert_eq!(output.batch.items[1].method, Some(FetchMethod::Rendered));
    assert_eq!(
        pdfs_in(&tmp.path().join("pdfs")),
        vec!["page_2.pdf", "pib_7.pdf"]
    );
    let saved = std::fs::read(tmp.path().join("pdfs/pib_7.pdf")).unwrap();
    assert_eq!(saved, common::pdf_bytes("release"));
}

#[tokio::test]
async fn details_match_files_actually_produced() {
    let server = TestServer::spawn().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), ConversionMode::Render);
    let links = vec![
        server.url("/page/a?PRID=1"),
        server.url("/page/broken?PRID=2"),
        server.url("/page/c?PRID=3"),
    ];

    let output = run_job(&payload(links, server.url("/hook"), None), &config)
        .await
        .unwrap();

    assert_eq!(output.batch.stats.failed, 1);
    assert!(output.batch.items[1].error.is_some());

    let hooks = server.hooks();
    let details = hooks[0]["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(hooks[0]["metadata"]["successful_pdfs"], json!(2));
    assert_eq!(hooks[0]["metadata"]["processed_urls"], json!(3));
}

#[tokio::test]
async fn nothing_produced_still_reports_zero() {
    let server = TestServer::spawn().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), ConversionMode::Render);
    let links = vec![server.url("/page/broken-1"), server.url("/page/broken-2")];

    let (logs, _guard) = capture_logs();
    let output = run_job(&payload(links, server.url("/hook"), Some(2)), &config)
        .await
        .unwrap();

    assert!(output.artifact.is_empty());
    assert!(logs.contents().contains("No files were found"));
    assert!(!tmp.path().join("artifacts/pib-pdfs").exists());

    let hooks = server.hooks();
    assert_eq!(hooks[0]["metadata"]["successful_pdfs"], json!(0));
    assert_eq!(hooks[0]["details"], json!([]));
}

#[tokio::test]
async fn empty_artifact_fails_under_error_policy() {
    let server = TestServer::spawn().await;
    let tmp = tempfile::tempdir().unwrap();
    let mut config = config(tmp.path(), ConversionMode::Render);
    config.if_no_files_found = IfNoFilesFound::Error;

    let err = run_job(
        &payload(vec![server.url("/page/broken")], server.url("/hook"), None),
        &config,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, FetchError::EmptyArtifact { .. }));
    assert!(server.hooks().is_empty(), "no summary after a failed publish");
}

#[tokio::test]
async fn leftover_pdfs_are_counted() {
    let server = TestServer::spawn().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), ConversionMode::Render);
    std::fs::create_dir_all(tmp.path().join("pdfs")).unwrap();
    std::fs::write(tmp.path().join("pdfs/earlier.pdf"), b"%PDF-1.4").unwrap();

    run_job(
        &payload(vec![server.url("/page/x?PRID=9")], server.url("/hook"), None),
        &config,
    )
    .await
    .unwrap();

    let hooks = server.hooks();
    assert_eq!(hooks[0]["metadata"]["successful_pdfs"], json!(2));
    assert_eq!(hooks[0]["details"][0]["filename"], json!("earlier.pdf"));
}

#[tokio::test]
async fn webhook_error_status_is_not_fatal() {
    let server = TestServer::spawn().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), ConversionMode::Render);

    let output = run_job(
        &payload(vec![server.url("/page/a?PRID=1")], server.url("/hook-500"), None),
        &config,
    )
    .await
    .unwrap();

    let webhook = output.webhook.unwrap();
    assert!(!webhook.delivered);
    assert_eq!(webhook.status, 500);
    assert_eq!(server.hooks().len(), 1);
}

#[tokio::test]
async fn unreachable_webhook_fails_after_publishing() {
    let server = TestServer::spawn().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), ConversionMode::Render);

    let err = run_job(
        &payload(vec![server.url("/page/a?PRID=1")], refused_url("/hook"), None),
        &config,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, FetchError::WebhookFailed { .. }));
    assert!(tmp.path().join("pdfs/pib_1.pdf").exists());
    assert!(tmp.path().join("artifacts/pib-pdfs/pib_1.pdf").exists());
}

#[tokio::test]
async fn duplicate_prids_do_not_overwrite() {
    let server = TestServer::spawn().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), ConversionMode::Render);
    let links = vec![server.url("/page/a?PRID=7"), server.url("/page/b?PRID=7")];

    let output = run_job_without_webhook(&payload(links, String::new(), None), &config)
        .await
        .unwrap();

    assert_eq!(output.batch.stats.succeeded, 2);
    assert_eq!(
        pdfs_in(&tmp.path().join("pdfs")),
        vec!["pib_7.pdf", "pib_7_2.pdf"]
    );
}

#[tokio::test]
async fn concurrent_run_keeps_input_order() {
    let server = TestServer::spawn().await;
    let tmp = tempfile::tempdir().unwrap();
    let mut config = config(tmp.path(), ConversionMode::Auto);
    config.concurrency = 4;
    let links: Vec<String> = (1..=6)
        .map(|i| server.url(&format!("/pdf/r{i}?PRID={i}")))
        .collect();

    let output = run_job_without_webhook(&payload(links, String::new(), None), &config)
        .await
        .unwrap();

    let order: Vec<usize> = output.batch.items.iter().map(|i| i.index).collect();
    assert_eq!(order, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(
        output.batch.items[3].file_name().as_deref(),
        Some("pib_4.pdf")
    );
}

#[tokio::test]
async fn missing_page_fails_only_that_item_in_download_mode() {
    let server = TestServer::spawn().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), ConversionMode::Download);
    let links = vec![server.url("/missing"), server.url("/pdf/ok?PRID=5")];

    let output = run_job_without_webhook(&payload(links, String::new(), None), &config)
        .await
        .unwrap();

    assert_eq!(output.batch.stats.failed, 1);
    assert_eq!(pdfs_in(&tmp.path().join("pdfs")), vec!["pib_5.pdf"]);
    assert!(!tmp.path().join("pdfs/page_1.pdf.part").exists());
}

#[tokio::test]
async fn unreachable_link_is_not_rendered_in_auto_mode() {
    let server = TestServer::spawn().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), ConversionMode::Auto);
    let links = vec![refused_url("/x?PRID=1"), server.url("/page/ok?PRID=2")];

    let output = run_job(&payload(links, server.url("/hook"), None), &config)
        .await
        .unwrap();

    assert_eq!(output.batch.stats.failed, 1);
    assert_eq!(output.batch.items[0].method, None);
    assert!(matches!(
        output.batch.items[0].error,
        Some(pib_pdfs::ItemError::DownloadFailed { index: 1, .. })
    ));
    assert_eq!(pdfs_in(&tmp.path().join("pdfs")), vec!["pib_2.pdf"]);
    assert_eq!(server.hooks()[0]["metadata"]["successful_pdfs"], json!(1));
}

#[tokio::test]
async fn error_status_falls_back_to_rendering_in_auto_mode() {
    let server = TestServer::spawn().await;
    let tmp = tempfile::tempdir().unwrap();
    let config = config(tmp.path(), ConversionMode::Auto);

    let output = run_job_without_webhook(
        &payload(vec![server.url("/missing")], String::new(), None),
        &config,
    )
    .await
    .unwrap();

    assert_eq!(output.batch.items[0].method, Some(FetchMethod::Rendered));
    assert_eq!(pdfs_in(&tmp.path().join("pdfs")), vec!["page_1.pdf"]);
}
