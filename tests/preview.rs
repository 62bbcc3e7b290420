use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::response::Html;
use axum::routing::get;
use rigbuild::preview::hub::RELOAD_MESSAGE;
use rigbuild::preview::proxy::{inject_script, reload_script, spawn_proxy};
use rigbuild::preview::{
    PreviewService, ReloadBroadcaster, ReloadOutcome, ReloadTask, ServeTask, WebSocketHub,
};
use rigbuild::tasks::Task;
use rigbuild_test_utils::{
    MemoryConfigProvider, RecordingBroadcaster, ThemeConfigBuilder, ThemeFixture, init_tracing,
};
use tokio::net::TcpListener;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn reload_broadcasts_when_enabled() {
    let recorder = Arc::new(RecordingBroadcaster::new(2));
    let preview = PreviewService::with_broadcaster(recorder.clone());
    let enabled = ThemeConfigBuilder::new().live_reload(true).build();

    assert_eq!(
        preview.reload(&enabled),
        ReloadOutcome::Broadcast { clients: 2, resumed: false }
    );
    assert_eq!(recorder.broadcasts(), 1);
}

#[test]
fn disabling_live_reload_pauses_and_enabling_resumes() {
    let recorder = Arc::new(RecordingBroadcaster::new(1));
    let preview = PreviewService::with_broadcaster(recorder.clone());
    let enabled = ThemeConfigBuilder::new().live_reload(true).build();
    let disabled = ThemeConfigBuilder::new().live_reload(false).build();

    assert_eq!(preview.reload(&disabled), ReloadOutcome::Paused);
    assert!(preview.is_paused());
    assert_eq!(preview.reload(&disabled), ReloadOutcome::Paused);
    assert_eq!(recorder.broadcasts(), 0);

    assert_eq!(
        preview.reload(&enabled),
        ReloadOutcome::Broadcast { clients: 1, resumed: true }
    );
    assert!(!preview.is_paused());
    assert_eq!(
        preview.reload(&enabled),
        ReloadOutcome::Broadcast { clients: 1, resumed: false }
    );
    assert_eq!(recorder.broadcasts(), 2);
}

#[tokio::test]
async fn reload_task_reads_config_each_run() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    let provider = Arc::new(MemoryConfigProvider::new(
        ThemeConfigBuilder::new().live_reload(true).build(),
    ));
    let ctx = fixture.context(provider.clone());
    let recorder = Arc::new(RecordingBroadcaster::new(1));
    let preview = Arc::new(PreviewService::with_broadcaster(recorder.clone()));
    let task = ReloadTask::new(Arc::clone(&preview));

    let report = task.run(&ctx).await?;
    assert_eq!(recorder.broadcasts(), 1);
    assert_eq!((report.written, report.skipped), (1, 0));

    provider.update(|c| c.live_reload.enabled = false);
    let report = task.run(&ctx).await?;
    assert_eq!(recorder.broadcasts(), 1);
    assert_eq!((report.written, report.skipped), (0, 1));
    assert!(preview.is_paused());

    provider.update(|c| c.live_reload.enabled = true);
    let report = task.run(&ctx).await?;
    assert_eq!(recorder.broadcasts(), 2);
    assert_eq!((report.written, report.skipped), (1, 0));
    assert!(!preview.is_paused());
    assert_eq!(provider.load_count(), 3);
    Ok(())
}

#[tokio::test]
async fn serve_is_a_no_op_when_disabled() -> TestResult {
    init_tracing();
    let fixture = ThemeFixture::new();
    let provider = Arc::new(MemoryConfigProvider::new(ThemeConfigBuilder::new().build()));
    let ctx = fixture.context(provider);
    let preview = Arc::new(PreviewService::new());

    ServeTask::new(Arc::clone(&preview)).run(&ctx).await?;
    ServeTask::new(Arc::clone(&preview)).run(&ctx).await?;
    assert!(!preview.is_started());
    Ok(())
}

#[test]
fn script_goes_before_last_body_close() {
    let html = "<html><body><p>&lt;/body&gt;</p></body></html>";
    let out = inject_script(html, 8182);
    let script = reload_script(8182);
    assert_eq!(out, format!("<html><body><p>&lt;/body&gt;</p>{script}</body></html>"));
    assert!(script.contains(":8182"));

    assert_eq!(inject_script("fragment", 1), format!("fragment{}", reload_script(1)));
}

#[test]
fn hub_sends_reload_to_connected_clients() -> TestResult {
    let hub = WebSocketHub::bind(0)?;
    let (mut client, _) = tungstenite::connect(format!("ws://127.0.0.1:{}", hub.port()))?;

    let deadline = Instant::now() + Duration::from_secs(5);
    while hub.client_count() == 0 {
        assert!(Instant::now() < deadline, "client never registered");
        std::thread::sleep(Duration::from_millis(10));
    }

    assert_eq!(hub.broadcast(), 1);
    let msg = client.read()?;
    assert_eq!(msg.to_text()?, RELOAD_MESSAGE);
    Ok(())
}

#[tokio::test]
async fn proxy_injects_into_html_and_maps_failures_to_502() -> TestResult {
    init_tracing();

    let upstream = TcpListener::bind("127.0.0.1:0").await?;
    let upstream_port = upstream.local_addr()?.port();
    let app = Router::new()
        .route("/", get(|| async { Html("<html><body>hello</body></html>") }))
        .route("/data.json", get(|| async { "{\"a\":1}" }));
    tokio::spawn(async move {
        let _ = axum::serve(upstream, app).await;
    });

    let port = spawn_proxy(0, &format!("http://127.0.0.1:{upstream_port}/"), 9999).await?;
    let client = reqwest::Client::new();

    let page = client
        .get(format!("http://127.0.0.1:{port}/"))
        .send()
        .await?
        .text()
        .await?;
    assert!(page.starts_with("<html><body>hello<script>"), "{page}");
    assert!(page.contains(":9999"));
    assert!(page.ends_with("</body></html>"));

    let data = client
        .get(format!("http://127.0.0.1:{port}/data.json"))
        .send()
        .await?
        .text()
        .await?;
    assert_eq!(data, "{\"a\":1}");

    // Nothing listens upstream of this proxy.
    let closed = TcpListener::bind("127.0.0.1:0").await?;
    let closed_port = closed.local_addr()?.port();
    drop(closed);
    let dead = spawn_proxy(0, &format!("http://127.0.0.1:{closed_port}"), 9999).await?;
    let status = client
        .get(format!("http://127.0.0.1:{dead}/"))
        .send()
        .await?
        .status();
    assert_eq!(status, reqwest::StatusCode::BAD_GATEWAY);
    Ok(())
}
