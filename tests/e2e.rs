//! End-to-end tests for nexa-ocr.
//!
//! Most tests run the full message → request → reply path against a
//! `wiremock` server standing in for the inference endpoint. The live test at
//! the bottom talks to a real server and is gated behind `E2E_ENABLED`.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture
//!
//! Against a running Nexa server:
//!   E2E_ENABLED=1 NEXA_OCR_BASE_URL=http://127.0.0.1:18181/v1 cargo test --test e2e live_
//!   (set E2E_IMAGE=/path/to/table.png to pick the image)

use nexa_ocr::{
    ChatMessage, ChatShell, Element, ErrorKind, ImageReference, OcrAssistant, OcrClient, OcrConfig,
    Reply,
};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

const COMPLETIONS: &str = "/v1/chat/completions";

#[derive(Default)]
struct Recorder(Mutex<Vec<Reply>>);

impl ChatShell for Recorder {
    fn send(&self, reply: &Reply) {
        self.0.lock().unwrap().push(reply.clone());
    }
}

impl Recorder {
    fn replies(&self) -> Vec<Reply> {
        self.0.lock().unwrap().clone()
    }
}

fn completion(text: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "NexaAI/DeepSeek-OCR-GGUF",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 700, "completion_tokens": 12, "total_tokens": 712 }
    })
}

/// A small, genuinely valid PNG.
fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([255, 255, 255]));
    let mut buf = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("encode png");
    buf
}

fn config_for(base_url: &str, upload_dir: &Path) -> OcrConfig {
    OcrConfig::builder()
        .base_url(format!("{base_url}/v1"))
        .api_key("test-key")
        .request_timeout_secs(5)
        .connect_timeout_secs(2)
        .upload_dir(upload_dir)
        .build()
        .expect("valid config")
}

async fn mock_ok(server: &MockServer, text: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(text)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn sent_image_urls(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).expect("JSON request body");
            body["messages"][0]["content"][0]["image_url"]["url"]
                .as_str()
                .expect("image_url part first")
                .to_string()
        })
        .collect()
}

fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).expect("read upload dir").next().is_none()
}

/// Port nothing listens on.
fn dead_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

// ── Scenarios ────────────────────────────────────────────────────────────────

/// Scenario 1: uploaded `table.png` → temp file → `file://` request → text.
#[tokio::test]
async fn upload_is_sent_as_file_url_and_removed() {
    let server = MockServer::start().await;
    mock_ok(&server, "| Item | Qty |\n|---|---|\n| Tea | 2 |", 1).await;

    let uploads = tempfile::tempdir().unwrap();
    let assistant = OcrAssistant::new(config_for(&server.uri(), uploads.path())).unwrap();
    let shell = Recorder::default();

    let message = ChatMessage::default().with_element(Element::image("table.png", png_bytes()));
    assistant.handle_message(&message, &shell).await;

    assert_eq!(
        shell.replies(),
        vec![
            Reply::RunningUpload,
            Reply::Extracted("| Item | Qty |\n|---|---|\n| Tea | 2 |".into()),
        ]
    );

    let urls = sent_image_urls(&server).await;
    assert_eq!(urls.len(), 1);
    let reference = ImageReference::parse(urls[0].clone()).unwrap();
    assert!(reference.is_local(), "got: {}", urls[0]);
    let tmp: PathBuf = reference.to_file_path().expect("file path");
    assert!(tmp.starts_with(uploads.path()));
    assert_eq!(tmp.extension().unwrap(), "png");
    assert!(!tmp.exists(), "temp upload must be deleted after OCR");
    assert!(dir_is_empty(uploads.path()));
}

/// Scenario 2: a pasted URL is forwarded verbatim.
#[tokio::test]
async fn pasted_url_is_forwarded_verbatim() {
    let server = MockServer::start().await;
    mock_ok(&server, "TOTAL 12.50", 1).await;

    let uploads = tempfile::tempdir().unwrap();
    let assistant = OcrAssistant::new(config_for(&server.uri(), uploads.path())).unwrap();
    let shell = Recorder::default();

    let message = ChatMessage::text("  https://example.com/receipt.jpg\n");
    assistant.handle_message(&message, &shell).await;

    assert_eq!(
        shell.replies(),
        vec![
            Reply::RunningUrl("https://example.com/receipt.jpg".into()),
            Reply::Extracted("TOTAL 12.50".into()),
        ]
    );
    assert_eq!(
        sent_image_urls(&server).await,
        vec!["https://example.com/receipt.jpg".to_string()]
    );
}

/// Scenario 3: plain text → guidance, no request.
#[tokio::test]
async fn plain_text_gets_guidance_and_no_request() {
    let server = MockServer::start().await;
    mock_ok(&server, "unused", 0).await;

    let uploads = tempfile::tempdir().unwrap();
    let assistant = OcrAssistant::new(config_for(&server.uri(), uploads.path())).unwrap();
    let shell = Recorder::default();

    assistant
        .handle_message(&ChatMessage::text("hello there"), &shell)
        .await;

    assert_eq!(shell.replies(), vec![Reply::Guidance]);
    let err = assistant
        .process_message(&ChatMessage::text("hello there"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(sent_image_urls(&server).await.is_empty());
}

/// Scenario 4: connection failure → error reply, temp file still removed.
#[tokio::test]
async fn connection_failure_reports_error_and_cleans_up() {
    let uploads = tempfile::tempdir().unwrap();
    let assistant = OcrAssistant::new(config_for(&dead_base_url(), uploads.path())).unwrap();
    let shell = Recorder::default();

    let message = ChatMessage::default().with_element(Element::image("table.png", png_bytes()));
    assistant.handle_message(&message, &shell).await;

    let replies = shell.replies();
    assert_eq!(replies.len(), 2, "got: {replies:?}");
    assert_eq!(replies[0], Reply::RunningUpload);
    match &replies[1] {
        Reply::Failed(msg) => assert!(msg.contains("OCR request"), "got: {msg}"),
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(dir_is_empty(uploads.path()));

    let err = assistant.process_message(&message).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Request);
    assert!(dir_is_empty(uploads.path()));
}

// ── Request-client behaviour ─────────────────────────────────────────────────

#[tokio::test]
async fn request_body_matches_chat_completion_contract() {
    let server = MockServer::start().await;
    mock_ok(&server, "ok", 1).await;

    let uploads = tempfile::tempdir().unwrap();
    let client = OcrClient::new(config_for(&server.uri(), uploads.path())).unwrap();
    let reference = ImageReference::parse("https://example.com/receipt.jpg").unwrap();
    let output = client.extract_output(&reference).await.unwrap();

    assert_eq!(output.text, "ok");
    assert_eq!(output.model, "NexaAI/DeepSeek-OCR-GGUF");
    assert_eq!(output.usage.map(|u| u.prompt_tokens), Some(700));

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "NexaAI/DeepSeek-OCR-GGUF");
    assert_eq!(body["stream"], false);
    assert_eq!(body["max_tokens"], 4096);
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    assert_eq!(body["messages"][0]["role"], "user");
    let parts = body["messages"][0]["content"].as_array().unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["type"], "image_url");
    assert_eq!(parts[1], json!({ "type": "text", "text": "<|FREE|>OCR." }));
}

#[tokio::test]
async fn text_is_returned_without_trimming() {
    let server = MockServer::start().await;
    mock_ok(&server, "\n  Invoice #42  \n\n", 1).await;

    let uploads = tempfile::tempdir().unwrap();
    let client = OcrClient::new(config_for(&server.uri(), uploads.path())).unwrap();
    let reference = ImageReference::parse("http://example.com/a.png").unwrap();
    assert_eq!(client.extract(&reference).await.unwrap(), "\n  Invoice #42  \n\n");
}

#[tokio::test]
async fn same_reference_twice_makes_two_requests() {
    let server = MockServer::start().await;
    mock_ok(&server, "same", 2).await;

    let uploads = tempfile::tempdir().unwrap();
    let client = OcrClient::new(config_for(&server.uri(), uploads.path())).unwrap();
    let reference = ImageReference::parse("https://example.com/receipt.jpg").unwrap();

    client.extract(&reference).await.unwrap();
    client.extract(&reference).await.unwrap();
    assert_eq!(sent_image_urls(&server).await.len(), 2);
}

#[tokio::test]
async fn non_success_status_is_request_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(ResponseTemplate::new(503).set_body_string("model is loading"))
        .expect(1)
        .mount(&server)
        .await;

    let uploads = tempfile::tempdir().unwrap();
    let assistant = OcrAssistant::new(config_for(&server.uri(), uploads.path())).unwrap();
    let message = ChatMessage::default().with_element(Element::image("scan.jpg", png_bytes()));
    let err = assistant.process_message(&message).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Request);
    let msg = err.to_string();
    assert!(msg.contains("503"), "got: {msg}");
    assert!(msg.contains("model is loading"), "got: {msg}");
    assert!(dir_is_empty(uploads.path()));
}

#[tokio::test]
async fn malformed_and_empty_bodies_are_request_errors() {
    for body in [
        ResponseTemplate::new(200).set_body_string("not json"),
        ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })),
        ResponseTemplate::new(200)
            .set_body_json(json!({ "choices": [{ "message": { "content": null } }] })),
    ] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(COMPLETIONS))
            .respond_with(body)
            .mount(&server)
            .await;

        let uploads = tempfile::tempdir().unwrap();
        let client = OcrClient::new(config_for(&server.uri(), uploads.path())).unwrap();
        let reference = ImageReference::parse("https://example.com/a.png").unwrap();
        let err = client.extract(&reference).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Request, "got: {err}");
    }
}

#[tokio::test]
async fn slow_endpoint_hits_configured_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(COMPLETIONS))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("late"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = OcrConfig::builder()
        .base_url(format!("{}/v1", server.uri()))
        .request_timeout_secs(1)
        .build()
        .unwrap();
    let client = OcrClient::new(config).unwrap();
    let reference = ImageReference::parse("https://example.com/a.png").unwrap();
    let err = client.extract(&reference).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Request);
    assert!(err.to_string().contains("timed out"), "got: {err}");
}

#[tokio::test]
async fn embedded_uploads_are_sent_as_data_urls() {
    let server = MockServer::start().await;
    mock_ok(&server, "inline", 1).await;

    let uploads = tempfile::tempdir().unwrap();
    let config = OcrConfig::builder()
        .base_url(format!("{}/v1", server.uri()))
        .api_key("test-key")
        .upload_dir(uploads.path())
        .embed_local_images(true)
        .build()
        .unwrap();
    let assistant = OcrAssistant::new(config).unwrap();

    let message = ChatMessage::default().with_element(Element::image("table.png", png_bytes()));
    let output = assistant.process_message(&message).await.unwrap();

    assert_eq!(output.text, "inline");
    assert!(output.image.is_local());
    let urls = sent_image_urls(&server).await;
    assert!(urls[0].starts_with("data:image/png;base64,"), "got: {}", &urls[0][..40]);
    assert!(dir_is_empty(uploads.path()));
}

// ── Input edge cases ─────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_attachment_is_reported_without_request() {
    let server = MockServer::start().await;
    mock_ok(&server, "unused", 0).await;

    let uploads = tempfile::tempdir().unwrap();
    let assistant = OcrAssistant::new(config_for(&server.uri(), uploads.path())).unwrap();
    let shell = Recorder::default();

    let message = ChatMessage::default().with_element(Element::image("blank.png", Vec::new()));
    assistant.handle_message(&message, &shell).await;

    match shell.replies().as_slice() {
        [Reply::Failed(msg)] => assert!(msg.contains("blank.png"), "got: {msg}"),
        other => panic!("expected a single Failed reply, got {other:?}"),
    }
    assert!(dir_is_empty(uploads.path()));
}

#[tokio::test]
async fn concurrent_uploads_use_distinct_temp_files() {
    let server = MockServer::start().await;
    mock_ok(&server, "done", 2).await;

    let uploads = tempfile::tempdir().unwrap();
    let assistant = OcrAssistant::new(config_for(&server.uri(), uploads.path())).unwrap();

    let a = ChatMessage::default().with_element(Element::image("table.png", png_bytes()));
    let b = ChatMessage::default().with_element(Element::image("table.png", png_bytes()));

    let first = tokio::spawn({
        let assistant = assistant.clone();
        async move { assistant.process_message(&a).await }
    });
    let second = tokio::spawn({
        let assistant = assistant.clone();
        async move { assistant.process_message(&b).await }
    });

    let (first, second) = (first.await.unwrap(), second.await.unwrap());
    assert_eq!(first.unwrap().text, "done");
    assert_eq!(second.unwrap().text, "done");

    let urls = sent_image_urls(&server).await;
    assert_eq!(urls.len(), 2);
    assert_ne!(urls[0], urls[1]);
    assert!(dir_is_empty(uploads.path()));
}

// ── Live server (needs E2E_ENABLED) ──────────────────────────────────────────

#[tokio::test]
async fn live_ocr_against_configured_server() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP: set E2E_ENABLED=1 to run against a real server");
        return;
    }

    let config = OcrConfig::from_env().expect("valid NEXA_OCR_* environment");
    let assistant = OcrAssistant::new(config).unwrap();

    let message = match std::env::var("E2E_IMAGE") {
        Ok(path) => {
            let element = Element::from_file(Path::new(&path))
                .await
                .expect("E2E_IMAGE readable");
            ChatMessage::default().with_element(element)
        }
        Err(_) => ChatMessage::default().with_element(Element::image("blank.png", png_bytes())),
    };

    let output = assistant
        .process_message(&message)
        .await
        .expect("OCR should succeed");
    println!(
        "[live] {}ms, {:?}\n{}",
        output.duration_ms, output.usage, output.text
    );
}
