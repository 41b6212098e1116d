//! The Gemini REST backend against a local mock server.

mod common;

use common::*;
use docustructure::error::SERVER_BUSY_MESSAGE;
use docustructure::{
    convert_file, ConversionConfig, DocuError, GeminiBackend, InferenceBackend, InferenceError,
    UploadedFile,
};
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-test";
const GENERATE_PATH: &str = "/models/gemini-test:generateContent";

fn config_for(server: &MockServer) -> ConversionConfig {
    ConversionConfig::builder()
        .api_key("test-key")
        .model(MODEL)
        .endpoint(server.uri())
        .retry_base_delay_ms(1)
        .build()
        .unwrap()
}

fn report_pdf() -> UploadedFile {
    UploadedFile::new("report.pdf", "application/pdf", PDF_BYTES.to_vec())
}

fn success_body(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "role": "model", "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 1500, "candidatesTokenCount": 420 }
    })
}

fn error_body(code: u16, status: &str, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message, "status": status } })
}

#[tokio::test]
async fn successful_call_sends_key_attachment_and_schema() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body(REPORT_JSON)))
        .expect(1)
        .mount(&server)
        .await;

    let doc = assert_ok!(convert_file(&report_pdf(), &config_for(&server)).await);
    assert_eq!(doc.metadata.filename, "report.pdf");
    assert_eq!(doc.structured_content.tables[0].rows.len(), 3);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: Value = requests[0].body_json().unwrap();

    let parts = &body["contents"][0]["parts"];
    assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
    assert!(!parts[0]["inlineData"]["data"].as_str().unwrap().is_empty());
    assert!(parts[1]["text"].as_str().unwrap().to_lowercase().contains("key points"));

    let gen = &body["generationConfig"];
    assert_eq!(gen["responseMimeType"], "application/json");
    assert_eq!(gen["responseSchema"]["type"], "OBJECT");
    assert!(gen.get("temperature").is_none());
}

#[tokio::test]
async fn persistent_503_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(error_body(
            503,
            "UNAVAILABLE",
            "The model is overloaded. Please try again later.",
        )))
        .expect(4)
        .mount(&server)
        .await;

    let err = assert_err!(convert_file(&report_pdf(), &config_for(&server)).await);
    assert!(matches!(err, DocuError::ServerBusy { attempts: 4 }));
    assert_eq!(err.to_string(), SERVER_BUSY_MESSAGE);
}

#[tokio::test]
async fn invalid_key_is_attempted_once() {
    let server = MockServer::start().await;
    let body = json!({
        "error": {
            "code": 400,
            "message": "API key not valid. Please pass a valid API key.",
            "status": "INVALID_ARGUMENT",
            "details": [{
                "@type": "type.googleapis.com/google.rpc.ErrorInfo",
                "reason": "API_KEY_INVALID"
            }]
        }
    });
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let err = assert_err!(convert_file(&report_pdf(), &config_for(&server)).await);
    assert!(matches!(
        err,
        DocuError::Inference(InferenceError::AuthRejected { status: 400, .. })
    ));
}

#[tokio::test]
async fn server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_json(error_body(
            500,
            "INTERNAL",
            "Internal error encountered.",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let err = assert_err!(convert_file(&report_pdf(), &config_for(&server)).await);
    assert!(matches!(
        err,
        DocuError::Inference(InferenceError::Api { status: 500, .. })
    ));
}

#[tokio::test]
async fn one_overload_then_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(error_body(
            503,
            "UNAVAILABLE",
            "overloaded",
        )))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body(REPORT_JSON)))
        .expect(1)
        .mount(&server)
        .await;

    let doc = assert_ok!(convert_file(&report_pdf(), &config_for(&server)).await);
    assert_eq!(doc.document_analysis.title, "Quarterly Sales Report");
}

#[tokio::test]
async fn candidate_without_text_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "OTHER" }
        })))
        .mount(&server)
        .await;

    let err = assert_err!(convert_file(&report_pdf(), &config_for(&server)).await);
    assert!(matches!(err, DocuError::EmptyResponse));
}

#[tokio::test]
async fn backend_reports_usage_and_finish_reason() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body("{}")))
        .mount(&server)
        .await;

    let backend = GeminiBackend::new("test-key", MODEL, format!("{}/", server.uri())).unwrap();
    let request = docustructure::pipeline::llm::build_request(
        docustructure::pipeline::encode::encode_attachment(PDF_BYTES, "application/pdf"),
        &ConversionConfig::default(),
    );

    let reply = assert_ok!(backend.generate(&request).await);
    assert_eq!(reply.text.as_deref(), Some("{}"));
    assert_eq!(reply.input_tokens, 1500);
    assert_eq!(reply.output_tokens, 420);
    assert_eq!(reply.finish_reason.as_deref(), Some("STOP"));
}
