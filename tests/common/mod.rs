//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use docustructure::{
    ConversionProgressCallback, InferenceBackend, InferenceError, InferenceReply,
    InferenceRequest, StructuredDocument,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A reply body for `report.pdf`: one table with two headers and three rows.
/// The model-supplied filename and timestamp are deliberately wrong.
pub const REPORT_JSON: &str = r##"{
  "metadata": {
    "filename": "scan_0001.pdf",
    "processedAt": "sometime last week",
    "language": "en"
  },
  "documentAnalysis": {
    "title": "Quarterly Sales Report",
    "summary": "Sales rose in every region during the third quarter.",
    "keyPoints": ["EU up 12%", "US up 8%", "APAC flat"]
  },
  "structuredContent": {
    "markdown": "# Quarterly Sales Report\n\n| Region | Sales |\n| --- | --- |\n| EU | 120 |\n| US | 340 |\n| APAC | 90 |\n",
    "tables": [
      {
        "title": "Sales by region",
        "description": "Q3, in thousands",
        "headers": ["Region", "Sales"],
        "rows": [["EU", "120"], ["US", "340"], ["APAC", "90"]]
      }
    ]
  }
}"##;

pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n";

pub fn text_reply(text: &str) -> InferenceReply {
    InferenceReply {
        text: Some(text.to_string()),
        input_tokens: 1200,
        output_tokens: 400,
        finish_reason: Some("STOP".into()),
    }
}

pub fn overloaded() -> InferenceError {
    InferenceError::Overloaded {
        detail: "The model is overloaded. Please try again later.".into(),
    }
}

/// Backend that plays back a fixed sequence of outcomes, then repeats the
/// last one.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Result<InferenceReply, InferenceError>>>,
    last: Mutex<Option<Result<InferenceReply, InferenceError>>>,
    calls: AtomicU32,
    instructions: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Result<InferenceReply, InferenceError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicU32::new(0),
            instructions: Mutex::new(Vec::new()),
        }
    }

    pub fn always(outcome: Result<InferenceReply, InferenceError>) -> Self {
        Self::new(vec![outcome])
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn instructions(&self) -> Vec<String> {
        self.instructions.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &InferenceRequest) -> Result<InferenceReply, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.instructions
            .lock()
            .unwrap()
            .push(request.instruction.clone());

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(outcome) => {
                *last = Some(outcome.clone());
                outcome
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(InferenceError::Network("script exhausted".into()))),
        }
    }
}

/// Records every progress event.
#[derive(Default)]
pub struct RecordingCallback {
    pub started: Mutex<Vec<(String, usize)>>,
    pub attempts: Mutex<Vec<u32>>,
    pub retries: Mutex<Vec<(u32, Duration)>>,
    pub completed: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl ConversionProgressCallback for RecordingCallback {
    fn on_conversion_start(&self, filename: &str, size_bytes: usize) {
        self.started
            .lock()
            .unwrap()
            .push((filename.to_string(), size_bytes));
    }

    fn on_attempt_start(&self, attempt: u32, _max_retries: u32) {
        self.attempts.lock().unwrap().push(attempt);
    }

    fn on_retry_scheduled(&self, attempt: u32, _max_retries: u32, delay: Duration) {
        self.retries.lock().unwrap().push((attempt, delay));
    }

    fn on_conversion_complete(&self, document: &StructuredDocument) {
        self.completed
            .lock()
            .unwrap()
            .push(document.metadata.filename.clone());
    }

    fn on_conversion_error(&self, error: &str) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

/// Backend whose call never completes.
#[derive(Default)]
pub struct HangingBackend {
    calls: AtomicU32,
}

impl HangingBackend {
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for HangingBackend {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn generate(&self, _request: &InferenceRequest) -> Result<InferenceReply, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }
}
