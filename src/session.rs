//! Session state machine: what the user sees while a document is converted.
//!
//! ```text
//!            select (valid PDF)             ok
//!   Idle ───────────────────────▶ Processing ───▶ Success(document)
//!    ▲  │                              │               │
//!    │  └─ select (invalid) ─▶ Idle    └─ err ─▶ Error(message)
//!    │      + validation message                        │
//!    └──────────────────── reset ◀──────────────────────┘
//! ```
//!
//! The session owns no conversion logic; it calls
//! [`crate::convert::convert_file`] and records the outcome. Every method
//! takes `&mut self`, so at most one conversion can be in flight.

use crate::config::ConversionConfig;
use crate::convert::convert_file;
use crate::error::DocuError;
use crate::output::StructuredDocument;
use crate::pipeline::input::UploadedFile;
use tracing::{debug, warn};

/// Shown when the selected file is not declared as a PDF.
pub const INVALID_TYPE_MESSAGE: &str = "Please upload a valid PDF file.";

/// Shown when the selected file has no content.
pub const EMPTY_FILE_MESSAGE: &str = "The selected file is empty.";

/// Current state of the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Idle,
    Processing,
    Success(Box<StructuredDocument>),
    Error(String),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Processing => "processing",
            SessionState::Success(_) => "success",
            SessionState::Error(_) => "error",
        }
    }
}

/// Result of selecting a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// The session moved to `Processing`.
    Accepted,
    /// The file failed validation; the session stays `Idle`.
    Rejected(String),
    /// The session was not `Idle`; nothing changed.
    Ignored,
}

/// One user session.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
    validation_message: Option<String>,
    selected: Option<UploadedFile>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Inline message from the last rejected selection, if any.
    pub fn validation_message(&self) -> Option<&str> {
        self.validation_message.as_deref()
    }

    /// Name of the file being (or last) processed.
    pub fn selected_file(&self) -> Option<&str> {
        self.selected.as_ref().map(|f| f.name.as_str())
    }

    /// The document, when in `Success`.
    pub fn document(&self) -> Option<&StructuredDocument> {
        match &self.state {
            SessionState::Success(doc) => Some(doc.as_ref()),
            _ => None,
        }
    }

    /// Offer a file. Only acts in `Idle`.
    pub fn select_file(&mut self, file: UploadedFile) -> Selection {
        if self.state != SessionState::Idle {
            debug!("Ignoring selection of {} in state {}", file.name, self.state.name());
            return Selection::Ignored;
        }

        let rejection = if !file.is_pdf() {
            Some(INVALID_TYPE_MESSAGE)
        } else if file.is_empty() {
            Some(EMPTY_FILE_MESSAGE)
        } else {
            None
        };

        if let Some(msg) = rejection {
            debug!("Rejected {} ({}): {}", file.name, file.mime_type, msg);
            self.validation_message = Some(msg.to_string());
            return Selection::Rejected(msg.to_string());
        }

        self.validation_message = None;
        self.selected = Some(file);
        self.state = SessionState::Processing;
        Selection::Accepted
    }

    /// Run the conversion for the accepted file and record the outcome.
    ///
    /// Does nothing unless the session is `Processing`.
    pub async fn process(&mut self, config: &ConversionConfig) -> &SessionState {
        if self.state != SessionState::Processing {
            return &self.state;
        }
        let Some(file) = self.selected.as_ref() else {
            self.state = SessionState::Error("No file selected.".to_string());
            return &self.state;
        };

        let result = convert_file(file, config).await;
        self.complete(result);
        &self.state
    }

    /// Select a file and, if accepted, process it.
    pub async fn submit(&mut self, file: UploadedFile, config: &ConversionConfig) -> Selection {
        let selection = self.select_file(file);
        if selection == Selection::Accepted {
            self.process(config).await;
        }
        selection
    }

    /// Record a conversion outcome. Only acts in `Processing`.
    pub fn complete(&mut self, result: Result<StructuredDocument, DocuError>) {
        if self.state != SessionState::Processing {
            return;
        }
        self.state = match result {
            Ok(doc) => SessionState::Success(Box::new(doc)),
            Err(e) => {
                warn!("Conversion failed ({:?}): {}", e.kind(), e);
                SessionState::Error(e.to_string())
            }
        };
    }

    /// Return to `Idle` from `Success` or `Error`, dropping the document,
    /// the message and the selected file.
    ///
    /// Returns `false` (and changes nothing) while `Processing`.
    pub fn reset(&mut self) -> bool {
        if self.state == SessionState::Processing {
            return false;
        }
        self.state = SessionState::Idle;
        self.validation_message = None;
        self.selected = None;
        true
    }
}
