//! Model interaction: build the request and drive it through the retry policy.
//!
//! ## Retry Strategy
//!
//! Only overload is retried. Attempt `n` (0-based) that fails with
//! [`InferenceError::Overloaded`] while `n < max_retries` waits
//! `retry_base_delay_ms * 2^n` and resubmits; with the defaults that is
//! 1 s → 2 s → 4 s, four attempts in total. Overload on the last attempt
//! becomes [`DocuError::ServerBusy`]. Every other failure ends the
//! conversion on the spot. No jitter.

use crate::config::ConversionConfig;
use crate::error::{DocuError, InferenceError};
use crate::pipeline::encode::InlineAttachment;
use crate::pipeline::gemini::{InferenceBackend, InferenceReply, InferenceRequest};
use crate::prompts;
use crate::schema::response_schema;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, error, warn};

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then submit again.
    Retry { delay: Duration },
    /// Overload outlived every retry.
    GiveUpBusy,
    /// Not retryable.
    Fail,
}

/// Transition function of the retry state machine.
pub fn decide(error: &InferenceError, attempt: u32, config: &ConversionConfig) -> RetryDecision {
    if !error.is_overload() {
        RetryDecision::Fail
    } else if attempt < config.max_retries {
        RetryDecision::Retry {
            delay: Duration::from_millis(config.backoff_delay_ms(attempt)),
        }
    } else {
        RetryDecision::GiveUpBusy
    }
}

/// Assemble the request: attachment, instruction, schema.
pub fn build_request(attachment: InlineAttachment, config: &ConversionConfig) -> InferenceRequest {
    InferenceRequest {
        attachment,
        instruction: prompts::instruction(config.instruction.as_deref()).to_string(),
        response_schema: response_schema(),
        temperature: config.temperature,
    }
}

/// Submit `request`, retrying on overload.
///
/// Returns the reply of the first successful attempt. The reply may still
/// have no text; that is checked by the caller.
pub async fn generate_with_retry(
    backend: &Arc<dyn InferenceBackend>,
    request: &InferenceRequest,
    config: &ConversionConfig,
) -> Result<InferenceReply, DocuError> {
    let start = Instant::now();
    let max_retries = config.max_retries;
    let mut attempt = 0u32;

    loop {
        if let Some(ref cb) = config.progress_callback {
            cb.on_attempt_start(attempt, max_retries);
        }

        let err = match submit(backend, request, config).await {
            Ok(reply) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {} attempt(s), {:?}",
                    backend.name(),
                    reply.input_tokens,
                    reply.output_tokens,
                    attempt + 1,
                    start.elapsed()
                );
                return Ok(reply);
            }
            Err(e) => e,
        };

        match decide(&err, attempt, config) {
            RetryDecision::Retry { delay } => {
                warn!(
                    "{} is overloaded; retry {}/{} after {}ms",
                    backend.name(),
                    attempt + 1,
                    max_retries,
                    delay.as_millis()
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_retry_scheduled(attempt + 1, max_retries, delay);
                }
                sleep(delay).await;
                attempt += 1;
            }
            RetryDecision::GiveUpBusy => {
                error!(
                    "{} still overloaded after {} attempts: {}",
                    backend.name(),
                    attempt + 1,
                    err
                );
                return Err(DocuError::ServerBusy {
                    attempts: attempt + 1,
                });
            }
            RetryDecision::Fail => {
                error!("{} call failed: {}", backend.name(), err);
                return Err(err.into());
            }
        }
    }
}

/// One attempt, bounded by `api_timeout_secs` when non-zero.
async fn submit(
    backend: &Arc<dyn InferenceBackend>,
    request: &InferenceRequest,
    config: &ConversionConfig,
) -> Result<InferenceReply, InferenceError> {
    if config.api_timeout_secs == 0 {
        return backend.generate(request).await;
    }
    let secs = config.api_timeout_secs;
    timeout(Duration::from_secs(secs), backend.generate(request))
        .await
        .unwrap_or(Err(InferenceError::Timeout { secs }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overloaded() -> InferenceError {
        InferenceError::Overloaded {
            detail: "busy".into(),
        }
    }

    #[test]
    fn overload_retries_until_limit() {
        let config = ConversionConfig::default();
        let decisions: Vec<_> = (0..=3).map(|n| decide(&overloaded(), n, &config)).collect();
        assert_eq!(
            decisions,
            vec![
                RetryDecision::Retry { delay: Duration::from_secs(1) },
                RetryDecision::Retry { delay: Duration::from_secs(2) },
                RetryDecision::Retry { delay: Duration::from_secs(4) },
                RetryDecision::GiveUpBusy,
            ]
        );
    }

    #[test]
    fn other_errors_fail_immediately() {
        let config = ConversionConfig::default();
        let auth = InferenceError::AuthRejected {
            status: 401,
            detail: "bad key".into(),
        };
        assert_eq!(decide(&auth, 0, &config), RetryDecision::Fail);
        assert_eq!(
            decide(&InferenceError::Timeout { secs: 1 }, 0, &config),
            RetryDecision::Fail
        );
    }

    #[test]
    fn every_non_overload_error_fails_at_any_attempt() {
        let config = ConversionConfig::default();
        let errors = [
            InferenceError::Api { status: 500, detail: "x".into() },
            InferenceError::Network("reset".into()),
            InferenceError::Timeout { secs: 300 },
        ];
        for err in &errors {
            for attempt in 0..=config.max_retries {
                assert_eq!(decide(err, attempt, &config), RetryDecision::Fail, "{err:?}");
            }
        }
    }

    #[test]
    fn zero_retries_gives_up_on_first_overload() {
        let config = ConversionConfig::builder().max_retries(0).build().unwrap();
        assert_eq!(decide(&overloaded(), 0, &config), RetryDecision::GiveUpBusy);
    }

    #[test]
    fn request_uses_default_instruction_and_schema() {
        let att = InlineAttachment {
            mime_type: "application/pdf".into(),
            data: "AA==".into(),
        };
        let req = build_request(att, &ConversionConfig::default());
        assert_eq!(req.instruction, prompts::DEFAULT_INSTRUCTION);
        assert_eq!(req.response_schema, response_schema());
        assert_eq!(req.temperature, None);
    }

    #[test]
    fn request_honours_instruction_override() {
        let att = InlineAttachment {
            mime_type: "application/pdf".into(),
            data: "AA==".into(),
        };
        let config = ConversionConfig::builder()
            .instruction("tables only")
            .temperature(0.2)
            .build()
            .unwrap();
        let req = build_request(att, &config);
        assert_eq!(req.instruction, "tables only");
        assert_eq!(req.temperature, Some(0.2));
    }
}
