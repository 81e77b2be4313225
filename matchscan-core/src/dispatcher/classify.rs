use std::fmt;

use serde_json::Value;

use super::transport::HttpResponse;

/// How a failed request is treated by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Expected failure (missing profile); surfaced without retrying.
    Nonretriable,
    /// Failure that points at a deployment problem such as a revoked key.
    NonretriableUnexpected,
    Retriable,
    /// The remote asked us to slow down; retried after growing the backoff.
    RetriableWithThrottling,
}

impl FailureClass {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            FailureClass::Retriable | FailureClass::RetriableWithThrottling
        )
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureClass::Nonretriable => "nonretriable",
            FailureClass::NonretriableUnexpected => "nonretriable-unexpected",
            FailureClass::Retriable => "retriable",
            FailureClass::RetriableWithThrottling => "throttled",
        })
    }
}

const THROTTLING_REASONS: &[&str] = &[
    "Account Over Queries Per Second Limit",
    "Account Over Rate Limit",
    "Rate Limit Exceeded",
];

const FORBIDDEN_REASONS: &[&str] =
    &["Forbidden", "Not Authorized", "Account Inactive"];

/// Classifies a non-success response. Returns the class and the message used
/// for logging.
pub fn classify_response(response: &HttpResponse) -> (FailureClass, String) {
    match response.status {
        403 => {
            let message = forbidden_message(response);
            (classify_forbidden(&message), message)
        }
        404 => (FailureClass::Nonretriable, status_message(response)),
        429 => (
            FailureClass::RetriableWithThrottling,
            status_message(response),
        ),
        500..=599 => (FailureClass::Retriable, status_message(response)),
        _ => (
            FailureClass::NonretriableUnexpected,
            status_message(response),
        ),
    }
}

fn classify_forbidden(message: &str) -> FailureClass {
    let matches_any = |known: &[&str]| {
        known
            .iter()
            .any(|reason| reason.eq_ignore_ascii_case(message))
    };

    if matches_any(THROTTLING_REASONS) {
        FailureClass::RetriableWithThrottling
    } else if matches_any(FORBIDDEN_REASONS) {
        FailureClass::NonretriableUnexpected
    } else {
        // Unrecognized 403 bodies are assumed to be rate limiting.
        FailureClass::RetriableWithThrottling
    }
}

/// A 403 carries its cause in the body, as a JSON `detail`/`message`/`reason`
/// field or as plain text.
fn forbidden_message(response: &HttpResponse) -> String {
    if let Ok(Value::Object(fields)) =
        serde_json::from_str::<Value>(&response.body)
    {
        for key in ["detail", "message", "reason"] {
            if let Some(Value::String(text)) = fields.get(key) {
                return text.trim().to_string();
            }
        }
    }

    response.body.trim().to_string()
}

fn status_message(response: &HttpResponse) -> String {
    format!("HTTP {}", response.status)
}
