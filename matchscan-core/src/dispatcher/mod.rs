//! Rate-limited dispatcher for third-party match history APIs.
//!
//! One [`ApiDispatcher`] is shared by every request of a process so throttling
//! observed by one player update slows all of them down.

mod backoff;
mod classify;
mod transport;

pub use classify::{FailureClass, classify_response};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportError};

use std::any::type_name_of_val;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use url::Url;

use crate::config::DispatcherSettings;
use backoff::BackoffState;

/// Final failure of a dispatched request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("request to {uri} failed after {attempts} attempt(s) [{class}]: {detail}")]
pub struct DispatchError {
    pub uri: String,
    pub class: FailureClass,
    pub attempts: u32,
    /// HTTP status when the server answered.
    pub status: Option<u16>,
    pub detail: String,
}

impl DispatchError {
    /// Unexpected failures point at configuration or account problems rather
    /// than at a single player.
    pub fn is_unexpected(&self) -> bool {
        self.class == FailureClass::NonretriableUnexpected
    }
}

pub struct ApiDispatcher {
    transport: Arc<dyn HttpTransport>,
    settings: DispatcherSettings,
    state: Mutex<BackoffState>,
}

impl fmt::Debug for ApiDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiDispatcher")
            .field("transport", &type_name_of_val(self.transport.as_ref()))
            .field("settings", &self.settings)
            .field("backoff", &self.current_backoff())
            .finish()
    }
}

impl ApiDispatcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        settings: DispatcherSettings,
    ) -> Self {
        let state = Mutex::new(BackoffState::new(&settings));
        Self {
            transport,
            settings,
            state,
        }
    }

    /// Dispatcher over a `reqwest` client configured from `settings`.
    pub fn with_reqwest(
        settings: DispatcherSettings,
    ) -> Result<Self, TransportError> {
        let transport = ReqwestTransport::new(settings.request_timeout())?;
        Ok(Self::new(Arc::new(transport), settings))
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    /// Delay currently enforced between consecutive requests.
    pub fn current_backoff(&self) -> Option<Duration> {
        self.lock_state().backoff()
    }

    /// Issues a GET for `uri` and returns the response body.
    ///
    /// Retriable failures are retried up to the configured attempt cap with a
    /// fixed pause between attempts; throttling also grows the shared
    /// backoff. The last failure is returned once attempts run out.
    pub async fn request(&self, uri: &Url) -> Result<String, DispatchError> {
        let max_attempts = self.settings.max_attempts.max(1);
        let shown_uri = without_query(uri);
        let mut attempts = 0;

        loop {
            attempts += 1;
            self.wait_for_backoff().await;

            let failure = match self.transport.get(uri).await {
                Ok(response) if response.is_success() => {
                    self.lock_state().record_success(Instant::now());
                    return Ok(response.body);
                }
                Ok(response) => {
                    let (class, detail) = classify_response(&response);
                    DispatchError {
                        uri: shown_uri.clone(),
                        class,
                        attempts,
                        status: Some(response.status),
                        detail,
                    }
                }
                Err(err) => DispatchError {
                    uri: shown_uri.clone(),
                    class: FailureClass::Retriable,
                    attempts,
                    status: None,
                    detail: err.to_string(),
                },
            };

            self.report_failure(&failure);

            if !failure.class.is_retriable() || attempts >= max_attempts {
                return Err(failure);
            }

            tokio::time::sleep(self.settings.retry_pause()).await;
        }
    }

    async fn wait_for_backoff(&self) {
        let next_request_at = self.lock_state().next_request_at();
        if let Some(deadline) = next_request_at
            && deadline > Instant::now()
        {
            tokio::time::sleep_until(deadline).await;
        }
        self.lock_state().record_request(Instant::now());
    }

    fn report_failure(&self, failure: &DispatchError) {
        match failure.class {
            FailureClass::RetriableWithThrottling => {
                let backoff = {
                    let mut state = self.lock_state();
                    state.record_throttle(Instant::now());
                    state.backoff().unwrap_or_default()
                };
                tracing::warn!(
                    target: "scan::dispatcher",
                    uri = %failure.uri,
                    backoff = %humantime::format_duration(backoff),
                    "dispatcher is being throttled: {}",
                    failure.detail
                );
            }
            FailureClass::Nonretriable => {
                tracing::error!(
                    target: "scan::dispatcher",
                    uri = %failure.uri,
                    "unretriable api error: {}",
                    failure.detail
                );
            }
            FailureClass::NonretriableUnexpected => {
                tracing::error!(
                    target: "scan::dispatcher",
                    uri = %failure.uri,
                    anomalous = true,
                    "unretriable and unexpected api error: {}",
                    failure.detail
                );
            }
            FailureClass::Retriable => {
                tracing::debug!(
                    target: "scan::dispatcher",
                    uri = %failure.uri,
                    attempt = failure.attempts,
                    "retriable api error: {}",
                    failure.detail
                );
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, BackoffState> {
        // The state stays consistent even if a holder panicked.
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Query strings carry credentials, so errors and logs only show the path.
fn without_query(uri: &Url) -> String {
    let mut shown = uri.clone();
    shown.set_query(None);
    shown.to_string()
}
