//! Terminal stand-ins for the page's notification widget, navigation and
//! challenge script.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use client_core::{
    ChallengeProvider, ChallengeToken, FallbackChallengeResponse, Navigator, Notice, Notifier,
    Severity,
};
use tracing::{debug, info};

pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, notice: Notice) {
        let label = match notice.severity {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match notice.title {
            Some(title) => println!("[{label}] {title}: {}", notice.message),
            None => println!("[{label}] {}", notice.message),
        }
    }
}

pub struct TerminalNavigator {
    origin: String,
}

impl TerminalNavigator {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
        }
    }
}

impl Navigator for TerminalNavigator {
    // Locations are origin-relative paths starting with a single `/`.
    fn navigate(&self, location: &str) {
        println!("navigate -> {}{location}", self.origin);
    }
}

/// Invisible step answered from a pre-minted token; the visible step is
/// solved out of band and its response pasted on stdin.
pub struct TerminalChallenge {
    token: Option<String>,
    response: Mutex<Option<String>>,
}

impl TerminalChallenge {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token,
            response: Mutex::new(None),
        }
    }

    pub fn solve(&self, response: String) {
        if let Ok(mut slot) = self.response.lock() {
            *slot = Some(response);
        }
    }
}

#[async_trait]
impl ChallengeProvider for TerminalChallenge {
    async fn execute(&self, action: &str) -> Result<ChallengeToken> {
        debug!(action, "using configured challenge token");
        self.token
            .clone()
            .map(ChallengeToken)
            .ok_or_else(|| anyhow!("no challenge token configured for action '{action}'"))
    }

    fn show(&self) {
        info!("fallback challenge opened");
        println!("Solve the reCAPTCHA in a browser and paste the response token below.");
    }

    fn hide(&self) {
        debug!("fallback challenge closed");
    }

    fn response(&self) -> Option<FallbackChallengeResponse> {
        self.response
            .lock()
            .ok()
            .and_then(|slot| slot.clone())
            .map(FallbackChallengeResponse)
    }

    fn reset(&self) {
        if let Ok(mut slot) = self.response.lock() {
            *slot = None;
        }
    }
}
