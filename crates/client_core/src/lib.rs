use std::{mem, sync::Arc};

use shared::protocol::ChallengeField;
use tracing::{info, warn};

pub mod actions;
pub mod challenge;
pub mod config;
pub mod error;
pub mod outcome;
pub mod transport;
pub mod ui;
pub mod validation;
pub mod vote;

pub use actions::{ActionSpec, SuccessTransition};
pub use challenge::{ChallengeProvider, ChallengeToken, FallbackChallengeResponse};
pub use error::{SubmissionError, TransportError, ValidationError};
pub use outcome::SubmissionOutcome;
pub use transport::{HttpTransport, OutboundRequest, ServerResponse, SubmissionTransport};
pub use ui::{Navigator, Notice, Notifier, Severity};

const BOT_SUSPECTED_TITLE: &str = "Anti-Bot Verification";
const BOT_SUSPECTED_MESSAGE: &str =
    "Our system suspects you of being a bot, please complete the reCAPTCHA.";
const FALLBACK_RETRY_MESSAGE: &str = "reCAPTCHA completed, trying again.";
const FALLBACK_INCOMPLETE_MESSAGE: &str = "Please complete the reCAPTCHA first.";

#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn SubmissionTransport>,
    pub challenge: Arc<dyn ChallengeProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
}

#[derive(Debug)]
pub enum FlowStatus {
    Completed(SuccessTransition),
    AwaitingFallback,
    Failed(SubmissionError),
}

impl FlowStatus {
    pub fn is_awaiting_fallback(&self) -> bool {
        matches!(self, Self::AwaitingFallback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Invisible,
    Fallback,
}

enum Phase<P> {
    Idle,
    AwaitingFallback { payload: P },
}

pub struct SubmissionController<A: ActionSpec> {
    action: A,
    ctx: Collaborators,
    phase: Phase<A::Payload>,
}

impl<A: ActionSpec> SubmissionController<A> {
    pub fn new(action: A, ctx: Collaborators) -> Self {
        Self {
            action,
            ctx,
            phase: Phase::Idle,
        }
    }

    pub fn action(&self) -> &A {
        &self.action
    }

    pub fn is_awaiting_fallback(&self) -> bool {
        matches!(self.phase, Phase::AwaitingFallback { .. })
    }

    // A fallback still pending from an earlier gesture is abandoned.
    pub async fn submit(&mut self, payload: A::Payload) -> FlowStatus {
        if let Phase::AwaitingFallback { .. } = mem::replace(&mut self.phase, Phase::Idle) {
            warn!(action = %A::KIND, "abandoning pending fallback for new submission");
            self.invalidate_widget();
        }

        if let Err(err) = self.action.validate(&payload) {
            info!(action = %A::KIND, error = %err, "local validation failed");
            match err.redirect_target() {
                Some(location) => self.ctx.navigator.navigate(location),
                None => self.ctx.notifier.notify(Notice::error(err.to_string())),
            }
            return FlowStatus::Failed(SubmissionError::Validation(err));
        }

        if let Some(message) = A::KIND.progress_message() {
            self.ctx.notifier.notify(Notice::info(message));
        }

        let token = match self.ctx.challenge.execute(A::KIND.challenge_name()).await {
            Ok(token) => token,
            Err(err) => return self.fail(SubmissionError::Challenge(format!("{err:#}"))),
        };

        let outcome = self
            .round_trip(&payload, ChallengeField::Captcha(token.0), Attempt::Invisible)
            .await;
        self.conclude(payload, outcome, Attempt::Invisible)
    }

    /// Resumes a flow after the user solved the visible widget, resubmitting
    /// the payload remembered when the server first suspected a bot.
    pub async fn complete_fallback(&mut self) -> FlowStatus {
        let payload = match mem::replace(&mut self.phase, Phase::Idle) {
            Phase::AwaitingFallback { payload } => payload,
            Phase::Idle => return self.fail(SubmissionError::NoPendingFallback),
        };

        let Some(response) = self.ctx.challenge.response() else {
            self.ctx
                .notifier
                .notify(Notice::warning(FALLBACK_INCOMPLETE_MESSAGE).titled(BOT_SUSPECTED_TITLE));
            self.phase = Phase::AwaitingFallback { payload };
            return FlowStatus::AwaitingFallback;
        };

        self.ctx.notifier.notify(Notice::info(FALLBACK_RETRY_MESSAGE));
        self.invalidate_widget();

        let outcome = self
            .round_trip(&payload, ChallengeField::CaptchaV2(response.0), Attempt::Fallback)
            .await;
        self.conclude(payload, outcome, Attempt::Fallback)
    }

    async fn round_trip(
        &self,
        payload: &A::Payload,
        challenge: ChallengeField,
        attempt: Attempt,
    ) -> Result<SubmissionOutcome<Vec<u8>>, SubmissionError> {
        let request = self.action.build_request(payload, challenge)?;
        info!(action = %A::KIND, path = %request.path, ?attempt, "submitting");

        let response = self.ctx.transport.send(request).await?;
        Ok(outcome::classify(
            response.status,
            response.body,
            A::REJECTIONS,
            A::GONE,
        ))
    }

    fn conclude(
        &mut self,
        payload: A::Payload,
        outcome: Result<SubmissionOutcome<Vec<u8>>, SubmissionError>,
        attempt: Attempt,
    ) -> FlowStatus {
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => return self.fail(err),
        };

        match outcome {
            SubmissionOutcome::Success(body) => self.succeed(&payload, &body),
            SubmissionOutcome::BotSuspected => match attempt {
                Attempt::Invisible => {
                    info!(action = %A::KIND, "bot suspected; opening fallback challenge");
                    self.phase = Phase::AwaitingFallback { payload };
                    self.ctx.notifier.notify(
                        Notice::warning(BOT_SUSPECTED_MESSAGE).titled(BOT_SUSPECTED_TITLE),
                    );
                    self.ctx.challenge.show();
                    FlowStatus::AwaitingFallback
                }
                // Only one fallback exists; a second refusal ends the flow.
                Attempt::Fallback => self.fail(SubmissionError::FallbackRejected {
                    reason: A::FALLBACK_FAILED,
                }),
            },
            SubmissionOutcome::Rejected { status, reason } => {
                self.fail(SubmissionError::Rejected { status, reason })
            }
            SubmissionOutcome::Gone { reason } => self.fail(SubmissionError::Gone { reason }),
            SubmissionOutcome::ServerError { status } => {
                self.fail(SubmissionError::Server { status })
            }
        }
    }

    fn succeed(&mut self, payload: &A::Payload, body: &[u8]) -> FlowStatus {
        let transition = match self.action.apply_success(payload, body) {
            Ok(transition) => transition,
            Err(err) => return self.fail(err),
        };

        info!(action = %A::KIND, ?transition, "submission succeeded");
        match &transition {
            SuccessTransition::Navigate(location) => self.ctx.navigator.navigate(location),
            SuccessTransition::Notice(message) => {
                self.ctx.notifier.notify(Notice::success(message.clone()))
            }
            SuccessTransition::VoteRecorded { .. } => {}
        }
        FlowStatus::Completed(transition)
    }

    fn fail(&self, err: SubmissionError) -> FlowStatus {
        warn!(action = %A::KIND, error = %err, "submission failed");
        self.ctx
            .notifier
            .notify(Notice::error(err.notice_message()).titled(A::KIND.failure_title()));
        FlowStatus::Failed(err)
    }

    fn invalidate_widget(&self) {
        self.ctx.challenge.hide();
        self.ctx.challenge.reset();
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod transport_tests;
