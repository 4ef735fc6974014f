use anyhow::Result;
use async_trait::async_trait;

/// Token minted by the invisible, score-based challenge for one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeToken(pub String);

/// Response produced by the visible widget once the user has solved it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackChallengeResponse(pub String);

/// Bot-verification provider. The visible widget is a single slot shared by
/// every controller on the page.
#[async_trait]
pub trait ChallengeProvider: Send + Sync {
    async fn execute(&self, action: &str) -> Result<ChallengeToken>;
    fn show(&self);
    fn hide(&self);
    /// `None` until the user has completed the visible widget.
    fn response(&self) -> Option<FallbackChallengeResponse>;
    fn reset(&self);
}
