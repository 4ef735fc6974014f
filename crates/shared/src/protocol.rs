use serde::{Deserialize, Serialize};

use crate::{domain::PostId, error::ProtocolError};

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const FORGOT_PASSWORD_PATH: &str = "/forgot-password";
pub const PASSWORD_RECOVERY_PATH: &str = "/password-recovery";
pub const POST_NEW_PATH: &str = "/post/new";

pub const LOGIN_PAGE: &str = "/login/";

pub fn post_page(post_id: &PostId) -> String {
    format!("/post/{post_id}")
}

pub fn vote_path(post_id: &PostId) -> String {
    format!("/post/{post_id}/vote")
}

// Flattened into request bodies so a request carries exactly one proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeField {
    Captcha(String),
    CaptchaV2(String),
}

impl ChallengeField {
    pub fn multipart_key(&self) -> &'static str {
        match self {
            Self::Captcha(_) => "captcha",
            Self::CaptchaV2(_) => "captchaV2",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Self::Captcha(v) | Self::CaptchaV2(v) => v,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::CaptchaV2(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(flatten)]
    pub challenge: ChallengeField,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(flatten)]
    pub challenge: ChallengeField,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ForgotPasswordRequest {
    pub email: String,
    #[serde(flatten)]
    pub challenge: ChallengeField,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PasswordResetRequest {
    pub code: String,
    pub password: String,
    #[serde(flatten)]
    pub challenge: ChallengeField,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoteRequest {
    pub upvote: bool,
    #[serde(flatten)]
    pub challenge: ChallengeField,
}

pub mod new_post_fields {
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const IMAGE: &str = "image";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VoteResponse {
    pub score: i64,
}

impl VoteResponse {
    pub fn from_body(body: &[u8]) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_slice(body)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPostResponse {
    #[serde(rename = "UUID")]
    pub uuid: String,
}

impl NewPostResponse {
    pub fn from_body(body: &[u8]) -> Result<Self, ProtocolError> {
        let response: Self = serde_json::from_slice(body)?;
        if response.uuid.trim().is_empty() {
            return Err(ProtocolError::EmptyField("UUID"));
        }
        Ok(response)
    }

    pub fn post_id(&self) -> PostId {
        PostId(self.uuid.clone())
    }
}
