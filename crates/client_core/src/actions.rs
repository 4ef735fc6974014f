//! Per-action payloads, endpoints, status tables and success transitions.

use shared::{
    domain::{ActionKind, PostId, VoteDirection, VoteState},
    protocol::{
        self, new_post_fields, ChallengeField, ForgotPasswordRequest, LoginRequest,
        NewPostResponse, PasswordResetRequest, RegisterRequest, VoteRequest, VoteResponse,
    },
};
use url::{form_urlencoded, Url};

use crate::{
    error::{SubmissionError, ValidationError, FALLBACK_FAILED_MESSAGE},
    transport::{FormPart, OutboundRequest},
    ui::Notice,
    validation::{require_email, require_filled, require_matching_passwords},
    vote::next_vote_state,
};

pub const RECOVERY_EMAIL_NOTICE: &str = "If an account is registered at that email and we haven't sent you a recovery email in the last 24 hours, we have sent an email to it.";

/// What the page does once the server confirms an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessTransition {
    Navigate(String),
    Notice(String),
    VoteRecorded { state: VoteState, score: i64 },
}

/// Everything that differs between the actions sharing the verification
/// protocol.
pub trait ActionSpec: Send {
    type Payload: Clone + Send + Sync;

    const KIND: ActionKind;
    /// Status codes the server uses for domain-level refusals, with the
    /// message shown for each.
    const REJECTIONS: &'static [(u16, &'static str)] = &[];
    const GONE: Option<&'static str> = None;
    /// Shown when the fallback response is refused as well.
    const FALLBACK_FAILED: &'static str = FALLBACK_FAILED_MESSAGE;

    fn validate(&self, _payload: &Self::Payload) -> Result<(), ValidationError> {
        Ok(())
    }

    fn build_request(
        &self,
        payload: &Self::Payload,
        challenge: ChallengeField,
    ) -> Result<OutboundRequest, SubmissionError>;

    fn apply_success(
        &mut self,
        payload: &Self::Payload,
        body: &[u8],
    ) -> Result<SuccessTransition, SubmissionError>;
}

fn query_param(page: &Url, key: &str) -> Option<String> {
    page.query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}

fn login_page_with(key: &str, value: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    format!("{}?{query}", protocol::LOGIN_PAGE)
}

// Only absolute paths on this origin; `//host`, `/\\host` and `@host`
// would all leave it once appended to the origin.
fn is_local_path(location: &str) -> bool {
    let mut chars = location.chars();
    chars.next() == Some('/') && !matches!(chars.next(), Some('/') | Some('\\'))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct LoginAction {
    return_to: Option<String>,
}

impl LoginAction {
    pub fn new(return_to: Option<String>) -> Self {
        Self {
            return_to: return_to.filter(|location| is_local_path(location)),
        }
    }

    /// Picks up the `redirect` parameter a protected page put on the login
    /// URL.
    pub fn from_page_url(page: &Url) -> Self {
        Self::new(query_param(page, "redirect"))
    }

    pub fn return_to(&self) -> Option<&str> {
        self.return_to.as_deref()
    }
}

impl ActionSpec for LoginAction {
    type Payload = LoginForm;

    const KIND: ActionKind = ActionKind::Login;
    const REJECTIONS: &'static [(u16, &'static str)] = &[
        (401, "Invalid login credentials."),
        (403, "You haven't verified your email yet, please check your inbox (even spam folder) to complete the registration process."),
    ];

    fn build_request(
        &self,
        payload: &LoginForm,
        challenge: ChallengeField,
    ) -> Result<OutboundRequest, SubmissionError> {
        let body = serde_json::to_value(LoginRequest {
            email: payload.email.clone(),
            password: payload.password.clone(),
            challenge,
        })?;
        Ok(OutboundRequest::json(protocol::LOGIN_PATH, body))
    }

    fn apply_success(
        &mut self,
        _payload: &LoginForm,
        _body: &[u8],
    ) -> Result<SuccessTransition, SubmissionError> {
        let target = self.return_to.clone().unwrap_or_else(|| "/".to_string());
        Ok(SuccessTransition::Navigate(target))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrationAction;

impl ActionSpec for RegistrationAction {
    type Payload = RegistrationForm;

    const KIND: ActionKind = ActionKind::Register;
    const REJECTIONS: &'static [(u16, &'static str)] = &[
        (406, "Email is invalid."),
        (409, "That email is already in use by another account."),
    ];

    fn validate(&self, payload: &RegistrationForm) -> Result<(), ValidationError> {
        require_filled(&[
            payload.email.as_str(),
            payload.username.as_str(),
            payload.password.as_str(),
        ])?;
        require_email(&payload.email)?;
        require_matching_passwords(&payload.password, &payload.password_confirm)
    }

    fn build_request(
        &self,
        payload: &RegistrationForm,
        challenge: ChallengeField,
    ) -> Result<OutboundRequest, SubmissionError> {
        let body = serde_json::to_value(RegisterRequest {
            email: payload.email.clone(),
            username: payload.username.clone(),
            password: payload.password.clone(),
            challenge,
        })?;
        Ok(OutboundRequest::json(protocol::REGISTER_PATH, body))
    }

    fn apply_success(
        &mut self,
        _payload: &RegistrationForm,
        _body: &[u8],
    ) -> Result<SuccessTransition, SubmissionError> {
        Ok(SuccessTransition::Navigate(login_page_with(
            "code",
            LoginBanner::Registered.code(),
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryRequestForm {
    pub email: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryRequestAction;

impl ActionSpec for RecoveryRequestAction {
    type Payload = RecoveryRequestForm;

    const KIND: ActionKind = ActionKind::ForgotPassword;

    fn build_request(
        &self,
        payload: &RecoveryRequestForm,
        challenge: ChallengeField,
    ) -> Result<OutboundRequest, SubmissionError> {
        let body = serde_json::to_value(ForgotPasswordRequest {
            email: payload.email.clone(),
            challenge,
        })?;
        Ok(OutboundRequest::json(protocol::FORGOT_PASSWORD_PATH, body))
    }

    // Same text whether or not the address is registered or was mailed
    // recently, so the response cannot be used to enumerate accounts.
    fn apply_success(
        &mut self,
        _payload: &RecoveryRequestForm,
        _body: &[u8],
    ) -> Result<SuccessTransition, SubmissionError> {
        Ok(SuccessTransition::Notice(RECOVERY_EMAIL_NOTICE.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetForm {
    pub password: String,
    pub password_confirm: String,
}

/// Reset of a forgotten password using the code mailed to the user.
#[derive(Debug, Clone, Default)]
pub struct PasswordResetAction {
    code: Option<String>,
}

impl PasswordResetAction {
    pub fn new(code: Option<String>) -> Self {
        Self {
            code: code.filter(|code| !code.is_empty()),
        }
    }

    /// Reads the reset code from the `code` parameter of the link in the
    /// recovery email.
    pub fn from_page_url(page: &Url) -> Self {
        Self::new(query_param(page, "code"))
    }
}

impl ActionSpec for PasswordResetAction {
    type Payload = PasswordResetForm;

    const KIND: ActionKind = ActionKind::ResetPassword;

    fn validate(&self, payload: &PasswordResetForm) -> Result<(), ValidationError> {
        require_matching_passwords(&payload.password, &payload.password_confirm)?;
        if self.code.is_none() {
            return Err(ValidationError::MissingResetCode);
        }
        Ok(())
    }

    fn build_request(
        &self,
        payload: &PasswordResetForm,
        challenge: ChallengeField,
    ) -> Result<OutboundRequest, SubmissionError> {
        let body = serde_json::to_value(PasswordResetRequest {
            code: self.code.clone().unwrap_or_default(),
            password: payload.password.clone(),
            challenge,
        })?;
        Ok(OutboundRequest::json(protocol::PASSWORD_RECOVERY_PATH, body))
    }

    fn apply_success(
        &mut self,
        _payload: &PasswordResetForm,
        _body: &[u8],
    ) -> Result<SuccessTransition, SubmissionError> {
        Ok(SuccessTransition::Navigate(login_page_with(
            "code",
            LoginBanner::PasswordReset.code(),
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPostForm {
    pub title: String,
    pub description: String,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NewPostAction;

impl ActionSpec for NewPostAction {
    type Payload = NewPostForm;

    const KIND: ActionKind = ActionKind::PostNew;
    const REJECTIONS: &'static [(u16, &'static str)] = &[
        (413, "You can not upload an image over 5MB."),
        (415, "The file you have selected is not an image."),
    ];

    fn validate(&self, payload: &NewPostForm) -> Result<(), ValidationError> {
        if payload.image.is_none() {
            return Err(ValidationError::MissingImage);
        }
        Ok(())
    }

    fn build_request(
        &self,
        payload: &NewPostForm,
        challenge: ChallengeField,
    ) -> Result<OutboundRequest, SubmissionError> {
        let mut parts = vec![
            FormPart::Text {
                name: new_post_fields::TITLE.to_string(),
                value: payload.title.clone(),
            },
            FormPart::Text {
                name: new_post_fields::DESCRIPTION.to_string(),
                value: payload.description.clone(),
            },
        ];
        if let Some(image) = &payload.image {
            parts.push(FormPart::File {
                name: new_post_fields::IMAGE.to_string(),
                filename: image.filename.clone(),
                mime_type: image.mime_type.clone(),
                bytes: image.bytes.clone(),
            });
        }
        parts.push(FormPart::Text {
            name: challenge.multipart_key().to_string(),
            value: challenge.value().to_string(),
        });
        Ok(OutboundRequest::multipart(protocol::POST_NEW_PATH, parts))
    }

    fn apply_success(
        &mut self,
        _payload: &NewPostForm,
        body: &[u8],
    ) -> Result<SuccessTransition, SubmissionError> {
        let created = NewPostResponse::from_body(body)?;
        Ok(SuccessTransition::Navigate(protocol::post_page(
            &created.post_id(),
        )))
    }
}

/// Vote on a single post page. Holds the client-side mirror of the user's
/// recorded vote and the last score the server reported.
#[derive(Debug, Clone)]
pub struct VoteAction {
    post_id: PostId,
    logged_in: bool,
    state: VoteState,
    score: Option<i64>,
}

impl VoteAction {
    pub fn new(post_id: PostId, logged_in: bool, state: VoteState) -> Self {
        Self {
            post_id,
            logged_in,
            state,
            score: None,
        }
    }

    pub fn post_id(&self) -> &PostId {
        &self.post_id
    }

    pub fn state(&self) -> VoteState {
        self.state
    }

    pub fn score(&self) -> Option<i64> {
        self.score
    }
}

impl ActionSpec for VoteAction {
    type Payload = VoteDirection;

    const KIND: ActionKind = ActionKind::Vote;
    const GONE: Option<&'static str> = Some("This post has been deleted.");
    const FALLBACK_FAILED: &'static str = "You failed the reCAPTCHA.";

    fn validate(&self, _payload: &VoteDirection) -> Result<(), ValidationError> {
        if !self.logged_in {
            return Err(ValidationError::LoginRequired {
                login_location: login_page_with("redirect", &protocol::post_page(&self.post_id)),
            });
        }
        Ok(())
    }

    fn build_request(
        &self,
        payload: &VoteDirection,
        challenge: ChallengeField,
    ) -> Result<OutboundRequest, SubmissionError> {
        let body = serde_json::to_value(VoteRequest {
            upvote: payload.is_upvote(),
            challenge,
        })?;
        Ok(OutboundRequest::json(protocol::vote_path(&self.post_id), body))
    }

    fn apply_success(
        &mut self,
        payload: &VoteDirection,
        body: &[u8],
    ) -> Result<SuccessTransition, SubmissionError> {
        let response = VoteResponse::from_body(body)?;
        self.state = next_vote_state(self.state, *payload);
        self.score = Some(response.score);
        Ok(SuccessTransition::VoteRecorded {
            state: self.state,
            score: response.score,
        })
    }
}

/// One-off banner the login entry point shows, selected by its `code`
/// query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginBanner {
    Registered,
    EmailVerified,
    AlreadyVerified,
    PasswordReset,
}

impl LoginBanner {
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(Self::Registered),
            "1" => Some(Self::EmailVerified),
            "2" => Some(Self::AlreadyVerified),
            "3" => Some(Self::PasswordReset),
            _ => None,
        }
    }

    pub fn from_page_url(page: &Url) -> Option<Self> {
        query_param(page, "code").as_deref().and_then(Self::from_code)
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Registered => "0",
            Self::EmailVerified => "1",
            Self::AlreadyVerified => "2",
            Self::PasswordReset => "3",
        }
    }

    pub fn notice(self) -> Notice {
        match self {
            Self::Registered => Notice::info(
                "Successfully registered account, please check your email inbox for a verification email.",
            ),
            Self::EmailVerified => Notice::info("Successfully verified email, you may now log in."),
            Self::AlreadyVerified => {
                Notice::warning("You were already verified before attempting to verify again.")
            }
            Self::PasswordReset => Notice::info("Successfully reset password, you may now log in."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(raw: &str) -> Url {
        Url::parse(raw).expect("url")
    }

    #[test]
    fn login_reads_redirect_parameter() {
        let action = LoginAction::from_page_url(&page(
            "https://forum.test/login/?redirect=%2Fpost%2Fabc",
        ));
        assert_eq!(action.return_to(), Some("/post/abc"));

        let action = LoginAction::from_page_url(&page("https://forum.test/login/?redirect="));
        assert_eq!(action.return_to(), None);
    }

    #[test]
    fn login_ignores_redirects_that_leave_the_origin() {
        for redirect in [
            "@evil.test",
            "%40evil.test%2Fphish",
            "%2F%2Fevil.test",
            "%2F%5Cevil.test",
            "https%3A%2F%2Fevil.test",
            "post%2Fabc",
        ] {
            let action = LoginAction::from_page_url(&page(&format!(
                "https://forum.test/login/?redirect={redirect}"
            )));
            assert_eq!(action.return_to(), None, "{redirect}");
        }
    }

    #[test]
    fn vote_login_gate_round_trips_through_login_redirect() {
        let action = VoteAction::new(PostId("abc".into()), false, VoteState::None);
        let err = action.validate(&VoteDirection::Up).expect_err("gate");
        let location = err.redirect_target().expect("redirect").to_string();
        assert_eq!(location, "/login/?redirect=%2Fpost%2Fabc");

        let login = LoginAction::from_page_url(&page(&format!("https://forum.test{location}")));
        assert_eq!(login.return_to(), Some("/post/abc"));
    }

    #[test]
    fn registration_success_lands_on_login_with_registered_banner() {
        let mut action = RegistrationAction;
        let form = RegistrationForm {
            email: "a@example.com".into(),
            username: "a".into(),
            password: "pw".into(),
            password_confirm: "pw".into(),
        };
        let transition = action.apply_success(&form, b"").expect("success");
        assert_eq!(
            transition,
            SuccessTransition::Navigate("/login/?code=0".into())
        );
        assert_eq!(
            LoginBanner::from_page_url(&page("https://forum.test/login/?code=0")),
            Some(LoginBanner::Registered)
        );
    }

    #[test]
    fn login_banners_decode_known_codes_only() {
        assert_eq!(LoginBanner::from_code("1"), Some(LoginBanner::EmailVerified));
        assert_eq!(
            LoginBanner::AlreadyVerified.notice().severity,
            crate::ui::Severity::Warning
        );
        assert_eq!(
            LoginBanner::PasswordReset.notice().message,
            "Successfully reset password, you may now log in."
        );
        assert_eq!(LoginBanner::from_code("9"), None);
        assert_eq!(LoginBanner::from_page_url(&page("https://forum.test/login/")), None);
    }

    #[test]
    fn reset_requires_code_from_link() {
        let form = PasswordResetForm {
            password: "pw".into(),
            password_confirm: "pw".into(),
        };
        assert_eq!(
            PasswordResetAction::new(None).validate(&form),
            Err(ValidationError::MissingResetCode)
        );
        let action =
            PasswordResetAction::from_page_url(&page("https://forum.test/password-recovery/?code=xyz"));
        assert_eq!(action.validate(&form), Ok(()));
    }

    #[test]
    fn new_post_puts_challenge_in_camel_case_field() {
        let form = NewPostForm {
            title: "cat".into(),
            description: "a cat".into(),
            image: Some(ImageUpload {
                filename: "cat.png".into(),
                mime_type: Some("image/png".into()),
                bytes: vec![1, 2, 3],
            }),
        };
        let request = NewPostAction
            .build_request(&form, ChallengeField::CaptchaV2("v2".into()))
            .expect("request");
        assert_eq!(request.path, "/post/new");
        let crate::transport::RequestBody::Multipart(parts) = request.body else {
            panic!("expected multipart body");
        };
        let names: Vec<&str> = parts.iter().map(FormPart::name).collect();
        assert_eq!(names, ["title", "description", "image", "captchaV2"]);
    }
}
