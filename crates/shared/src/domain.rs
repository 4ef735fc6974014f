use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(PostId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Login,
    Register,
    ForgotPassword,
    ResetPassword,
    PostNew,
    Vote,
}

impl ActionKind {
    // The server rejects tokens minted for a different action.
    pub fn challenge_name(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Register => "register",
            Self::ForgotPassword => "forgot_password",
            Self::ResetPassword => "reset_password",
            Self::PostNew => "post_new",
            Self::Vote => "vote",
        }
    }

    pub fn failure_title(self) -> &'static str {
        match self {
            Self::Login => "Login Failed",
            Self::Register => "Registration Failed",
            Self::ForgotPassword => "Email Send Failed",
            Self::ResetPassword => "Password Recovery Failed",
            Self::PostNew => "Post Creation Failed",
            Self::Vote => "Vote Failed",
        }
    }

    pub fn progress_message(self) -> Option<&'static str> {
        match self {
            Self::Login => Some("Logging in."),
            Self::Register => Some("Registering account."),
            Self::ForgotPassword => Some("Sending forgot password email."),
            Self::ResetPassword => Some("Resetting password."),
            Self::PostNew => Some("Creating new post."),
            Self::Vote => None,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.challenge_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn is_upvote(self) -> bool {
        matches!(self, Self::Up)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteState {
    #[default]
    None,
    Upvoted,
    Downvoted,
}

impl VoteState {
    // 0 = none, 1 = up, 2 = down
    pub fn from_wire(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::Upvoted),
            2 => Some(Self::Downvoted),
            _ => None,
        }
    }

    pub fn as_wire(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Upvoted => 1,
            Self::Downvoted => 2,
        }
    }
}
