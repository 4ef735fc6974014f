//! Notification and navigation surfaces the controller reports into.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// One transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    pub title: Option<String>,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            title: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

pub trait Navigator: Send + Sync {
    /// `location` is a path on the application's origin, e.g. `/post/abc`.
    fn navigate(&self, location: &str);
}
