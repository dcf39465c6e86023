/// A message produced during a synchronization pass.
///
/// Passes collect these instead of printing, so the CLI can write them to
/// the terminal while the webhook only forwards them to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feedback {
    /// Progress or outcome of a step that went as planned.
    Info(String),
    /// The pass continued but something noteworthy occurred.
    Warning(String),
    /// A step failed; the pass as a whole will report failure.
    Error(String),
}

impl Feedback {
    pub fn info(msg: impl Into<String>) -> Self {
        Self::Info(msg.into())
    }

    pub fn warning(msg: impl Into<String>) -> Self {
        Self::Warning(msg.into())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Info(msg) | Self::Warning(msg) | Self::Error(msg) => msg,
        }
    }

    /// Forward to the tracing subscriber at the matching level.
    pub fn emit(&self) {
        match self {
            Self::Info(msg) => tracing::info!("{msg}"),
            Self::Warning(msg) => tracing::warn!("{msg}"),
            Self::Error(msg) => tracing::error!("{msg}"),
        }
    }
}

impl std::fmt::Display for Feedback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info(msg) => write!(f, "{msg}"),
            Self::Warning(msg) => write!(f, "warning: {msg}"),
            Self::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels() {
        assert!(Feedback::error("list failed").is_error());
        assert!(Feedback::warning("unlisted file").is_warning());
        assert!(!Feedback::info("ok").is_error());
        assert_eq!(Feedback::info("mods: 0 to delete").message(), "mods: 0 to delete");
    }

    #[test]
    fn display_prefixes_severity() {
        assert_eq!(Feedback::info("msg").to_string(), "msg");
        assert_eq!(Feedback::warning("msg").to_string(), "warning: msg");
        assert_eq!(Feedback::error("msg").to_string(), "error: msg");
    }
}
