use thiserror::Error;

/// Failures of the collaborators that sit behind the HTTP surface.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("unavailable: {message}")]
    Unavailable { code: &'static str, message: String },
    #[error("internal error: {message}")]
    Internal { code: &'static str, message: String },
}

impl AppError {
    pub fn unavailable(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            code,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "internal_error",
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable { code, .. } | Self::Internal { code, .. } => code,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
