use std::{error::Error, fmt::Display};

#[derive(Debug)]
pub enum RelayError {
    ConfigToken,
    InvalidDirectUrl(String),
    Send(String),
    Timeout,
}

impl Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigToken => write!(f, "Error: no Telegram bot token"),
            Self::InvalidDirectUrl(url) => write!(f, "Invalid video URL received: {url}"),
            Self::Send(e) => write!(f, "Error sending message: {e}"),
            Self::Timeout => write!(f, "Timed out sending message"),
        }
    }
}

impl Error for RelayError {}

/// User-facing reason a rich media delivery failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryFailure {
    Unreachable,
    Formatting,
    Unknown,
}

impl DeliveryFailure {
    pub fn classify(error: &RelayError) -> Self {
        let RelayError::Send(text) = error else {
            return Self::Unknown;
        };
        let text = text.to_lowercase();
        if text.contains("failed to get http url content")
            || text.contains("wrong file identifier/http url specified")
        {
            Self::Unreachable
        } else if text.contains("can't parse entities") {
            Self::Formatting
        } else {
            Self::Unknown
        }
    }

    pub fn explanation(self) -> &'static str {
        match self {
            Self::Unreachable => "Telegram couldn't access the video content from the provided URL. The link might be expired or restricted.",
            Self::Formatting => "a formatting error in the message.",
            Self::Unknown => "an unknown error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_send_errors() {
        let unreachable = RelayError::Send("Bad Request: failed to get HTTP URL content".into());
        assert_eq!(
            DeliveryFailure::classify(&unreachable),
            DeliveryFailure::Unreachable
        );

        let formatting = RelayError::Send(
            "Bad Request: can't parse entities: Character '.' is reserved".into(),
        );
        assert_eq!(
            DeliveryFailure::classify(&formatting),
            DeliveryFailure::Formatting
        );

        let other = RelayError::Send("Forbidden: bot was blocked by the user".into());
        assert_eq!(DeliveryFailure::classify(&other), DeliveryFailure::Unknown);
    }

    #[test]
    fn non_send_errors_are_unknown() {
        assert_eq!(
            DeliveryFailure::classify(&RelayError::InvalidDirectUrl("ftp://x".into())),
            DeliveryFailure::Unknown
        );
        assert_eq!(
            DeliveryFailure::classify(&RelayError::Timeout),
            DeliveryFailure::Unknown
        );
    }
}
