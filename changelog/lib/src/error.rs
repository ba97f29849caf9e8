use thiserror::Error;

/// Failures while turning the from/to tokens into a concrete tag range.
///
/// The messages are stable: CI tooling matches on them, so they must not
/// change wording.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagResolutionError {
    /// The provider returned an empty tag list.
    #[error("No tags found in repository")]
    NoTags,

    /// An explicit fromTag name does not exist.
    #[error("Tag '{0}' not found")]
    NotFound(String),

    /// A `-N` offset walks past the oldest tag. Holds the digits as written.
    #[error("Offset -{0} is out of range")]
    OffsetOutOfRange(String),

    /// toTag has no older neighbour to auto-detect from.
    #[error("Could not determine fromTag")]
    Undetermined,
}

/// Errors raised by a hosting-platform provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// Git operation failed.
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// The platform cannot serve this operation.
    #[error("Operation not supported: {0}")]
    Unsupported(String),
}

/// Malformed user input, detected before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Invalid mode: {0}. Must be PR, COMMIT, or HYBRID.")]
    Mode(String),

    #[error("Invalid platform: {0}. Must be github, gitea, local, or git.")]
    Platform(String),

    #[error("Invalid {name}: {value}. Must be a number.")]
    Number { name: &'static str, value: String },

    #[error(
        "PR and HYBRID modes are not supported for {0} platform. Use COMMIT mode instead."
    )]
    ModeNotSupported(String),

    #[error("Could not determine repository owner/name: {0}")]
    Repository(String),
}

/// Umbrella error for a full changelog run.
///
/// `Display` forwards the inner message untouched.
#[derive(Debug, Error)]
pub enum ChangelogError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    TagResolution(#[from] TagResolutionError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Convenience Result type for changelog operations.
pub type Result<T> = std::result::Result<T, ChangelogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_resolution_messages_are_stable() {
        assert_eq!(
            TagResolutionError::NoTags.to_string(),
            "No tags found in repository"
        );
        assert_eq!(
            TagResolutionError::NotFound("v0.0.0".into()).to_string(),
            "Tag 'v0.0.0' not found"
        );
        assert_eq!(
            TagResolutionError::OffsetOutOfRange("3".into()).to_string(),
            "Offset -3 is out of range"
        );
        assert_eq!(
            TagResolutionError::Undetermined.to_string(),
            "Could not determine fromTag"
        );
    }

    #[test]
    fn umbrella_error_is_transparent() {
        let err: ChangelogError = TagResolutionError::NoTags.into();
        assert_eq!(err.to_string(), "No tags found in repository");

        let err: ChangelogError = InputError::Mode("nope".into()).into();
        assert_eq!(
            err.to_string(),
            "Invalid mode: nope. Must be PR, COMMIT, or HYBRID."
        );
    }

    #[test]
    fn number_error_names_the_input() {
        let err = InputError::Number {
            name: "maxTagsToFetch",
            value: "lots".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid maxTagsToFetch: lots. Must be a number."
        );
    }
}
