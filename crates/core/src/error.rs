/// Errors raised by the registration core.
///
/// Reconciliation itself never fails; these cover configuration, input parsing and the
/// coordinator channel.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to read configuration file: {0}")]
    ConfigRead(std::io::Error),
    #[error("failed to deserialize configuration YAML: {0}")]
    ConfigDeserialization(serde_yaml::Error),
    #[error("form state coordinator has stopped")]
    CoordinatorClosed,
}

pub type RegistrationResult<T> = std::result::Result<T, RegistrationError>;

/// Failure of a single data source fetch.
///
/// These never abort reconciliation; they are logged and surfaced as
/// [`crate::live::StateEvent::SourceFailed`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },
    #[error("failed to read {resource}: {message}")]
    Read {
        resource: &'static str,
        message: String,
    },
    #[error("failed to deserialize {resource}: {message}")]
    Deserialization {
        resource: &'static str,
        message: String,
    },
    #[error("{resource} source unavailable: {message}")]
    Unavailable {
        resource: &'static str,
        message: String,
    },
}

impl SourceError {
    /// The source answered, but holds nothing for the requested id.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SourceError::NotFound { .. })
    }
}

pub type SourceResult<T> = std::result::Result<T, SourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_resources_count_as_not_found() {
        let missing = SourceError::NotFound {
            resource: "person",
            id: "p-1".into(),
        };
        let unavailable = SourceError::Unavailable {
            resource: "person",
            message: "no network".into(),
        };

        assert!(missing.is_not_found());
        assert!(!unavailable.is_not_found());
        assert_eq!(missing.to_string(), "person not found: p-1");
    }
}
