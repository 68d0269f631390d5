//! Error types for the session layer.

/// Errors that can occur while working with sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Handler code tried to write or remove a key only the pipeline
    /// may touch (`session_id` or `permissions`).
    #[error("attribute {0:?} is reserved")]
    ReservedAttribute(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_attribute_display_names_key() {
        let err = SessionError::ReservedAttribute("permissions".into());
        assert_eq!(err.to_string(), "attribute \"permissions\" is reserved");
    }
}
