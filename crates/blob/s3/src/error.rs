use depot_blob::BlobError;

/// Classify an AWS SDK error message into the appropriate [`BlobError`].
///
/// Inspects the message for common connectivity patterns and falls back to
/// [`BlobError::Storage`].
pub(crate) fn classify_sdk_error(error_str: &str) -> BlobError {
    let lower = error_str.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        BlobError::Timeout(std::time::Duration::ZERO)
    } else if lower.contains("dispatch failure")
        || lower.contains("connection")
        || lower.contains("dns error")
    {
        BlobError::Connection(error_str.to_owned())
    } else {
        BlobError::Storage(error_str.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_timeout() {
        assert!(matches!(
            classify_sdk_error("request timed out"),
            BlobError::Timeout(_)
        ));
    }

    #[test]
    fn classify_connection() {
        assert!(matches!(
            classify_sdk_error("dispatch failure: io error"),
            BlobError::Connection(_)
        ));
    }

    #[test]
    fn classify_other() {
        assert!(matches!(
            classify_sdk_error("AccessDenied"),
            BlobError::Storage(_)
        ));
    }
}
