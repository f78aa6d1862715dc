use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to identify the tracks of a set.
#[derive(Debug, Deserialize, Validate)]
pub struct IdentifyRequest {
    #[garde(length(min = 1, max = 2048))]
    pub url: String,

    /// Seconds between sample starts; the configured default when absent.
    #[garde(range(min = 1))]
    pub segment_duration: Option<u64>,
}

/// Response after submitting a set.
#[derive(Debug, Serialize, Deserialize)]
pub struct IdentifyResponse {
    pub job_id: Uuid,
}

/// Error payload for client-visible failures.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ErrorBody {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str, segment_duration: Option<u64>) -> IdentifyRequest {
        IdentifyRequest {
            url: url.to_string(),
            segment_duration,
        }
    }

    #[test]
    fn test_default_stride_is_valid() {
        assert!(request("https://soundcloud.com/dj/set", None).validate().is_ok());
        assert!(request("https://soundcloud.com/dj/set", Some(30)).validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_url() {
        assert!(request("", None).validate().is_err());
    }

    #[test]
    fn test_stride_bounds() {
        assert!(request("https://example.com", Some(0)).validate().is_err());
        assert!(request("https://example.com", Some(1)).validate().is_ok());
        assert!(request("https://example.com", Some(3600)).validate().is_ok());
    }
}
