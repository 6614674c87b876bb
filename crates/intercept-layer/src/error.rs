use crate::lifecycle::Phase;
use generation_cache::CacheError;
use http::StatusCode;

/// Network fetch failures. A fetch that produced any HTTP response, whatever
/// its status, is not an error.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("network unreachable: {0}")]
    Connect(String),

    /// The client speaks plain HTTP only.
    #[error("unsupported scheme in {0}")]
    UnsupportedScheme(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Errors surfaced by the intercept layer.
///
/// Most platform failures are absorbed inside the layer and only logged;
/// these are the ones a host has to see.
#[derive(Debug, thiserror::Error)]
pub enum InterceptError {
    #[error("invalid origin {0}")]
    InvalidOrigin(String),

    #[error("invalid seed path {0}")]
    InvalidSeedPath(String),

    #[error("lifecycle step requires phase {expected}, layer is {actual}")]
    InvalidPhase { expected: Phase, actual: Phase },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("seed fetch of {url} failed")]
    SeedFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("seed fetch of {url} returned {status}")]
    SeedStatus { url: String, status: StatusCode },

    /// A pass-through request failed at the network.
    #[error(transparent)]
    Network(#[from] FetchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_error_names_both_phases() {
        let err = InterceptError::InvalidPhase {
            expected: Phase::Installed,
            actual: Phase::Parsed,
        };
        let msg = err.to_string();
        assert!(msg.contains("installed"));
        assert!(msg.contains("parsed"));
    }

    #[test]
    fn seed_status_includes_url() {
        let err = InterceptError::SeedStatus {
            url: "http://localhost:8080/health".into(),
            status: StatusCode::NOT_FOUND,
        };
        assert!(err.to_string().contains("/health"));
        assert!(err.to_string().contains("404"));
    }
}
