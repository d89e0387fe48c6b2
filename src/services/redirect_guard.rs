//! Bounds redirect targets to the configured storage endpoint.
//!
//! A presigned URL is only handed to the client when its host is the
//! endpoint host itself or a subdomain of it.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RedirectError {
    #[error("presigned URL could not be parsed: {0}")]
    Malformed(#[from] url::ParseError),
    #[error("presigned URL host `{host}` is outside endpoint `{endpoint}`")]
    InvalidHost { host: String, endpoint: String },
}

/// Endpoint string with any `:port` suffix removed.
pub fn endpoint_host(endpoint: &str) -> &str {
    endpoint.split(':').next().unwrap_or(endpoint)
}

/// Accept `presigned` when its host equals the endpoint host or ends with
/// `.<endpoint host>`.
pub fn validate(presigned: &str, endpoint: &str) -> Result<Url, RedirectError> {
    let url = Url::parse(presigned)?;
    let allowed = endpoint_host(endpoint).to_ascii_lowercase();
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();

    let within = !allowed.is_empty()
        && (host == allowed
            || host
                .strip_suffix(allowed.as_str())
                .is_some_and(|rest| rest.ends_with('.')));
    if within {
        Ok(url)
    } else {
        Err(RedirectError::InvalidHost {
            host,
            endpoint: endpoint.to_string(),
        })
    }
}
