//! Session-level error types shared across credential providers, the token lifecycle, and
//! affinity resolution.

// self
use crate::{_prelude::*, obs::FlowKind};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Fewer than two distinct sticky-session cookies at the probing deadline is not an error; see
/// [`crate::affinity::Affinity::is_degraded`].
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; retrying with the same configuration reproduces it.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identity endpoint answered, but not with a usable token.
	#[error(transparent)]
	AuthProtocol(#[from] AuthProtocolError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
}
impl Error {
	/// Returns `true` when the error stems from configuration and must not be retried.
	pub fn is_fatal(&self) -> bool {
		matches!(self, Self::Config(_))
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A freshly minted token is already inside the buffer window.
	#[error(
		"Token lifetime is not longer than the buffer period of {buffer}; please adjust parameters."
	)]
	BufferExceedsLifetime {
		/// Configured buffer period.
		buffer: Duration,
		/// Remaining lifetime of the freshly minted token.
		lifetime: Duration,
	},
	/// A required credential field is empty.
	#[error("Credential field `{field}` must not be empty.")]
	MissingCredential {
		/// Name of the empty field.
		field: &'static str,
	},
	/// Neither OAuth2 nor basic-auth credentials were supplied.
	#[error("An authentication method must be configured.")]
	MissingAuthMethod,
	/// Target host cannot be turned into a base URL.
	#[error("Target FQDN `{fqdn}` is invalid.")]
	InvalidFqdn {
		/// Rejected input.
		fqdn: String,
		/// Underlying parsing failure, when the input was parsed as a URL.
		#[source]
		source: Option<url::ParseError>,
	},
	/// Endpoint cannot be appended to the base URL.
	#[error("Endpoint `{endpoint}` does not form a valid URL.")]
	InvalidEndpoint {
		/// Rejected endpoint.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Buffer period must be zero or positive.
	#[error("Buffer period must not be negative.")]
	NegativeBufferPeriod,
	/// Affinity probing timeout must be zero or positive.
	#[error("Affinity timeout must not be negative.")]
	NegativeAffinityTimeout,
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] ::http::Error),
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Identity endpoint responses that cannot produce a usable token.
#[derive(Debug, ThisError)]
pub enum AuthProtocolError {
	/// Endpoint returned a non-2xx status.
	#[error("The {flow} endpoint returned HTTP {status}.")]
	UnexpectedStatus {
		/// Exchange that failed.
		flow: FlowKind,
		/// HTTP status code.
		status: u16,
		/// Truncated response body; empty when sensitive data is hidden.
		body_preview: String,
	},
	/// Endpoint responded with JSON that does not match the expected shape.
	#[error("The {flow} endpoint returned a malformed response.")]
	MalformedResponse {
		/// Exchange that failed.
		flow: FlowKind,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Endpoint returned an empty token field.
	#[error("The {flow} endpoint returned an empty access token.")]
	EmptyToken {
		/// Exchange that failed.
		flow: FlowKind,
	},
	/// Reported lifetime cannot be represented.
	#[error("The {flow} endpoint returned an expiry outside the supported range.")]
	ExpiryOutOfRange {
		/// Exchange that failed.
		flow: FlowKind,
	},
	/// Token contains characters that cannot be carried in an HTTP header.
	#[error("The {flow} endpoint returned a token that is not a valid header value.")]
	InvalidTokenCharacters {
		/// Exchange that minted the token.
		flow: FlowKind,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred during the {flow} request.")]
	Network {
		/// Operation that was in flight.
		flow: FlowKind,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error raised during `flow`.
	pub fn network(flow: FlowKind, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { flow, source: Box::new(src) }
	}

	/// Operation that was in flight when the transport failed.
	pub fn flow(&self) -> FlowKind {
		match self {
			Self::Network { flow, .. } => *flow,
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn only_configuration_errors_are_fatal() {
		let config: Error = ConfigError::BufferExceedsLifetime {
			buffer: Duration::minutes(10),
			lifetime: Duration::seconds(60),
		}
		.into();
		let protocol: Error =
			AuthProtocolError::EmptyToken { flow: FlowKind::ClientCredentials }.into();

		assert!(config.is_fatal());
		assert!(!protocol.is_fatal());
		assert_eq!(
			protocol.to_string(),
			"The client_credentials endpoint returned an empty access token."
		);
	}
}
