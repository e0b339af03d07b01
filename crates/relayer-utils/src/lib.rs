// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Metrics functionality
pub mod metric;
/// A module used for debugging relayer lifecycle, sync state, or other relayer state.
pub mod probe;
/// Retry functionality
pub mod retry;

/// An enum of all possible errors that could be encountered during the execution of the Bridge
/// Relayer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An Io error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON Error occurred.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Config loading error.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// Error while iterating over a glob pattern.
    #[error(transparent)]
    GlobPattern(#[from] glob::PatternError),
    /// Error from Glob Iterator.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),
    /// Error while parsing a URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),
    /// Error in the underlying Http server.
    #[error(transparent)]
    Axum(#[from] axum::Error),
    /// HTTP Error
    #[error(transparent)]
    Hyper(#[from] hyper::Error),
    /// Reqwest error
    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
    /// Prometheus error.
    #[error(transparent)]
    PrometheusError(#[from] prometheus::Error),
    /// Hex decoding error.
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
    /// Generic error.
    #[error("{}", _0)]
    Generic(&'static str),
    /// Error while parsing the config files.
    #[error("Config parse error: {}", _0)]
    ParseConfig(#[from] serde_path_to_error::Error<config::ConfigError>),
    /// The source chain node answered a JSON-RPC call with an error object.
    #[error("Source chain RPC `{method}` failed: {message}")]
    ChainRpc {
        /// The RPC method that failed.
        method: String,
        /// The error reported by the node.
        message: String,
    },
    /// The source chain does not know a block at this height (yet).
    #[error("Block not found at height #{}", _0)]
    BlockNotFound(u64),
    /// The destination rejected a bridge submission.
    #[error("Destination submit failed {status}: {body}")]
    Submission {
        /// HTTP status code returned by the destination.
        status: u16,
        /// Raw response body, as returned by the destination.
        body: String,
    },
    /// The relayer checkpoint could not be persisted or loaded.
    #[error("Checkpoint persistence failed: {}", _0)]
    Persistence(String),
    /// A public key given for envelope encryption is not a valid SEC1 point.
    #[error("Invalid recipient public key: {}", _0)]
    InvalidPublicKey(String),
    /// Envelope encryption failed.
    #[error("Envelope encryption failed")]
    EnvelopeEncryption,
    /// Missing Secrets in the config, such as the envelope key.
    #[error("Missing required secret `{}` in the config", _0)]
    MissingSecrets(&'static str),
    /// A setting required by the selected clients is missing from the config.
    #[error("Missing required setting `{}` in the config", _0)]
    MissingConfig(&'static str),
    /// a background task failed and stopped Abnormally.
    #[error("Task Stopped Apnormally")]
    TaskStoppedAbnormally,
    /// A relayer instance is already running.
    #[error("Relayer is already running")]
    AlreadyRunning,
    /// There is no relayer instance running.
    #[error("Relayer is not running")]
    NotRunning,
}

/// A type alias for the result for bridge relayer, that uses the `Error` enum.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error is a transient infrastructure failure that could
    /// go away on its own if the operation is retried later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Reqwest(_)
                | Error::Hyper(_)
                | Error::ChainRpc { .. }
                | Error::BlockNotFound(_)
                | Error::Submission { .. }
        )
    }
}

impl From<Error> for HandlerError {
    fn from(value: Error) -> Self {
        let status = match value {
            Error::AlreadyRunning => StatusCode::CONFLICT,
            Error::NotRunning => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HandlerError(status, value.to_string())
    }
}

/// Error type for HTTP handlers
#[derive(Debug)]
pub struct HandlerError(
    /// HTTP status code for response
    pub StatusCode,
    /// Response message
    pub String,
);

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let body = axum::Json(serde_json::json!({ "error": self.1 }));
        (self.0, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_errors_map_to_http_status() {
        let HandlerError(status, msg) = Error::AlreadyRunning.into();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(msg, "Relayer is already running");

        let HandlerError(status, _) = Error::NotRunning.into();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let HandlerError(status, _) =
            Error::Persistence("disk full".into()).into();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn submission_error_carries_status_and_body() {
        let e = Error::Submission {
            status: 503,
            body: "node syncing".into(),
        };
        assert_eq!(e.to_string(), "Destination submit failed 503: node syncing");
        assert!(e.is_transient());
        assert!(!Error::Persistence("x".into()).is_transient());
    }
}
