use crate::transport::TransportError;
use rox_core::errors::UsageError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures while navigating hal+json link relations.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("server responded with unexpected status code {status} (response: {body})")]
    UnexpectedStatus { status: u16, body: String },

    #[error("expected hal+json response to be valid JSON: {message} (response: {body})")]
    InvalidJson { message: String, body: String },

    #[error("expected hal+json response to have a \"_links\" property (response: {body})")]
    MissingLinks { body: String },

    #[error("expected hal+json response to have link \"{rel}\" (response links: {links})")]
    MissingRelation { rel: String, links: String },

    #[error("expected link {rel} in hal+json response to have an \"href\" property (link: {link})")]
    MissingHref { rel: String, link: String },

    #[error("no link relation given to resolve")]
    EmptyRelationChain,
}

/// Failures while publishing a test run.
///
/// Validation problems never appear here; they are returned in
/// [`crate::client::ProcessOutcome::errors`].
#[derive(Debug, Error)]
pub enum PublishError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The upload itself (after link resolution) came back with a status
    /// other than 202 Accepted.
    #[error("server responded with unexpected status code {status} (response: {body})")]
    UnexpectedStatus { status: u16, body: String },

    #[error("no server is selected or its API URL is not configured")]
    ServerNotConfigured,

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("failed to serialize payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write payload cache at {path}: {source}")]
    Cache {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
