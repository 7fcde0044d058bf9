//! Error types of the request engine.

use thiserror::Error;

/// Errors detected while validating the workload configuration.
///
/// These are fatal: a requester with an invalid configuration never starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The cumulative operation thresholds are not well-formed.
    #[error("invalid operation mix: {0}")]
    OperationMix(String),

    /// Node operations have a non-zero probability, but no node store was supplied.
    #[error("node store not provided but node operations have non-zero probability")]
    MissingNodeStore,

    /// Node operations have a non-zero probability, but no node access distribution was
    /// configured.
    #[error("node access distribution not configured but node operations have non-zero probability")]
    MissingNodeDistribution,

    /// A distribution identifier does not name a registered distribution.
    #[error("unknown distribution `{0}`")]
    UnknownDistribution(String),

    /// A distribution could not be built from its parameters.
    #[error("invalid parameters for distribution `{name}`: {reason}")]
    InvalidDistribution {
        /// The distribution identifier.
        name: String,
        /// Why the parameters were rejected.
        reason: String,
    },

    /// The configured id range is empty.
    #[error("empty id range [{start}, {max})")]
    EmptyIdRange {
        /// The first id of the range.
        start: i64,
        /// One past the last id of the range.
        max: i64,
    },

    /// The requester index is outside of `0..requesters`.
    #[error("bad requester id {id}/{requesters}")]
    BadRequesterId {
        /// The requester index.
        id: usize,
        /// The total number of requesters.
        requesters: usize,
    },
}

/// Errors returned by store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be initialized for a requester.
    #[error("store initialization failed: {0}")]
    Initialization(String),

    /// A single store operation failed. The requester counts it and carries on.
    #[error("{0}")]
    Operation(String),

    /// I/O errors while talking to the store.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error stemming from a store implementation.
    #[error("store error: {context}")]
    Generic {
        /// What the store was doing.
        context: String,
        /// The underlying error.
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that prevent a requester from running.
#[derive(Debug, Error)]
pub enum RequesterError {
    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A store failed to initialize.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A requester task panicked or was cancelled.
    #[error("requester task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
