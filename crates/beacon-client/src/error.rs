//! Error types for the beacon client.

use thiserror::Error;

/// Errors produced by the beacon client layers.
///
/// Per-node failures (`Request`, `Api`, `Decode`) are logged by the
/// multi-node client and folded into the terminal variants; callers only ever
/// see the terminal kinds.
#[derive(Debug, Error)]
pub enum BeaconClientError {
    /// No beacon node reported a finished sync and syncing nodes are not
    /// accepted.
    #[error("beacon node is syncing or unavailable")]
    NodeSyncing,

    /// Every beacon node failed a read. Carries the last node's error.
    #[error("all beacon nodes responded with error")]
    AllNodesFailed {
        #[source]
        last: Option<Box<BeaconClientError>>,
    },

    /// The block was broadcast but failed validation (HTTP 202).
    #[error("beacon block failed validation but was still broadcast (202)")]
    BlockFailedValidation,

    /// The chain has not reached the capella fork, so withdrawals do not
    /// exist yet. Not a transport failure.
    #[error("withdrawals are not supported before capella")]
    WithdrawalsBeforeCapella,

    /// Block publication failed on every beacon node. `status` is the HTTP
    /// status of the last outcome collected.
    #[error("failed to publish block on any beacon node (last status {status})")]
    PublishFailed {
        status: u16,
        #[source]
        last: Option<Box<BeaconClientError>>,
    },

    /// Transport-level failure talking to a beacon node.
    #[error("beacon node request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx response from a beacon node, with the response body text.
    #[error("beacon node responded with status {status}: {message}")]
    Api { status: u16, message: String },

    /// A response body that did not match the expected payload shape.
    #[error("failed to decode beacon node response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BeaconClientError {
    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Request(err) => err.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BeaconClientError>;
