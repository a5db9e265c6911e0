//! Multi-node Ethereum beacon client.
//!
//! Fronts a fleet of consensus-layer nodes behind a single client surface.
//! Reads fail over between nodes with affinity to the last one that
//! responded, sync status is reduced concurrently across the fleet, block
//! publication races every node and reports the first acceptance, and
//! server-sent event streams are merged into one consumer channel.
//!
//! ## Components
//!
//! - **node**: the per-node operation contract ([`BeaconNode`])
//! - **http**: REST/SSE implementation of the contract ([`HttpBeaconNode`])
//! - **multi**: the multi-node client ([`MultiBeaconClient`])
//! - **types**: beacon API payloads
//! - **error**: error types

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod error;
pub mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod multi;
pub mod node;
pub mod types;

pub use error::BeaconClientError;
pub use http::HttpBeaconNode;
pub use multi::MultiBeaconClient;
pub use node::BeaconNode;
