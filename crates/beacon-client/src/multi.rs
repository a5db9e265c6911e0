//! Multi-node beacon client.
//!
//! Owns an ordered fleet of beacon nodes and dispatches every operation with
//! one of three strategies: sequential failover with affinity to the last
//! node that responded (reads), a concurrent reduction (sync status), or a
//! first-success race (block publication). Event subscriptions fan in from
//! every node onto the caller's channel.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures::{
    FutureExt as _,
    future::{self, BoxFuture},
};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, info, warn};

use crate::{
    error::{BeaconClientError, Result},
    node::BeaconNode,
    types::{
        BlockResponse, BlsPublicKey, ChainSpec, ExpectedWithdrawals, ForkScheduleEntry,
        GenesisInfo, HeadEvent, PayloadAttributesEvent, ProposerDutiesResponse, RandaoInfo,
        SignedBeaconBlock, SyncStatus, ValidatorResponseEntry,
    },
};

/// Error text nodes return when asked for withdrawals before the capella
/// fork is active.
const WITHDRAWALS_NOT_ENABLED: &str = "Withdrawals not enabled before capella";

fn is_pre_capella(err: &BeaconClientError) -> bool {
    err.to_string().contains(WITHDRAWALS_NOT_ENABLED)
}

/// The node list for one dispatch, with the preferred node swapped to the
/// front. Positions other than the front and the swapped slot keep their
/// configured order.
struct RotatedNodes<N> {
    nodes: Vec<Arc<N>>,
    rotation: usize,
}

impl<N> RotatedNodes<N> {
    /// Maps a position in the rotated order back to the configured order.
    /// The swap is its own inverse: the front and the swapped slot exchange,
    /// every other position is unchanged.
    fn source_index(&self, view_index: usize) -> usize {
        if view_index == 0 {
            self.rotation
        } else if view_index == self.rotation {
            0
        } else {
            view_index
        }
    }
}

/// Outcome of one node's publish attempt, as collected by the race.
struct PublishOutcome {
    index: usize,
    code: u16,
    err: Option<BeaconClientError>,
}

/// A fleet of beacon nodes behind a single client surface.
///
/// Reads stick to the node that served the last success and fail over
/// through the rest in configured order. Block publication races every node
/// and reports the first acceptance. Event subscriptions merge every node's
/// stream onto one channel, so consumers see each logical event once per
/// node and must tolerate the replays.
pub struct MultiBeaconClient<N> {
    nodes: Vec<Arc<N>>,
    /// Configured-order index of the node behind the most recent success.
    preferred: AtomicUsize,
    allow_syncing: bool,
}

impl<N: BeaconNode> MultiBeaconClient<N> {
    /// Creates a client over `nodes`, in operator priority order. The list
    /// is fixed for the lifetime of the client.
    ///
    /// Reads the `ALLOW_SYNCING_BEACON_NODE` environment variable: when set
    /// and non-empty, a syncing node's status becomes an acceptable
    /// [`best_sync_status`](Self::best_sync_status) answer.
    pub fn new(nodes: Vec<Arc<N>>) -> Self {
        let allow_syncing =
            std::env::var("ALLOW_SYNCING_BEACON_NODE").is_ok_and(|value| !value.is_empty());
        if allow_syncing {
            warn!("env: ALLOW_SYNCING_BEACON_NODE: allowing syncing beacon nodes");
        }

        Self {
            nodes,
            preferred: AtomicUsize::new(0),
            allow_syncing,
        }
    }

    /// Overrides the syncing-node policy regardless of the environment.
    pub fn with_allow_syncing(mut self, allow_syncing: bool) -> Self {
        self.allow_syncing = allow_syncing;
        self
    }

    /// Configured-order position of the node currently preferred by reads.
    /// Informational, for operator-facing output.
    pub fn preferred_index(&self) -> usize {
        self.preferred.load(Ordering::Relaxed)
    }

    /// The nodes with the preferred one swapped to the front, on a fresh
    /// copy; the configured list itself is never reordered.
    fn nodes_by_last_response(&self) -> RotatedNodes<N> {
        let rotation = self.preferred.load(Ordering::Relaxed);
        let mut nodes = self.nodes.clone();
        if rotation != 0 {
            nodes.swap(0, rotation);
        }
        RotatedNodes { nodes, rotation }
    }

    /// Queries every node concurrently and reduces to a single sync status.
    ///
    /// A node that has finished syncing wins over any syncing one and locks
    /// the reduction; otherwise the first status to arrive stands. Does not
    /// move read affinity: this is a health probe, not a data read.
    pub async fn best_sync_status(&self) -> Result<SyncStatus> {
        struct Reduction {
            best: Option<SyncStatus>,
            found_synced: bool,
        }

        let reduction = Arc::new(Mutex::new(Reduction {
            best: None,
            found_synced: false,
        }));

        let mut tasks = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let node = Arc::clone(node);
            let reduction = Arc::clone(&reduction);
            tasks.push(tokio::spawn(async move {
                debug!(uri = %node.uri(), "getting sync status");
                let status = match node.sync_status().await {
                    Ok(status) => status,
                    Err(err) => {
                        error!(uri = %node.uri(), error = %err, "failed to get sync status");
                        return;
                    }
                };

                let mut reduction = reduction.lock().await;
                if reduction.found_synced {
                    return;
                }
                if reduction.best.is_none() {
                    reduction.best = Some(status.clone());
                }
                if !status.is_syncing {
                    reduction.best = Some(status);
                    reduction.found_synced = true;
                }
            }));
        }
        future::join_all(tasks).await;

        let mut reduction = reduction.lock().await;
        if !reduction.found_synced && !self.allow_syncing {
            return Err(BeaconClientError::NodeSyncing);
        }
        reduction
            .best
            .take()
            .ok_or(BeaconClientError::AllNodesFailed { last: None })
    }

    /// Merges `head` events from every node into `events`. A single head
    /// will arrive once per node; consumers must be idempotent.
    ///
    /// The channel is owned by the caller and is never closed from here;
    /// its capacity is the only backpressure applied to the node streams.
    pub fn subscribe_to_head_events(&self, events: mpsc::Sender<HeadEvent>) {
        for node in &self.nodes {
            let node = Arc::clone(node);
            let events = events.clone();
            tokio::spawn(async move {
                node.subscribe_to_head_events(events).await;
            });
        }
    }

    /// Merges `payload_attributes` events from every node into `events`,
    /// with the same replay semantics as head events.
    pub fn subscribe_to_payload_attributes_events(
        &self,
        events: mpsc::Sender<PayloadAttributesEvent>,
    ) {
        for node in &self.nodes {
            let node = Arc::clone(node);
            let events = events.clone();
            tokio::spawn(async move {
                node.subscribe_to_payload_attributes_events(events).await;
            });
        }
    }

    /// Awaits one request per node of the rotated view in order, returning
    /// the first success and folding every failure into the terminal error.
    /// `update_affinity` moves the preferred index to the winner, mapped
    /// back to the configured order.
    ///
    /// `requests[i]` must be the pending call against `rotated.nodes[i]`;
    /// requests past the first success are dropped without being polled.
    async fn failover<'a, T>(
        &self,
        op: &'static str,
        update_affinity: bool,
        rotated: &'a RotatedNodes<N>,
        requests: Vec<BoxFuture<'a, Result<T>>>,
    ) -> Result<T> {
        let mut last_error = None;

        for (index, request) in requests.into_iter().enumerate() {
            let node = &rotated.nodes[index];
            debug!(uri = %node.uri(), op, "querying beacon node");
            match request.await {
                Ok(value) => {
                    if update_affinity {
                        self.preferred
                            .store(rotated.source_index(index), Ordering::Relaxed);
                    }
                    return Ok(value);
                }
                Err(err) => {
                    warn!(uri = %node.uri(), op, error = %err, "beacon node request failed");
                    last_error = Some(err);
                }
            }
        }

        error!(op, "request failed on all beacon nodes");
        Err(BeaconClientError::AllNodesFailed {
            last: last_error.map(Box::new),
        })
    }

    /// Active and pending validators of the given state, keyed by pubkey,
    /// from the first node that answers.
    pub async fn get_state_validators(
        &self,
        state_id: &str,
    ) -> Result<HashMap<BlsPublicKey, ValidatorResponseEntry>> {
        let rotated = self.nodes_by_last_response();
        let requests = rotated
            .nodes
            .iter()
            .map(|node| node.get_state_validators(state_id).boxed())
            .collect();
        self.failover("state validators", true, &rotated, requests)
            .await
    }

    pub async fn get_proposer_duties(&self, epoch: u64) -> Result<ProposerDutiesResponse> {
        let rotated = self.nodes_by_last_response();
        let requests = rotated
            .nodes
            .iter()
            .map(|node| node.get_proposer_duties(epoch).boxed())
            .collect();
        self.failover("proposer duties", true, &rotated, requests)
            .await
    }

    pub async fn get_genesis(&self) -> Result<GenesisInfo> {
        let rotated = self.nodes_by_last_response();
        let requests = rotated
            .nodes
            .iter()
            .map(|node| node.get_genesis().boxed())
            .collect();
        self.failover("genesis info", true, &rotated, requests).await
    }

    /// Chain configuration from the first node that answers. Does not move
    /// read affinity.
    pub async fn get_spec(&self) -> Result<ChainSpec> {
        let rotated = self.nodes_by_last_response();
        let requests = rotated
            .nodes
            .iter()
            .map(|node| node.get_spec().boxed())
            .collect();
        self.failover("spec", false, &rotated, requests).await
    }

    pub async fn get_fork_schedule(&self) -> Result<Vec<ForkScheduleEntry>> {
        let rotated = self.nodes_by_last_response();
        let requests = rotated
            .nodes
            .iter()
            .map(|node| node.get_fork_schedule().boxed())
            .collect();
        self.failover("fork schedule", true, &rotated, requests)
            .await
    }

    /// A block by id (`head`, a slot, or a root) from the first node that
    /// answers. Does not move read affinity.
    pub async fn get_block(&self, block_id: &str) -> Result<BlockResponse> {
        let rotated = self.nodes_by_last_response();
        let requests = rotated
            .nodes
            .iter()
            .map(|node| node.get_block(block_id).boxed())
            .collect();
        self.failover("block", false, &rotated, requests).await
    }

    pub async fn get_randao(&self, slot: u64) -> Result<RandaoInfo> {
        let rotated = self.nodes_by_last_response();
        let requests = rotated
            .nodes
            .iter()
            .map(|node| node.get_randao(slot).boxed())
            .collect();
        self.failover("randao", true, &rotated, requests).await
    }

    /// Expected withdrawals at `slot` from the first node that answers.
    ///
    /// A node reporting that the capella fork is not active yet ends the
    /// failover immediately: every other node is on the same chain, so the
    /// answer cannot differ.
    pub async fn get_withdrawals(&self, slot: u64) -> Result<ExpectedWithdrawals> {
        let rotated = self.nodes_by_last_response();
        let mut last_error: Option<BeaconClientError> = None;

        for (index, node) in rotated.nodes.iter().enumerate() {
            match node.get_withdrawals(slot).await {
                Ok(withdrawals) => {
                    self.preferred
                        .store(rotated.source_index(index), Ordering::Relaxed);
                    return Ok(withdrawals);
                }
                Err(err) => {
                    let stop = is_pre_capella(&err);
                    if !stop {
                        warn!(uri = %node.uri(), slot, error = %err, "failed to get withdrawals");
                    }
                    last_error = Some(err);
                    if stop {
                        break;
                    }
                }
            }
        }

        match last_error {
            Some(err) if is_pre_capella(&err) => {
                debug!(slot, error = %err, "withdrawals not available, capella not reached");
                Err(BeaconClientError::WithdrawalsBeforeCapella)
            }
            last => {
                warn!(slot, "failed to get withdrawals from any beacon node");
                Err(BeaconClientError::AllNodesFailed {
                    last: last.map(Box::new),
                })
            }
        }
    }

    /// Publishes `block` to every node at once and returns the first
    /// acceptance.
    ///
    /// A 202 means the node broadcast the block but failed to validate it;
    /// it never wins the race, but the race keeps going in case another node
    /// accepts outright. The result channel is sized to the fleet so nodes
    /// that finish after the first acceptance never block on it.
    pub async fn publish_block(&self, block: &SignedBeaconBlock) -> Result<u16> {
        let slot = block.slot();
        let block_hash = block.block_hash();
        let rotated = self.nodes_by_last_response();

        let (outcomes_tx, mut outcomes_rx) = mpsc::channel(rotated.nodes.len());
        let block = Arc::new(block.clone());

        for (index, node) in rotated.nodes.iter().enumerate() {
            let node = Arc::clone(node);
            let block = Arc::clone(&block);
            let outcomes_tx = outcomes_tx.clone();
            tokio::spawn(async move {
                debug!(uri = %node.uri(), slot, "publishing block");
                let outcome = match node.publish_block(&block).await {
                    Ok(code) => PublishOutcome {
                        index,
                        code,
                        err: None,
                    },
                    Err(err) => PublishOutcome {
                        index,
                        code: err.status().unwrap_or(0),
                        err: Some(err),
                    },
                };
                let _ = outcomes_tx.send(outcome).await;
            });
        }
        drop(outcomes_tx);

        let mut last_failure: Option<PublishOutcome> = None;
        for _ in 0..rotated.nodes.len() {
            let Some(outcome) = outcomes_rx.recv().await else {
                break;
            };
            let uri = rotated.nodes[outcome.index].uri();

            if let Some(err) = &outcome.err {
                warn!(uri = %uri, slot, %block_hash, status = outcome.code, error = %err, "failed to publish block");
                last_failure = Some(outcome);
                continue;
            }
            if outcome.code == 202 {
                error!(uri = %uri, slot, %block_hash, "block failed validation but was still broadcast");
                last_failure = Some(PublishOutcome {
                    err: Some(BeaconClientError::BlockFailedValidation),
                    ..outcome
                });
                continue;
            }

            self.preferred
                .store(rotated.source_index(outcome.index), Ordering::Relaxed);
            info!(uri = %uri, slot, %block_hash, status = outcome.code, "published block");
            return Ok(outcome.code);
        }

        error!(slot, %block_hash, "failed to publish block on any beacon node");
        let (status, last) = match last_failure {
            Some(outcome) => (outcome.code, outcome.err.map(Box::new)),
            None => (0, None),
        };
        Err(BeaconClientError::PublishFailed { status, last })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy_primitives::B256;

    use super::*;
    use crate::{mock::MockBeaconNode, types::PayloadAttributesEventData};

    fn fleet(nodes: Vec<MockBeaconNode>) -> (MultiBeaconClient<MockBeaconNode>, Vec<Arc<MockBeaconNode>>) {
        let nodes: Vec<Arc<MockBeaconNode>> = nodes.into_iter().map(Arc::new).collect();
        let client = MultiBeaconClient::new(nodes.clone()).with_allow_syncing(false);
        (client, nodes)
    }

    fn signed_block() -> SignedBeaconBlock {
        SignedBeaconBlock::new(
            100,
            B256::repeat_byte(0xab),
            serde_json::json!({"message": {"slot": "100"}}),
        )
    }

    #[test]
    fn rotation_swaps_preferred_to_front() {
        let (client, nodes) = fleet(vec![
            MockBeaconNode::new("http://beacon-0"),
            MockBeaconNode::new("http://beacon-1"),
            MockBeaconNode::new("http://beacon-2"),
        ]);

        let rotated = client.nodes_by_last_response();
        assert!(Arc::ptr_eq(&rotated.nodes[0], &nodes[0]));

        client.preferred.store(2, Ordering::Relaxed);
        let rotated = client.nodes_by_last_response();
        assert!(Arc::ptr_eq(&rotated.nodes[0], &nodes[2]));
        assert!(Arc::ptr_eq(&rotated.nodes[1], &nodes[1]));
        assert!(Arc::ptr_eq(&rotated.nodes[2], &nodes[0]));

        // mapping back through the swap is involutive
        assert_eq!(rotated.source_index(0), 2);
        assert_eq!(rotated.source_index(1), 1);
        assert_eq!(rotated.source_index(2), 0);
    }

    #[tokio::test]
    async fn affinity_seeds_and_sticks() {
        let mut failing = MockBeaconNode::new("http://beacon-0");
        failing.genesis = Err((500, "boom".into()));
        let (client, nodes) = fleet(vec![
            failing,
            MockBeaconNode::new("http://beacon-1"),
            MockBeaconNode::new("http://beacon-2"),
        ]);

        client.get_genesis().await.unwrap();
        assert_eq!(client.preferred_index(), 1);

        // second dispatch tries the preferred node first and keeps it
        client.get_genesis().await.unwrap();
        assert_eq!(client.preferred_index(), 1);
        assert_eq!(nodes[0].call_count("get_genesis"), 1);
        assert_eq!(nodes[1].call_count("get_genesis"), 2);
        assert_eq!(nodes[2].call_count("get_genesis"), 0);
    }

    #[tokio::test]
    async fn affinity_maps_back_from_the_swapped_slot() {
        // preferred = 2 puts beacon-2 in front and beacon-0 at the back of
        // the rotated view; a success at the back must prefer beacon-0, not
        // the slot it was dispatched from
        let mut n1 = MockBeaconNode::new("http://beacon-1");
        let mut n2 = MockBeaconNode::new("http://beacon-2");
        n1.randao = Err((500, "down".into()));
        n2.randao = Err((500, "down".into()));
        let (client, nodes) = fleet(vec![MockBeaconNode::new("http://beacon-0"), n1, n2]);
        client.preferred.store(2, Ordering::Relaxed);

        client.get_randao(1).await.unwrap();
        assert_eq!(client.preferred_index(), 0);
        assert_eq!(nodes[2].call_count("get_randao"), 1);
        assert_eq!(nodes[1].call_count("get_randao"), 1);
        assert_eq!(nodes[0].call_count("get_randao"), 1);

        // the next dispatch tries beacon-0 first
        client.get_randao(2).await.unwrap();
        assert_eq!(nodes[0].call_count("get_randao"), 2);
        assert_eq!(nodes[1].call_count("get_randao"), 1);
    }

    #[tokio::test]
    async fn failover_reaches_the_last_node() {
        let mut n0 = MockBeaconNode::new("http://beacon-0");
        let mut n1 = MockBeaconNode::new("http://beacon-1");
        n0.proposer_duties = Err((500, "down".into()));
        n1.proposer_duties = Err((502, "down".into()));
        let mut n2 = MockBeaconNode::new("http://beacon-2");
        n2.proposer_duties = Ok(ProposerDutiesResponse {
            dependent_root: B256::repeat_byte(0x42),
            data: vec![],
        });
        let (client, _) = fleet(vec![n0, n1, n2]);

        let duties = client.get_proposer_duties(10).await.unwrap();
        assert_eq!(duties.dependent_root, B256::repeat_byte(0x42));
        assert_eq!(client.preferred_index(), 2);
    }

    #[tokio::test]
    async fn all_nodes_failed_carries_last_error() {
        let mut n0 = MockBeaconNode::new("http://beacon-0");
        let mut n1 = MockBeaconNode::new("http://beacon-1");
        n0.genesis = Err((500, "first".into()));
        n1.genesis = Err((503, "second".into()));
        let (client, _) = fleet(vec![n0, n1]);

        let err = client.get_genesis().await.unwrap_err();
        match err {
            BeaconClientError::AllNodesFailed { last: Some(last) } => {
                assert_eq!(last.status(), Some(503));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn spec_and_block_do_not_move_affinity() {
        let mut n0 = MockBeaconNode::new("http://beacon-0");
        n0.spec = Err((500, "down".into()));
        n0.block = Err((500, "down".into()));
        let (client, _) = fleet(vec![n0, MockBeaconNode::new("http://beacon-1")]);

        client.get_spec().await.unwrap();
        assert_eq!(client.preferred_index(), 0);
        client.get_block("head").await.unwrap();
        assert_eq!(client.preferred_index(), 0);
    }

    #[tokio::test]
    async fn sync_status_prefers_synced_node() {
        let mut n0 = MockBeaconNode::new("http://beacon-0");
        n0.sync_status = Ok(SyncStatus {
            head_slot: 50,
            sync_distance: 10,
            is_syncing: true,
        });
        let mut n1 = MockBeaconNode::new("http://beacon-1");
        n1.sync_status = Err((500, "down".into()));
        let mut n2 = MockBeaconNode::new("http://beacon-2");
        n2.sync_status = Ok(SyncStatus {
            head_slot: 100,
            sync_distance: 0,
            is_syncing: false,
        });
        let (client, _) = fleet(vec![n0, n1, n2]);

        let status = client.best_sync_status().await.unwrap();
        assert_eq!(status.head_slot, 100);
        assert!(!status.is_syncing);
        assert_eq!(client.preferred_index(), 0);
    }

    #[tokio::test]
    async fn sync_status_all_syncing_depends_on_flag() {
        fn syncing_fleet() -> Vec<MockBeaconNode> {
            (0..3)
                .map(|i| {
                    let mut node = MockBeaconNode::new(format!("http://beacon-{i}"));
                    node.sync_status = Ok(SyncStatus {
                        head_slot: 10,
                        sync_distance: 90,
                        is_syncing: true,
                    });
                    node
                })
                .collect()
        }

        let (client, _) = fleet(syncing_fleet());
        assert!(matches!(
            client.best_sync_status().await.unwrap_err(),
            BeaconClientError::NodeSyncing
        ));

        let (client, _) = fleet(syncing_fleet());
        let client = client.with_allow_syncing(true);
        let status = client.best_sync_status().await.unwrap();
        assert!(status.is_syncing);
    }

    #[tokio::test]
    async fn sync_status_all_unreachable() {
        let mut n0 = MockBeaconNode::new("http://beacon-0");
        n0.sync_status = Err((500, "down".into()));
        let (client, _) = fleet(vec![n0]);
        let client = client.with_allow_syncing(true);

        assert!(matches!(
            client.best_sync_status().await.unwrap_err(),
            BeaconClientError::AllNodesFailed { last: None }
        ));
    }

    #[tokio::test]
    async fn publish_race_skips_202() {
        let mut n0 = MockBeaconNode::new("http://beacon-0");
        n0.publish = Ok(202);
        n0.publish_delay = Duration::from_millis(10);
        let mut n1 = MockBeaconNode::new("http://beacon-1");
        n1.publish = Ok(200);
        n1.publish_delay = Duration::from_millis(40);
        let mut n2 = MockBeaconNode::new("http://beacon-2");
        n2.publish = Err((500, "down".into()));
        let (client, _) = fleet(vec![n0, n1, n2]);

        let code = client.publish_block(&signed_block()).await.unwrap();
        assert_eq!(code, 200);
        assert_eq!(client.preferred_index(), 1);
    }

    #[tokio::test]
    async fn publish_all_failed_reports_last_outcome() {
        let mut n0 = MockBeaconNode::new("http://beacon-0");
        n0.publish = Err((400, "bad block".into()));
        let mut n1 = MockBeaconNode::new("http://beacon-1");
        n1.publish = Ok(202);
        n1.publish_delay = Duration::from_millis(30);
        let mut n2 = MockBeaconNode::new("http://beacon-2");
        n2.publish = Err((500, "down".into()));
        let (client, _) = fleet(vec![n0, n1, n2]);

        let err = client.publish_block(&signed_block()).await.unwrap_err();
        match err {
            BeaconClientError::PublishFailed { status, last } => {
                assert_eq!(status, 202);
                assert!(matches!(
                    last.as_deref(),
                    Some(BeaconClientError::BlockFailedValidation)
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
        // nothing succeeded, affinity must not move
        assert_eq!(client.preferred_index(), 0);
    }

    #[tokio::test]
    async fn withdrawals_pre_capella_short_circuits() {
        let mut n0 = MockBeaconNode::new("http://beacon-0");
        n0.withdrawals = Err((400, "Withdrawals not enabled before capella".into()));
        let (client, nodes) = fleet(vec![
            n0,
            MockBeaconNode::new("http://beacon-1"),
            MockBeaconNode::new("http://beacon-2"),
        ]);

        let err = client.get_withdrawals(7).await.unwrap_err();
        assert!(matches!(err, BeaconClientError::WithdrawalsBeforeCapella));
        assert_eq!(nodes[0].call_count("get_withdrawals"), 1);
        assert_eq!(nodes[1].call_count("get_withdrawals"), 0);
        assert_eq!(nodes[2].call_count("get_withdrawals"), 0);
    }

    #[tokio::test]
    async fn withdrawals_mixed_failures_stay_all_nodes_failed() {
        let mut n0 = MockBeaconNode::new("http://beacon-0");
        n0.withdrawals = Err((500, "down".into()));
        let mut n1 = MockBeaconNode::new("http://beacon-1");
        n1.withdrawals = Err((502, "also down".into()));
        let (client, _) = fleet(vec![n0, n1]);

        let err = client.get_withdrawals(7).await.unwrap_err();
        match err {
            BeaconClientError::AllNodesFailed { last: Some(last) } => {
                assert_eq!(last.status(), Some(502));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn head_events_fan_in_once_per_node() {
        let event = HeadEvent {
            slot: 5,
            block: B256::repeat_byte(0x01),
            state: B256::repeat_byte(0x02),
        };
        let nodes: Vec<MockBeaconNode> = (0..3)
            .map(|i| {
                let mut node = MockBeaconNode::new(format!("http://beacon-{i}"));
                node.head_events = vec![event.clone()];
                node
            })
            .collect();
        let (client, _) = fleet(nodes);

        let (tx, mut rx) = mpsc::channel(16);
        client.subscribe_to_head_events(tx);

        for _ in 0..3 {
            assert_eq!(rx.recv().await.unwrap(), event);
        }
        // every sender is dropped once the mock streams are drained
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn payload_attributes_events_fan_in_once_per_node() {
        let event = PayloadAttributesEvent {
            version: "capella".to_string(),
            data: PayloadAttributesEventData {
                proposer_index: 1,
                proposal_slot: 9,
                parent_block_number: 8,
                ..Default::default()
            },
        };
        let nodes: Vec<MockBeaconNode> = (0..3)
            .map(|i| {
                let mut node = MockBeaconNode::new(format!("http://beacon-{i}"));
                node.payload_attributes_events = vec![event.clone()];
                node
            })
            .collect();
        let (client, _) = fleet(nodes);

        let (tx, mut rx) = mpsc::channel(16);
        client.subscribe_to_payload_attributes_events(tx);

        for _ in 0..3 {
            assert_eq!(rx.recv().await.unwrap(), event);
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn preferred_index_stays_in_bounds() {
        let mut n0 = MockBeaconNode::new("http://beacon-0");
        n0.genesis = Err((500, "down".into()));
        n0.randao = Err((500, "down".into()));
        let mut n1 = MockBeaconNode::new("http://beacon-1");
        n1.randao = Err((500, "down".into()));
        let (client, _) = fleet(vec![n0, n1, MockBeaconNode::new("http://beacon-2")]);

        client.get_genesis().await.unwrap();
        assert!(client.preferred_index() < 3);
        client.get_randao(1).await.unwrap();
        assert!(client.preferred_index() < 3);
        client.get_genesis().await.unwrap();
        assert!(client.preferred_index() < 3);
    }
}
