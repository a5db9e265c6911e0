//! Contract a single beacon node implements.

use std::{collections::HashMap, future::Future};

use tokio::sync::mpsc;

use crate::{
    error::Result,
    types::{
        BlockResponse, BlsPublicKey, ChainSpec, ExpectedWithdrawals, ForkScheduleEntry,
        GenesisInfo, HeadEvent, PayloadAttributesEvent, ProposerDutiesResponse, RandaoInfo,
        SignedBeaconBlock, SyncStatus, ValidatorResponseEntry,
    },
};

/// Operations one beacon node exposes to the multi-node client.
///
/// In production this is [`HttpBeaconNode`](crate::http::HttpBeaconNode); tests
/// use the programmable [`MockBeaconNode`](crate::mock::MockBeaconNode).
///
/// Error display text must be stable: the multi-node client matches on the
/// node-reported message for the pre-capella withdrawals case.
pub trait BeaconNode: Send + Sync + 'static {
    /// Base endpoint of the node, used in logs.
    fn uri(&self) -> &str;

    fn sync_status(&self) -> impl Future<Output = Result<SyncStatus>> + Send;

    /// Head slot as reported by the node's sync status.
    fn current_slot(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Pushes decoded `head` events into `events` for as long as the stream
    /// and the receiving side are alive.
    fn subscribe_to_head_events(
        &self,
        events: mpsc::Sender<HeadEvent>,
    ) -> impl Future<Output = ()> + Send;

    /// Pushes decoded `payload_attributes` events into `events` for as long
    /// as the stream and the receiving side are alive.
    fn subscribe_to_payload_attributes_events(
        &self,
        events: mpsc::Sender<PayloadAttributesEvent>,
    ) -> impl Future<Output = ()> + Send;

    /// Active and pending validators of the given state, keyed by pubkey.
    fn get_state_validators(
        &self,
        state_id: &str,
    ) -> impl Future<Output = Result<HashMap<BlsPublicKey, ValidatorResponseEntry>>> + Send;

    fn get_proposer_duties(
        &self,
        epoch: u64,
    ) -> impl Future<Output = Result<ProposerDutiesResponse>> + Send;

    fn get_genesis(&self) -> impl Future<Output = Result<GenesisInfo>> + Send;

    fn get_spec(&self) -> impl Future<Output = Result<ChainSpec>> + Send;

    fn get_fork_schedule(&self) -> impl Future<Output = Result<Vec<ForkScheduleEntry>>> + Send;

    fn get_block(&self, block_id: &str) -> impl Future<Output = Result<BlockResponse>> + Send;

    fn get_randao(&self, slot: u64) -> impl Future<Output = Result<RandaoInfo>> + Send;

    fn get_withdrawals(
        &self,
        slot: u64,
    ) -> impl Future<Output = Result<ExpectedWithdrawals>> + Send;

    /// Publishes a signed block. Any 2xx status is returned as `Ok`, 202
    /// included; the multi-node client is the layer that classifies 202 as
    /// broadcast-but-invalid.
    fn publish_block(&self, block: &SignedBeaconBlock) -> impl Future<Output = Result<u16>> + Send;
}
