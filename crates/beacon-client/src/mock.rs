//! Programmable beacon node for tests.

use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use tokio::sync::mpsc;

use crate::{
    error::{BeaconClientError, Result},
    node::BeaconNode,
    types::{
        BlockResponse, BlsPublicKey, ChainSpec, ExpectedWithdrawals, ForkScheduleEntry,
        GenesisInfo, HeadEvent, PayloadAttributesEvent, ProposerDutiesResponse, RandaoInfo,
        SignedBeaconBlock, SyncStatus, ValidatorResponseEntry,
    },
};

/// Canned outcome for one operation: a payload, or a `(status, message)`
/// pair surfaced as [`BeaconClientError::Api`]. Expressing errors as node
/// response text keeps message-matching paths (the capella withdrawals
/// case) testable.
pub type MockResponse<T> = std::result::Result<T, (u16, String)>;

/// A beacon node whose responses are fixed up front.
///
/// Every operation is counted, so tests can assert dispatch order and
/// short-circuits. Configure the public fields before sharing the node.
pub struct MockBeaconNode {
    uri: String,
    pub sync_status: MockResponse<SyncStatus>,
    pub state_validators: MockResponse<HashMap<BlsPublicKey, ValidatorResponseEntry>>,
    pub proposer_duties: MockResponse<ProposerDutiesResponse>,
    pub genesis: MockResponse<GenesisInfo>,
    pub spec: MockResponse<ChainSpec>,
    pub fork_schedule: MockResponse<Vec<ForkScheduleEntry>>,
    pub block: MockResponse<BlockResponse>,
    pub randao: MockResponse<RandaoInfo>,
    pub withdrawals: MockResponse<ExpectedWithdrawals>,
    /// Returned as-is, 202 included.
    pub publish: MockResponse<u16>,
    /// Applied before the publish response, for racing tests.
    pub publish_delay: Duration,
    /// Sent into the subscriber channel, then the stream ends.
    pub head_events: Vec<HeadEvent>,
    pub payload_attributes_events: Vec<PayloadAttributesEvent>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MockBeaconNode {
    /// A node that answers every operation with default payloads and
    /// publishes with 200.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            sync_status: Ok(SyncStatus::default()),
            state_validators: Ok(HashMap::new()),
            proposer_duties: Ok(ProposerDutiesResponse::default()),
            genesis: Ok(GenesisInfo::default()),
            spec: Ok(ChainSpec::default()),
            fork_schedule: Ok(Vec::new()),
            block: Ok(BlockResponse::default()),
            randao: Ok(RandaoInfo::default()),
            withdrawals: Ok(ExpectedWithdrawals::default()),
            publish: Ok(200),
            publish_delay: Duration::ZERO,
            head_events: Vec::new(),
            payload_attributes_events: Vec::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// How many times `op` (the trait method name) has been invoked.
    pub fn call_count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .expect("mock call log poisoned")
            .get(op)
            .copied()
            .unwrap_or(0)
    }

    fn record(&self, op: &'static str) {
        *self
            .calls
            .lock()
            .expect("mock call log poisoned")
            .entry(op)
            .or_insert(0) += 1;
    }

    fn respond<T: Clone>(&self, op: &'static str, response: &MockResponse<T>) -> Result<T> {
        self.record(op);
        match response {
            Ok(value) => Ok(value.clone()),
            Err((status, message)) => Err(BeaconClientError::Api {
                status: *status,
                message: message.clone(),
            }),
        }
    }
}

impl BeaconNode for MockBeaconNode {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn sync_status(&self) -> Result<SyncStatus> {
        self.respond("sync_status", &self.sync_status)
    }

    async fn current_slot(&self) -> Result<u64> {
        Ok(self.respond("current_slot", &self.sync_status)?.head_slot)
    }

    async fn subscribe_to_head_events(&self, events: mpsc::Sender<HeadEvent>) {
        self.record("subscribe_to_head_events");
        for event in self.head_events.clone() {
            if events.send(event).await.is_err() {
                return;
            }
        }
    }

    async fn subscribe_to_payload_attributes_events(
        &self,
        events: mpsc::Sender<PayloadAttributesEvent>,
    ) {
        self.record("subscribe_to_payload_attributes_events");
        for event in self.payload_attributes_events.clone() {
            if events.send(event).await.is_err() {
                return;
            }
        }
    }

    async fn get_state_validators(
        &self,
        _state_id: &str,
    ) -> Result<HashMap<BlsPublicKey, ValidatorResponseEntry>> {
        self.respond("get_state_validators", &self.state_validators)
    }

    async fn get_proposer_duties(&self, _epoch: u64) -> Result<ProposerDutiesResponse> {
        self.respond("get_proposer_duties", &self.proposer_duties)
    }

    async fn get_genesis(&self) -> Result<GenesisInfo> {
        self.respond("get_genesis", &self.genesis)
    }

    async fn get_spec(&self) -> Result<ChainSpec> {
        self.respond("get_spec", &self.spec)
    }

    async fn get_fork_schedule(&self) -> Result<Vec<ForkScheduleEntry>> {
        self.respond("get_fork_schedule", &self.fork_schedule)
    }

    async fn get_block(&self, _block_id: &str) -> Result<BlockResponse> {
        self.respond("get_block", &self.block)
    }

    async fn get_randao(&self, _slot: u64) -> Result<RandaoInfo> {
        self.respond("get_randao", &self.randao)
    }

    async fn get_withdrawals(&self, _slot: u64) -> Result<ExpectedWithdrawals> {
        self.respond("get_withdrawals", &self.withdrawals)
    }

    async fn publish_block(&self, _block: &SignedBeaconBlock) -> Result<u16> {
        let response = self.respond("publish_block", &self.publish);
        if !self.publish_delay.is_zero() {
            tokio::time::sleep(self.publish_delay).await;
        }
        response
    }
}
