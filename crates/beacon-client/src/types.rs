//! Beacon API payloads.
//!
//! Only the fields the relay consumes are modeled; unknown fields are
//! ignored on decode. Slot, epoch and index values travel as decimal strings
//! on the wire (`quoted_u64`), roots and keys as 0x-prefixed hex.

use std::collections::HashMap;

use alloy_primitives::{Address, B256, FixedBytes};
use serde::{Deserialize, Serialize};

/// BLS public key identifying a validator.
pub type BlsPublicKey = FixedBytes<48>;

/// BLS signature over a beacon object.
pub type BlsSignature = FixedBytes<96>;

/// Four-byte fork version.
pub type ForkVersion = FixedBytes<4>;

/// Sync state reported by a node, `GET /eth/v1/node/syncing`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    #[serde(with = "quoted_u64")]
    pub head_slot: u64,
    #[serde(with = "quoted_u64")]
    pub sync_distance: u64,
    pub is_syncing: bool,
}

/// `head` topic event from the node's event stream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadEvent {
    #[serde(with = "quoted_u64")]
    pub slot: u64,
    pub block: B256,
    pub state: B256,
}

/// `payload_attributes` topic event from the node's event stream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadAttributesEvent {
    pub version: String,
    pub data: PayloadAttributesEventData,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadAttributesEventData {
    #[serde(with = "quoted_u64")]
    pub proposer_index: u64,
    #[serde(with = "quoted_u64")]
    pub proposal_slot: u64,
    #[serde(with = "quoted_u64")]
    pub parent_block_number: u64,
    pub parent_block_root: B256,
    pub parent_block_hash: B256,
    pub payload_attributes: PayloadAttributes,
}

/// Attributes the execution layer needs to start building a payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PayloadAttributes {
    #[serde(with = "quoted_u64")]
    pub timestamp: u64,
    pub prev_randao: B256,
    pub suggested_fee_recipient: Address,
    #[serde(default)]
    pub withdrawals: Vec<Withdrawal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_beacon_block_root: Option<B256>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    #[serde(with = "quoted_u64")]
    pub index: u64,
    #[serde(with = "quoted_u64")]
    pub validator_index: u64,
    pub address: Address,
    /// Gwei.
    #[serde(with = "quoted_u64")]
    pub amount: u64,
}

/// One entry of `GET /eth/v1/beacon/states/{state_id}/validators`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorResponseEntry {
    #[serde(with = "quoted_u64")]
    pub index: u64,
    /// Gwei.
    #[serde(with = "quoted_u64")]
    pub balance: u64,
    pub status: String,
    pub validator: ValidatorDescription,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatorDescription {
    pub pubkey: BlsPublicKey,
}

/// `GET /eth/v1/validator/duties/proposer/{epoch}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposerDutiesResponse {
    pub dependent_root: B256,
    pub data: Vec<ProposerDuty>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposerDuty {
    pub pubkey: BlsPublicKey,
    #[serde(with = "quoted_u64")]
    pub validator_index: u64,
    #[serde(with = "quoted_u64")]
    pub slot: u64,
}

/// Genesis details, `GET /eth/v1/beacon/genesis`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenesisInfo {
    #[serde(with = "quoted_u64")]
    pub genesis_time: u64,
    pub genesis_validators_root: B256,
    pub genesis_fork_version: ForkVersion,
}

/// Chain configuration, `GET /eth/v1/config/spec`.
///
/// The endpoint returns a large, client-dependent set of constants; values
/// are kept untyped and consumers pick out what they need.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainSpec {
    #[serde(flatten)]
    pub values: HashMap<String, serde_json::Value>,
}

impl ChainSpec {
    /// `SECONDS_PER_SLOT`, if the node reported it in a parseable form.
    pub fn seconds_per_slot(&self) -> Option<u64> {
        match self.values.get("SECONDS_PER_SLOT")? {
            serde_json::Value::String(value) => value.parse().ok(),
            serde_json::Value::Number(value) => value.as_u64(),
            _ => None,
        }
    }
}

/// One entry of `GET /eth/v1/config/fork_schedule`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ForkScheduleEntry {
    pub previous_version: ForkVersion,
    pub current_version: ForkVersion,
    #[serde(with = "quoted_u64")]
    pub epoch: u64,
}

/// `GET /eth/v2/beacon/blocks/{block_id}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockResponse {
    #[serde(default)]
    pub version: String,
    pub data: SignedBlockData,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SignedBlockData {
    pub message: BlockMessage,
    pub signature: BlsSignature,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockMessage {
    #[serde(with = "quoted_u64")]
    pub slot: u64,
    #[serde(with = "quoted_u64")]
    pub proposer_index: u64,
    pub body: BlockBody,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockBody {
    pub execution_payload: ExecutionPayloadHeader,
}

/// Execution-payload subset the relay reads off fetched blocks.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPayloadHeader {
    pub parent_hash: B256,
    pub block_hash: B256,
    #[serde(with = "quoted_u64")]
    pub block_number: u64,
}

/// `GET /eth/v1/beacon/states/{slot}/randao`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RandaoInfo {
    pub randao: B256,
}

/// `GET /eth/v1/beacon/states/{slot}/withdrawals`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedWithdrawals {
    pub withdrawals: Vec<Withdrawal>,
}

/// A signed beacon block ready for publication.
///
/// The block itself is carried as raw JSON and posted verbatim; the client
/// reads `slot` and `block_hash` only for logging.
#[derive(Clone, Debug)]
pub struct SignedBeaconBlock {
    slot: u64,
    block_hash: B256,
    body: serde_json::Value,
}

impl SignedBeaconBlock {
    pub fn new(slot: u64, block_hash: B256, body: serde_json::Value) -> Self {
        Self {
            slot,
            block_hash,
            body,
        }
    }

    pub fn slot(&self) -> u64 {
        self.slot
    }

    pub fn block_hash(&self) -> B256 {
        self.block_hash
    }

    /// The wire form posted to `/eth/v1/beacon/blocks`.
    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }
}

/// Decimal-string integers, the beacon API's wire form for `u64` fields.
/// Accepts bare numbers on decode for tolerance.
pub(crate) mod quoted_u64 {
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u64),
            String(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::String(value) => value.parse().map_err(de::Error::custom),
        }
    }
}
