//! HTTP implementation of the beacon node contract.
//!
//! REST reads against the standard beacon API, block publication, and
//! server-sent-event subscriptions for the `head` and `payload_attributes`
//! topics. Event subscriptions reconnect forever; REST calls carry a
//! per-request deadline so a hung node cannot stall failover.

use std::{collections::HashMap, time::Duration};

use futures::{Stream, StreamExt as _};
use reqwest::header;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    error::{BeaconClientError, Result},
    node::BeaconNode,
    types::{
        BlockResponse, BlsPublicKey, ChainSpec, ExpectedWithdrawals, ForkScheduleEntry,
        GenesisInfo, HeadEvent, PayloadAttributesEvent, ProposerDutiesResponse, RandaoInfo,
        SignedBeaconBlock, SyncStatus, ValidatorResponseEntry,
    },
};

/// Deadline for REST reads and publication. Event streams are exempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between reconnect attempts of an event stream.
const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Standard `{"data": …}` envelope most beacon API responses use.
#[derive(serde::Deserialize)]
struct ApiData<T> {
    data: T,
}

/// A single beacon node reachable over HTTP.
pub struct HttpBeaconNode {
    uri: String,
    client: reqwest::Client,
}

impl HttpBeaconNode {
    /// `uri` is the node's base endpoint, e.g. `http://localhost:3500`.
    pub fn new(uri: impl Into<String>) -> Self {
        let uri: String = uri.into();
        Self {
            uri: uri.trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{path}", self.uri))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BeaconClientError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Follows one SSE topic forever, reconnecting whenever the stream ends
    /// or fails. Returns only once the consumer side is gone.
    async fn subscribe<T: DeserializeOwned>(&self, topic: &str, events: mpsc::Sender<T>) {
        let url = format!("{}/eth/v1/events?topics={topic}", self.uri);
        loop {
            match self.stream_events(&url, &events).await {
                Ok(()) => debug!(uri = %self.uri, topic, "event stream ended"),
                Err(err) => {
                    warn!(uri = %self.uri, topic, error = %err, "event stream failed");
                }
            }

            if events.is_closed() {
                return;
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }

    async fn stream_events<T: DeserializeOwned>(
        &self,
        url: &str,
        events: &mpsc::Sender<T>,
    ) -> Result<()> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BeaconClientError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        forward_sse(Box::pin(response.bytes_stream()), events).await
    }
}

impl BeaconNode for HttpBeaconNode {
    fn uri(&self) -> &str {
        &self.uri
    }

    async fn sync_status(&self) -> Result<SyncStatus> {
        let response: ApiData<SyncStatus> = self.get_json("/eth/v1/node/syncing").await?;
        Ok(response.data)
    }

    async fn current_slot(&self) -> Result<u64> {
        Ok(self.sync_status().await?.head_slot)
    }

    async fn subscribe_to_head_events(&self, events: mpsc::Sender<HeadEvent>) {
        self.subscribe("head", events).await;
    }

    async fn subscribe_to_payload_attributes_events(
        &self,
        events: mpsc::Sender<PayloadAttributesEvent>,
    ) {
        self.subscribe("payload_attributes", events).await;
    }

    async fn get_state_validators(
        &self,
        state_id: &str,
    ) -> Result<HashMap<BlsPublicKey, ValidatorResponseEntry>> {
        let response: ApiData<Vec<ValidatorResponseEntry>> = self
            .get_json(&format!(
                "/eth/v1/beacon/states/{state_id}/validators?status=active,pending"
            ))
            .await?;

        Ok(response
            .data
            .into_iter()
            .map(|entry| (entry.validator.pubkey, entry))
            .collect())
    }

    async fn get_proposer_duties(&self, epoch: u64) -> Result<ProposerDutiesResponse> {
        self.get_json(&format!("/eth/v1/validator/duties/proposer/{epoch}"))
            .await
    }

    async fn get_genesis(&self) -> Result<GenesisInfo> {
        let response: ApiData<GenesisInfo> = self.get_json("/eth/v1/beacon/genesis").await?;
        Ok(response.data)
    }

    async fn get_spec(&self) -> Result<ChainSpec> {
        let response: ApiData<ChainSpec> = self.get_json("/eth/v1/config/spec").await?;
        Ok(response.data)
    }

    async fn get_fork_schedule(&self) -> Result<Vec<ForkScheduleEntry>> {
        let response: ApiData<Vec<ForkScheduleEntry>> =
            self.get_json("/eth/v1/config/fork_schedule").await?;
        Ok(response.data)
    }

    async fn get_block(&self, block_id: &str) -> Result<BlockResponse> {
        self.get_json(&format!("/eth/v2/beacon/blocks/{block_id}"))
            .await
    }

    async fn get_randao(&self, slot: u64) -> Result<RandaoInfo> {
        let response: ApiData<RandaoInfo> = self
            .get_json(&format!("/eth/v1/beacon/states/{slot}/randao"))
            .await?;
        Ok(response.data)
    }

    async fn get_withdrawals(&self, slot: u64) -> Result<ExpectedWithdrawals> {
        let response: ApiData<ExpectedWithdrawals> = self
            .get_json(&format!("/eth/v1/beacon/states/{slot}/withdrawals"))
            .await?;
        Ok(response.data)
    }

    async fn publish_block(&self, block: &SignedBeaconBlock) -> Result<u16> {
        let response = self
            .client
            .post(format!("{}/eth/v1/beacon/blocks", self.uri))
            .timeout(REQUEST_TIMEOUT)
            .json(block.body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BeaconClientError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(status.as_u16())
    }
}

/// Reassembles an SSE byte stream into `data:` payloads and forwards each
/// decoded event into `events`.
///
/// Chunk boundaries need not align with lines. Only `data:` fields are
/// inspected; `event:`/`id:` fields and keep-alive comments carry nothing we
/// need since topic filtering happens server-side. Returns `Ok` when the
/// stream or the receiver ends; decode failures of individual events are
/// logged and skipped.
async fn forward_sse<S, B, T>(mut stream: S, events: &mpsc::Sender<T>) -> Result<()>
where
    S: Stream<Item = std::result::Result<B, reqwest::Error>> + Unpin,
    B: AsRef<[u8]>,
    T: DeserializeOwned,
{
    let mut buffer = String::new();
    let mut data = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buffer.push_str(&String::from_utf8_lossy(chunk.as_ref()));

        while let Some(newline) = buffer.find('\n') {
            let line: String = buffer.drain(..=newline).collect();
            let line = line.trim_end();

            if line.is_empty() {
                // blank line terminates an event
                if data.is_empty() {
                    continue;
                }
                match serde_json::from_str::<T>(&data) {
                    Ok(event) => {
                        if events.send(event).await.is_err() {
                            return Ok(());
                        }
                    }
                    Err(err) => warn!(error = %err, "failed to decode event payload"),
                }
                data.clear();
            } else if let Some(value) = line.strip_prefix("data:") {
                data = value.trim_start().to_owned();
            }
        }
    }

    Ok(())
}
