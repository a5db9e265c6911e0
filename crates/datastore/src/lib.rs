//! Relay-side datastore helpers.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

use std::collections::HashMap;

use alloy_primitives::U256;

/// Per-builder bid values for one slot, as loaded from the bid store.
///
/// Values arrive as decimal strings keyed by builder pubkey; anything
/// unparseable counts as zero.
pub struct BuilderBids {
    bid_values: HashMap<String, U256>,
}

impl BuilderBids {
    pub fn new(bid_value_map: &HashMap<String, String>) -> Self {
        let bid_values = bid_value_map
            .iter()
            .map(|(builder_pubkey, value)| {
                (
                    builder_pubkey.clone(),
                    U256::from_str_radix(value, 10).unwrap_or(U256::ZERO),
                )
            })
            .collect();

        Self { bid_values }
    }

    /// The builder with the highest bid and that bid's value. Zero and an
    /// empty pubkey when no bids are known.
    pub fn top_bid(&self) -> (String, U256) {
        let mut top_builder_pubkey = String::new();
        let mut top_value = U256::ZERO;
        for (builder_pubkey, value) in &self.bid_values {
            if *value > top_value {
                top_value = *value;
                top_builder_pubkey = builder_pubkey.clone();
            }
        }
        (top_builder_pubkey, top_value)
    }

    /// The builder's bid value, zero when the builder has no bid.
    pub fn builder_value(&self, builder_pubkey: &str) -> U256 {
        self.bid_values
            .get(builder_pubkey)
            .copied()
            .unwrap_or(U256::ZERO)
    }
}
