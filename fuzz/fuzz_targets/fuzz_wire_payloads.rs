//! Fuzzes wire payload decoding: arbitrary bytes fed to the JSON shapes
//! that cross the backend boundary must never panic, only error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ruvector_bridge::{
    ClusterNode, CollectionInfo, IndexMatch, SearchQuery, SearchResult, Transaction, VectorEntry,
};

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<VectorEntry>(data);
    let _ = serde_json::from_slice::<SearchQuery>(data);
    let _ = serde_json::from_slice::<Vec<SearchResult>>(data);
    let _ = serde_json::from_slice::<Vec<IndexMatch>>(data);
    let _ = serde_json::from_slice::<CollectionInfo>(data);
    let _ = serde_json::from_slice::<ClusterNode>(data);
    let _ = serde_json::from_slice::<Transaction>(data);
});
