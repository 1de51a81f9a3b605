//! Fuzzes the handle registry with arbitrary register/resolve/release
//! sequences. The registry must never panic, and a released handle must
//! never resolve again.

#![no_main]

use libfuzzer_sys::fuzz_target;
use ruvector_bridge::{Domain, HandleRegistry};

const DOMAINS: [Domain; 5] = [
    Domain::Vector,
    Domain::Index,
    Domain::Collection,
    Domain::Cluster,
    Domain::Consensus,
];

fuzz_target!(|data: &[u8]| {
    let registry = HandleRegistry::new();
    let mut live = Vec::new();
    let mut released = Vec::new();

    for chunk in data.chunks(3) {
        let op = chunk[0] % 3;
        let pick = chunk.get(1).copied().unwrap_or(0) as usize;
        let domain = DOMAINS[chunk.get(2).copied().unwrap_or(0) as usize % DOMAINS.len()];

        match op {
            0 => {
                let handle = registry.register(pick as u64, domain);
                live.push((handle, domain));
            }
            1 => {
                if !live.is_empty() {
                    let (handle, registered) = live[pick % live.len()];
                    let resolved = registry.resolve(handle, domain);
                    assert_eq!(resolved.is_ok(), domain == registered);
                }
            }
            _ => {
                if !live.is_empty() {
                    let (handle, registered) = live.remove(pick % live.len());
                    if registry.release(handle, domain).is_err() {
                        // Wrong domain leaves the handle live
                        assert_ne!(domain, registered);
                        live.push((handle, registered));
                    } else {
                        released.push((handle, registered));
                    }
                }
            }
        }
    }

    for (handle, domain) in released {
        assert!(registry.resolve(handle, domain).is_err());
    }
});
