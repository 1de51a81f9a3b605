//! Generation-checked handle registry.
//!
//! Backends identify live objects by raw integers. Rather than trusting
//! those integers blindly, the bridge wraps them in [`Handle`]s issued by
//! a slot table with per-slot generation counters: releasing a handle bumps
//! its slot's generation, so a stale copy of the handle can never resolve
//! to a later occupant of the same slot. Wrong-domain use (an index handle
//! passed where a vector-store handle is expected) is rejected the same way.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::backend::RawHandle;
use crate::error::{Result, RuvectorError};

/// Opaque reference to a live backend object.
///
/// Cheap to copy; valid only against the registry that issued it, and only
/// until it is released.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Slot index within the issuing registry.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation the handle was issued under.
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}.g{}", self.index, self.generation)
    }
}

/// Facade family a handle belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Domain {
    /// Vector store handles.
    Vector,
    /// ANN index handles.
    Index,
    /// Collection manager handles.
    Collection,
    /// Cluster manager handles.
    Cluster,
    /// Consensus engine handles.
    Consensus,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vector => "vector",
            Self::Index => "index",
            Self::Collection => "collection",
            Self::Cluster => "cluster",
            Self::Consensus => "consensus",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    live: Option<(RawHandle, Domain)>,
}

#[derive(Debug, Default)]
struct Inner {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

/// Table of live backend handles with generation checking.
///
/// One registry exists per [`crate::BackendContext`]; facades register the
/// raw handle a `*_new` call returned and resolve it on every dispatch.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    inner: Mutex<Inner>,
}

impl HandleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The slot table is consistent after every operation, so a lock
    /// poisoned by a panicking thread is still safe to reuse.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a raw backend handle, returning a generation-checked handle.
    pub fn register(&self, raw: RawHandle, domain: Domain) -> Handle {
        let mut inner = self.lock();
        if let Some(index) = inner.free.pop() {
            let slot = &mut inner.slots[index as usize];
            slot.live = Some((raw, domain));
            Handle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = inner.slots.len() as u32;
            inner.slots.push(Slot {
                generation: 0,
                live: Some((raw, domain)),
            });
            Handle {
                index,
                generation: 0,
            }
        }
    }

    /// Resolves a handle to its raw backend handle.
    ///
    /// # Errors
    ///
    /// Returns [`RuvectorError::HandleInvalid`] if the handle is stale
    /// (released, generation mismatch) or belongs to another domain.
    pub fn resolve(&self, handle: Handle, domain: Domain) -> Result<RawHandle> {
        let inner = self.lock();
        match inner.slots.get(handle.index as usize) {
            Some(slot) if slot.generation == handle.generation => match slot.live {
                Some((raw, live_domain)) if live_domain == domain => Ok(raw),
                _ => Err(RuvectorError::handle_invalid(handle)),
            },
            _ => Err(RuvectorError::handle_invalid(handle)),
        }
    }

    /// Releases a handle, invalidating every outstanding copy of it.
    ///
    /// The slot's generation is bumped before reuse, so later occupants of
    /// the same slot never collide with the released handle.
    ///
    /// # Errors
    ///
    /// Returns [`RuvectorError::HandleInvalid`] if the handle is already
    /// released or belongs to another domain.
    pub fn release(&self, handle: Handle, domain: Domain) -> Result<RawHandle> {
        let mut inner = self.lock();
        let slot = inner
            .slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or_else(|| RuvectorError::handle_invalid(handle))?;

        match slot.live.take() {
            Some((raw, live_domain)) if live_domain == domain => {
                slot.generation = slot.generation.wrapping_add(1);
                inner.free.push(handle.index);
                Ok(raw)
            }
            Some(live) => {
                // Wrong domain: put the entry back untouched
                slot.live = Some(live);
                Err(RuvectorError::handle_invalid(handle))
            }
            None => Err(RuvectorError::handle_invalid(handle)),
        }
    }

    /// Number of currently live handles.
    pub fn live_count(&self) -> usize {
        let inner = self.lock();
        inner.slots.iter().filter(|slot| slot.live.is_some()).count()
    }
}
