//! The global, refcounted port-mapping table shared by every
//! [`crate::UpnpController`] in-process.
//!
//! Multiple controllers (one per ICE transport, typically) can request a
//! mapping for the same external port — the table tracks how many
//! controllers currently hold each mapping and only unmaps on the router
//! once the count hits zero. Partitioned by protocol, since UDP port 40000
//! and TCP port 40000 are independent on the wire.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Transport protocol a mapping applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// UDP — the only protocol ICE candidates use.
    Udp,
    /// TCP — exposed for completeness; the core only maps UDP.
    Tcp,
}

#[derive(Default)]
struct Entry {
    refcount: u32,
    description: String,
}

/// Process-wide, mutex-guarded, protocol-partitioned refcount table.
#[derive(Default)]
pub struct MappingTable {
    entries: Mutex<HashMap<(Protocol, u16), Entry>>,
}

impl MappingTable {
    /// A fresh, empty table. Callers typically wrap this in an `Arc` and
    /// share it across every [`crate::UpnpController`] in the process;
    /// see [`MappingTable::shared`] for the common case.
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared instance suitable for handing to multiple controllers.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Record a new holder of `(protocol, port)`. Returns `true` if this
    /// is the first holder (i.e. the router-side mapping needs to
    /// actually be created).
    pub fn acquire(&self, protocol: Protocol, port: u16, description: &str) -> bool {
        let mut entries = self.entries.lock();
        let entry = entries.entry((protocol, port)).or_insert_with(|| Entry {
            refcount: 0,
            description: description.to_string(),
        });
        entry.refcount += 1;
        entry.refcount == 1
    }

    /// Drop one holder of `(protocol, port)`. Returns `true` if the
    /// refcount hit zero (i.e. the router-side mapping should now be
    /// removed).
    pub fn release(&self, protocol: Protocol, port: u16) -> bool {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(&(protocol, port)) else {
            return false;
        };
        entry.refcount = entry.refcount.saturating_sub(1);
        let drained = entry.refcount == 0;
        if drained {
            entries.remove(&(protocol, port));
        }
        drained
    }

    /// Current refcount for `(protocol, port)`, `0` if unmapped.
    pub fn refcount(&self, protocol: Protocol, port: u16) -> u32 {
        self.entries
            .lock()
            .get(&(protocol, port))
            .map(|e| e.refcount)
            .unwrap_or(0)
    }

    /// All `(protocol, port)` pairs whose description matches `description`,
    /// used by [`crate::UpnpController::remove_all`].
    pub fn ports_with_description(&self, description: &str) -> Vec<(Protocol, u16)> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, e)| e.description == description)
            .map(|(key, _)| *key)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_exists_iff_refcount_positive() {
        let table = MappingTable::new();
        assert!(table.acquire(Protocol::Udp, 40000, "corephone"));
        assert!(!table.acquire(Protocol::Udp, 40000, "corephone"));
        assert_eq!(table.refcount(Protocol::Udp, 40000), 2);

        assert!(!table.release(Protocol::Udp, 40000));
        assert!(table.release(Protocol::Udp, 40000));
        assert_eq!(table.refcount(Protocol::Udp, 40000), 0);
    }

    #[test]
    fn protocols_are_partitioned() {
        let table = MappingTable::new();
        table.acquire(Protocol::Udp, 5000, "a");
        assert_eq!(table.refcount(Protocol::Tcp, 5000), 0);
        assert_eq!(table.refcount(Protocol::Udp, 5000), 1);
    }
}
