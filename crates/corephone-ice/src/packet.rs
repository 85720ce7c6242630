//! A received packet, and the queue-or-callback delivery mode each
//! component chooses between (§4.K.2, §9 "Dynamic callbacks").

use bytes::Bytes;
use std::collections::VecDeque;

/// One datagram received on a component, owned rather than borrowed from
/// the socket's read buffer so it can sit in a queue or cross into a
/// callback closure.
#[derive(Debug, Clone)]
pub struct Packet {
    /// The datagram's bytes.
    pub data: Bytes,
}

impl Packet {
    /// Wrap `data` as a received packet.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// `true` iff the packet carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A per-component receive callback: takes the packet's bytes, returns
/// nothing. Installed through [`crate::IceTransport::set_on_receive`].
///
/// The factory's event-pump thread invokes this directly — it must not
/// block (§5: "the implementer must document this contract").
pub type ReceiveCallback = Box<dyn Fn(Bytes) + Send + Sync>;

/// Where a component's received packets go: queued for a future `recv`
/// call, or handed straight to an installed callback. Re-architected
/// from the source's raw function-pointer dispatch into an explicit enum
/// under a mutex (§9), so the `Queue -> Callback` transition can drain
/// synchronously instead of racing a callback installation against
/// in-flight packets.
pub enum Delivery {
    /// No callback installed yet; packets accumulate here.
    Queue(VecDeque<Packet>),
    /// A callback is installed; every future packet bypasses the queue.
    Callback(ReceiveCallback),
}

impl Default for Delivery {
    fn default() -> Self {
        Delivery::Queue(VecDeque::new())
    }
}

impl Delivery {
    /// Deliver one packet: append to the queue, or invoke the callback
    /// immediately. Per §5's ordering guarantee, exactly one of these
    /// happens for any given packet, never both.
    pub fn deliver(&mut self, packet: Packet) {
        match self {
            Delivery::Queue(queue) => queue.push_back(packet),
            Delivery::Callback(cb) => cb(packet.data),
        }
    }

    /// Install `callback`, draining any packets already queued through
    /// it synchronously first (§4.K.2: "the transport first drains any
    /// queued packets through the callback, then future packets bypass
    /// the queue").
    pub fn install_callback(&mut self, callback: ReceiveCallback) {
        if let Delivery::Queue(queue) = self {
            while let Some(packet) = queue.pop_front() {
                callback(packet.data);
            }
        }
        *self = Delivery::Callback(callback);
    }

    /// Pop the oldest queued packet, if any and if no callback is
    /// installed (once a callback is installed the queue path is dead).
    pub fn pop(&mut self) -> Option<Packet> {
        match self {
            Delivery::Queue(queue) => queue.pop_front(),
            Delivery::Callback(_) => None,
        }
    }

    /// Size in bytes of the oldest queued packet, without consuming it.
    pub fn peek_size(&self) -> Option<usize> {
        match self {
            Delivery::Queue(queue) => queue.front().map(Packet::len),
            Delivery::Callback(_) => None,
        }
    }

    /// `true` iff at least one packet is queued.
    pub fn has_queued(&self) -> bool {
        matches!(self, Delivery::Queue(q) if !q.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_packets_drain_into_installed_callback() {
        let mut delivery = Delivery::default();
        delivery.deliver(Packet::new(&b"one"[..]));
        delivery.deliver(Packet::new(&b"two"[..]));

        let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_cb = seen.clone();
        delivery.install_callback(Box::new(move |b| seen_cb.lock().push(b)));

        assert_eq!(seen.lock().len(), 2);

        delivery.deliver(Packet::new(&b"three"[..]));
        assert_eq!(seen.lock().len(), 3);
        assert!(!delivery.has_queued());
    }

    #[test]
    fn without_callback_packets_queue_and_pop_in_order() {
        let mut delivery = Delivery::default();
        delivery.deliver(Packet::new(&b"a"[..]));
        delivery.deliver(Packet::new(&b"b"[..]));
        assert_eq!(delivery.peek_size(), Some(1));
        let first = delivery.pop().unwrap();
        assert_eq!(&first.data[..], b"a");
        let second = delivery.pop().unwrap();
        assert_eq!(&second.data[..], b"b");
        assert!(delivery.pop().is_none());
    }
}
