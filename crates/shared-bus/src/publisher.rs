//! # Event Publisher
//!
//! The ring buffer, the subscription table and the dispatch loop.
//!
//! `publish` touches only the lock-free queue and a few atomic counters, so
//! it is safe from the radio callback thread. `subscribe`, `unsubscribe` and
//! `dispatch` take the subscription lock and run in fibre context.

use crate::envelope::Envelope;
use crate::events::{EventFilter, EventType};
use crate::subscriber::{BusError, EventHandler, Subscription};
use crate::{EVENT_QUEUE_SIZE, MAX_SUBSCRIBERS};
use crossbeam_queue::ArrayQueue;
use heapless::Vec as HeaplessVec;
use parking_lot::Mutex;
use shared_types::{Clock, CorrelationId};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Trait for publishing envelopes to the bus.
///
/// This is the port the adapter and the collaborators emit through.
pub trait EventPublisher: Send + Sync {
    /// Enqueues a copy of `envelope`.
    ///
    /// # Errors
    ///
    /// [`BusError::QueueFull`] when the ring buffer is at capacity.
    fn publish(&self, envelope: Envelope) -> Result<(), BusError>;

    /// Builds an envelope stamped with the current tick and publishes it.
    /// Payload bytes beyond the maximum are truncated.
    fn emit(&self, kind: EventType, payload: &[u8]) -> Result<(), BusError> {
        self.publish(Envelope::with_bytes(kind, payload))
    }
}

/// Snapshot of bus counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    pub published: u64,
    pub dispatched: u64,
    pub dropped: u64,
    pub current_depth: usize,
    pub high_water: usize,
}

/// Bounded in-memory event bus.
pub struct EventBus {
    queue: ArrayQueue<Envelope>,
    subscriptions: Mutex<HeaplessVec<Subscription, MAX_SUBSCRIBERS>>,
    clock: Arc<dyn Clock>,
    published: AtomicU64,
    dispatched: AtomicU64,
    dropped: AtomicU64,
    depth: AtomicUsize,
    high_water: AtomicUsize,
    next_correlation: AtomicU32,
}

impl EventBus {
    /// Creates an empty bus that timestamps envelopes from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            queue: ArrayQueue::new(EVENT_QUEUE_SIZE),
            subscriptions: Mutex::new(HeaplessVec::new()),
            clock,
            published: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            depth: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            next_correlation: AtomicU32::new(1),
        }
    }

    /// Publishes an envelope carrying a correlation id.
    pub fn emit_correlated(
        &self,
        kind: EventType,
        correlation_id: CorrelationId,
        payload: &[u8],
    ) -> Result<(), BusError> {
        self.publish(Envelope::with_bytes(kind, payload).correlated(correlation_id))
    }

    /// Registers `handler` for every type in `filter`.
    ///
    /// # Errors
    ///
    /// [`BusError::TableFull`] when all subscription slots are taken.
    pub fn subscribe(
        &self,
        filter: EventFilter,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), BusError> {
        let mut subscriptions = self.subscriptions.lock();
        subscriptions
            .push(Subscription { filter, handler })
            .map_err(|_| BusError::TableFull)?;
        debug!(
            min = filter.min.0,
            max = filter.max.0,
            subscribers = subscriptions.len(),
            "Subscribed"
        );
        Ok(())
    }

    /// Removes the first subscription using `handler`.
    ///
    /// # Errors
    ///
    /// [`BusError::HandlerNotFound`] when the handler is not subscribed.
    pub fn unsubscribe(&self, handler: &Arc<dyn EventHandler>) -> Result<(), BusError> {
        let mut subscriptions = self.subscriptions.lock();
        let index = subscriptions
            .iter()
            .position(|s| s.uses(handler))
            .ok_or(BusError::HandlerNotFound)?;
        // Order-preserving so dispatch order stays subscription order.
        subscriptions.remove(index);
        debug!(subscribers = subscriptions.len(), "Unsubscribed");
        Ok(())
    }

    /// Dispatches up to `max_count` envelopes (0 = until empty) in FIFO
    /// order. Returns the number dispatched.
    ///
    /// Matching handlers are collected before any is invoked, so handlers
    /// may change subscriptions; the change applies from the next envelope.
    pub fn dispatch(&self, max_count: usize) -> usize {
        let mut count = 0;
        while max_count == 0 || count < max_count {
            let Some(envelope) = self.queue.pop() else {
                break;
            };
            self.depth.fetch_sub(1, Ordering::AcqRel);

            let handlers = self.matching_handlers(envelope.kind);
            trace!(kind = %envelope.kind, handlers = handlers.len(), "Dispatching");
            for handler in &handlers {
                handler.handle(&envelope);
            }

            self.dispatched.fetch_add(1, Ordering::Relaxed);
            count += 1;
        }
        count
    }

    fn matching_handlers(
        &self,
        kind: EventType,
    ) -> HeaplessVec<Arc<dyn EventHandler>, MAX_SUBSCRIBERS> {
        let subscriptions = self.subscriptions.lock();
        let mut handlers = HeaplessVec::new();
        for subscription in subscriptions.iter().filter(|s| s.filter.matches(kind)) {
            // Both vectors share the same capacity.
            let _ = handlers.push(Arc::clone(&subscription.handler));
        }
        handlers
    }

    pub fn stats(&self) -> BusStats {
        BusStats {
            published: self.published.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            current_depth: self.depth.load(Ordering::Acquire),
            high_water: self.high_water.load(Ordering::Relaxed),
        }
    }

    /// Next correlation id. Starts at 1 and skips 0 on wrap.
    pub fn new_correlation_id(&self) -> CorrelationId {
        loop {
            let id = self.next_correlation.fetch_add(1, Ordering::Relaxed);
            if id != 0 {
                return CorrelationId(id);
            }
        }
    }

    fn drop_newest(&self, kind: EventType) -> BusError {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        warn!(kind = %kind, "Event queue full, dropping newest");
        BusError::QueueFull
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    pub const fn capacity(&self) -> usize {
        EVENT_QUEUE_SIZE
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, envelope: Envelope) -> Result<(), BusError> {
        let mut envelope = envelope;
        if envelope.timestamp == 0 {
            envelope.timestamp = self.clock.now();
        }

        // A slot is reserved in `depth` before the push, so depth is never
        // below the queue length and never above the capacity.
        let reserved = self
            .depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| {
                (depth < EVENT_QUEUE_SIZE).then_some(depth + 1)
            });
        let depth = match reserved {
            Ok(previous) => previous + 1,
            Err(_) => return Err(self.drop_newest(envelope.kind)),
        };
        if self.queue.push(envelope).is_err() {
            self.depth.fetch_sub(1, Ordering::AcqRel);
            return Err(self.drop_newest(envelope.kind));
        }

        self.published.fetch_add(1, Ordering::Relaxed);
        self.high_water.fetch_max(depth, Ordering::Relaxed);
        Ok(())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("stats", &self.stats())
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::DeviceAddress;
    use proptest::prelude::*;
    use shared_types::{Eui64, ManualClock, NetAddr};
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    fn bus() -> (Arc<ManualClock>, EventBus) {
        let clock = Arc::new(ManualClock::new(100));
        let bus = EventBus::new(clock.clone());
        (clock, bus)
    }

    fn recorder() -> (Arc<Mutex<Vec<Envelope>>>, Arc<dyn EventHandler>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: Arc<dyn EventHandler> =
            Arc::new(move |e: &Envelope| sink.lock().push(*e));
        (seen, handler)
    }

    #[test]
    fn test_publish_fills_zero_timestamp() {
        let (clock, bus) = bus();
        let (seen, handler) = recorder();
        bus.subscribe(EventFilter::ALL, handler).unwrap();

        bus.emit(EventType::BOOT, &[]).unwrap();
        clock.advance(5);
        bus.publish(Envelope::new(EventType::LOG).at(3)).unwrap();
        bus.dispatch(0);

        let seen = seen.lock();
        assert_eq!(seen[0].timestamp, 100);
        assert_eq!(seen[1].timestamp, 3);
    }

    #[test]
    fn test_subscribe_joined_only() {
        let (_, bus) = bus();
        let (seen, handler) = recorder();
        bus.subscribe(EventFilter::only(EventType::DEVICE_JOINED), handler)
            .unwrap();

        let payload = DeviceAddress {
            identity: Eui64(0x0011_2233_4455_6677),
            net_addr: NetAddr(0x1234),
        };
        bus.publish(Envelope::with_payload(EventType::DEVICE_JOINED, &payload))
            .unwrap();
        bus.emit(EventType::DEVICE_LEFT, &[0; 8]).unwrap();
        assert_eq!(bus.dispatch(0), 2);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].decode::<DeviceAddress>().unwrap(), payload);
    }

    #[test]
    fn test_queue_full_drops_newest() {
        let (_, bus) = bus();
        for i in 0..EVENT_QUEUE_SIZE {
            bus.emit(EventType::USER_BASE, &(i as u16).to_le_bytes())
                .unwrap();
        }
        assert_eq!(
            bus.emit(EventType::USER_BASE, &[0xFF, 0xFF]),
            Err(BusError::QueueFull)
        );

        let stats = bus.stats();
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.published, EVENT_QUEUE_SIZE as u64);
        assert_eq!(stats.current_depth, EVENT_QUEUE_SIZE);
        assert_eq!(stats.high_water, EVENT_QUEUE_SIZE);

        let (seen, handler) = recorder();
        bus.subscribe(EventFilter::ALL, handler).unwrap();
        assert_eq!(bus.dispatch(0), EVENT_QUEUE_SIZE);
        let seen = seen.lock();
        for (i, envelope) in seen.iter().enumerate() {
            assert_eq!(envelope.payload(), &(i as u16).to_le_bytes());
        }
        assert_eq!(bus.stats().current_depth, 0);
    }

    #[test]
    fn test_publish_on_full_queue_returns_promptly() {
        let (_, bus) = bus();
        let bus = Arc::new(bus);
        for _ in 0..EVENT_QUEUE_SIZE {
            bus.emit(EventType::LOG, &[]).unwrap();
        }

        let (tx, rx) = mpsc::channel();
        let producer = {
            let bus = Arc::clone(&bus);
            thread::spawn(move || {
                let _ = tx.send(bus.emit(EventType::LOG, &[1]));
            })
        };
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(3)),
            Ok(Err(BusError::QueueFull))
        );
        producer.join().unwrap();

        // One slot freed, one publish accepted, then full again.
        assert_eq!(bus.dispatch(1), 1);
        bus.emit(EventType::LOG, &[2]).unwrap();
        assert_eq!(bus.emit(EventType::LOG, &[3]), Err(BusError::QueueFull));
        let stats = bus.stats();
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.current_depth, EVENT_QUEUE_SIZE);
    }

    #[test]
    fn test_publish_from_thread_while_dispatching() {
        const ATTEMPTS: u32 = 20_000;

        let (_, bus) = bus();
        let bus = Arc::new(bus);
        let (seen, handler) = recorder();
        bus.subscribe(EventFilter::ALL, handler).unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let producer = {
            let bus = Arc::clone(&bus);
            thread::spawn(move || {
                let mut accepted = 0u64;
                for i in 0..ATTEMPTS {
                    if bus.emit(EventType::USER_BASE, &i.to_le_bytes()).is_ok() {
                        accepted += 1;
                    }
                }
                let _ = done_tx.send(accepted);
            })
        };

        let accepted = loop {
            bus.dispatch(16);
            let depth = bus.stats().current_depth;
            assert!(depth <= EVENT_QUEUE_SIZE, "depth out of range: {depth}");
            match done_rx.recv_timeout(Duration::from_millis(0)) {
                Ok(accepted) => break accepted,
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => panic!("producer died"),
            }
        };
        producer.join().unwrap();
        bus.dispatch(0);

        let stats = bus.stats();
        assert_eq!(stats.published, accepted);
        assert_eq!(stats.published + stats.dropped, u64::from(ATTEMPTS));
        assert_eq!(stats.dispatched, accepted);
        assert_eq!(stats.current_depth, 0);

        let seen = seen.lock();
        assert_eq!(seen.len() as u64, accepted);
        let mut previous = None;
        for envelope in seen.iter() {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(envelope.payload());
            let value = u32::from_le_bytes(raw);
            assert!(previous.map_or(true, |p| value > p), "out of order at {value}");
            previous = Some(value);
        }
    }

    #[test]
    fn test_dispatch_respects_max_count() {
        let (_, bus) = bus();
        for _ in 0..5 {
            bus.emit(EventType::LOG, &[]).unwrap();
        }
        assert_eq!(bus.dispatch(2), 2);
        assert_eq!(bus.stats().current_depth, 3);
        assert_eq!(bus.dispatch(0), 3);
        assert_eq!(bus.dispatch(0), 0);
    }

    #[test]
    fn test_dispatch_without_subscribers_still_consumes() {
        let (_, bus) = bus();
        bus.emit(EventType::LOG, &[]).unwrap();
        assert_eq!(bus.dispatch(0), 1);
        assert_eq!(bus.stats().dispatched, 1);
    }

    #[test]
    fn test_subscription_table_full() {
        let (_, bus) = bus();
        for _ in 0..MAX_SUBSCRIBERS {
            let (_, handler) = recorder();
            bus.subscribe(EventFilter::ALL, handler).unwrap();
        }
        let (_, handler) = recorder();
        assert_eq!(
            bus.subscribe(EventFilter::ALL, handler),
            Err(BusError::TableFull)
        );
    }

    #[test]
    fn test_unsubscribe_by_identity() {
        let (_, bus) = bus();
        let (seen, handler) = recorder();
        let (_, other) = recorder();
        bus.subscribe(EventFilter::ALL, Arc::clone(&handler)).unwrap();
        bus.subscribe(EventFilter::ALL, Arc::clone(&other)).unwrap();

        bus.unsubscribe(&handler).unwrap();
        assert_eq!(bus.unsubscribe(&handler), Err(BusError::HandlerNotFound));
        assert_eq!(bus.subscriber_count(), 1);

        bus.emit(EventType::LOG, &[]).unwrap();
        bus.dispatch(0);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_handler_may_unsubscribe_itself() {
        let clock = Arc::new(ManualClock::new(1));
        let bus = Arc::new(EventBus::new(clock));
        let calls = Arc::new(AtomicU32::new(0));
        let slot: Arc<Mutex<Option<Arc<dyn EventHandler>>>> = Arc::new(Mutex::new(None));

        let handler: Arc<dyn EventHandler> = {
            let bus = Arc::clone(&bus);
            let calls = Arc::clone(&calls);
            let slot = Arc::clone(&slot);
            Arc::new(move |_: &Envelope| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(me) = slot.lock().take() {
                    bus.unsubscribe(&me).unwrap();
                }
            })
        };
        *slot.lock() = Some(Arc::clone(&handler));
        bus.subscribe(EventFilter::ALL, handler).unwrap();

        bus.emit(EventType::LOG, &[]).unwrap();
        bus.emit(EventType::LOG, &[]).unwrap();
        bus.dispatch(0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_correlation_ids_skip_zero() {
        let (_, bus) = bus();
        assert_eq!(bus.new_correlation_id(), CorrelationId(1));
        assert_eq!(bus.new_correlation_id(), CorrelationId(2));

        bus.next_correlation.store(u32::MAX, Ordering::Relaxed);
        assert_eq!(bus.new_correlation_id(), CorrelationId(u32::MAX));
        assert_eq!(bus.new_correlation_id(), CorrelationId(1));
    }

    #[test]
    fn test_emit_correlated() {
        let (_, bus) = bus();
        let (seen, handler) = recorder();
        bus.subscribe(EventFilter::ALL, handler).unwrap();
        bus.emit_correlated(EventType::COMMAND_CONFIRMED, CorrelationId(7), &[7, 0, 0, 0, 0, 0])
            .unwrap();
        bus.dispatch(0);
        assert_eq!(seen.lock()[0].correlation_id, CorrelationId(7));
    }

    proptest! {
        #[test]
        fn prop_dispatch_is_fifo(kinds in proptest::collection::vec(any::<u8>(), 0..EVENT_QUEUE_SIZE)) {
            let (_, bus) = bus();
            let (seen, handler) = recorder();
            bus.subscribe(EventFilter::ALL, handler).unwrap();
            for (i, kind) in kinds.iter().enumerate() {
                bus.emit(EventType(*kind), &(i as u32).to_le_bytes()).unwrap();
            }
            prop_assert_eq!(bus.dispatch(0), kinds.len());
            let seen = seen.lock();
            prop_assert_eq!(seen.len(), kinds.len());
            for (i, envelope) in seen.iter().enumerate() {
                prop_assert_eq!(envelope.kind, EventType(kinds[i]));
                prop_assert_eq!(envelope.payload(), &(i as u32).to_le_bytes()[..]);
            }
        }

        #[test]
        fn prop_filter_selects_exactly_range(min in any::<u8>(), max in any::<u8>(), kind in any::<u8>()) {
            let (_, bus) = bus();
            let (seen, handler) = recorder();
            bus.subscribe(EventFilter::range(EventType(min), EventType(max)), handler).unwrap();
            bus.emit(EventType(kind), &[]).unwrap();
            bus.dispatch(0);
            let expected = usize::from(min <= kind && kind <= max);
            prop_assert_eq!(seen.lock().len(), expected);
        }

        #[test]
        fn prop_overflow_drops_exactly_excess(extra in 1usize..8) {
            let (_, bus) = bus();
            let mut rejected = 0;
            for _ in 0..EVENT_QUEUE_SIZE + extra {
                if bus.emit(EventType::LOG, &[]).is_err() {
                    rejected += 1;
                }
            }
            prop_assert_eq!(rejected, extra);
            prop_assert_eq!(bus.stats().dropped, extra as u64);
            prop_assert_eq!(bus.dispatch(0), EVENT_QUEUE_SIZE);
        }
    }
}
