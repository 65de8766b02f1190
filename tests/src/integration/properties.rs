//! # Cross-Crate Properties
//!
//! Property checks that span more than one crate: bus delivery as seen by
//! several subscribers, command correlation through the adapter and the bus,
//! sleeping fibres across the tick wrap, and address upserts flowing into
//! the registry.

#[cfg(test)]
mod tests {
    use gw_01_fibre_scheduler::{FibreBackend, FibreId, Scheduler, SchedulerConfig};
    use gw_02_zigbee_adapter::{
        AdapterState, SimulatedRadio, SimulatedRadioControl, ZigbeeAdapter, ZigbeeConfig,
        STATUS_OK,
    };
    use gw_03_device_registry::{Registry, RegistrySync};
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use shared_bus::{
        CommandConfirmed, CommandFailed, Envelope, EventBus, EventFilter, EventHandler,
        EventPublisher, EventType,
    };
    use shared_types::{Clock, CorrelationId, Eui64, ManualClock, NetAddr};
    use std::collections::HashMap;
    use std::sync::Arc;

    type Recorded = Arc<Mutex<Vec<Envelope>>>;

    fn recorder(bus: &EventBus, filter: EventFilter) -> Recorded {
        let seen: Recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: Arc<dyn EventHandler> = Arc::new(move |e: &Envelope| sink.lock().push(*e));
        bus.subscribe(filter, handler).unwrap();
        seen
    }

    struct Rig {
        adapter: ZigbeeAdapter<SimulatedRadio>,
        radio: SimulatedRadioControl,
        bus: Arc<EventBus>,
        clock: Arc<ManualClock>,
        seen: Recorded,
    }

    fn rig(cmd_timeout_ms: u32) -> Rig {
        let clock = Arc::new(ManualClock::new(0));
        let clock_port: Arc<dyn Clock> = clock.clone();
        let bus = Arc::new(EventBus::new(Arc::clone(&clock_port)));
        let seen = recorder(
            &bus,
            EventFilter::range(EventType::COMMAND_CONFIRMED, EventType::COMMAND_FAILED),
        );
        let radio = SimulatedRadio::new();
        let control = radio.control();
        let publisher: Arc<dyn EventPublisher> = bus.clone();
        let config = ZigbeeConfig {
            cmd_timeout_ms,
            ..ZigbeeConfig::for_testing()
        };
        let adapter = ZigbeeAdapter::new(config, radio, publisher, clock_port);
        adapter.initialize().unwrap();
        adapter.poll_radio();
        assert_eq!(adapter.state(), AdapterState::Ready);
        Rig {
            adapter,
            radio: control,
            bus,
            clock,
            seen,
        }
    }

    const DEVICE: Eui64 = Eui64(0x0000_0000_0000_0ABC);

    /// Sweeps once and records the tick each timed-out command failed at.
    fn record_timeouts(r: &Rig, failed_at: &mut HashMap<CorrelationId, u32>) {
        r.adapter.sweep_timeouts();
        r.bus.dispatch(0);
        for e in r.seen.lock().drain(..) {
            let failed: CommandFailed = e.decode().unwrap();
            assert!(failed.is_timeout());
            let first = failed_at.insert(failed.correlation_id, r.clock.now());
            assert!(first.is_none(), "{} failed twice", failed.correlation_id);
        }
    }

    proptest! {
        // Each subscriber sees exactly the envelopes in its range,
        // in publish order.
        #[test]
        fn prop_subscribers_see_their_range_in_order(
            kinds in prop::collection::vec(any::<u8>(), 1..200),
            ranges in prop::collection::vec((any::<u8>(), any::<u8>()), 1..6),
        ) {
            let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(1));
            let bus = EventBus::new(clock);
            let recorders: Vec<(EventFilter, Recorded)> = ranges
                .iter()
                .map(|&(min, max)| {
                    let filter = EventFilter::range(EventType(min), EventType(max));
                    (filter, recorder(&bus, filter))
                })
                .collect();

            for (seq, &kind) in kinds.iter().enumerate() {
                bus.emit(EventType(kind), &(seq as u16).to_le_bytes()).unwrap();
            }
            prop_assert_eq!(bus.dispatch(0), kinds.len());

            for (filter, seen) in &recorders {
                let expected: Vec<u16> = kinds
                    .iter()
                    .enumerate()
                    .filter(|(_, &k)| filter.min.0 <= k && k <= filter.max.0)
                    .map(|(seq, _)| seq as u16)
                    .collect();
                let observed: Vec<u16> = seen
                    .lock()
                    .iter()
                    .map(|e| u16::from_le_bytes([e.payload()[0], e.payload()[1]]))
                    .collect();
                prop_assert_eq!(observed, expected);
            }
        }

        // Any completion order confirms every command exactly once.
        #[test]
        fn prop_every_command_confirmed_once(
            order in (1usize..=16).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle()),
        ) {
            let r = rig(10_000);
            r.radio.announce(DEVICE, NetAddr(0x2222));
            r.adapter.poll_radio();

            let tsns: Vec<u8> = (1..=order.len() as u32)
                .map(|id| r.adapter.send_onoff(DEVICE, 1, id % 2 == 0, CorrelationId(id)).unwrap())
                .collect();
            for &index in &order {
                r.radio.complete(tsns[index], STATUS_OK);
            }
            r.adapter.poll_radio();
            r.clock.advance(20_000);
            prop_assert_eq!(r.adapter.sweep_timeouts(), 0);
            r.bus.dispatch(0);

            let seen = r.seen.lock();
            prop_assert!(seen.iter().all(|e| e.kind == EventType::COMMAND_CONFIRMED));
            let confirmed: Vec<u32> = seen
                .iter()
                .map(|e| e.decode::<CommandConfirmed>().unwrap().correlation_id.0)
                .collect();
            let expected: Vec<u32> = order.iter().map(|&index| index as u32 + 1).collect();
            prop_assert_eq!(confirmed, expected);
            prop_assert_eq!(r.adapter.pending_count(), 0);
        }

        // Unacknowledged commands time out exactly once, on the first
        // sweep after the timeout and never before.
        #[test]
        fn prop_unacknowledged_commands_time_out_once(
            timeout in 1u32..300,
            issue_gaps in prop::collection::vec(0u32..50, 1..16),
        ) {
            let r = rig(timeout);
            r.radio.announce(DEVICE, NetAddr(0x3333));
            r.adapter.poll_radio();

            let mut issued_at = HashMap::new();
            let mut failed_at = HashMap::new();
            for (i, &gap) in issue_gaps.iter().enumerate() {
                for _ in 0..gap {
                    r.clock.advance(1);
                    record_timeouts(&r, &mut failed_at);
                }
                let id = CorrelationId(i as u32 + 1);
                r.adapter.send_onoff(DEVICE, 1, true, id).unwrap();
                issued_at.insert(id, r.clock.now());
            }
            let horizon = r.clock.now() + timeout + 2;
            while r.clock.now() < horizon {
                r.clock.advance(1);
                record_timeouts(&r, &mut failed_at);
            }

            prop_assert_eq!(failed_at.len(), issued_at.len());
            for (id, at) in failed_at {
                prop_assert_eq!(at - issued_at[&id], timeout + 1);
            }
            prop_assert_eq!(r.adapter.pending_count(), 0);
            prop_assert!(r.adapter.send_onoff(DEVICE, 1, false, CorrelationId(99)).is_ok());
        }

        // Across the tick wrap, a sleeping fibre is not selected before D ticks.
        #[test]
        fn prop_sleep_not_selected_early_across_wrap(
            before_wrap in 0u32..8,
            duration in 1u32..20,
        ) {
            let scheduler = Scheduler::new(SchedulerConfig::for_testing(FibreBackend::Polled)).unwrap();
            scheduler.tick_advance_by(u32::MAX - before_wrap);
            let woke = Arc::new(Mutex::new(None));
            let slot = Arc::clone(&woke);
            let id = scheduler
                .create("sleeper", 0, move |ctx| async move {
                    let start = ctx.now();
                    ctx.sleep_ticks(duration).await;
                    *slot.lock() = Some(ctx.now().wrapping_sub(start));
                })
                .unwrap();

            prop_assert_eq!(scheduler.run_pass(), id);
            for _ in 1..duration {
                scheduler.tick_advance();
                prop_assert_eq!(scheduler.run_pass(), FibreId::IDLE);
            }
            scheduler.tick_advance();
            prop_assert_eq!(scheduler.run_pass(), id);
            prop_assert_eq!(*woke.lock(), Some(duration));
        }

        // Repeated announces leave one cache entry and one
        // registry node, both at the latest address.
        #[test]
        fn prop_reannounce_keeps_one_entry(addrs in prop::collection::vec(0u16..0xFFF0, 1..10)) {
            let r = rig(10_000);
            let clock: Arc<dyn Clock> = r.clock.clone();
            let sync = RegistrySync::new(Arc::new(Mutex::new(Registry::new(clock))));
            RegistrySync::subscribe(&sync, &r.bus).unwrap();

            for &addr in &addrs {
                r.radio.announce(DEVICE, NetAddr(addr));
                r.adapter.poll_radio();
            }
            r.bus.dispatch(0);

            let latest = NetAddr(*addrs.last().unwrap());
            prop_assert_eq!(r.adapter.stats().cache_entries, 1);
            prop_assert_eq!(r.adapter.lookup(DEVICE).unwrap().net_addr, latest);
            let registry = sync.registry().lock();
            prop_assert_eq!(registry.node_count(), 1);
            prop_assert_eq!(registry.find_node(DEVICE).unwrap().net_addr, latest);
        }
    }
}
