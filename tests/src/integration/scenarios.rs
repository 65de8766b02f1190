//! # Cross-crate Scenarios
//!
//! Short end-to-end flows, each run against the public API of the crates
//! involved:
//!
//! | Test | Crates | Checks |
//! |------|--------|--------|
//! | `test_device_joined_delivered_once` | shared-bus | single-type subscription receives the exact payload |
//! | `test_seventeenth_command_exhausts_table` | gw-02 | 17th correlated send hits `ResourceExhausted` |
//! | `test_round_robin_on_both_backends` | gw-01 | 9 passes over A, B, C are strictly round-robin |
//! | `test_unknown_device_has_no_side_effects` | gw-02 | `NotFound`, nothing emitted, nothing allocated |
//! | `test_level_confirmed_exactly_once` | gw-02 + shared-bus | level command confirmed exactly once |
//! | `test_overflow_drops_newest` | shared-bus | 257th publish into a 256 ring is dropped and counted |

#[cfg(test)]
mod tests {
    use gw_01_fibre_scheduler::{FibreBackend, FibreId, Scheduler, SchedulerConfig};
    use gw_02_zigbee_adapter::{
        AdapterState, SimulatedRadio, SimulatedRadioControl, ZigbeeAdapter, ZigbeeConfig,
        STATUS_OK,
    };
    use parking_lot::Mutex;
    use shared_bus::{
        BusError, CommandConfirmed, DeviceAddress, Envelope, EventBus, EventFilter, EventHandler,
        EventPublisher, EventType, EVENT_QUEUE_SIZE,
    };
    use shared_types::{Clock, CorrelationId, ErrorKind, Eui64, ManualClock, NetAddr};
    use std::sync::Arc;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    type Recorded = Arc<Mutex<Vec<Envelope>>>;

    fn recorder(bus: &EventBus, filter: EventFilter) -> Recorded {
        let seen: Recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: Arc<dyn EventHandler> = Arc::new(move |e: &Envelope| sink.lock().push(*e));
        bus.subscribe(filter, handler).unwrap();
        seen
    }

    fn bus() -> Arc<EventBus> {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(1));
        Arc::new(EventBus::new(clock))
    }

    struct Coordinator {
        adapter: ZigbeeAdapter<SimulatedRadio>,
        radio: SimulatedRadioControl,
        bus: Arc<EventBus>,
        seen: Recorded,
    }

    /// An adapter with a formed network and the bus drained.
    fn coordinator() -> Coordinator {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(100));
        let bus = Arc::new(EventBus::new(Arc::clone(&clock)));
        let seen = recorder(&bus, EventFilter::ALL);
        let radio = SimulatedRadio::new();
        let control = radio.control();
        let publisher: Arc<dyn EventPublisher> = bus.clone();
        let adapter = ZigbeeAdapter::new(ZigbeeConfig::for_testing(), radio, publisher, clock);
        adapter.initialize().unwrap();
        adapter.poll_radio();
        assert_eq!(adapter.state(), AdapterState::Ready);
        bus.dispatch(0);
        seen.lock().clear();
        Coordinator {
            adapter,
            radio: control,
            bus,
            seen,
        }
    }

    // =============================================================================
    // SCENARIO 1: SINGLE-TYPE SUBSCRIPTION
    // =============================================================================

    #[test]
    fn test_device_joined_delivered_once() {
        let bus = bus();
        let seen = recorder(&bus, EventFilter::only(EventType::DEVICE_JOINED));
        let joined = DeviceAddress {
            identity: Eui64(0x0011_2233_4455_6677),
            net_addr: NetAddr(0x1234),
        };

        bus.publish(Envelope::with_payload(EventType::DEVICE_JOINED, &joined))
            .unwrap();
        bus.dispatch(0);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, EventType::DEVICE_JOINED);
        assert_eq!(seen[0].decode::<DeviceAddress>().unwrap(), joined);
        assert_eq!(seen[0].payload().len(), 10);
    }

    // =============================================================================
    // SCENARIO 2: PENDING TABLE EXHAUSTION
    // =============================================================================

    #[test]
    fn test_seventeenth_command_exhausts_table() {
        let c = coordinator();
        let device = Eui64(0x0102_0304_0506_0708);
        c.radio.announce(device, NetAddr(0x4000));
        c.adapter.poll_radio();

        for id in 1..=16 {
            c.adapter
                .send_onoff(device, 1, true, CorrelationId(id))
                .unwrap();
        }
        assert_eq!(c.adapter.pending_count(), 16);

        let err = c
            .adapter
            .send_onoff(device, 1, true, CorrelationId(17))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
        assert_eq!(c.adapter.pending_count(), 16);
        assert_eq!(c.radio.sent_frames().len(), 16);
    }

    // =============================================================================
    // SCENARIO 3: ROUND-ROBIN FAIRNESS
    // =============================================================================

    #[test]
    fn test_round_robin_on_both_backends() {
        for backend in [FibreBackend::Polled, FibreBackend::Threaded] {
            let scheduler = Scheduler::new(SchedulerConfig::for_testing(backend)).unwrap();
            let log = Arc::new(Mutex::new(Vec::new()));
            let ids: Vec<FibreId> = ["A", "B", "C"]
                .into_iter()
                .map(|name| {
                    let log = Arc::clone(&log);
                    scheduler
                        .create(name, 0, move |ctx| async move {
                            loop {
                                log.lock().push(name);
                                ctx.yield_now().await;
                            }
                        })
                        .unwrap()
                })
                .collect();

            let ran: Vec<FibreId> = (0..9).map(|_| scheduler.run_pass()).collect();

            let expected: Vec<FibreId> = ids.iter().copied().cycle().take(9).collect();
            assert_eq!(ran, expected, "backend {backend}");
            assert_eq!(
                *log.lock(),
                vec!["A", "B", "C", "A", "B", "C", "A", "B", "C"]
            );
            for id in ids {
                assert_eq!(scheduler.info(id).unwrap().run_count, 3);
            }
        }
    }

    // =============================================================================
    // SCENARIO 4: UNKNOWN DEVICE
    // =============================================================================

    #[test]
    fn test_unknown_device_has_no_side_effects() {
        let c = coordinator();
        let before = c.bus.stats();

        let err = c
            .adapter
            .send_onoff(Eui64(0xDEAD_BEEF_0000_0001), 1, true, CorrelationId(42))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(c.adapter.pending_count(), 0);
        assert_eq!(c.bus.stats().published, before.published);
        assert!(c.radio.sent_frames().is_empty());
        c.bus.dispatch(0);
        assert!(c.seen.lock().is_empty());
    }

    // =============================================================================
    // SCENARIO 5: LEVEL COMMAND ROUND TRIP
    // =============================================================================

    #[test]
    fn test_level_confirmed_exactly_once() {
        let c = coordinator();
        let device = Eui64(0xAAAA_AAAA_AAAA_AAAA);
        c.radio.announce(device, NetAddr(0x5678));
        c.adapter.poll_radio();
        c.bus.dispatch(0);
        c.seen.lock().clear();

        let tsn = c
            .adapter
            .send_level(device, 1, 50, 10, CorrelationId(7))
            .unwrap();
        let frame = c.radio.last_sent().unwrap();
        assert_eq!(frame.tsn, tsn);
        assert_eq!(frame.destination, NetAddr(0x5678));

        c.radio.complete(tsn, STATUS_OK);
        c.adapter.poll_radio();
        // A duplicate status for the same sequence number is ignored.
        c.radio.complete(tsn, STATUS_OK);
        c.adapter.poll_radio();
        c.adapter.sweep_timeouts();
        c.bus.dispatch(0);

        let seen = c.seen.lock();
        let confirmed: Vec<CommandConfirmed> = seen
            .iter()
            .filter(|e| e.kind == EventType::COMMAND_CONFIRMED)
            .map(|e| e.decode().unwrap())
            .collect();
        assert_eq!(
            confirmed,
            vec![CommandConfirmed {
                correlation_id: CorrelationId(7),
                status: 0
            }]
        );
        assert_eq!(seen[0].correlation_id, CorrelationId(7));
        assert!(seen.iter().all(|e| e.kind != EventType::COMMAND_FAILED));
        assert_eq!(c.adapter.pending_count(), 0);
    }

    // =============================================================================
    // SCENARIO 6: QUEUE OVERFLOW
    // =============================================================================

    #[test]
    fn test_overflow_drops_newest() {
        let bus = bus();
        let seen = recorder(&bus, EventFilter::ALL);

        for i in 0..EVENT_QUEUE_SIZE {
            bus.emit(EventType::USER_BASE, &(i as u16).to_le_bytes())
                .unwrap();
        }
        assert_eq!(
            bus.emit(EventType::USER_BASE, &u16::MAX.to_le_bytes()),
            Err(BusError::QueueFull)
        );
        assert_eq!(bus.stats().dropped, 1);

        assert_eq!(bus.dispatch(0), EVENT_QUEUE_SIZE);
        let order: Vec<u16> = seen
            .lock()
            .iter()
            .map(|e| u16::from_le_bytes([e.payload()[0], e.payload()[1]]))
            .collect();
        assert_eq!(order, (0..EVENT_QUEUE_SIZE as u16).collect::<Vec<_>>());
    }
}
