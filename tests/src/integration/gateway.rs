//! # Gateway End-to-End
//!
//! Drives a fully wired [`GatewayRuntime`] on the polled backend: every
//! service fibre is real, time is advanced by hand one tick at a time.

#[cfg(test)]
mod tests {
    use gateway_runtime::{GatewayConfig, GatewayRuntime};
    use gw_02_zigbee_adapter::{AdapterState, SimulatedRadio, SimulatedRadioControl, STATUS_OK};
    use gw_03_device_registry::NodeState;
    use parking_lot::Mutex;
    use shared_bus::{
        CommandConfirmed, CommandFailed, Envelope, EventFilter, EventHandler, EventType,
    };
    use shared_types::{CorrelationId, Eui64, NetAddr};
    use std::path::Path;
    use std::sync::Arc;

    const BULB: Eui64 = Eui64(0x0017_8801_0A0B_0C0D);
    const PASSES_PER_TICK: usize = 8;

    type Recorded = Arc<Mutex<Vec<Envelope>>>;

    fn boot(config: GatewayConfig) -> (GatewayRuntime<SimulatedRadio>, SimulatedRadioControl) {
        let radio = SimulatedRadio::new();
        let control = radio.control();
        let runtime = GatewayRuntime::new(config, radio).unwrap();
        (runtime, control)
    }

    fn record(runtime: &GatewayRuntime<SimulatedRadio>, filter: EventFilter) -> Recorded {
        let seen: Recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: Arc<dyn EventHandler> = Arc::new(move |e: &Envelope| sink.lock().push(*e));
        runtime.bus().subscribe(filter, handler).unwrap();
        seen
    }

    fn drive(runtime: &GatewayRuntime<SimulatedRadio>, ticks: u32) {
        let scheduler = runtime.scheduler();
        for _ in 0..ticks {
            scheduler.tick_advance();
            scheduler.run_passes(PASSES_PER_TICK);
        }
    }

    fn bring_up(runtime: &GatewayRuntime<SimulatedRadio>) {
        drive(runtime, 100);
        assert_eq!(runtime.adapter().state(), AdapterState::Ready);
        assert!(runtime.network_up());
    }

    fn persistent_config(dir: &Path) -> GatewayConfig {
        let mut config = GatewayConfig::for_testing();
        config.persist.dir = Some(dir.to_path_buf());
        config.persist.flush_interval_ms = 20;
        config.service.registry_persist_ms = 20;
        config.service.restore_registry = true;
        config
    }

    #[test]
    fn test_boot_event_dispatched_first() {
        let (runtime, _radio) = boot(GatewayConfig::for_testing());
        let seen = record(&runtime, EventFilter::ALL);
        drive(&runtime, 1);
        assert_eq!(seen.lock().first().map(|e| e.kind), Some(EventType::BOOT));
    }

    #[test]
    fn test_network_comes_up_and_opens_permit_join() {
        let (runtime, radio) = boot(GatewayConfig::for_testing());
        assert_eq!(runtime.fibres().len(), 6);
        bring_up(&runtime);
        assert!(radio.is_started());
        assert_eq!(radio.permit_join(), 180);
    }

    #[test]
    fn test_permit_join_zero_leaves_network_closed() {
        let mut config = GatewayConfig::for_testing();
        config.zigbee.permit_join_s = 0;
        let (runtime, radio) = boot(config);
        bring_up(&runtime);
        assert_eq!(radio.permit_join(), 0);
    }

    #[test]
    fn test_announce_registers_node() {
        let (runtime, radio) = boot(GatewayConfig::for_testing());
        bring_up(&runtime);

        radio.announce(BULB, NetAddr(0x4A21));
        drive(&runtime, 20);

        assert_eq!(runtime.adapter().lookup(BULB).unwrap().net_addr, NetAddr(0x4A21));
        let registry = runtime.registry().lock();
        let node = registry.find_node(BULB).unwrap();
        assert_eq!(node.net_addr, NetAddr(0x4A21));
        assert_eq!(node.state, NodeState::New);
    }

    #[test]
    fn test_leave_marks_node_left() {
        let (runtime, radio) = boot(GatewayConfig::for_testing());
        bring_up(&runtime);
        radio.announce(BULB, NetAddr(0x4A21));
        drive(&runtime, 20);

        radio.leave(BULB);
        drive(&runtime, 20);

        assert!(runtime.adapter().lookup(BULB).is_none());
        let registry = runtime.registry().lock();
        assert_eq!(registry.find_node(BULB).unwrap().state, NodeState::Left);
    }

    #[test]
    fn test_command_confirmed_through_runtime() {
        let (runtime, radio) = boot(GatewayConfig::for_testing());
        let seen = record(&runtime, EventFilter::only(EventType::COMMAND_CONFIRMED));
        bring_up(&runtime);
        radio.announce(BULB, NetAddr(0x4A21));
        drive(&runtime, 20);

        let tsn = runtime.adapter().send_onoff(BULB, 11, true, CorrelationId(42)).unwrap();
        let frame = radio.last_sent().unwrap();
        assert_eq!(frame.tsn, tsn);
        assert_eq!(frame.destination, NetAddr(0x4A21));

        radio.complete(tsn, STATUS_OK);
        drive(&runtime, 20);

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].decode::<CommandConfirmed>().unwrap(),
            CommandConfirmed {
                correlation_id: CorrelationId(42),
                status: STATUS_OK,
            }
        );
        assert_eq!(runtime.adapter().pending_count(), 0);
    }

    #[test]
    fn test_unanswered_command_times_out_via_sweep_fibre() {
        let mut config = GatewayConfig::for_testing();
        config.zigbee.cmd_timeout_ms = 50;
        config.zigbee.sweep_interval_ms = 10;
        let (runtime, radio) = boot(config);
        let seen = record(&runtime, EventFilter::only(EventType::COMMAND_FAILED));
        bring_up(&runtime);
        radio.announce(BULB, NetAddr(0x4A21));
        drive(&runtime, 20);

        runtime.adapter().send_onoff(BULB, 11, false, CorrelationId(7)).unwrap();
        drive(&runtime, 40);
        assert!(seen.lock().is_empty());
        assert_eq!(runtime.adapter().pending_count(), 1);

        drive(&runtime, 40);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        let failed: CommandFailed = seen[0].decode().unwrap();
        assert_eq!(failed.correlation_id, CorrelationId(7));
        assert!(failed.is_timeout());
        assert_eq!(runtime.adapter().pending_count(), 0);
    }

    #[test]
    fn test_registry_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (runtime, radio) = boot(persistent_config(dir.path()));
            bring_up(&runtime);
            radio.announce(BULB, NetAddr(0x4A21));
            drive(&runtime, 50);
            runtime.shutdown();
            assert_eq!(runtime.store().pending(), 0);
        }

        let (runtime, _radio) = boot(persistent_config(dir.path()));
        let registry = runtime.registry().lock();
        assert_eq!(registry.node_count(), 1);
        assert_eq!(registry.find_node(BULB).unwrap().net_addr, NetAddr(0x4A21));
    }

    #[test]
    fn test_restore_disabled_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (runtime, radio) = boot(persistent_config(dir.path()));
            bring_up(&runtime);
            radio.announce(BULB, NetAddr(0x4A21));
            drive(&runtime, 50);
            runtime.shutdown();
        }

        let mut config = persistent_config(dir.path());
        config.service.restore_registry = false;
        let (runtime, _radio) = boot(config);
        assert!(runtime.registry().lock().is_empty());
    }

    #[test]
    fn test_invalid_config_rejected_before_wiring() {
        let mut config = GatewayConfig::for_testing();
        config.zigbee.channel = 30;
        assert!(GatewayRuntime::new(config, SimulatedRadio::new()).is_err());
    }
}
