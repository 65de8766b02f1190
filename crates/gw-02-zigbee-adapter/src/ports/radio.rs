//! # Radio Port
//!
//! The vendor Zigbee stack, seen as an opaque, non-reentrant peer.
//!
//! - Every call into a [`RadioStack`] happens with the adapter's exclusive
//!   radio lock held.
//! - The stack delivers signals and completions only from inside
//!   [`RadioStack::poll`], so callbacks run on the radio thread with that
//!   lock held. Callbacks must not call back into the stack; work the stack
//!   must do in response is returned as a [`SignalAction`].

use crate::domain::command::ZclCommand;
use shared_types::{AttributeId, ClusterId, Endpoint, Eui64, NetAddr, Tsn};
use thiserror::Error;

/// Vendor status code; 0 is success.
pub type RadioStatus = u16;

/// Status value reported for success.
pub const STATUS_OK: RadioStatus = 0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadioError {
    #[error("radio stack not started")]
    NotStarted,
    #[error("radio rejected request with status {0}")]
    Rejected(RadioStatus),
}

/// Network parameters handed to the stack at init.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioConfig {
    pub pan_id: u16,
    pub channel: u8,
    pub max_children: u16,
}

/// Application signals raised by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioSignal {
    /// The stack finished starting. `first_start` is false after a reboot
    /// with a stored network.
    StackStarted {
        first_start: bool,
        status: RadioStatus,
    },
    /// Network formation finished.
    Formation {
        status: RadioStatus,
        pan_id: u16,
        channel: u8,
    },
    DeviceAnnounce {
        identity: Eui64,
        net_addr: NetAddr,
    },
    LeaveIndication {
        identity: Eui64,
    },
    /// Permit-join window changed; 0 means closed.
    PermitJoinStatus {
        seconds: u8,
    },
    /// Any signal the adapter does not act on.
    Other {
        code: u16,
        status: RadioStatus,
    },
}

/// What the stack should do after a signal was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    None,
    /// Begin network formation commissioning.
    StartFormation,
}

/// An unsolicited attribute report as delivered by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RadioReport<'a> {
    pub source: NetAddr,
    pub endpoint: Endpoint,
    pub cluster: ClusterId,
    pub attribute: AttributeId,
    pub data_type: u8,
    pub value: &'a [u8],
}

/// Callbacks the stack invokes from [`RadioStack::poll`].
///
/// Implementations must finish in bounded time, never block on the radio
/// lock and never panic.
pub trait RadioCallbacks: Send + Sync {
    fn on_signal(&self, signal: RadioSignal) -> SignalAction;

    /// Completion of a previously sent command, matched by TSN.
    fn on_send_status(&self, tsn: Tsn, status: RadioStatus);

    fn on_attribute_report(&self, report: &RadioReport<'_>);
}

/// Driven port to the vendor stack.
pub trait RadioStack: Send + 'static {
    fn init(&mut self, config: RadioConfig) -> Result<(), RadioError>;

    /// Starts the stack. Completion arrives as [`RadioSignal::StackStarted`].
    fn start(&mut self) -> Result<(), RadioError>;

    /// Runs one iteration of the stack main loop, delivering any due
    /// callbacks. Returns the number of callbacks delivered.
    fn poll(&mut self, callbacks: &dyn RadioCallbacks) -> usize;

    /// Opens the network for joining for `seconds` (0 closes it).
    fn open_network(&mut self, seconds: u8) -> Result<(), RadioError>;

    /// Sends a ZCL/ZDO command and returns its sequence number.
    fn send(
        &mut self,
        destination: NetAddr,
        endpoint: Endpoint,
        command: &ZclCommand,
    ) -> Result<Tsn, RadioError>;
}
