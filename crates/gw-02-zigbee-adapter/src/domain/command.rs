//! # ZCL Commands
//!
//! The closed set of commands the adapter issues. Each variant is
//! validated before any state is touched; out-of-range values are rejected,
//! never clamped.

use super::errors::ZigbeeError;
use heapless::Vec as HeaplessVec;
use shared_types::limits::MAX_READ_ATTRIBUTES;
use shared_types::{clusters, AttributeId, ClusterId};

/// Highest valid Move-to-Level level (255 is reserved by ZCL).
pub const MAX_LEVEL: u8 = 254;

/// ZCL command identifiers recorded with pending slots.
pub mod command_ids {
    pub const OFF: u8 = 0x00;
    pub const ON: u8 = 0x01;
    pub const MOVE_TO_LEVEL: u8 = 0x00;
    pub const READ_ATTRIBUTES: u8 = 0x00;
    pub const CONFIGURE_REPORTING: u8 = 0x06;
    pub const BIND_REQUEST: u8 = 0x21;
}

/// Attribute reporting parameters for one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportingConfig {
    pub cluster: ClusterId,
    pub attribute: AttributeId,
    pub data_type: u8,
    /// Seconds.
    pub min_interval: u16,
    /// Seconds.
    pub max_interval: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZclCommand {
    OnOff {
        on: bool,
    },
    MoveToLevel {
        level: u8,
        /// Tenths of a second.
        transition_ds: u16,
    },
    ReadAttributes {
        cluster: ClusterId,
        attributes: HeaplessVec<AttributeId, MAX_READ_ATTRIBUTES>,
    },
    ConfigureReporting(ReportingConfig),
    Bind {
        cluster: ClusterId,
    },
}

impl ZclCommand {
    /// Builds a level command.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for `level > 254`.
    pub fn move_to_level(level: u8, transition_ds: u16) -> Result<Self, ZigbeeError> {
        if level > MAX_LEVEL {
            return Err(ZigbeeError::InvalidArgument(format!(
                "level {level} exceeds {MAX_LEVEL}"
            )));
        }
        Ok(Self::MoveToLevel {
            level,
            transition_ds,
        })
    }

    /// Builds a read-attributes command.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty list or more than 8 attributes.
    pub fn read_attributes(
        cluster: ClusterId,
        attributes: &[AttributeId],
    ) -> Result<Self, ZigbeeError> {
        if attributes.is_empty() {
            return Err(ZigbeeError::InvalidArgument(
                "attribute list is empty".into(),
            ));
        }
        let attributes = HeaplessVec::from_slice(attributes).map_err(|()| {
            ZigbeeError::InvalidArgument(format!(
                "{} attributes exceeds {MAX_READ_ATTRIBUTES}",
                attributes.len()
            ))
        })?;
        Ok(Self::ReadAttributes {
            cluster,
            attributes,
        })
    }

    /// Builds a configure-reporting command.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `min_interval > max_interval`.
    pub fn configure_reporting(config: ReportingConfig) -> Result<Self, ZigbeeError> {
        if config.min_interval > config.max_interval {
            return Err(ZigbeeError::InvalidArgument(format!(
                "min_interval {} exceeds max_interval {}",
                config.min_interval, config.max_interval
            )));
        }
        Ok(Self::ConfigureReporting(config))
    }

    pub const fn cluster(&self) -> ClusterId {
        match self {
            Self::OnOff { .. } => clusters::ON_OFF,
            Self::MoveToLevel { .. } => clusters::LEVEL_CONTROL,
            Self::ReadAttributes { cluster, .. } | Self::Bind { cluster } => *cluster,
            Self::ConfigureReporting(config) => config.cluster,
        }
    }

    pub const fn command_id(&self) -> u8 {
        match self {
            Self::OnOff { on: true } => command_ids::ON,
            Self::OnOff { on: false } => command_ids::OFF,
            Self::MoveToLevel { .. } => command_ids::MOVE_TO_LEVEL,
            Self::ReadAttributes { .. } => command_ids::READ_ATTRIBUTES,
            Self::ConfigureReporting(_) => command_ids::CONFIGURE_REPORTING,
            Self::Bind { .. } => command_ids::BIND_REQUEST,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::OnOff { .. } => "on_off",
            Self::MoveToLevel { .. } => "move_to_level",
            Self::ReadAttributes { .. } => "read_attributes",
            Self::ConfigureReporting(_) => "configure_reporting",
            Self::Bind { .. } => "bind",
        }
    }
}
