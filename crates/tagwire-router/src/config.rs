use std::time::Duration;

use crate::error::{Result, RouterError};

/// Default capacity of the intake, delivery and outgoing buffers.
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Default window in which a failing transporter start is reported.
pub const DEFAULT_PREPARE_PERIOD: Duration = Duration::from_secs(1);

/// Router construction options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Queue decoded messages for `recv`.
    pub enable_recv: bool,
    /// Run registered handlers on the dispatch thread.
    pub enable_handler: bool,
    /// Decoded messages waiting for dispatch.
    pub intake_capacity: usize,
    /// Messages waiting for `recv`.
    pub delivery_capacity: usize,
    /// Messages waiting to be encoded and sent.
    pub outgoing_capacity: usize,
    /// How long `start` waits for the transporter to report a start failure.
    pub prepare_period: Duration,
}

impl RouterConfig {
    pub fn new(enable_recv: bool, enable_handler: bool) -> Self {
        Self {
            enable_recv,
            enable_handler,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.enable_recv && !self.enable_handler {
            return Err(RouterError::NoDeliveryMode);
        }
        for (name, capacity) in [
            ("intake_capacity", self.intake_capacity),
            ("delivery_capacity", self.delivery_capacity),
            ("outgoing_capacity", self.outgoing_capacity),
        ] {
            if capacity == 0 {
                return Err(RouterError::InvalidConfig(format!(
                    "{name} must be at least 1"
                )));
            }
        }
        if self.prepare_period.is_zero() {
            return Err(RouterError::InvalidConfig(
                "prepare_period must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            enable_recv: true,
            enable_handler: true,
            intake_capacity: DEFAULT_BUFFER_CAPACITY,
            delivery_capacity: DEFAULT_BUFFER_CAPACITY,
            outgoing_capacity: DEFAULT_BUFFER_CAPACITY,
            prepare_period: DEFAULT_PREPARE_PERIOD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_enables_both_modes() {
        let config = RouterConfig::default();
        assert!(config.enable_recv);
        assert!(config.enable_handler);
        assert_eq!(config.outgoing_capacity, DEFAULT_BUFFER_CAPACITY);
        assert_eq!(config.prepare_period, Duration::from_secs(1));
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn rejects_no_delivery_mode() {
        let result = RouterConfig::new(false, false).validate();
        assert!(matches!(result, Err(RouterError::NoDeliveryMode)));
    }

    #[test]
    fn rejects_zero_capacity() {
        let config = RouterConfig {
            delivery_capacity: 0,
            ..RouterConfig::default()
        };
        match config.validate() {
            Err(RouterError::InvalidConfig(msg)) => assert!(msg.contains("delivery_capacity")),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_prepare_period() {
        let config = RouterConfig {
            prepare_period: Duration::ZERO,
            ..RouterConfig::default()
        };
        match config.validate() {
            Err(RouterError::InvalidConfig(msg)) => assert!(msg.contains("prepare_period")),
            other => panic!("expected InvalidConfig, got {other:?}"),
        }
    }
}
