//! Connected radio.

use log::{debug, info};
use rand::RngCore;

use crate::device::firmware::{FirmwareClassification, classify, extract_version_string};
use crate::device::probe::probe_capacity_with;
use crate::error::Result;
use crate::memory::{AddressSpace, CapacityTier};
use crate::port::Port;
use crate::protocol::command::CommandFrame;
use crate::transfer::TransferEngine;
use crate::transport::{Transport, TransportConfig};

/// What the radio can do, fixed at connect time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceCapability {
    /// Firmware classification.
    pub firmware: FirmwareClassification,
    /// Detected EEPROM size.
    pub tier: CapacityTier,
}

/// An open connection to one radio.
///
/// Owns the port for its whole lifetime. The port is released on
/// [`DeviceSession::close`] or when the session is dropped.
pub struct DeviceSession<P: Port> {
    transport: Transport<P>,
    capability: DeviceCapability,
}

impl<P: Port> DeviceSession<P> {
    /// Handshake with the radio on `port` using default settings.
    pub fn connect(port: P) -> Result<Self> {
        Self::connect_with(port, TransportConfig::default())
    }

    /// Handshake with the radio on `port`.
    pub fn connect_with(port: P, config: TransportConfig) -> Result<Self> {
        Self::connect_with_rng(port, config, &mut rand::thread_rng())
    }

    /// Handshake with the radio, drawing capacity probe patterns from `rng`.
    pub fn connect_with_rng<R: RngCore + ?Sized>(
        port: P,
        config: TransportConfig,
        rng: &mut R,
    ) -> Result<Self> {
        info!("Connecting to radio on {}...", port.name());
        let mut transport = Transport::new(port, config)?;

        let reply = transport.hello()?;
        let version = extract_version_string(&reply);
        let firmware = classify(&version);
        info!("Firmware: {firmware}");

        let tier = if firmware.is_capable() {
            probe_capacity_with(&mut transport, rng)?
        } else {
            debug!("Firmware cannot address the extended EEPROM, assuming {}", CapacityTier::Stock);
            CapacityTier::Stock
        };

        Ok(Self {
            transport,
            capability: DeviceCapability { firmware, tier },
        })
    }

    /// Capability detected at connect time.
    pub fn capability(&self) -> &DeviceCapability {
        &self.capability
    }

    /// Firmware classification.
    pub fn firmware(&self) -> &FirmwareClassification {
        &self.capability.firmware
    }

    /// Version string reported by the radio.
    pub fn version(&self) -> &str {
        &self.capability.firmware.raw
    }

    /// Detected capacity tier.
    pub fn tier(&self) -> CapacityTier {
        self.capability.tier
    }

    /// Address space of the radio.
    pub fn address_space(&self) -> AddressSpace {
        AddressSpace::new(self.capability.tier)
    }

    /// Page transfer engine bound to this session.
    pub fn engine(&mut self) -> TransferEngine<'_, P> {
        let space = self.address_space();
        TransferEngine::new(&mut self.transport, space)
    }

    /// Borrow the transport.
    pub fn transport_mut(&mut self) -> &mut Transport<P> {
        &mut self.transport
    }

    /// Reboot the radio. No reply is expected.
    pub fn reset(&mut self) -> Result<()> {
        info!("Resetting radio...");
        self.transport.request(&CommandFrame::reset())?;
        Ok(())
    }

    /// Close the port.
    pub fn close(mut self) -> Result<()> {
        self.transport.port_mut().close()
    }
}

#[cfg(feature = "native")]
impl DeviceSession<crate::port::NativePort> {
    /// Open a serial port and connect to the radio on it.
    pub fn open(config: &crate::port::SerialConfig) -> Result<Self> {
        let port = crate::port::NativePort::open(config)?;
        Self::connect_with(
            port,
            TransportConfig {
                timeout: config.timeout,
                ..TransportConfig::default()
            },
        )
    }
}
