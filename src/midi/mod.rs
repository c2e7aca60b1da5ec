// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

use std::borrow::Cow;

use thiserror::Error;

#[cfg(feature = "midir")]
pub(crate) mod midir;

/// Timestamp of a wire message, microseconds since an arbitrary origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeStamp(u64);

impl TimeStamp {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    #[must_use]
    pub const fn to_micros(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{micros}\u{b5}s", micros = self.0)
    }
}

/// One raw MIDI message as it appears on the wire.
///
/// Outbound messages carry [`TimeStamp::ZERO`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    pub ts: TimeStamp,
    pub bytes: Vec<u8>,
}

impl WireMessage {
    #[must_use]
    pub fn received(ts: TimeStamp, bytes: &[u8]) -> Self {
        Self {
            ts,
            bytes: bytes.to_vec(),
        }
    }

    #[must_use]
    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::outbound(vec![0x90 | (channel & 0x0f), note & 0x7f, velocity & 0x7f])
    }

    #[must_use]
    pub fn note_off(channel: u8, note: u8) -> Self {
        Self::outbound(vec![0x80 | (channel & 0x0f), note & 0x7f, 0x00])
    }

    #[must_use]
    pub fn control_change(channel: u8, control: u8, value: u8) -> Self {
        Self::outbound(vec![0xb0 | (channel & 0x0f), control & 0x7f, value & 0x7f])
    }

    #[must_use]
    pub fn program_change(channel: u8, program: u8) -> Self {
        Self::outbound(vec![0xc0 | (channel & 0x0f), program & 0x7f])
    }

    /// Build a complete SysEx message from its payload (without the
    /// surrounding `F0`/`F7` framing bytes).
    #[must_use]
    pub fn sysex(payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(payload.len() + 2);
        bytes.push(0xf0);
        bytes.extend_from_slice(payload);
        bytes.push(0xf7);
        Self::outbound(bytes)
    }

    fn outbound(bytes: Vec<u8>) -> Self {
        Self {
            ts: TimeStamp::ZERO,
            bytes,
        }
    }
}

/// Vendor/model identification of a supported device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub vendor_name: Cow<'static, str>,
    pub model_name: Cow<'static, str>,
}

impl DeviceDescriptor {
    #[must_use]
    pub fn name(&self) -> String {
        format!(
            "{vendor} {model}",
            vendor = self.vendor_name,
            model = self.model_name
        )
    }
}

/// MIDI-related, extended [`DeviceDescriptor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiDeviceDescriptor {
    pub device: DeviceDescriptor,
    pub port_name_prefix: &'static str,
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("disconnected")]
    Disconnected,
    #[error("send: {msg}")]
    Send { msg: Cow<'static, str> },
}

pub type OutputResult<T> = std::result::Result<T, OutputError>;

/// Byte-level connection to one device.
///
/// `try_recv` never blocks: the implementation is expected to buffer
/// incoming messages (e.g. from a driver callback thread) and hand them
/// out on demand. `send` may fail but must not block indefinitely.
pub trait MidiTransport: Send {
    fn send(&mut self, message: &WireMessage) -> OutputResult<()>;

    /// Next buffered incoming message, if any.
    fn try_recv(&mut self) -> Option<WireMessage>;

    /// Release the underlying connection. Idempotent.
    fn close(&mut self);
}

/// In-memory transport for tests and demos without hardware.
///
/// Everything sent is recorded; incoming traffic is injected by the
/// test through [`LoopbackTransport::push_incoming`].
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    incoming: std::collections::VecDeque<WireMessage>,
    pub sent: Vec<WireMessage>,
    closed: bool,
}

impl LoopbackTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_incoming(&mut self, message: WireMessage) {
        self.incoming.push_back(message);
    }
}

impl MidiTransport for LoopbackTransport {
    fn send(&mut self, message: &WireMessage) -> OutputResult<()> {
        if self.closed {
            return Err(OutputError::Disconnected);
        }
        self.sent.push(message.clone());
        Ok(())
    }

    fn try_recv(&mut self) -> Option<WireMessage> {
        self.incoming.pop_front()
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
