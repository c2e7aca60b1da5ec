// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

use crate::{
    BankId, BankSwitchMode, Color, ControlDefinition, ControlId, MidiDeviceDescriptor, TimeStamp,
    WireMessage,
};

/// Canonical event decoded from one wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInputEvent {
    /// Input on one control.
    Control {
        ts: TimeStamp,
        control_id: ControlId,
        /// Raw device value (velocity, CC value, ...).
        value: u16,
        /// The bank the wire encoding implies, for devices that encode
        /// the active layer in the message itself rather than sending a
        /// dedicated switch message. `None` means "the active bank".
        bank_id: Option<BankId>,
    },
    /// The device reported its active bank.
    BankReported { ts: TimeStamp, bank_id: BankId },
}

/// Control layout declared by a plugin at connection time.
///
/// Every bank shares the address namespace semantics: the same control
/// id in two banks denotes two distinct physical controls.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub switch_mode: BankSwitchMode,
    pub initial_bank: BankId,
    pub banks: Vec<(BankId, Vec<ControlDefinition>)>,
}

/// State view handed to [`ControllerPlugin::encode`] when feedback is
/// due: only what the hardware can reflect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackState {
    pub is_on: bool,
    pub value: u16,
    pub color: Option<Color>,
}

/// Device-specific translator between wire messages and canonical
/// events/commands.
///
/// The engine depends only on this interface; adding a device never
/// touches the engine. Implementations are stateless with respect to
/// control state (the engine owns that) and must be shareable across
/// the ingestion and application threads.
pub trait ControllerPlugin: Send + Sync {
    fn descriptor(&self) -> &MidiDeviceDescriptor;

    /// The control layout, queried once during connection.
    fn layout(&self) -> Layout;

    /// Translate a wire message into a canonical input event.
    ///
    /// Returning `None` is not an error: devices emit traffic the
    /// abstraction has no use for (clock, aftertouch, ...).
    fn decode(&self, message: &WireMessage) -> Option<RawInputEvent>;

    /// Translate a control's feedback-relevant state into the wire
    /// message that makes the hardware reflect it.
    ///
    /// The bank identifies which physical control the id denotes on
    /// devices where the same id exists in several banks.
    ///
    /// Returns `None` for controls without any feedback surface.
    fn encode(
        &self,
        bank_id: &BankId,
        control_id: &ControlId,
        state: &FeedbackState,
    ) -> Option<WireMessage>;

    /// The device-specific bank switch command.
    ///
    /// Only meaningful for software-managed banking; the default covers
    /// hardware-managed devices.
    fn switch_bank_command(&self, bank_id: &BankId) -> Option<WireMessage> {
        let _ = bank_id;
        None
    }

    /// Messages that bring the device into a known state on connect.
    fn init_messages(&self) -> Vec<WireMessage> {
        Vec::new()
    }

    /// Messages that clean the device up on disconnect.
    fn shutdown_messages(&self) -> Vec<WireMessage> {
        Vec::new()
    }
}
