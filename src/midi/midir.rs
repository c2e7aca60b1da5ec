// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};

use midir::{
    ConnectError, Ignore, InitError, MidiInput, MidiInputConnection, MidiOutput,
    MidiOutputConnection, SendError,
};
use thiserror::Error;

use super::{MidiTransport, OutputError, OutputResult, TimeStamp, WireMessage};

/// Upper bound on buffered input before messages are dropped.
const INPUT_QUEUE_CAPACITY: usize = 1024;

const CLIENT_NAME: &str = "padio";

#[derive(Debug, Error)]
pub enum PortError {
    #[error("disconnected")]
    Disconnected,
    #[error("no port matching \"{prefix}\"")]
    NoMatchingPort { prefix: String },
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(transparent)]
    ConnectInput(#[from] ConnectError<MidiInput>),
    #[error(transparent)]
    ConnectOutput(#[from] ConnectError<MidiOutput>),
}

impl From<SendError> for OutputError {
    fn from(err: SendError) -> Self {
        OutputError::Send {
            msg: err.to_string().into(),
        }
    }
}

// Adapter for the midir callback closure: runs on the driver thread and
// must only enqueue.
fn enqueue_input(micros: u64, input: &[u8], tx: &mut SyncSender<WireMessage>) {
    let ts = TimeStamp::from_micros(micros);
    log::trace!("Received MIDI input: {ts} {input:02x?}");
    match tx.try_send(WireMessage::received(ts, input)) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            log::warn!("Dropping MIDI input {ts}: queue full");
        }
        Err(TrySendError::Disconnected(_)) => {
            log::debug!("Dropping MIDI input {ts}: receiver gone");
        }
    }
}

/// [`MidiTransport`] driven by [`midir`].
///
/// Input arrives on the midir callback thread and is buffered in a
/// bounded queue; [`MidiTransport::try_recv`] drains that queue without
/// blocking.
#[allow(missing_debug_implementations)]
pub struct MidirTransport {
    input_connection: Option<MidiInputConnection<SyncSender<WireMessage>>>,
    output_connection: Option<MidiOutputConnection>,
    rx: Receiver<WireMessage>,
    port_name: String,
}

impl MidirTransport {
    /// Connect to the first input/output port pair whose name starts
    /// with `port_name_prefix`.
    pub fn connect(port_name_prefix: &str) -> Result<Self, PortError> {
        let mut input = MidiInput::new(CLIENT_NAME)?;
        input.ignore(Ignore::None);
        let output = MidiOutput::new(CLIENT_NAME)?;

        let input_port = input
            .ports()
            .into_iter()
            .find(|port| {
                input
                    .port_name(port)
                    .is_ok_and(|name| name.starts_with(port_name_prefix))
            })
            .ok_or_else(|| PortError::NoMatchingPort {
                prefix: port_name_prefix.to_owned(),
            })?;
        let output_port = output
            .ports()
            .into_iter()
            .find(|port| {
                output
                    .port_name(port)
                    .is_ok_and(|name| name.starts_with(port_name_prefix))
            })
            .ok_or_else(|| PortError::NoMatchingPort {
                prefix: port_name_prefix.to_owned(),
            })?;

        let port_name = input
            .port_name(&input_port)
            .unwrap_or_else(|_| port_name_prefix.to_owned());
        log::debug!("Connecting MIDI ports \"{port_name}\"");

        let (tx, rx) = sync_channel(INPUT_QUEUE_CAPACITY);
        let input_connection = input.connect(
            &input_port,
            &port_name,
            |micros, input, tx| {
                enqueue_input(micros, input, tx);
            },
            tx,
        )?;
        let output_connection = output.connect(&output_port, &port_name)?;

        Ok(Self {
            input_connection: Some(input_connection),
            output_connection: Some(output_connection),
            rx,
            port_name,
        })
    }

    #[must_use]
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Names of all currently available input ports.
    pub fn input_port_names() -> Result<Vec<String>, PortError> {
        let mut input = MidiInput::new(CLIENT_NAME)?;
        input.ignore(Ignore::None);
        Ok(input
            .ports()
            .iter()
            .filter_map(|port| input.port_name(port).ok())
            .collect())
    }
}

impl MidiTransport for MidirTransport {
    fn send(&mut self, message: &WireMessage) -> OutputResult<()> {
        let Some(output_connection) = &mut self.output_connection else {
            return Err(OutputError::Disconnected);
        };
        output_connection.send(&message.bytes).map_err(Into::into)
    }

    fn try_recv(&mut self) -> Option<WireMessage> {
        self.rx.try_recv().ok()
    }

    fn close(&mut self) {
        if let Some(input_connection) = self.input_connection.take() {
            input_connection.close();
        }
        if let Some(output_connection) = self.output_connection.take() {
            output_connection.close();
        }
    }
}

impl Drop for MidirTransport {
    fn drop(&mut self) {
        self.close();
    }
}
