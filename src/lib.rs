// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

#![allow(rustdoc::invalid_rust_codeblocks)]
#![doc = include_str!("../README.md")]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(unreachable_pub)]
#![warn(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(rustdoc::broken_intra_doc_links)]
// Repetitions of module/type names occur frequently when using many
// modules for keeping the size of the source files handy. Often
// types have the same name as their parent module.
#![allow(clippy::module_name_repetitions)]
// Repeating the type name in `..Default::default()` expressions
// is not needed since the context is obvious.
#![allow(clippy::default_trait_access)]

pub mod bank;
pub use self::bank::{BankError, BankId, BankResolver, BankSwitchMode};

pub mod config;
pub use self::config::{BankConfig, ConfigError, ControlConfig, ControllerConfig};

pub mod control;
pub use self::control::{
    CapabilitySet, Color, Control, ControlDefinition, ControlId, ControlState, ControlType,
    StateDelta, StateUpdate,
};

pub mod controller;
pub use self::controller::{Controller, ControllerError, ControllerOptions};

pub mod devices;

pub mod dispatch;
pub use self::dispatch::{DispatchHub, HandlerId, Notification};

pub mod engine;
pub use self::engine::{ControlStateEngine, EngineError, FeedbackPolicy};

pub mod midi;
pub use self::midi::{
    DeviceDescriptor, LoopbackTransport, MidiDeviceDescriptor, MidiTransport, OutputError,
    OutputResult, TimeStamp, WireMessage,
};
#[cfg(feature = "midir")]
pub use self::midi::midir::{MidirTransport, PortError};

pub mod plugin;
pub use self::plugin::{ControllerPlugin, FeedbackState, Layout, RawInputEvent};

pub mod registry;
pub use self::registry::{PluginRegistry, RegistryEntry};

pub mod validate;
pub use self::validate::{CapabilityError, ValidationMode};
