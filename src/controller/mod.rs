// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use crate::{
    config::ConfigError, BankId, ControlId, ControlStateEngine, ControlState, ControlType,
    ControllerConfig, ControllerPlugin, DispatchHub, EngineError, FeedbackPolicy, HandlerId,
    MidiTransport, Notification, OutputError, StateDelta, StateUpdate, ValidationMode,
};


#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("not connected")]
    NotConnected,
    #[cfg(feature = "midir")]
    #[error("no supported device detected")]
    NoDeviceDetected,
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Output(#[from] OutputError),
    #[cfg(feature = "midir")]
    #[error(transparent)]
    Port(#[from] crate::PortError),
}

/// Construction-time options of a [`Controller`].
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Whether capability violations are hard errors (`true`, the
    /// default) or degrade to warnings with partial application.
    pub strict_mode: bool,
    pub feedback_policy: FeedbackPolicy,
    /// User overrides applied over the plugin's declared layout.
    pub config: Option<ControllerConfig>,
    /// Establish the connection during construction.
    pub auto_connect: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            strict_mode: true,
            feedback_policy: FeedbackPolicy::default(),
            config: None,
            auto_connect: false,
        }
    }
}

impl ControllerOptions {
    const fn validation_mode(&self) -> ValidationMode {
        if self.strict_mode {
            ValidationMode::Strict
        } else {
            ValidationMode::Permissive
        }
    }
}

/// Public entry point wiring transport, plugin, engine, and dispatch.
///
/// Two threads may use a controller concurrently: one driving
/// [`Controller::process_events`], one issuing state commands and
/// (un)registering observers.
#[allow(missing_debug_implementations)]
pub struct Controller {
    plugin: Arc<dyn ControllerPlugin>,
    hub: Arc<DispatchHub>,
    transport: Arc<Mutex<dyn MidiTransport>>,
    engine: Option<Arc<ControlStateEngine>>,
    options: ControllerOptions,
}

impl Controller {
    /// Build a controller from an explicit plugin and transport.
    pub fn new(
        plugin: Arc<dyn ControllerPlugin>,
        transport: Arc<Mutex<dyn MidiTransport>>,
        options: ControllerOptions,
    ) -> Result<Self, ControllerError> {
        let mut controller = Self {
            plugin,
            hub: Arc::new(DispatchHub::new()),
            transport,
            engine: None,
            options,
        };
        if controller.options.auto_connect {
            controller.connect()?;
        }
        Ok(controller)
    }

    /// Auto-detect a supported device on the available MIDI ports.
    #[cfg(feature = "midir")]
    pub fn auto(options: ControllerOptions) -> Result<Self, ControllerError> {
        let registry = crate::PluginRegistry::with_builtin_plugins();
        let port_names = crate::MidirTransport::input_port_names()?;
        let Some((plugin, _port_name)) =
            registry.detect(port_names.iter().map(String::as_str))
        else {
            return Err(ControllerError::NoDeviceDetected);
        };
        let transport =
            crate::MidirTransport::connect(plugin.descriptor().port_name_prefix)?;
        Self::new(plugin, Arc::new(Mutex::new(transport)), options)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.engine.is_some()
    }

    #[must_use]
    pub fn plugin(&self) -> &Arc<dyn ControllerPlugin> {
        &self.plugin
    }

    /// Create all controls from the plugin layout (with configuration
    /// overrides applied) and bring the device into a known state.
    pub fn connect(&mut self) -> Result<(), ControllerError> {
        if self.is_connected() {
            log::warn!("Already connected");
            return Ok(());
        }
        let mut layout = self.plugin.layout();
        if let Some(config) = &self.options.config {
            layout = config.resolve_layout(layout)?;
        }
        let engine = Arc::new(ControlStateEngine::new(
            Arc::clone(&self.plugin),
            Arc::clone(&self.hub),
            layout,
            Some(Arc::clone(&self.transport)),
            self.options.feedback_policy,
        ));
        for message in self.plugin.init_messages() {
            self.send(&message)?;
        }
        self.engine = Some(engine);
        log::info!(
            "Connected to {device_name}",
            device_name = self.plugin.descriptor().device.name()
        );
        Ok(())
    }

    /// Clean the device up and release the transport. Idempotent.
    pub fn disconnect(&mut self) {
        if self.engine.take().is_none() {
            return;
        }
        for message in self.plugin.shutdown_messages() {
            if let Err(err) = self.send(&message) {
                log::warn!("Failed to send shutdown message: {err}");
            }
        }
        self.lock_transport().close();
        log::info!("Disconnected");
    }

    /// Drain all pending input once.
    ///
    /// Decodes and applies every buffered wire message, then flushes
    /// feedback queued under the deferred policy. Returns the number of
    /// wire messages taken off the transport. Transport and structural
    /// errors are surfaced; already-applied changes stay applied.
    pub fn process_events(&self) -> Result<usize, ControllerError> {
        let engine = self.engine()?;
        let mut processed = 0;
        loop {
            let Some(message) = self.lock_transport().try_recv() else {
                break;
            };
            processed += 1;
            let Some(event) = self.plugin.decode(&message) else {
                log::debug!(
                    "No mapping for wire message {bytes:02x?}",
                    bytes = message.bytes
                );
                continue;
            };
            engine.apply_input(event)?;
        }
        for message in engine.take_pending_output() {
            self.send(&message)?;
        }
        Ok(processed)
    }

    /// Set control state programmatically, with hardware feedback where
    /// the device needs it.
    pub fn set_state(
        &self,
        control_id: impl Into<ControlId>,
        update: StateUpdate,
    ) -> Result<StateDelta, ControllerError> {
        let engine = self.engine()?;
        let delta =
            engine.apply_command(&control_id.into(), &update, self.options.validation_mode())?;
        if matches!(self.options.feedback_policy, FeedbackPolicy::Deferred) {
            for message in engine.take_pending_output() {
                self.send(&message)?;
            }
        }
        Ok(delta)
    }

    /// Whether [`Controller::set_state`] would succeed in strict mode.
    #[must_use]
    pub fn can_set_state(&self, control_id: impl Into<ControlId>, update: &StateUpdate) -> bool {
        self.engine
            .as_ref()
            .is_some_and(|engine| engine.can_set_state(&control_id.into(), update))
    }

    /// Snapshot of a control's state in the active bank.
    #[must_use]
    pub fn state(&self, control_id: impl Into<ControlId>) -> Option<ControlState> {
        self.engine.as_ref()?.state(&control_id.into())
    }

    #[must_use]
    pub fn active_bank(&self) -> Option<BankId> {
        Some(self.engine.as_ref()?.active_bank())
    }

    /// Software-initiated bank switch.
    pub fn switch_bank(&self, bank_id: impl Into<BankId>) -> Result<(), ControllerError> {
        self.engine()?.switch_bank(&bank_id.into()).map_err(Into::into)
    }

    #[must_use]
    pub fn discovered_controls(&self) -> Vec<ControlId> {
        self.engine
            .as_ref()
            .map(|engine| engine.discovered_controls())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn undiscovered_controls(&self) -> Vec<ControlId> {
        self.engine
            .as_ref()
            .map(|engine| engine.undiscovered_controls())
            .unwrap_or_default()
    }

    /// Most recent accepted changes, oldest first.
    #[must_use]
    pub fn change_log(&self, limit: usize) -> Vec<(ControlId, StateDelta)> {
        self.engine
            .as_ref()
            .map(|engine| engine.change_log(limit))
            .unwrap_or_default()
    }

    pub fn on_control(
        &self,
        control_id: impl Into<ControlId>,
        handler: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> HandlerId {
        self.hub.register_by_control(control_id, handler)
    }

    pub fn on_type(
        &self,
        control_type: ControlType,
        handler: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> HandlerId {
        self.hub.register_by_type(control_type, handler)
    }

    pub fn on_category(
        &self,
        category: &'static str,
        handler: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> HandlerId {
        self.hub.register_by_category(category, handler)
    }

    pub fn on_global(
        &self,
        handler: impl Fn(&Notification) + Send + Sync + 'static,
    ) -> HandlerId {
        self.hub.register_global(handler)
    }

    pub fn on_bank_change(
        &self,
        handler: impl Fn(&BankId) + Send + Sync + 'static,
    ) -> HandlerId {
        self.hub.register_bank(handler)
    }

    pub fn unregister(&self, handler_id: HandlerId) -> bool {
        self.hub.unregister(handler_id)
    }

    fn engine(&self) -> Result<&Arc<ControlStateEngine>, ControllerError> {
        self.engine.as_ref().ok_or(ControllerError::NotConnected)
    }

    fn send(&self, message: &crate::WireMessage) -> Result<(), ControllerError> {
        self.lock_transport().send(message).map_err(Into::into)
    }

    fn lock_transport(&self) -> std::sync::MutexGuard<'_, dyn MidiTransport + 'static> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.disconnect();
    }
}
