// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

use std::sync::Arc;

use crate::{ControllerPlugin, MidiDeviceDescriptor};

type NewPlugin = fn() -> Arc<dyn ControllerPlugin>;

/// One supported device family: its descriptor plus a constructor for
/// the matching plugin.
#[derive(Clone)]
pub struct RegistryEntry {
    pub descriptor: &'static MidiDeviceDescriptor,
    pub new_plugin: NewPlugin,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Maps device descriptors to plugin constructors for auto-detection.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    entries: Vec<RegistryEntry>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with all compiled-in device plugins.
    #[must_use]
    pub fn with_builtin_plugins() -> Self {
        let mut registry = Self::new();
        for entry in crate::devices::builtin_plugins() {
            registry.register(entry);
        }
        registry
    }

    pub fn register(&mut self, entry: RegistryEntry) {
        log::debug!(
            "Registering plugin for {device_name}",
            device_name = entry.descriptor.device.name()
        );
        self.entries.push(entry);
    }

    #[must_use]
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Find the plugin whose device name matches `model_name`.
    #[must_use]
    pub fn by_model_name(&self, model_name: &str) -> Option<Arc<dyn ControllerPlugin>> {
        self.entries
            .iter()
            .find(|entry| entry.descriptor.device.model_name == model_name)
            .map(|entry| (entry.new_plugin)())
    }

    /// Match available port names against registered descriptors.
    ///
    /// Returns the first registered plugin whose port name prefix
    /// matches any of the given ports, together with the matched port
    /// name.
    #[must_use]
    pub fn detect<'a>(
        &self,
        port_names: impl IntoIterator<Item = &'a str>,
    ) -> Option<(Arc<dyn ControllerPlugin>, String)> {
        for port_name in port_names {
            let Some(entry) = self
                .entries
                .iter()
                .find(|entry| port_name.starts_with(entry.descriptor.port_name_prefix))
            else {
                log::debug!("Port \"{port_name}\" does not belong to a supported device");
                continue;
            };
            log::info!(
                "Detected {device_name} on port \"{port_name}\"",
                device_name = entry.descriptor.device.name()
            );
            return Some(((entry.new_plugin)(), port_name.to_owned()));
        }
        None
    }
}
