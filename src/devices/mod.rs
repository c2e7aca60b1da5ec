// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

#[cfg(feature = "generic-midi")]
pub mod generic_midi;

#[cfg(feature = "behringer-x-touch-mini")]
pub mod behringer_x_touch_mini;

#[cfg(feature = "akai-lpd8-mk2")]
pub mod akai_lpd8_mk2;

/// Registry entries for all compiled-in device plugins.
///
/// The generic MIDI plugin is deliberately absent: it matches any port
/// and would shadow real devices during auto-detection. Construct it
/// explicitly when needed.
pub(crate) fn builtin_plugins() -> Vec<crate::registry::RegistryEntry> {
    #[allow(unused_mut)]
    let mut entries = Vec::new();
    #[cfg(feature = "behringer-x-touch-mini")]
    entries.push(behringer_x_touch_mini::registry_entry());
    #[cfg(feature = "akai-lpd8-mk2")]
    entries.push(akai_lpd8_mk2::registry_entry());
    entries
}
