// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

//! Connects to an X-Touch Mini and prints every state change.

use std::{thread, time::Duration};

use padio::{Controller, ControllerOptions, ControlType};

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let mut controller = Controller::auto(ControllerOptions::default())?;
    controller.connect()?;

    controller.on_global(|notification| {
        println!(
            "{control_id}: {delta:?}",
            control_id = notification.control_id,
            delta = notification.delta,
        );
    });
    controller.on_type(ControlType::Continuous, |notification| {
        if let Some(normalized) = notification.state.normalized_value() {
            println!(
                "{control_id} at {percent:.0}%",
                control_id = notification.control_id,
                percent = normalized * 100.0,
            );
        }
    });
    controller.on_bank_change(|bank_id| {
        println!("Active layer: {bank_id}");
    });

    println!("Monitoring (Ctrl-C to quit)");
    loop {
        controller.process_events()?;
        thread::sleep(Duration::from_millis(1));
    }
}
