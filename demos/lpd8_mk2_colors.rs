// SPDX-FileCopyrightText: The padio authors
// SPDX-License-Identifier: MPL-2.0

//! Configures LPD8 MK2 pad colors and mirrors toggle state on them.

use std::{sync::Arc, thread, time::Duration};

use padio::{
    devices::akai_lpd8_mk2::Lpd8Mk2, BankConfig, Color, ControlConfig, Controller,
    ControllerConfig, ControllerOptions, ControllerPlugin as _, MidirTransport,
};

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let plugin = Arc::new(Lpd8Mk2::new());
    let transport = MidirTransport::connect(plugin.descriptor().port_name_prefix)?;
    let config = ControllerConfig {
        banks: vec![(
            "program_1".into(),
            BankConfig {
                controls: vec![(
                    "pad_*".into(),
                    ControlConfig {
                        color: Some(Color::BLUE),
                        off_color: Some(Color::OFF),
                        ..Default::default()
                    },
                )],
            },
        )],
        ..Default::default()
    };
    let mut controller = Controller::new(
        plugin,
        Arc::new(std::sync::Mutex::new(transport)),
        ControllerOptions {
            config: Some(config),
            ..Default::default()
        },
    )?;
    controller.connect()?;

    controller.on_category("pad", |notification| {
        println!(
            "{control_id} is {state}",
            control_id = notification.control_id,
            state = if notification.state.is_on() { "on" } else { "off" },
        );
    });

    println!("Toggle some pads (Ctrl-C to quit)");
    loop {
        controller.process_events()?;
        thread::sleep(Duration::from_millis(1));
    }
}
