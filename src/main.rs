/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use clap::Parser;
use newt::{Engine, EngineCommand};

fn main() {
    let mut newt = Engine::new();
    println!("{}", newt.name());

    // If a command was provided on the command line, run it and then exit
    if let Ok(cmd) = EngineCommand::try_parse_from(std::env::args_os().skip(1)) {
        newt.send_command(cmd);
        newt.send_command(EngineCommand::Exit);
    }

    // Run the engine's main event loop
    if let Err(e) = newt.run() {
        eprintln!("{} encountered a fatal error: {e:#}", newt.name());
    }
}
