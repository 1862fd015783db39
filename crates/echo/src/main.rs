/*
 * main.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

mod interpreter;

use std::sync::Arc;
use std::time::Duration;

use callisto::config::KernelConfig;
use callisto::connection_file::ConnectionFile;
use callisto::kernel;

use crate::interpreter::EchoInterpreter;

fn start_kernel(connection_file: ConnectionFile, config: KernelConfig) {
    let interpreter = Arc::new(EchoInterpreter::new());

    let kernel = match kernel::connect(connection_file, config, interpreter) {
        Ok(kernel) => kernel,
        Err(err) => {
            eprintln!("Couldn't connect to frontend: {err}");
            std::process::exit(1);
        },
    };

    match kernel.wait_for_shutdown() {
        Some(req) => log::info!("Shutdown requested (restart = {})", req.restart),
        None => log::error!("Kernel stopped without a shutdown request"),
    }
}

fn main() {
    // Initialize logging system; the env_logger lets you configure logging with
    // the RUST_LOG env var
    env_logger::init();

    // Get an iterator over all the command-line arguments
    let mut argv = std::env::args();

    // Skip the first "argument" as it's the path/name to this executable
    argv.next();

    let mut connection_file: Option<String> = None;
    let mut config = KernelConfig {
        name: String::from("echo"),
        ..Default::default()
    };

    // Process remaining arguments
    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--connection_file" => match argv.next() {
                Some(file) => connection_file = Some(file),
                None => {
                    eprintln!(
                        "A connection file must be specified with the --connection_file argument."
                    );
                    return;
                },
            },
            "--timeout" => match argv.next().map(|secs| secs.parse::<f64>()) {
                Some(Ok(secs)) if secs > 0.0 => {
                    config.execution_timeout = Some(Duration::from_secs_f64(secs));
                },
                _ => {
                    eprintln!("The --timeout argument takes a positive number of seconds.");
                    return;
                },
            },
            "--version" => {
                println!("Callisto Echo {}", env!("CARGO_PKG_VERSION"));
                return;
            },
            other => {
                eprintln!("Argument '{other}' unknown");
                return;
            },
        }
    }

    let Some(connection_file) = connection_file else {
        println!("Usage: echo --connection_file /path/to/file [--timeout <seconds>]");
        return;
    };

    match kernel::read_connection(&connection_file) {
        Ok(connection) => start_kernel(connection, config),
        Err(err) => eprintln!("Could not read connection file '{connection_file}': {err}"),
    }
}
