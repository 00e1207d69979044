use std::io::Write;
use std::net::TcpListener;

use devlink_device::DeviceSimulator;
use tracing::{info, warn};

use crate::cmd::SimulateArgs;
use crate::exit::{io_error, CliResult};

pub fn run(args: SimulateArgs) -> CliResult<i32> {
    let listener = TcpListener::bind(&args.address)
        .map_err(|err| io_error(&format!("failed to bind {}", args.address), err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| io_error("failed to resolve listen address", err))?;

    // Announce the bound address on stdout so scripts can pick up the port.
    println!("listening on {addr}");
    let _ = std::io::stdout().flush();

    let simulator = DeviceSimulator::new();
    loop {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(%err, "accept failed");
                continue;
            }
        };
        info!(%peer, "session connected");
        let reader = match stream.try_clone() {
            Ok(reader) => reader,
            Err(err) => {
                warn!(%err, "could not clone connection");
                continue;
            }
        };
        simulator.serve(reader, stream);
        info!(%peer, "session ended");
    }
}
