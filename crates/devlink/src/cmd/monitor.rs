use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use devlink_device::{connect, Device, DeviceError};
use devlink_mux::StreamReceiver;

use crate::cmd::MonitorArgs;
use crate::exit::{device_error, CliError, CliResult, SUCCESS};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn run(args: MonitorArgs) -> CliResult<i32> {
    let device =
        Arc::new(connect(&args.address).map_err(|err| device_error("connect failed", err))?);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(Arc::clone(&running), Arc::clone(&device))?;

    if args.forward_stdin {
        spawn_stdin_forwarder(Arc::clone(&device));
    }

    let log_thread = {
        let device = Arc::clone(&device);
        let running = Arc::clone(&running);
        std::thread::spawn(move || {
            let _ = pump(&device.log_output, &mut std::io::stderr(), &running);
        })
    };

    let outcome = pump(&device.program_output, &mut std::io::stdout(), &running);

    running.store(false, Ordering::SeqCst);
    device.close();
    let _ = log_thread.join();

    outcome.map_err(|err| device_error("monitor failed", err))?;
    Ok(SUCCESS)
}

/// Copy one stream channel to a local sink until the channel ends, the link
/// fails, or monitoring is stopped.
fn pump(
    source: &StreamReceiver,
    sink: &mut impl Write,
    running: &AtomicBool,
) -> Result<(), DeviceError> {
    let mut buf = [0u8; 4096];
    while running.load(Ordering::SeqCst) {
        match source.read_timeout(&mut buf, POLL_INTERVAL)? {
            Some(0) => break,
            Some(n) => {
                if sink.write_all(&buf[..n]).and_then(|()| sink.flush()).is_err() {
                    break;
                }
            }
            None => continue,
        }
    }
    Ok(())
}

fn spawn_stdin_forwarder(device: Arc<Device>) {
    std::thread::spawn(move || {
        let mut stdin = std::io::stdin();
        let mut buf = [0u8; 1024];
        loop {
            match stdin.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if device.program_input.write(&buf[..n]).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

fn install_ctrlc_handler(running: Arc<AtomicBool>, device: Arc<Device>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
        device.close();
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
