use devlink_device::connect;

use crate::cmd::StopArgs;
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_ack, OutputFormat};

pub fn run(args: StopArgs, format: OutputFormat) -> CliResult<i32> {
    let device = connect(&args.address).map_err(|err| device_error("connect failed", err))?;

    let ack = device
        .controller
        .stop()
        .map_err(|err| device_error("stop failed", err))?;
    device.close();

    print_ack(&ack, format);
    Ok(SUCCESS)
}
