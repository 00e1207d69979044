use devlink_device::connect;

use crate::cmd::ReadArgs;
use crate::exit::{device_error, CliResult, SUCCESS};
use crate::output::{print_raw, OutputFormat};

pub fn run(args: ReadArgs, _format: OutputFormat) -> CliResult<i32> {
    let device = connect(&args.address).map_err(|err| device_error("connect failed", err))?;

    device
        .controller
        .lock()
        .map_err(|err| device_error("lock failed", err))?;
    let data = device
        .uploader
        .read_file(&args.path)
        .map_err(|err| device_error("read failed", err))?;
    device
        .controller
        .unlock()
        .map_err(|err| device_error("unlock failed", err))?;
    device.close();

    // File content goes to stdout untouched regardless of --format.
    print_raw(&data);
    Ok(SUCCESS)
}
