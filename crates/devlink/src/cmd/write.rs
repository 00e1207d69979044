use std::fs;

use devlink_device::connect;
use tracing::info;

use crate::cmd::WriteArgs;
use crate::exit::{device_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

pub fn run(args: WriteArgs, _format: OutputFormat) -> CliResult<i32> {
    let content = resolve_content(&args)?;

    let device = connect(&args.address).map_err(|err| device_error("connect failed", err))?;

    device
        .controller
        .lock()
        .map_err(|err| device_error("lock failed", err))?;
    device
        .uploader
        .write_file(&args.path, &content)
        .map_err(|err| device_error("write failed", err))?;
    device
        .controller
        .unlock()
        .map_err(|err| device_error("unlock failed", err))?;
    device.close();

    info!(path = %args.path, bytes = content.len(), "file written");
    Ok(SUCCESS)
}

fn resolve_content(args: &WriteArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Err(CliError::new(
        USAGE,
        "either --file or --data must be given",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_data_wins() {
        let args = WriteArgs {
            address: "127.0.0.1:1".into(),
            path: "/x".into(),
            file: None,
            data: Some("hello".into()),
        };
        assert_eq!(resolve_content(&args).unwrap(), b"hello");
    }

    #[test]
    fn missing_payload_is_a_usage_error() {
        let args = WriteArgs {
            address: "127.0.0.1:1".into(),
            path: "/x".into(),
            file: None,
            data: None,
        };
        let err = resolve_content(&args).unwrap_err();
        assert_eq!(err.code, USAGE);
    }
}
