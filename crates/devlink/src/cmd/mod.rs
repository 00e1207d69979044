use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod monitor;
pub mod read;
pub mod simulate;
pub mod stop;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read a file from the device.
    Read(ReadArgs),
    /// Write a file to the device.
    Write(WriteArgs),
    /// Stop the program running on the device.
    Stop(StopArgs),
    /// Stream program output and device log.
    Monitor(MonitorArgs),
    /// Run an in-process device simulator on a TCP listener.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Read(args) => read::run(args, format),
        Command::Write(args) => write::run(args, format),
        Command::Stop(args) => stop::run(args, format),
        Command::Monitor(args) => monitor::run(args),
        Command::Simulate(args) => simulate::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Device address (host:port).
    pub address: String,
    /// Remote file to read.
    pub path: String,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Device address (host:port).
    pub address: String,
    /// Remote file to write.
    pub path: String,
    /// Read content from a local file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Literal string content.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
}

#[derive(Args, Debug)]
pub struct StopArgs {
    /// Device address (host:port).
    pub address: String,
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Device address (host:port).
    pub address: String,
    /// Forward this process's stdin to the program running on the device.
    #[arg(long)]
    pub forward_stdin: bool,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Address to listen on; port 0 picks a free port.
    #[arg(default_value = "127.0.0.1:0")]
    pub address: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
