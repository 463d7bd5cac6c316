// Velvet: parameter validation and invocation for the velveth/velvetg assembler
//
// Turns structured run parameters into the exact command lines the two
// Velvet phases expect, runs them, and collects what they write.

#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod constants;
pub mod error;
pub mod hash_length;
pub mod channel;
pub mod numbering;
pub mod command;
pub mod config;
pub mod velveth;
pub mod velvetg;
pub mod runner;
pub mod artifacts;
pub mod report;
pub mod pipeline;

// Re-export common types at crate root
pub use channel::{ChannelSpec, FileFormat, FileLayout, ReadFamily, ReadFileInfo, ReadsChannel};
pub use command::ToolCommand;
pub use config::ToolConfig;
pub use error::{Phase, Result, VelvetError};
pub use hash_length::HashLength;
pub use pipeline::Pipeline;
pub use report::{ReportBuilder, ReportRequest, VelvetResults};
pub use runner::{PhaseRunner, ProcessRunner};
pub use velvetg::{build_velvetg_command, Coverage, VelvetgParams};
pub use velveth::{build_velveth_command, VelvethOptions, VelvethParams, VelvethPlan};

/// Version information
pub fn version() -> (u8, u8, u8) {
    constants::VERSION
}
