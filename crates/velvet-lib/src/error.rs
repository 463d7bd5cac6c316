//! Error types for parameter validation and phase execution
//!
//! Validation errors are raised before any external process starts.
//! Process errors carry the [`Phase`] that failed.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// The two external phases of a Velvet run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// velveth: hashing reads into Roadmaps/Sequences
    Indexing,
    /// velvetg: building the graph and exporting contigs
    GraphConstruction,
}

impl Phase {
    /// Name of the binary that implements this phase
    pub fn tool_name(self) -> &'static str {
        match self {
            Phase::Indexing => "velveth",
            Phase::GraphConstruction => "velvetg",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Indexing => f.write_str("indexing"),
            Phase::GraphConstruction => f.write_str("graph-construction"),
        }
    }
}

/// Error type for the Velvet invocation layer
#[derive(Error, Debug)]
pub enum VelvetError {
    /// Hash length is non-positive, or a sweep range is empty or has an odd step
    #[error("Invalid hash length: {0}")]
    InvalidHashLength(String),

    /// A file field required by the channel's layout is absent
    #[error("Channel {channel}: missing {field}")]
    MissingReadFile {
        /// Position of the channel in `reads_channels`
        channel: usize,
        /// Name of the missing field
        field: &'static str,
    },

    /// Separate layout requested for a format that carries no mate layout
    #[error("Channel {channel}: layout 'separate' is not allowed with format '{format}'")]
    IncompatibleLayoutFormat {
        /// Position of the channel in `reads_channels`
        channel: usize,
        /// The offending format label
        format: String,
    },

    /// Separate layout requested for an unpaired read type
    #[error("Channel {channel}: layout 'separate' requires a paired read type, got '{read_type}'")]
    IncompatibleLayoutReadType {
        /// Position of the channel in `reads_channels`
        channel: usize,
        /// The offending read type label
        read_type: String,
    },

    /// Reference channel in a format other than fasta/sam/bam
    #[error("Channel {channel}: reference sequences must be fasta, sam or bam, got '{format}'")]
    InvalidReferenceFormat {
        /// Position of the channel in `reads_channels`
        channel: usize,
        /// The offending format label
        format: String,
    },

    /// Both `read_file` and `left_file`/`right_file` are populated
    #[error("Channel {channel}: both read_file and left_file/right_file are set")]
    ConflictingReadFiles {
        /// Position of the channel in `reads_channels`
        channel: usize,
    },

    /// Read type label not understood by velveth
    #[error("Channel {channel}: unknown read type '{read_type}'")]
    UnknownReadType {
        /// Position of the channel in `reads_channels`
        channel: usize,
        /// The offending label
        read_type: String,
    },

    /// More than one reference channel
    #[error("Channel {channel}: only one reference channel is allowed")]
    DuplicateReferenceChannel {
        /// Position of the second reference channel
        channel: usize,
    },

    /// More channels of one family than the Velvet build has categories
    #[error("Channel {channel}: more than {max} '{family}' channels")]
    TooManyChannels {
        /// Position of the first channel over the limit
        channel: usize,
        /// Base read-type family
        family: &'static str,
        /// Configured category count
        max: usize,
    },

    /// Parameter outside its accepted domain
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name as it appears in the params record
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// The external binary could not be started
    #[error("Failed to start {phase} phase")]
    ProcessSpawn {
        /// Phase that failed to start
        phase: Phase,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },

    /// The external binary exited with a non-zero status
    #[error("{phase} phase failed ({status})\n{stderr_tail}")]
    ExternalProcessFailure {
        /// Phase that failed
        phase: Phase,
        /// Exit status as reported by the OS
        status: String,
        /// Last lines of the child's stderr
        stderr_tail: String,
    },

    /// The external binary exceeded its time budget and was killed
    #[error("{phase} phase exceeded its {timeout:?} budget and was killed")]
    PipelineTimeout {
        /// Phase that timed out
        phase: Phase,
        /// Budget that was exceeded
        timeout: Duration,
    },

    /// A phase exited successfully without writing a contracted artifact
    #[error("{phase} phase did not produce {path:?}")]
    MissingArtifact {
        /// Phase that should have produced the file
        phase: Phase,
        /// Expected location
        path: PathBuf,
    },

    /// The report collaborator failed
    #[error("Report generation failed: {0}")]
    Report(String),

    /// Invalid tool configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl VelvetError {
    /// Phase this error originated in, if it came from an external process
    pub fn phase(&self) -> Option<Phase> {
        match self {
            VelvetError::ProcessSpawn { phase, .. }
            | VelvetError::ExternalProcessFailure { phase, .. }
            | VelvetError::PipelineTimeout { phase, .. }
            | VelvetError::MissingArtifact { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, VelvetError>;
