//! velveth command construction
//!
//! Builds the indexing command line:
//! 1. Normalize the hash length
//! 2. Validate every reads channel
//! 3. Resolve type flags in declaration order
//! 4. Emit `out_folder hash_length` then one token group per channel
//!
//! The token sequence is a pure function of the parameters and the
//! configuration; nothing here touches the filesystem.

use crate::channel::{validate_channels, ReadsChannel};
use crate::command::ToolCommand;
use crate::config::ToolConfig;
use crate::error::{Phase, Result, VelvetError};
use crate::hash_length::HashLength;
use crate::numbering::{resolve_numbering, NumberedChannel};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// velveth's own switches, rendered after the channels
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelvethOptions {
    /// `-strand_specific`: reads are strand specific
    pub strand_specific: bool,
    /// `-reuse_Sequences`: keep the existing Sequences file
    pub reuse_sequences: bool,
    /// `-reuse_binary`: keep the existing binary CnyUnifiedSeq file
    pub reuse_binary: bool,
    /// `-noHash`: only prepare Sequences, skip hashing
    pub no_hash: bool,
    /// `-create_binary`: write sequences in binary form
    pub create_binary: bool,
}

impl VelvethOptions {
    fn tokens(&self) -> impl Iterator<Item = &'static str> {
        [
            (self.strand_specific, "-strand_specific"),
            (self.reuse_sequences, "-reuse_Sequences"),
            (self.reuse_binary, "-reuse_binary"),
            (self.no_hash, "-noHash"),
            (self.create_binary, "-create_binary"),
        ]
        .into_iter()
        .filter_map(|(on, flag)| on.then_some(flag))
    }
}

/// Parameters of the indexing phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VelvethParams {
    /// Output directory, relative to the scratch directory unless absolute
    pub out_folder: String,
    /// Workspace the report is saved to
    pub workspace_name: String,
    /// k-mer length or sweep
    pub hash_length: HashLength,
    /// Input channels; order decides numbering
    pub reads_channels: Vec<ReadsChannel>,
    /// Additional velveth switches
    #[serde(default)]
    pub options: VelvethOptions,
}

impl VelvethParams {
    /// Check the fields every run needs
    pub fn check_required(&self) -> Result<()> {
        if self.out_folder.trim().is_empty() {
            return Err(VelvetError::InvalidParameter {
                name: "out_folder",
                reason: "must not be empty".into(),
            });
        }
        if self.workspace_name.trim().is_empty() {
            return Err(VelvetError::InvalidParameter {
                name: "workspace_name",
                reason: "must not be empty".into(),
            });
        }
        if self.reads_channels.is_empty() {
            return Err(VelvetError::InvalidParameter {
                name: "reads_channels",
                reason: "at least one channel is required".into(),
            });
        }
        Ok(())
    }
}

/// A built velveth invocation and the facts downstream steps need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VelvethPlan {
    /// The command line
    pub command: ToolCommand,
    /// Hash length after normalization
    pub hash_length: HashLength,
    /// Channels with their resolved flags
    pub channels: Vec<NumberedChannel>,
}

/// Tokens for a list of numbered channels, in order
pub fn channel_tokens(channels: &[NumberedChannel]) -> Vec<String> {
    let mut tokens = Vec::new();
    for numbered in channels {
        tokens.push(numbered.flag.clone());
        tokens.push(numbered.channel.format().flag());
        if let Some(layout) = numbered.channel.layout_flag() {
            tokens.push(layout.to_string());
        }
        tokens.extend(numbered.channel.paths().into_iter().map(str::to_string));
    }
    tokens
}

/// Build the velveth command for `params`
///
/// # Errors
/// Any validation error; no command is produced unless every channel is valid.
pub fn build_velveth_command(params: &VelvethParams, config: &ToolConfig) -> Result<VelvethPlan> {
    params.check_required()?;

    let hash_length = params.hash_length.normalize(config.max_kmer_length)?;
    if hash_length != params.hash_length {
        info!(
            "Hash length {} normalized to {}",
            params.hash_length.token(),
            hash_length.token()
        );
    }

    let specs = validate_channels(&params.reads_channels)?;
    let channels = resolve_numbering(specs, config.categories)?;

    let mut command = ToolCommand::new(config.binary(Phase::Indexing));
    command.arg(params.out_folder.as_str()).arg(hash_length.token());
    command.args.extend(channel_tokens(&channels));
    command.args.extend(params.options.tokens().map(str::to_string));

    debug!("velveth tokens: {:?}", command.args);
    Ok(VelvethPlan { command, hash_length, channels })
}
