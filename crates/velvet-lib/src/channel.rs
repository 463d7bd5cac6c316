//! Reads channels and their validation
//!
//! A [`ReadsChannel`] is what the caller sends: a read type label, a file
//! format, an optional layout and a bag of optional file fields. Validation
//! turns it into a [`ChannelSpec`], where only legal combinations exist.
//! Nothing here touches the filesystem.

use crate::error::{Result, VelvetError};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Base read-type family; the unit the numbering resolver counts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReadFamily {
    /// Single-end short reads
    Short,
    /// Paired-end short reads
    ShortPaired,
    /// Single-end long reads
    Long,
    /// Paired-end long reads
    LongPaired,
}

impl ReadFamily {
    /// All families, in the order velveth documents them
    pub const ALL: [ReadFamily; 4] = [
        ReadFamily::Short,
        ReadFamily::ShortPaired,
        ReadFamily::Long,
        ReadFamily::LongPaired,
    ];

    /// Flag name without the leading dash or numeric suffix
    pub fn base_flag(self) -> &'static str {
        match self {
            ReadFamily::Short => "short",
            ReadFamily::ShortPaired => "shortPaired",
            ReadFamily::Long => "long",
            ReadFamily::LongPaired => "longPaired",
        }
    }

    /// Whether reads of this family come in mate pairs
    pub fn is_paired(self) -> bool {
        matches!(self, ReadFamily::ShortPaired | ReadFamily::LongPaired)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// A parsed `read_type` label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadKind {
    /// Reads of one family
    Reads(ReadFamily),
    /// A reference sequence
    Reference,
}

impl ReadKind {
    /// Parse a velveth read type label.
    ///
    /// Numbered labels (`short2`, `shortPaired3`, ...) map to their base
    /// family; the final suffix is assigned by position, not by label.
    pub fn parse(label: &str) -> Option<Self> {
        let numbered = |rest: &str| rest.is_empty() || rest.parse::<u32>().is_ok_and(|n| n >= 2);
        match label {
            "reference" => Some(ReadKind::Reference),
            "long" => Some(ReadKind::Reads(ReadFamily::Long)),
            "longPaired" => Some(ReadKind::Reads(ReadFamily::LongPaired)),
            _ => {
                if let Some(rest) = label.strip_prefix("shortPaired") {
                    numbered(rest).then_some(ReadKind::Reads(ReadFamily::ShortPaired))
                } else if let Some(rest) = label.strip_prefix("short") {
                    numbered(rest).then_some(ReadKind::Reads(ReadFamily::Short))
                } else {
                    None
                }
            }
        }
    }
}

/// Read file format understood by velveth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileFormat {
    /// FASTA
    #[serde(rename = "fasta")]
    Fasta,
    /// FASTQ
    #[serde(rename = "fastq")]
    Fastq,
    /// One sequence per line
    #[serde(rename = "raw")]
    Raw,
    /// Gzipped FASTA
    #[serde(rename = "fasta.gz")]
    FastaGz,
    /// Gzipped FASTQ
    #[serde(rename = "fastq.gz")]
    FastqGz,
    /// Gzipped raw
    #[serde(rename = "raw.gz")]
    RawGz,
    /// SAM alignments
    #[serde(rename = "sam")]
    Sam,
    /// BAM alignments
    #[serde(rename = "bam")]
    Bam,
    /// Let velveth detect the format
    #[serde(rename = "fmtAuto")]
    FmtAuto,
}

impl FileFormat {
    /// Label as written in parameter files
    pub fn label(self) -> &'static str {
        match self {
            FileFormat::Fasta => "fasta",
            FileFormat::Fastq => "fastq",
            FileFormat::Raw => "raw",
            FileFormat::FastaGz => "fasta.gz",
            FileFormat::FastqGz => "fastq.gz",
            FileFormat::RawGz => "raw.gz",
            FileFormat::Sam => "sam",
            FileFormat::Bam => "bam",
            FileFormat::FmtAuto => "fmtAuto",
        }
    }

    /// velveth flag selecting this format
    pub fn flag(self) -> String {
        format!("-{}", self.label())
    }

    /// Whether mates may be split over two files in this format.
    ///
    /// SAM/BAM carry pairing internally and raw has no mate names.
    pub fn supports_layout(self) -> bool {
        matches!(
            self,
            FileFormat::Fasta
                | FileFormat::Fastq
                | FileFormat::FastaGz
                | FileFormat::FastqGz
                | FileFormat::FmtAuto
        )
    }

    /// Whether a reference channel may use this format
    pub fn allowed_for_reference(self) -> bool {
        matches!(self, FileFormat::Fasta | FileFormat::Sam | FileFormat::Bam)
    }
}

/// How the mates of paired reads are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileLayout {
    /// Both mates in one file, alternating
    #[default]
    Interleaved,
    /// Left mates and right mates in two files
    Separate,
}

/// File fields of a channel, as received
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadFileInfo {
    /// Single reads file (interleaved layout, SAM/BAM)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_file: Option<String>,
    /// Reference sequence, for `read_type = reference`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_file: Option<String>,
    /// Left mates, separate layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_file: Option<String>,
    /// Right mates, separate layout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_file: Option<String>,
    /// Layout given alongside the files; the channel-level field wins
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_layout: Option<FileLayout>,
}

/// One input channel of velveth, as received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadsChannel {
    /// Read type label (`short`, `shortPaired2`, `reference`, ...)
    pub read_type: String,
    /// File format
    pub file_format: FileFormat,
    /// Mate layout; interleaved when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_layout: Option<FileLayout>,
    /// File fields
    #[serde(default)]
    pub read_file_info: ReadFileInfo,
}

/// A validated channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSpec {
    /// Reads in a single file
    Interleaved {
        /// Read family
        family: ReadFamily,
        /// File format
        format: FileFormat,
        /// Reads file
        file: String,
    },
    /// Paired reads split over two files
    Separate {
        /// Read family (always paired)
        family: ReadFamily,
        /// File format
        format: FileFormat,
        /// Left mates
        left: String,
        /// Right mates
        right: String,
    },
    /// Reference sequence
    Reference {
        /// File format
        format: FileFormat,
        /// Reference file
        file: String,
    },
}

impl ChannelSpec {
    /// Read family, or `None` for the reference channel
    pub fn family(&self) -> Option<ReadFamily> {
        match self {
            ChannelSpec::Interleaved { family, .. } | ChannelSpec::Separate { family, .. } => {
                Some(*family)
            }
            ChannelSpec::Reference { .. } => None,
        }
    }

    /// File format
    pub fn format(&self) -> FileFormat {
        match self {
            ChannelSpec::Interleaved { format, .. }
            | ChannelSpec::Separate { format, .. }
            | ChannelSpec::Reference { format, .. } => *format,
        }
    }

    /// Layout flag, when velveth gives one meaning for this channel
    pub fn layout_flag(&self) -> Option<&'static str> {
        match self {
            ChannelSpec::Separate { .. } => Some("-separate"),
            ChannelSpec::Interleaved { family, format, .. }
                if family.is_paired() && format.supports_layout() =>
            {
                Some("-interleaved")
            }
            _ => None,
        }
    }

    /// File path tokens, in command order
    pub fn paths(&self) -> Vec<&str> {
        match self {
            ChannelSpec::Interleaved { file, .. } | ChannelSpec::Reference { file, .. } => {
                vec![file.as_str()]
            }
            ChannelSpec::Separate { left, right, .. } => vec![left.as_str(), right.as_str()],
        }
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}

/// Validate one channel; `index` is its position, used in error messages
pub fn validate_channel(index: usize, channel: &ReadsChannel) -> Result<ChannelSpec> {
    let kind = ReadKind::parse(&channel.read_type).ok_or_else(|| VelvetError::UnknownReadType {
        channel: index,
        read_type: channel.read_type.clone(),
    })?;
    let info = &channel.read_file_info;
    let format = channel.file_format;
    let missing = |field| VelvetError::MissingReadFile { channel: index, field };

    let family = match kind {
        ReadKind::Reference => {
            if !format.allowed_for_reference() {
                return Err(VelvetError::InvalidReferenceFormat {
                    channel: index,
                    format: format.label().to_string(),
                });
            }
            let file = present(&info.reference_file).ok_or_else(|| missing("reference_file"))?;
            if present(&info.read_file).is_some()
                || present(&info.left_file).is_some()
                || present(&info.right_file).is_some()
                || channel.file_layout.is_some()
            {
                warn!("Channel {}: reference channel ignores read files and layout", index);
            }
            return Ok(ChannelSpec::Reference { format, file: file.to_string() });
        }
        ReadKind::Reads(family) => family,
    };

    let layout = channel.file_layout.or(info.file_layout).unwrap_or_default();
    let read_file = present(&info.read_file);
    let left = present(&info.left_file);
    let right = present(&info.right_file);
    if present(&info.reference_file).is_some() {
        warn!("Channel {}: reference_file ignored for read type '{}'", index, channel.read_type);
    }

    match layout {
        FileLayout::Separate => {
            // Missing mate files are reported before format and type checks
            if read_file.is_some() && (left.is_some() || right.is_some()) {
                return Err(VelvetError::ConflictingReadFiles { channel: index });
            }
            let left = left.ok_or_else(|| missing("left_file"))?;
            let right = right.ok_or_else(|| missing("right_file"))?;
            if !format.supports_layout() {
                return Err(VelvetError::IncompatibleLayoutFormat {
                    channel: index,
                    format: format.label().to_string(),
                });
            }
            if !family.is_paired() {
                return Err(VelvetError::IncompatibleLayoutReadType {
                    channel: index,
                    read_type: channel.read_type.clone(),
                });
            }
            Ok(ChannelSpec::Separate {
                family,
                format,
                left: left.to_string(),
                right: right.to_string(),
            })
        }
        FileLayout::Interleaved => {
            if read_file.is_some() && (left.is_some() || right.is_some()) {
                return Err(VelvetError::ConflictingReadFiles { channel: index });
            }
            let file = read_file.ok_or_else(|| missing("read_file"))?;
            Ok(ChannelSpec::Interleaved { family, format, file: file.to_string() })
        }
    }
}

/// Validate every channel, failing on the first invalid one
pub fn validate_channels(channels: &[ReadsChannel]) -> Result<Vec<ChannelSpec>> {
    channels
        .iter()
        .enumerate()
        .map(|(index, channel)| validate_channel(index, channel))
        .collect()
}
