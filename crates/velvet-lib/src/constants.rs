//! Constants for the Velvet invocation layer
//!
//! Limits of the default Velvet build, binary names, and the artifact
//! file names both phases are contracted to write.

/// Maximum k-mer length of a default Velvet build (`MAXKMERLENGTH=31`)
pub const DEFAULT_MAX_KMER_LENGTH: u32 = 31;

/// Number of short-read libraries in a default Velvet build (`CATEGORIES=2`)
pub const DEFAULT_CATEGORIES: usize = 2;

/// Default name of the indexing binary
pub const VELVETH_BINARY: &str = "velveth";

/// Default name of the graph-construction binary
pub const VELVETG_BINARY: &str = "velvetg";

/// Number of stderr lines kept when an external phase fails
pub const DEFAULT_STDERR_TAIL_LINES: usize = 20;

/// Indexing artifact: read roadmaps
pub const ROADMAPS_FILE: &str = "Roadmaps";
/// Indexing artifact: read sequences
pub const SEQUENCES_FILE: &str = "Sequences";
/// Graph artifact: assembled contigs
pub const CONTIGS_FILE: &str = "contigs.fa";
/// Graph artifact: per-node statistics
pub const STATS_FILE: &str = "stats.txt";
/// Graph artifact: final graph
pub const LAST_GRAPH_FILE: &str = "LastGraph";
/// Graph artifact: AMOS assembly, written only with `-amos_file yes`
pub const AMOS_FILE: &str = "velvet_asm.afg";

/// Version number
pub const VERSION: (u8, u8, u8) = (0, 1, 0);

/// Check if a k-mer length can be passed to velveth unchanged
#[inline]
pub const fn is_valid_hash_length(k: u32, max: u32) -> bool {
    k >= 1 && k <= max && k % 2 == 1
}
