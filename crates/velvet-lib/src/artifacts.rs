//! On-disk artifacts of the two phases
//!
//! Collection only checks that each contracted file exists after the phase
//! reported success; contents are never read.

use crate::constants::{
    AMOS_FILE, CONTIGS_FILE, LAST_GRAPH_FILE, ROADMAPS_FILE, SEQUENCES_FILE, STATS_FILE,
};
use crate::error::{Phase, Result, VelvetError};
use serde::Serialize;
use std::path::{Path, PathBuf};

fn require(phase: Phase, path: PathBuf) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(VelvetError::MissingArtifact { phase, path })
    }
}

/// Files written by velveth into one output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexArtifacts {
    /// The output directory
    pub dir: PathBuf,
    /// `Roadmaps`; absent when velveth ran with `-noHash`
    pub roadmaps: Option<PathBuf>,
    /// `Sequences`
    pub sequences: PathBuf,
}

impl IndexArtifacts {
    /// Check the files velveth should have written to `dir`
    pub fn collect(dir: &Path, hashed: bool) -> Result<Self> {
        let roadmaps = if hashed {
            Some(require(Phase::Indexing, dir.join(ROADMAPS_FILE))?)
        } else {
            None
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            roadmaps,
            sequences: require(Phase::Indexing, dir.join(SEQUENCES_FILE))?,
        })
    }
}

/// Files written by velvetg into its working directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyArtifacts {
    /// The working directory
    pub dir: PathBuf,
    /// `contigs.fa`
    pub contigs: PathBuf,
    /// `stats.txt`
    pub stats: PathBuf,
    /// `LastGraph`
    pub last_graph: PathBuf,
    /// `velvet_asm.afg`, when requested
    pub amos: Option<PathBuf>,
}

impl AssemblyArtifacts {
    /// Check the files velvetg should have written to `dir`
    pub fn collect(dir: &Path, amos_requested: bool) -> Result<Self> {
        let phase = Phase::GraphConstruction;
        let amos = if amos_requested {
            Some(require(phase, dir.join(AMOS_FILE))?)
        } else {
            None
        };
        Ok(Self {
            dir: dir.to_path_buf(),
            contigs: require(phase, dir.join(CONTIGS_FILE))?,
            stats: require(phase, dir.join(STATS_FILE))?,
            last_graph: require(phase, dir.join(LAST_GRAPH_FILE))?,
            amos,
        })
    }
}
