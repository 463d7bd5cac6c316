//! The report collaborator
//!
//! The pipeline hands its artifacts to a [`ReportBuilder`] and returns the
//! [`VelvetResults`] it gets back without looking inside.

use crate::artifacts::{AssemblyArtifacts, IndexArtifacts};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Handles to a saved report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VelvetResults {
    /// Name of the report object
    pub report_name: String,
    /// Reference of the report object
    pub report_ref: String,
}

/// What a finished run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRequest {
    /// Workspace the report belongs to
    pub workspace_name: String,
    /// velveth outputs, one per k
    pub index: Vec<IndexArtifacts>,
    /// velvetg outputs, one per k; empty after an indexing-only run
    pub assemblies: Vec<AssemblyArtifacts>,
}

/// Builds and stores a report for a run
pub trait ReportBuilder {
    /// Create the report; errors should be `VelvetError::Report`
    fn build_report(&self, request: &ReportRequest) -> Result<VelvetResults>;
}

impl<T: ReportBuilder + ?Sized> ReportBuilder for &T {
    fn build_report(&self, request: &ReportRequest) -> Result<VelvetResults> {
        (**self).build_report(request)
    }
}
