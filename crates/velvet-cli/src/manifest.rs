//! Local report builder: writes a JSON manifest next to the artifacts

use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use velvet_lib::{ReportBuilder, ReportRequest, Result, VelvetError, VelvetResults};

/// Reports created by this process so far
static REPORT_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Serialize)]
struct Manifest<'a> {
    report_name: &'a str,
    created_ms: u64,
    #[serde(flatten)]
    request: &'a ReportRequest,
    contig_bytes: Vec<u64>,
}

/// Saves each report as `<name>.json` in the run's output directory
pub struct ManifestReporter {
    fallback_dir: PathBuf,
}

impl ManifestReporter {
    pub fn new(fallback_dir: impl Into<PathBuf>) -> Self {
        Self { fallback_dir: fallback_dir.into() }
    }

    fn target_dir<'a>(&'a self, request: &'a ReportRequest) -> &'a Path {
        request
            .assemblies
            .first()
            .map(|a| a.dir.as_path())
            .or_else(|| request.index.first().map(|i| i.dir.as_path()))
            .unwrap_or(self.fallback_dir.as_path())
    }

    /// Create `<name>.json` in `dir` under a fresh name, never replacing a file
    fn create_unique(dir: &Path, created_ms: u64) -> io::Result<(String, PathBuf, fs::File)> {
        loop {
            let seq = REPORT_SEQ.fetch_add(1, Ordering::Relaxed);
            let name = format!("velvet_report_{created_ms}_{}_{seq}", std::process::id());
            let path = dir.join(format!("{name}.json"));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((name, path, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl ReportBuilder for ManifestReporter {
    fn build_report(&self, request: &ReportRequest) -> Result<VelvetResults> {
        let created_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let dir = self.target_dir(request);
        let (report_name, path, mut file) = Self::create_unique(dir, created_ms)
            .map_err(|e| VelvetError::Report(format!("cannot create report in {}: {e}", dir.display())))?;

        let contig_bytes = request
            .assemblies
            .iter()
            .map(|a| fs::metadata(&a.contigs).map(|m| m.len()).unwrap_or(0))
            .collect();
        let manifest = Manifest { report_name: &report_name, created_ms, request, contig_bytes };

        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| VelvetError::Report(format!("cannot encode manifest: {e}")))?;
        file.write_all(json.as_bytes())
            .map_err(|e| VelvetError::Report(format!("cannot write {}: {e}", path.display())))?;
        info!("Report manifest written to {}", path.display());

        Ok(VelvetResults {
            report_name,
            report_ref: path.display().to_string(),
        })
    }
}
