//! Pipeline orchestration
//!
//! Runs the two phases in order:
//! 1. Build the velveth command (normalize, validate, number)
//! 2. Run velveth and check Roadmaps/Sequences
//! 3. Map the velvetg parameters
//! 4. Run velvetg and check contigs.fa, stats.txt, LastGraph
//! 5. Hand the artifacts to the report builder
//!
//! Both parameter records are validated before anything runs, and velvetg
//! must work in the folder velveth writes. A failed phase stops the
//! pipeline; velvetg never runs after a failed velveth.
//!
//! For a hash-length sweep velveth writes `<out_folder>_<k>` per k, and
//! velvetg runs once per k in `<wk_folder>_<k>`.

use crate::artifacts::{AssemblyArtifacts, IndexArtifacts};
use crate::config::ToolConfig;
use crate::error::{Phase, Result, VelvetError};
use crate::hash_length::HashLength;
use crate::report::{ReportBuilder, ReportRequest, VelvetResults};
use crate::runner::PhaseRunner;
use crate::velvetg::{velvetg_command_in, VelvetgParams};
use crate::velveth::{build_velveth_command, VelvethParams};
use tracing::info;

/// Folder name velveth uses for one k of a sweep
pub fn sweep_folder(folder: &str, k: i64) -> String {
    format!("{folder}_{k}")
}

/// Folders a phase reads or writes for a normalized hash length
pub fn phase_folders(folder: &str, hash_length: &HashLength) -> Vec<String> {
    if hash_length.is_sweep() {
        hash_length
            .kmer_values()
            .into_iter()
            .map(|k| sweep_folder(folder, k))
            .collect()
    } else {
        vec![folder.to_string()]
    }
}

/// Sequences velveth and velvetg and reports the results
pub struct Pipeline<R, B> {
    config: ToolConfig,
    runner: R,
    reporter: B,
}

impl<R: PhaseRunner, B: ReportBuilder> Pipeline<R, B> {
    /// Create a pipeline over a validated configuration
    pub fn new(config: ToolConfig, runner: R, reporter: B) -> Result<Self> {
        config.validate()?;
        config.print();
        Ok(Self { config, runner, reporter })
    }

    /// The tool configuration
    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    fn index(&self, params: &VelvethParams) -> Result<(HashLength, Vec<IndexArtifacts>)> {
        info!("Step 1: Building velveth command...");
        let plan = build_velveth_command(params, &self.config)?;
        info!("  {} channels, hash length {}", plan.channels.len(), plan.hash_length.token());

        info!("Step 2: Indexing reads...");
        self.runner.run(Phase::Indexing, &plan.command)?;

        let hashed = !params.options.no_hash;
        let index = phase_folders(&params.out_folder, &plan.hash_length)
            .iter()
            .map(|folder| IndexArtifacts::collect(&self.config.resolve(folder), hashed))
            .collect::<Result<Vec<_>>>()?;
        Ok((plan.hash_length, index))
    }

    fn assemble(&self, params: &VelvetgParams, wk_folder: &str) -> Result<AssemblyArtifacts> {
        let command = velvetg_command_in(params, wk_folder, &self.config)?;
        self.runner.run(Phase::GraphConstruction, &command)?;
        AssemblyArtifacts::collect(&self.config.resolve(wk_folder), params.wants_amos())
    }

    fn report(&self, request: ReportRequest) -> Result<VelvetResults> {
        info!("Step 5: Building report...");
        let results = self.reporter.build_report(&request)?;
        info!("  Report {} saved as {}", results.report_name, results.report_ref);
        Ok(results)
    }

    /// Run only the indexing phase
    pub fn run_velveth(&self, params: &VelvethParams) -> Result<VelvetResults> {
        let (_, index) = self.index(params)?;
        self.report(ReportRequest {
            workspace_name: params.workspace_name.clone(),
            index,
            assemblies: Vec::new(),
        })
    }

    /// Run only the graph-construction phase on an existing index
    pub fn run_velvetg(&self, params: &VelvetgParams) -> Result<VelvetResults> {
        info!("Step 3: Mapping velvetg parameters...");
        params.validate()?;
        info!("Step 4: Building graph in {}...", params.wk_folder);
        let assembly = self.assemble(params, &params.wk_folder)?;
        self.report(ReportRequest {
            workspace_name: params.workspace_name.clone(),
            index: Vec::new(),
            assemblies: vec![assembly],
        })
    }

    /// Run both phases and report on the assembly
    pub fn run(&self, velveth: &VelvethParams, velvetg: &VelvetgParams) -> Result<VelvetResults> {
        velvetg.validate()?;
        let out_dir = self.config.resolve(&velveth.out_folder);
        if self.config.resolve(&velvetg.wk_folder) != out_dir {
            return Err(VelvetError::InvalidParameter {
                name: "wk_folder",
                reason: format!("must name the velveth output folder {}", out_dir.display()),
            });
        }
        let (hash_length, index) = self.index(velveth)?;

        info!("Step 3: Mapping velvetg parameters...");
        let folders = phase_folders(&velvetg.wk_folder, &hash_length);
        let mut assemblies = Vec::with_capacity(folders.len());
        for folder in &folders {
            info!("Step 4: Building graph in {}...", folder);
            assemblies.push(self.assemble(velvetg, folder)?);
        }

        self.report(ReportRequest {
            workspace_name: velveth.workspace_name.clone(),
            index,
            assemblies,
        })
    }
}
