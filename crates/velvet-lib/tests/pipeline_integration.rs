//! Integration tests for the pipeline
//!
//! These tests drive the full pipeline with stand-in phase runners and
//! report builders, checking phase ordering, short-circuiting and the
//! artifacts handed to the report.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use velvet_lib::{
    Coverage, FileFormat, FileLayout, HashLength, Phase, PhaseRunner, Pipeline, ReadFileInfo,
    ReadsChannel, ReportBuilder, ReportRequest, Result, ToolCommand, ToolConfig, VelvetError,
    VelvetResults, VelvetgParams, VelvethOptions, VelvethParams,
};

/// Records commands and writes the files a real phase would
struct FakeRunner {
    scratch: PathBuf,
    fail: Option<Phase>,
    calls: RefCell<Vec<(Phase, ToolCommand)>>,
}

impl FakeRunner {
    fn new(scratch: &Path) -> Self {
        Self { scratch: scratch.to_path_buf(), fail: None, calls: RefCell::new(Vec::new()) }
    }

    fn failing(scratch: &Path, phase: Phase) -> Self {
        Self { fail: Some(phase), ..Self::new(scratch) }
    }

    fn phases(&self) -> Vec<Phase> {
        self.calls.borrow().iter().map(|(phase, _)| *phase).collect()
    }

    fn touch(dir: &Path, names: &[&str]) {
        fs::create_dir_all(dir).unwrap();
        for name in names {
            fs::write(dir.join(name), b"").unwrap();
        }
    }
}

impl PhaseRunner for FakeRunner {
    fn run(&self, phase: Phase, command: &ToolCommand) -> Result<()> {
        self.calls.borrow_mut().push((phase, command.clone()));
        if self.fail == Some(phase) {
            return Err(VelvetError::ExternalProcessFailure {
                phase,
                status: "exit status: 1".into(),
                stderr_tail: "simulated failure".into(),
            });
        }
        let folder = &command.args[0];
        match phase {
            Phase::Indexing => {
                let hash = &command.args[1];
                let dirs: Vec<String> = match hash.split(',').map(|v| v.parse::<i64>().unwrap()).collect::<Vec<_>>()[..] {
                    [_] => vec![folder.clone()],
                    [min, max, step] => (min..max).step_by(step as usize).map(|k| format!("{folder}_{k}")).collect(),
                    _ => panic!("bad hash token {hash}"),
                };
                for dir in dirs {
                    Self::touch(&self.scratch.join(dir), &["Roadmaps", "Sequences"]);
                }
            }
            Phase::GraphConstruction => {
                let mut files = vec!["contigs.fa", "stats.txt", "LastGraph"];
                if command.args.windows(2).any(|w| w[0] == "-amos_file" && w[1] == "yes") {
                    files.push("velvet_asm.afg");
                }
                Self::touch(&self.scratch.join(folder), &files);
            }
        }
        Ok(())
    }
}

/// Records the request and returns fixed handles
#[derive(Default)]
struct RecordingReporter {
    requests: RefCell<Vec<ReportRequest>>,
}

impl ReportBuilder for RecordingReporter {
    fn build_report(&self, request: &ReportRequest) -> Result<VelvetResults> {
        self.requests.borrow_mut().push(request.clone());
        Ok(VelvetResults { report_name: "velvet_report_1".into(), report_ref: "ws/7/1".into() })
    }
}

fn interleaved(read_type: &str, file: &str) -> ReadsChannel {
    ReadsChannel {
        read_type: read_type.into(),
        file_format: FileFormat::Fasta,
        file_layout: None,
        read_file_info: ReadFileInfo { read_file: Some(file.into()), ..ReadFileInfo::default() },
    }
}

fn velveth_params(hash_length: HashLength) -> VelvethParams {
    VelvethParams {
        out_folder: "asm".into(),
        workspace_name: "ws".into(),
        hash_length,
        reads_channels: vec![
            interleaved("shortPaired", "inter.fa"),
            ReadsChannel {
                read_type: "shortPaired".into(),
                file_format: FileFormat::Fastq,
                file_layout: Some(FileLayout::Separate),
                read_file_info: ReadFileInfo {
                    left_file: Some("left.fq".into()),
                    right_file: Some("right.fq".into()),
                    ..ReadFileInfo::default()
                },
            },
        ],
        options: VelvethOptions::default(),
    }
}

fn velvetg_params() -> VelvetgParams {
    VelvetgParams {
        wk_folder: "asm".into(),
        workspace_name: "ws".into(),
        cov_cutoff: Some(Coverage::Auto),
        read_trkg: Some(true),
        ..VelvetgParams::default()
    }
}

#[test]
fn test_full_run() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new(dir.path());
    let reporter = RecordingReporter::default();
    let pipeline = Pipeline::new(ToolConfig::new(dir.path()).unwrap(), runner, reporter).unwrap();

    let results = pipeline.run(&velveth_params(HashLength::Single(22)), &velvetg_params()).unwrap();
    assert_eq!(results, VelvetResults { report_name: "velvet_report_1".into(), report_ref: "ws/7/1".into() });
}

#[test]
fn test_full_run_commands_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new(dir.path());
    let reporter = RecordingReporter::default();
    let config = ToolConfig::new(dir.path()).unwrap();
    let pipeline = Pipeline::new(config, &runner, &reporter).unwrap();

    pipeline.run(&velveth_params(HashLength::Single(22)), &velvetg_params()).unwrap();

    let calls = runner.calls.borrow();
    assert_eq!(runner.phases(), vec![Phase::Indexing, Phase::GraphConstruction]);
    assert_eq!(
        calls[0].1.args,
        vec![
            "asm", "21",
            "-shortPaired", "-fasta", "-interleaved", "inter.fa",
            "-shortPaired2", "-fastq", "-separate", "left.fq", "right.fq",
        ]
    );
    assert_eq!(calls[1].1.args, vec!["asm", "-cov_cutoff", "auto", "-read_trkg", "yes"]);

    let requests = reporter.requests.borrow();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.workspace_name, "ws");
    assert_eq!(request.index.len(), 1);
    assert_eq!(request.index[0].sequences, dir.path().join("asm").join("Sequences"));
    assert_eq!(request.assemblies.len(), 1);
    assert_eq!(request.assemblies[0].contigs, dir.path().join("asm").join("contigs.fa"));
    assert_eq!(request.assemblies[0].amos, None);
}

#[test]
fn test_indexing_failure_skips_graph_construction() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::failing(dir.path(), Phase::Indexing);
    let reporter = RecordingReporter::default();
    let pipeline = Pipeline::new(ToolConfig::new(dir.path()).unwrap(), &runner, &reporter).unwrap();

    let err = pipeline.run(&velveth_params(HashLength::Single(21)), &velvetg_params()).unwrap_err();
    assert!(matches!(err, VelvetError::ExternalProcessFailure { phase: Phase::Indexing, .. }));
    assert_eq!(err.phase(), Some(Phase::Indexing));
    assert_eq!(runner.phases(), vec![Phase::Indexing]);
    assert!(reporter.requests.borrow().is_empty());
}

#[test]
fn test_graph_failure_reports_phase() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::failing(dir.path(), Phase::GraphConstruction);
    let reporter = RecordingReporter::default();
    let pipeline = Pipeline::new(ToolConfig::new(dir.path()).unwrap(), &runner, &reporter).unwrap();

    let err = pipeline.run(&velveth_params(HashLength::Single(21)), &velvetg_params()).unwrap_err();
    assert_eq!(err.phase(), Some(Phase::GraphConstruction));
    assert!(reporter.requests.borrow().is_empty());
    // Indexing output stays in place
    assert!(dir.path().join("asm").join("Roadmaps").exists());
}

#[test]
fn test_validation_errors_run_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new(dir.path());
    let reporter = RecordingReporter::default();
    let pipeline = Pipeline::new(ToolConfig::new(dir.path()).unwrap(), &runner, &reporter).unwrap();

    let mut velveth = velveth_params(HashLength::Single(21));
    velveth.reads_channels.push(ReadsChannel {
        read_type: "reference".into(),
        file_format: FileFormat::Fasta,
        file_layout: None,
        read_file_info: ReadFileInfo { reference_file: Some("a.fa".into()), ..ReadFileInfo::default() },
    });
    velveth.reads_channels.push(ReadsChannel {
        read_type: "reference".into(),
        file_format: FileFormat::Fasta,
        file_layout: None,
        read_file_info: ReadFileInfo { reference_file: Some("b.fa".into()), ..ReadFileInfo::default() },
    });
    let err = pipeline.run(&velveth, &velvetg_params()).unwrap_err();
    assert!(matches!(err, VelvetError::DuplicateReferenceChannel { channel: 3 }));

    let bad_velvetg = VelvetgParams { exp_cov: Some(Coverage::Fixed(f64::INFINITY)), ..velvetg_params() };
    let err = pipeline.run(&velveth_params(HashLength::Single(21)), &bad_velvetg).unwrap_err();
    assert!(matches!(err, VelvetError::InvalidParameter { name: "exp_cov", .. }));

    assert!(runner.phases().is_empty());
}

#[test]
fn test_mismatched_work_folder_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new(dir.path());
    let reporter = RecordingReporter::default();
    let pipeline = Pipeline::new(ToolConfig::new(dir.path()).unwrap(), &runner, &reporter).unwrap();

    let elsewhere = VelvetgParams { wk_folder: "elsewhere".into(), ..velvetg_params() };
    let err = pipeline.run(&velveth_params(HashLength::Single(21)), &elsewhere).unwrap_err();
    assert!(matches!(err, VelvetError::InvalidParameter { name: "wk_folder", .. }));
    assert!(runner.phases().is_empty());
    assert!(reporter.requests.borrow().is_empty());

    // An absolute path to the same directory is accepted
    let absolute = VelvetgParams {
        wk_folder: dir.path().join("asm").display().to_string(),
        ..velvetg_params()
    };
    pipeline.run(&velveth_params(HashLength::Single(21)), &absolute).unwrap();
    assert_eq!(runner.phases(), vec![Phase::Indexing, Phase::GraphConstruction]);
}

#[test]
fn test_hash_length_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new(dir.path());
    let reporter = RecordingReporter::default();
    let pipeline = Pipeline::new(ToolConfig::new(dir.path()).unwrap(), &runner, &reporter).unwrap();

    pipeline
        .run(&velveth_params(HashLength::Range { min: 21, max: 26, step: 2 }), &velvetg_params())
        .unwrap();

    let calls = runner.calls.borrow();
    assert_eq!(calls[0].1.args[1], "21,25,2");
    let velvetg_folders: Vec<&str> = calls[1..].iter().map(|(_, c)| c.args[0].as_str()).collect();
    assert_eq!(velvetg_folders, vec!["asm_21", "asm_23"]);

    let requests = reporter.requests.borrow();
    assert_eq!(requests[0].index.len(), 2);
    assert_eq!(requests[0].assemblies.len(), 2);
    assert_eq!(requests[0].assemblies[1].dir, dir.path().join("asm_23"));
}

#[test]
fn test_amos_artifact_collected_when_requested() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new(dir.path());
    let reporter = RecordingReporter::default();
    let pipeline = Pipeline::new(ToolConfig::new(dir.path()).unwrap(), &runner, &reporter).unwrap();

    let velvetg = VelvetgParams { amos_file: Some(true), ..velvetg_params() };
    pipeline.run(&velveth_params(HashLength::Single(21)), &velvetg).unwrap();

    let requests = reporter.requests.borrow();
    assert_eq!(requests[0].assemblies[0].amos, Some(dir.path().join("asm").join("velvet_asm.afg")));
}

#[test]
fn test_single_phases() {
    let dir = tempfile::tempdir().unwrap();
    let runner = FakeRunner::new(dir.path());
    let reporter = RecordingReporter::default();
    let pipeline = Pipeline::new(ToolConfig::new(dir.path()).unwrap(), &runner, &reporter).unwrap();

    pipeline.run_velveth(&velveth_params(HashLength::Single(31))).unwrap();
    pipeline.run_velvetg(&velvetg_params()).unwrap();

    assert_eq!(runner.phases(), vec![Phase::Indexing, Phase::GraphConstruction]);
    let requests = reporter.requests.borrow();
    assert!(requests[0].assemblies.is_empty());
    assert_eq!(requests[0].index.len(), 1);
    assert!(requests[1].index.is_empty());
    assert_eq!(requests[1].assemblies.len(), 1);
}

#[cfg(unix)]
mod with_scripts {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use velvet_lib::ProcessRunner;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_process_runner_end_to_end() {
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let velveth = script(
            bin.path(),
            "velveth",
            r#"mkdir -p "$1" && touch "$1/Roadmaps" "$1/Sequences" && echo "$@" > "$1/velveth.args""#,
        );
        let velvetg = script(
            bin.path(),
            "velvetg",
            r#"touch "$1/contigs.fa" "$1/stats.txt" "$1/LastGraph" && echo "$@" > "$1/velvetg.args""#,
        );
        let config = ToolConfig {
            velveth_binary: velveth,
            velvetg_binary: velvetg,
            velveth_timeout_secs: Some(30),
            ..ToolConfig::new(scratch.path()).unwrap()
        };
        let runner = ProcessRunner::new(&config);
        let reporter = RecordingReporter::default();
        let pipeline = Pipeline::new(config, runner, &reporter).unwrap();

        pipeline.run(&velveth_params(HashLength::Single(21)), &velvetg_params()).unwrap();

        let asm = scratch.path().join("asm");
        let velveth_args = fs::read_to_string(asm.join("velveth.args")).unwrap();
        assert_eq!(
            velveth_args.trim(),
            "asm 21 -shortPaired -fasta -interleaved inter.fa -shortPaired2 -fastq -separate left.fq right.fq"
        );
        let velvetg_args = fs::read_to_string(asm.join("velvetg.args")).unwrap();
        assert_eq!(velvetg_args.trim(), "asm -cov_cutoff auto -read_trkg yes");
        assert_eq!(reporter.requests.borrow().len(), 1);
    }

    #[test]
    fn test_failing_velveth_script() {
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let velveth = script(bin.path(), "velveth", "echo 'cannot open inter.fa' >&2; exit 1");
        let velvetg = script(bin.path(), "velvetg", "touch \"$1/ran\"");
        let config = ToolConfig {
            velveth_binary: velveth,
            velvetg_binary: velvetg,
            ..ToolConfig::new(scratch.path()).unwrap()
        };
        let runner = ProcessRunner::new(&config);
        let pipeline = Pipeline::new(config, runner, RecordingReporter::default()).unwrap();

        let err = pipeline.run(&velveth_params(HashLength::Single(21)), &velvetg_params()).unwrap_err();
        match err {
            VelvetError::ExternalProcessFailure { phase, stderr_tail, .. } => {
                assert_eq!(phase, Phase::Indexing);
                assert_eq!(stderr_tail, "cannot open inter.fa");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!scratch.path().join("asm").join("ran").exists());
    }
}
