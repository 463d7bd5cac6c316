//! velvetg parameter mapping
//!
//! Each populated field of [`VelvetgParams`] becomes one flag/value pair.
//! Unset fields are left out so velvetg's own defaults apply; in particular
//! `min_contig_lgth` is never filled in here.

use crate::command::ToolCommand;
use crate::constants::VELVETG_BINARY;
use crate::config::ToolConfig;
use crate::error::{Phase, Result, VelvetError};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::debug;

/// A coverage value, or `auto` to let velvetg infer it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CoverageRepr", into = "CoverageRepr")]
pub enum Coverage {
    /// Explicit value
    Fixed(f64),
    /// Inferred by velvetg
    Auto,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CoverageRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<CoverageRepr> for Coverage {
    type Error = String;

    fn try_from(repr: CoverageRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            CoverageRepr::Number(value) => Ok(Coverage::Fixed(value)),
            CoverageRepr::Text(text) if text.eq_ignore_ascii_case("auto") => Ok(Coverage::Auto),
            CoverageRepr::Text(text) => Err(format!("expected a number or \"auto\", got {text:?}")),
        }
    }
}

impl From<Coverage> for CoverageRepr {
    fn from(coverage: Coverage) -> Self {
        match coverage {
            Coverage::Fixed(value) => CoverageRepr::Number(value),
            Coverage::Auto => CoverageRepr::Text("auto".into()),
        }
    }
}

impl fmt::Display for Coverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coverage::Fixed(value) => f.write_str(&format_float(*value)),
            Coverage::Auto => f.write_str("auto"),
        }
    }
}

/// Accept `true`/`false` as well as the `1`/`0` the service interface uses
fn deserialize_toggle<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ToggleRepr {
        Bool(bool),
        Int(i64),
    }

    match Option::<ToggleRepr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(ToggleRepr::Bool(b)) => Ok(Some(b)),
        Some(ToggleRepr::Int(0)) => Ok(Some(false)),
        Some(ToggleRepr::Int(1)) => Ok(Some(true)),
        Some(ToggleRepr::Int(n)) => Err(serde::de::Error::custom(format!("expected 0 or 1, got {n}"))),
    }
}

/// Render a float: integral values keep one decimal, others the shortest round-trip form
pub fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Parameters of the graph-construction phase
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelvetgParams {
    /// Directory holding velveth's output; velvetg writes here too
    pub wk_folder: String,
    /// Workspace the report is saved to
    pub workspace_name: String,

    /// `-cov_cutoff`: remove low coverage nodes after tour bus
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cov_cutoff: Option<Coverage>,
    /// `-ins_length`: expected insert length of the first paired library (0 = no pairing)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ins_length: Option<u64>,
    /// `-read_trkg`: track short read positions
    #[serde(deserialize_with = "deserialize_toggle", skip_serializing_if = "Option::is_none")]
    pub read_trkg: Option<bool>,
    /// `-min_contig_lgth`: minimum contig length exported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_contig_length: Option<u64>,
    /// `-amos_file`: export an AMOS assembly
    #[serde(deserialize_with = "deserialize_toggle", skip_serializing_if = "Option::is_none")]
    pub amos_file: Option<bool>,
    /// `-exp_cov`: expected coverage of unique regions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp_cov: Option<Coverage>,
    /// `-long_cov_cutoff`: remove nodes with low long-read coverage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_cov_cutoff: Option<f64>,

    /// `-ins_length2`: insert length of the second short paired library
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ins_length2: Option<u64>,
    /// `-ins_length_long`: insert length of long paired reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ins_length_long: Option<u64>,
    /// `-ins_length_sd`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ins_length_sd: Option<u64>,
    /// `-ins_length2_sd`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ins_length2_sd: Option<u64>,
    /// `-ins_length_long_sd`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ins_length_long_sd: Option<u64>,
    /// `-scaffolding`
    #[serde(deserialize_with = "deserialize_toggle", skip_serializing_if = "Option::is_none")]
    pub scaffolding: Option<bool>,
    /// `-max_branch_length`: maximum bubble length in bp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_branch_length: Option<u64>,
    /// `-max_divergence`: maximum divergence rate between bubble branches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_divergence: Option<f64>,
    /// `-max_gap_count`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_gap_count: Option<u64>,
    /// `-min_pair_count`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_pair_count: Option<u64>,
    /// `-max_coverage`: remove high coverage nodes after tour bus
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_coverage: Option<f64>,
    /// `-coverage_mask`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage_mask: Option<u64>,
    /// `-long_mult_cutoff`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_mult_cutoff: Option<u64>,
    /// `-unused_reads`: export UnusedReads.fa
    #[serde(deserialize_with = "deserialize_toggle", skip_serializing_if = "Option::is_none")]
    pub unused_reads: Option<bool>,
    /// `-alignments`: export contig alignments to the reference
    #[serde(deserialize_with = "deserialize_toggle", skip_serializing_if = "Option::is_none")]
    pub alignments: Option<bool>,
    /// `-exportFiltered`
    #[serde(deserialize_with = "deserialize_toggle", skip_serializing_if = "Option::is_none")]
    pub export_filtered: Option<bool>,
    /// `-clean`
    #[serde(deserialize_with = "deserialize_toggle", skip_serializing_if = "Option::is_none")]
    pub clean: Option<bool>,
    /// `-very_clean`
    #[serde(deserialize_with = "deserialize_toggle", skip_serializing_if = "Option::is_none")]
    pub very_clean: Option<bool>,
    /// `-paired_exp_fraction`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paired_exp_fraction: Option<f64>,
    /// `-shortMatePaired`: first library is mate-pair, possibly with paired-end contamination
    #[serde(deserialize_with = "deserialize_toggle", skip_serializing_if = "Option::is_none")]
    pub short_mate_paired: Option<bool>,
    /// `-conserveLong`
    #[serde(deserialize_with = "deserialize_toggle", skip_serializing_if = "Option::is_none")]
    pub conserve_long: Option<bool>,
}

fn check_float(name: &'static str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(VelvetError::InvalidParameter {
            name,
            reason: format!("must be a finite non-negative number, got {v}"),
        }),
        _ => Ok(()),
    }
}

fn fixed(coverage: Option<Coverage>) -> Option<f64> {
    match coverage {
        Some(Coverage::Fixed(v)) => Some(v),
        _ => None,
    }
}

/// Appends flag/value pairs to a command
struct FlagWriter<'a> {
    command: &'a mut ToolCommand,
}

impl FlagWriter<'_> {
    fn push(&mut self, flag: &str, value: String) {
        self.command.flag_value(flag, value);
    }

    fn int(&mut self, flag: &str, value: Option<u64>) {
        if let Some(v) = value {
            self.push(flag, v.to_string());
        }
    }

    /// Insert lengths where 0 means "no pairing"
    fn length(&mut self, flag: &str, value: Option<u64>) {
        self.int(flag, value.filter(|&v| v > 0));
    }

    fn float(&mut self, flag: &str, value: Option<f64>) {
        if let Some(v) = value {
            self.push(flag, format_float(v));
        }
    }

    fn coverage(&mut self, flag: &str, value: Option<Coverage>) {
        if let Some(v) = value {
            self.push(flag, v.to_string());
        }
    }

    fn toggle(&mut self, flag: &str, value: Option<bool>) {
        if let Some(v) = value {
            self.push(flag, if v { "yes" } else { "no" }.to_string());
        }
    }
}

impl VelvetgParams {
    /// Check required fields and numeric domains
    pub fn validate(&self) -> Result<()> {
        if self.wk_folder.trim().is_empty() {
            return Err(VelvetError::InvalidParameter {
                name: "wk_folder",
                reason: "must not be empty".into(),
            });
        }
        if self.workspace_name.trim().is_empty() {
            return Err(VelvetError::InvalidParameter {
                name: "workspace_name",
                reason: "must not be empty".into(),
            });
        }
        check_float("cov_cutoff", fixed(self.cov_cutoff))?;
        check_float("exp_cov", fixed(self.exp_cov))?;
        check_float("long_cov_cutoff", self.long_cov_cutoff)?;
        check_float("max_divergence", self.max_divergence)?;
        check_float("max_coverage", self.max_coverage)?;
        check_float("paired_exp_fraction", self.paired_exp_fraction)?;
        Ok(())
    }

    /// Whether velvetg will write `velvet_asm.afg`
    pub fn wants_amos(&self) -> bool {
        self.amos_file == Some(true)
    }

    /// Flag/value tokens for every populated field, in velvetg's documented order
    pub fn to_flags(&self) -> Result<Vec<String>> {
        let mut command = ToolCommand::new(VELVETG_BINARY);
        self.append_flags(&mut command)?;
        Ok(command.args)
    }

    /// Validate, then append the flags of [`Self::to_flags`] to `command`
    pub fn append_flags(&self, command: &mut ToolCommand) -> Result<()> {
        self.validate()?;
        let mut w = FlagWriter { command };

        w.coverage("-cov_cutoff", self.cov_cutoff);
        w.length("-ins_length", self.ins_length);
        w.toggle("-read_trkg", self.read_trkg);
        w.int("-min_contig_lgth", self.min_contig_length);
        w.toggle("-amos_file", self.amos_file);
        w.coverage("-exp_cov", self.exp_cov);
        w.float("-long_cov_cutoff", self.long_cov_cutoff);

        w.length("-ins_length2", self.ins_length2);
        w.length("-ins_length_long", self.ins_length_long);
        w.int("-ins_length_sd", self.ins_length_sd);
        w.int("-ins_length2_sd", self.ins_length2_sd);
        w.int("-ins_length_long_sd", self.ins_length_long_sd);
        w.toggle("-scaffolding", self.scaffolding);
        w.int("-max_branch_length", self.max_branch_length);
        w.float("-max_divergence", self.max_divergence);
        w.int("-max_gap_count", self.max_gap_count);
        w.int("-min_pair_count", self.min_pair_count);
        w.float("-max_coverage", self.max_coverage);
        w.int("-coverage_mask", self.coverage_mask);
        w.int("-long_mult_cutoff", self.long_mult_cutoff);
        w.toggle("-unused_reads", self.unused_reads);
        w.toggle("-alignments", self.alignments);
        w.toggle("-exportFiltered", self.export_filtered);
        w.toggle("-clean", self.clean);
        w.toggle("-very_clean", self.very_clean);
        w.float("-paired_exp_fraction", self.paired_exp_fraction);
        w.toggle("-shortMatePaired", self.short_mate_paired);
        w.toggle("-conserveLong", self.conserve_long);
        Ok(())
    }
}

/// Build the velvetg command running in `wk_folder`
pub fn velvetg_command_in(params: &VelvetgParams, wk_folder: &str, config: &ToolConfig) -> Result<ToolCommand> {
    let mut command = ToolCommand::new(config.binary(Phase::GraphConstruction));
    command.arg(wk_folder);
    params.append_flags(&mut command)?;
    debug!("velvetg tokens: {:?}", command.args);
    Ok(command)
}

/// Build the velvetg command for `params.wk_folder`
pub fn build_velvetg_command(params: &VelvetgParams, config: &ToolConfig) -> Result<ToolCommand> {
    velvetg_command_in(params, &params.wk_folder, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> VelvetgParams {
        VelvetgParams {
            wk_folder: "asm".into(),
            workspace_name: "ws".into(),
            ..VelvetgParams::default()
        }
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(5.0), "5.0");
        assert_eq!(format_float(0.0), "0.0");
        assert_eq!(format_float(0.25), "0.25");
        assert_eq!(format_float(3.1), "3.1");
        assert_eq!(format_float(12.125), "12.125");
    }

    #[test]
    fn test_auto_and_read_tracking() {
        let params = VelvetgParams {
            cov_cutoff: Some(Coverage::Auto),
            read_trkg: Some(true),
            ..base()
        };
        assert_eq!(params.to_flags().unwrap(), vec!["-cov_cutoff", "auto", "-read_trkg", "yes"]);
    }

    #[test]
    fn test_unset_fields_omitted() {
        assert!(base().to_flags().unwrap().is_empty());
        let command = build_velvetg_command(&base(), &ToolConfig::default()).unwrap();
        assert_eq!(command.args, vec!["asm"]);
    }

    #[test]
    fn test_zero_insert_length_disabled() {
        let params = VelvetgParams { ins_length: Some(0), ins_length2: Some(0), ..base() };
        assert!(params.to_flags().unwrap().is_empty());
        let params = VelvetgParams { ins_length: Some(300), ..base() };
        assert_eq!(params.to_flags().unwrap(), vec!["-ins_length", "300"]);
    }

    #[test]
    fn test_standard_options_order() {
        let params = VelvetgParams {
            cov_cutoff: Some(Coverage::Fixed(4.0)),
            ins_length: Some(350),
            read_trkg: Some(false),
            min_contig_length: Some(200),
            amos_file: Some(true),
            exp_cov: Some(Coverage::Fixed(21.5)),
            long_cov_cutoff: Some(2.0),
            ..base()
        };
        let command = build_velvetg_command(&params, &ToolConfig::default()).unwrap();
        assert_eq!(
            command.args,
            vec![
                "asm",
                "-cov_cutoff", "4.0",
                "-ins_length", "350",
                "-read_trkg", "no",
                "-min_contig_lgth", "200",
                "-amos_file", "yes",
                "-exp_cov", "21.5",
                "-long_cov_cutoff", "2.0",
            ]
        );
        assert!(params.wants_amos());
    }

    #[test]
    fn test_advanced_options() {
        let params = VelvetgParams {
            exp_cov: Some(Coverage::Auto),
            ins_length2: Some(2000),
            ins_length2_sd: Some(200),
            scaffolding: Some(false),
            max_divergence: Some(0.2),
            export_filtered: Some(true),
            short_mate_paired: Some(true),
            conserve_long: Some(false),
            ..base()
        };
        assert_eq!(
            params.to_flags().unwrap(),
            vec![
                "-exp_cov", "auto",
                "-ins_length2", "2000",
                "-ins_length2_sd", "200",
                "-scaffolding", "no",
                "-max_divergence", "0.2",
                "-exportFiltered", "yes",
                "-shortMatePaired", "yes",
                "-conserveLong", "no",
            ]
        );
    }

    #[test]
    fn test_min_contig_length_not_injected() {
        let params = VelvetgParams { cov_cutoff: Some(Coverage::Fixed(3.0)), ..base() };
        let flags = params.to_flags().unwrap();
        assert!(!flags.iter().any(|t| t == "-min_contig_lgth"));
    }

    #[test]
    fn test_command_runs_in_given_folder() {
        let params = VelvetgParams { ins_length: Some(250), amos_file: Some(true), ..base() };
        let command = velvetg_command_in(&params, "asm_23", &ToolConfig::default()).unwrap();
        assert_eq!(command.program, std::path::PathBuf::from("velvetg"));
        assert_eq!(command.args, vec!["asm_23", "-ins_length", "250", "-amos_file", "yes"]);
        assert_eq!(build_velvetg_command(&params, &ToolConfig::default()).unwrap().args[0], "asm");
    }

    #[test]
    fn test_invalid_numbers() {
        let params = VelvetgParams { cov_cutoff: Some(Coverage::Fixed(-1.0)), ..base() };
        assert!(matches!(
            params.to_flags(),
            Err(VelvetError::InvalidParameter { name: "cov_cutoff", .. })
        ));
        let params = VelvetgParams { max_coverage: Some(f64::NAN), ..base() };
        assert!(params.to_flags().is_err());
        let params = VelvetgParams { wk_folder: String::new(), ..base() };
        assert!(matches!(params.validate(), Err(VelvetError::InvalidParameter { name: "wk_folder", .. })));
    }

    #[test]
    fn test_deserialize_service_record() {
        let json = r#"{
            "wk_folder": "asm",
            "workspace_name": "ws",
            "cov_cutoff": "auto",
            "ins_length": 0,
            "read_trkg": 1,
            "amos_file": 0,
            "exp_cov": 15,
            "long_cov_cutoff": 2.5
        }"#;
        let params: VelvetgParams = serde_json::from_str(json).unwrap();
        assert_eq!(params.cov_cutoff, Some(Coverage::Auto));
        assert_eq!(params.read_trkg, Some(true));
        assert_eq!(params.amos_file, Some(false));
        assert_eq!(params.exp_cov, Some(Coverage::Fixed(15.0)));
        assert_eq!(params.min_contig_length, None);
        assert_eq!(
            params.to_flags().unwrap(),
            vec!["-cov_cutoff", "auto", "-read_trkg", "yes", "-amos_file", "no", "-exp_cov", "15.0", "-long_cov_cutoff", "2.5"]
        );
    }

    #[test]
    fn test_deserialize_rejects_bad_values() {
        assert!(serde_json::from_str::<VelvetgParams>(r#"{"cov_cutoff": "high"}"#).is_err());
        assert!(serde_json::from_str::<VelvetgParams>(r#"{"read_trkg": 2}"#).is_err());
        let params: VelvetgParams = serde_json::from_str(r#"{"clean": true}"#).unwrap();
        assert_eq!(params.clean, Some(true));
    }
}
