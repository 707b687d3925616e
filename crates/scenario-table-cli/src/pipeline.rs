//! Input loading and the fixed comparison pipeline.

use std::path::{Path, PathBuf};

use log::info;
use scenario_table_core::{
    AppendSpec, Predicate, RunMetadata, ScenarioTable,
    config::{RunControl, UnitTable},
    io::{read_block_csv, read_iamc_csv_with_metadata, read_metadata_csv},
};
use snafu::{OptionExt, ResultExt};

use crate::error::{
    CliResult, ConfigSnafu, GroupWithoutRunControlSnafu, InvalidPredicateSnafu,
    InvalidReferenceSnafu, LoadSnafu, PipelineSnafu,
};

#[derive(Debug, Clone)]
pub struct Inputs {
    pub data: PathBuf,
    pub meta: Option<PathBuf>,
    pub units: Option<PathBuf>,
}

/// Load data and metadata, installing any extra unit conversions.
pub fn load_table(inputs: &Inputs) -> CliResult<ScenarioTable> {
    let metadata = match &inputs.meta {
        Some(path) => read_metadata_csv(path).context(LoadSnafu { what: "metadata" })?,
        None => RunMetadata::new(),
    };
    let mut table =
        read_iamc_csv_with_metadata(&inputs.data, metadata).context(LoadSnafu { what: "data" })?;

    if let Some(path) = &inputs.units {
        let units = UnitTable::from_path(path).context(ConfigSnafu)?;
        table = table.with_unit_registry(units.to_registry().context(ConfigSnafu)?);
    }

    info!(
        "loaded {} row(s) across {} run(s) from {}",
        table.len(),
        table.runs().len(),
        inputs.data.display()
    );
    Ok(table)
}

/// Parse repeated `field=value[,value]` flags.
pub fn parse_predicates(flag: &'static str, specs: &[String]) -> CliResult<Vec<Predicate>> {
    specs
        .iter()
        .map(|spec| {
            spec.parse::<Predicate>()
                .context(InvalidPredicateSnafu { flag, spec: spec.as_str() })
        })
        .collect()
}

/// Combine `--filter`, `--exclude` and an optional run-control group into
/// one predicate. Each exclusion is negated on its own.
pub fn selection(
    keep: &[String],
    exclude: &[String],
    group: Option<(&str, &Path, &str)>,
) -> CliResult<Predicate> {
    let mut parts = parse_predicates("filter", keep)?;
    parts.extend(
        parse_predicates("exclude", exclude)?
            .into_iter()
            .map(Predicate::negate),
    );
    if let Some((name, run_control, attribute)) = group {
        let rc = RunControl::from_path(run_control).context(ConfigSnafu)?;
        parts.push(rc.group_predicate(name, attribute).context(ConfigSnafu)?);
    }
    Ok(Predicate::all(parts))
}

/// Resolve `--group` against `--run-control`, rejecting a lone `--group`.
pub fn group_arg<'a>(
    group: Option<&'a str>,
    run_control: Option<&'a Path>,
    attribute: &'a str,
) -> CliResult<Option<(&'a str, &'a Path, &'a str)>> {
    match group {
        None => Ok(None),
        Some(name) => {
            let rc = run_control.context(GroupWithoutRunControlSnafu)?;
            Ok(Some((name, rc, attribute)))
        }
    }
}

/// A reference block to append: `<path>:<model>:<scenario>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub path: PathBuf,
    pub model: String,
    pub scenario: String,
}

impl Reference {
    /// Split from the right so paths may contain `:`.
    pub fn parse(spec: &str) -> CliResult<Self> {
        let mut parts = spec.rsplitn(3, ':');
        let (scenario, model, path) = match (parts.next(), parts.next(), parts.next()) {
            (Some(s), Some(m), Some(p)) if !s.is_empty() && !m.is_empty() && !p.is_empty() => {
                (s, m, p)
            }
            _ => return InvalidReferenceSnafu { spec }.fail(),
        };
        Ok(Reference {
            path: PathBuf::from(path),
            model: model.to_string(),
            scenario: scenario.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompareOpts {
    pub exclude: Vec<String>,
    pub variable: String,
    pub years: Vec<i32>,
    pub from_unit: String,
    pub to_unit: String,
    pub references: Vec<Reference>,
}

/// exclude -> keep variable and years -> convert -> append references.
pub fn compare(table: &ScenarioTable, opts: &CompareOpts) -> CliResult<ScenarioTable> {
    let exclusion = selection(&[], &opts.exclude, None)?;
    let mut out = table
        .filter(&exclusion)
        .context(PipelineSnafu { step: format!("filter '{exclusion}'") })?;

    let mut keep = Predicate::equals("variable", opts.variable.as_str());
    if !opts.years.is_empty() {
        keep = keep.and(Predicate::years(opts.years.iter().copied()));
    }
    out = out
        .filter(&keep)
        .context(PipelineSnafu { step: format!("filter '{keep}'") })?;

    out.convert_unit_inplace(&opts.from_unit, &opts.to_unit)
        .context(PipelineSnafu {
            step: format!("convert_unit '{}' -> '{}'", opts.from_unit, opts.to_unit),
        })?;

    for reference in &opts.references {
        let block = read_block_csv(&reference.path).context(LoadSnafu { what: "reference block" })?;
        let spec = AppendSpec::new(
            reference.model.as_str(),
            reference.scenario.as_str(),
            opts.variable.as_str(),
            opts.to_unit.as_str(),
        );
        out.append_block_inplace(&block, &spec)
            .context(PipelineSnafu {
                step: format!("append {}", reference.path.display()),
            })?;
    }

    info!("compare: {} row(s) after pipeline", out.len());
    Ok(out)
}
