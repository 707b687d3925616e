//! CLI tool for filtering and comparing IAMC scenario ensembles.

mod error;
mod output;
mod pipeline;

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use scenario_table_core::{CATEGORY, ScenarioTable};
use snafu::ResultExt;
use tracing_subscriber::EnvFilter;

use crate::{
    error::{CliResult, PipelineSnafu, StdoutSnafu},
    output::{OutputFormat, Preview, render_table, write_batch, write_preview},
    pipeline::{CompareOpts, Inputs, Reference, compare, group_arg, load_table, selection},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    Csv,
    Jsonl,
    Parquet,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(v: OutputFormatArg) -> Self {
        match v {
            OutputFormatArg::Csv => OutputFormat::Csv,
            OutputFormatArg::Jsonl => OutputFormat::Jsonl,
            OutputFormatArg::Parquet => OutputFormat::Parquet,
        }
    }
}

#[derive(Debug, Args)]
struct InputArgs {
    /// IAMC scenario data (wide or long CSV)
    #[arg(long)]
    data: PathBuf,

    /// Run metadata CSV (model, scenario, category, ...)
    #[arg(long)]
    meta: Option<PathBuf>,

    /// YAML table of extra unit conversions
    #[arg(long)]
    units: Option<PathBuf>,
}

impl From<InputArgs> for Inputs {
    fn from(args: InputArgs) -> Self {
        Inputs {
            data: args.data,
            meta: args.meta,
            units: args.units,
        }
    }
}

#[derive(Debug, Args)]
struct OutputArgs {
    #[arg(long, default_value_t = 10)]
    max_rows: usize,

    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormatArg::Csv)]
    format: OutputFormatArg,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize a dataset: sizes, distinct labels, categories
    Inspect {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Keep rows matching every --filter and no --exclude
    Filter {
        #[command(flatten)]
        input: InputArgs,

        /// Repeatable field=value[,value] selections (field!=value negates)
        #[arg(long = "filter")]
        filter: Vec<String>,

        /// Repeatable field=value[,value] exclusions
        #[arg(long)]
        exclude: Vec<String>,

        /// Keep runs whose --attribute is in this run-control group
        #[arg(long)]
        group: Option<String>,

        #[arg(long = "run-control")]
        run_control: Option<PathBuf>,

        /// Metadata attribute used by --group and exported with the rows
        #[arg(long, default_value = CATEGORY)]
        attribute: String,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Exclude, select one variable, convert units, append reference curves
    Compare {
        #[command(flatten)]
        input: InputArgs,

        /// Repeatable field=value[,value] exclusions
        #[arg(long, default_value = "category=Above 2C")]
        exclude: Vec<String>,

        /// Skip all exclusions
        #[arg(long, default_value_t = false)]
        no_exclude: bool,

        #[arg(long, default_value = "Emissions|CO2")]
        variable: String,

        /// Comma-separated years to keep (default: all)
        #[arg(long, value_delimiter = ',')]
        years: Vec<i32>,

        #[arg(long = "from-unit", default_value = "Mt CO2/yr")]
        from_unit: String,

        #[arg(long = "to-unit", default_value = "Gt CO2/yr")]
        to_unit: String,

        /// Repeatable <path>:<model>:<scenario> reference blocks
        #[arg(long = "reference")]
        reference: Vec<String>,

        #[command(flatten)]
        out: OutputArgs,
    },
}

#[derive(Debug, Parser)]
#[command(name = "sctable", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn label_or_none(label: Option<&str>) -> String {
    label.unwrap_or("(none)").to_string()
}

fn cmd_inspect(input: InputArgs) -> CliResult<()> {
    let table = load_table(&input.into())?;
    let years = table.years();
    let span = match (years.first(), years.last()) {
        (Some(first), Some(last)) => format!("{first}..={last} ({} distinct)", years.len()),
        _ => "-".to_string(),
    };

    let rows = vec![
        vec!["rows".to_string(), table.len().to_string()],
        vec!["runs".to_string(), table.runs().len().to_string()],
        vec!["models".to_string(), table.models().len().to_string()],
        vec!["scenarios".to_string(), table.scenarios().len().to_string()],
        vec!["regions".to_string(), table.regions().len().to_string()],
        vec!["variables".to_string(), table.variables().len().to_string()],
        vec!["units".to_string(), table.units().len().to_string()],
        vec!["years".to_string(), span],
        vec![
            "runs without metadata".to_string(),
            table.runs_without_metadata().len().to_string(),
        ],
    ];

    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", render_table(&["field".to_string(), "value".to_string()], &rows))
        .context(StdoutSnafu)?;

    let mut per_category: std::collections::BTreeMap<String, usize> = Default::default();
    for run in table.runs() {
        *per_category
            .entry(label_or_none(table.category_of(&run.model, &run.scenario)))
            .or_default() += 1;
    }
    let rows: Vec<Vec<String>> = per_category
        .into_iter()
        .map(|(label, n)| vec![label, n.to_string()])
        .collect();
    writeln!(stdout, "{}", render_table(&[CATEGORY.to_string(), "runs".to_string()], &rows))
        .context(StdoutSnafu)?;
    Ok(())
}

fn emit(table: &ScenarioTable, attribute: &str, out: OutputArgs) -> CliResult<()> {
    let attribute = table.metadata().has_attribute(attribute).then_some(attribute);
    let batch = table
        .to_record_batch(attribute)
        .context(PipelineSnafu { step: "export" })?;

    let mut stdout = std::io::stdout();
    write_preview(&Preview::of_batch(&batch, out.max_rows)?, &mut stdout)?;

    if let Some(path) = &out.output {
        let format: OutputFormat = out.format.into();
        write_batch(path, format, &batch)?;
        writeln!(stdout, "wrote: {} ({format:?})", path.display()).context(StdoutSnafu)?;
    }
    Ok(())
}

fn cmd_filter(
    input: InputArgs,
    filter: Vec<String>,
    exclude: Vec<String>,
    group: Option<String>,
    run_control: Option<PathBuf>,
    attribute: String,
    out: OutputArgs,
) -> CliResult<()> {
    let table = load_table(&input.into())?;
    let group = group_arg(group.as_deref(), run_control.as_deref(), &attribute)?;
    let predicate = selection(&filter, &exclude, group)?;

    let selected = table
        .filter(&predicate)
        .context(PipelineSnafu { step: format!("filter '{predicate}'") })?;
    emit(&selected, &attribute, out)
}

fn cmd_compare(input: InputArgs, opts: CompareOpts, out: OutputArgs) -> CliResult<()> {
    let table = load_table(&input.into())?;
    let result = compare(&table, &opts)?;

    let mut rows = Vec::new();
    for (label, ranges) in result.range_by_year(CATEGORY) {
        for r in ranges {
            rows.push(vec![
                label_or_none(label.as_deref()),
                r.year.to_string(),
                r.count.to_string(),
                format!("{:.3}", r.min),
                format!("{:.3}", r.median),
                format!("{:.3}", r.max),
            ]);
        }
    }
    let columns: Vec<String> = [CATEGORY, "year", "n", "min", "median", "max"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut stdout = std::io::stdout();
    writeln!(stdout, "{} ({})", opts.variable, opts.to_unit).context(StdoutSnafu)?;
    if !rows.is_empty() {
        writeln!(stdout, "{}", render_table(&columns, &rows)).context(StdoutSnafu)?;
    }
    emit(&result, CATEGORY, out)
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Inspect { input } => cmd_inspect(input),

        Command::Filter {
            input,
            filter,
            exclude,
            group,
            run_control,
            attribute,
            out,
        } => cmd_filter(input, filter, exclude, group, run_control, attribute, out),

        Command::Compare {
            input,
            exclude,
            no_exclude,
            variable,
            years,
            from_unit,
            to_unit,
            reference,
            out,
        } => {
            let references = reference
                .iter()
                .map(|spec| Reference::parse(spec))
                .collect::<CliResult<Vec<_>>>()?;
            let opts = CompareOpts {
                exclude: if no_exclude { Vec::new() } else { exclude },
                variable,
                years,
                from_unit,
                to_unit,
                references,
            };
            cmd_compare(input, opts, out)
        }
    }
}

fn main() {
    init_logging();
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
