//! XPlan-Umring CLI
//!
//! Commands: convert, validate
//! Outputs JSON to stdout, logs to stderr (RUST_LOG, default warn)
//! Exit codes: 1 on I/O, parse or config errors, 2 on malformed input or
//! blocking validation

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use xplan_umring_core::{
    archive::{self, ConversionReport, ENTRY_NAME},
    parse_xml, ConvertError, FailureMode, MapperConfig, ParseOptions, TemplateMapper,
};

#[derive(Parser)]
#[command(name = "xplan-umring")]
#[command(version, about = "Convert an OGR GML plan boundary export to XPlanGML")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file with mapper settings (srsName, failureMode, indent)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Coordinate reference system written to the output
    #[arg(long, global = true)]
    srs: Option<String>,

    /// How validation findings are treated
    #[arg(long, global = true, value_enum)]
    failure_mode: Option<ModeArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Block,
    Warn,
    Log,
}

impl From<ModeArg> for FailureMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Block => FailureMode::Block,
            ModeArg::Warn => FailureMode::Warn,
            ModeArg::Log => FailureMode::Log,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a GML export into an XPlanArchiv (<plan-name>.zip)
    Convert {
        /// OGR GML file with one plan boundary feature
        input: PathBuf,

        /// Directory the archive is written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Print the XPlanGML document instead of writing an archive
        #[arg(long)]
        stdout: bool,
    },

    /// Extract and validate without writing anything
    Validate {
        /// OGR GML file with one plan boundary feature
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let mut mapper = TemplateMapper::new(config);

    let result = match &cli.command {
        Commands::Convert { input, output_dir, stdout } => convert(&mut mapper, input, output_dir, *stdout),
        Commands::Validate { input } => validate(&mapper, input),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&e),
    }
}

fn load_config(cli: &Cli) -> Result<MapperConfig, ConvertError> {
    let mut config = match &cli.config {
        Some(path) => MapperConfig::from_json_file(path)?,
        None => MapperConfig::default(),
    };
    if let Some(srs) = &cli.srs {
        config.srs_name = srs.clone();
    }
    if let Some(mode) = cli.failure_mode {
        config.failure_mode = mode.into();
    }
    Ok(config)
}

fn convert(mapper: &mut TemplateMapper, input: &Path, output_dir: &Path, stdout: bool) -> Result<(), ConvertError> {
    let text = fs::read_to_string(input)?;
    let document = parse_xml(&text, &ParseOptions::default())?;
    let conversion = mapper.convert_document(&document)?;
    let rendered = mapper.render(&conversion.document)?;

    if stdout {
        print!("{}", rendered);
        return Ok(());
    }

    let path = archive::archive_and_offer(
        ENTRY_NAME,
        &rendered,
        &archive::download_name(&conversion.feature.name),
        output_dir,
    )?;

    let report = ConversionReport::new(&conversion, &rendered, Some(path));
    let output = serde_json::json!({ "success": true, "report": report });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn validate(mapper: &TemplateMapper, input: &Path) -> Result<(), ConvertError> {
    let text = fs::read_to_string(input)?;
    let document = parse_xml(&text, &ParseOptions::default())?;
    let feature = xplan_umring_core::SourceFeature::extract(&document)?;
    let result = mapper.validate(&feature)?;

    let output = serde_json::json!({ "valid": result.valid, "feature": feature, "violations": result.violations });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn fail(error: &ConvertError) -> ExitCode {
    tracing::error!("{}", error);
    let output = serde_json::json!({ "success": false, "error": error.to_string() });
    println!("{}", output);

    match error {
        ConvertError::MalformedInput { .. } | ConvertError::ValidationFailed(_) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}
