//! VERBUM CLI Entry Point
//!
//! Looks up a scripture reference and prints the assembled text, the raw
//! USFM, or the full result as JSON.

use std::io::Write;

use clap::{Parser, ValueEnum};
use verbum_core::{ScriptureFormat, ScriptureRequest, ScriptureResult, VerbumError, VerbumResult};
use verbum_service::{init_tracing, ResourceOutcome, ScriptureService, ServiceConfig, TelemetryConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Usfm,
}

impl From<OutputFormat> for ScriptureFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ScriptureFormat::Text,
            OutputFormat::Usfm => ScriptureFormat::Usfm,
        }
    }
}

/// Command-line arguments for verbum
#[derive(Parser, Debug)]
#[command(name = "verbum")]
#[command(about = "Fetch aligned scripture from Door43 resources")]
struct Args {
    /// Reference such as "John 3:16", "Gen 1" or "Rom 8:28-30"
    reference: String,

    /// Language code
    #[arg(short, long, env = "VERBUM_DEFAULT_LANGUAGE")]
    language: Option<String>,

    /// Publishing organization
    #[arg(short, long, env = "VERBUM_DEFAULT_ORGANIZATION")]
    organization: Option<String>,

    /// Resource id; repeat to compare several resources
    #[arg(short, long)]
    resource: Vec<String>,

    /// Release tag, or "master" for the branch head
    #[arg(long, default_value = "master")]
    version: String,

    /// Output body
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Omit verse numbers from assembled text
    #[arg(long)]
    no_verse_numbers: bool,

    /// Print the full result, alignment included, as JSON
    #[arg(long)]
    json: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> VerbumResult<()> {
    let args = Args::parse();
    let config = ServiceConfig::from_env()?;

    let mut telemetry = TelemetryConfig::default().with_format(config.log_format);
    if args.verbose {
        telemetry = telemetry.verbose();
    }
    init_tracing(&telemetry)?;

    let request = ScriptureRequest::new(args.reference.as_str())
        .with_language(args.language.clone().unwrap_or_else(|| config.default_language.clone()))
        .with_organization(
            args.organization
                .clone()
                .unwrap_or_else(|| config.default_organization.clone()),
        )
        .with_resource(config.default_resource.clone())
        .with_version(args.version.as_str())
        .with_format(args.format.into())
        .with_verse_numbers(!args.no_verse_numbers)
        .with_alignment(args.json);

    let service = ScriptureService::from_config(config)?;

    let outcome = if args.resource.len() > 1 {
        let outcomes = service.fetch_scripture_multi(request, &args.resource).await;
        print_many(&outcomes, &args)
    } else {
        let request = match args.resource.first() {
            Some(resource) => request.with_resource(resource.as_str()),
            None => request,
        };
        match service.fetch_scripture(request).await {
            Ok(result) => print_one(&result, &args),
            Err(e) => Err(e),
        }
    };

    service.shutdown().await?;
    outcome
}

fn print_one(result: &ScriptureResult, args: &Args) -> VerbumResult<()> {
    if !result.warnings.is_empty() {
        tracing::warn!(
            reference = %result.citation,
            warnings = result.warnings.count(),
            "Document contained markup problems"
        );
    }

    let body = if args.json {
        serde_json::to_string_pretty(result)
            .map_err(|e| VerbumError::internal(format!("Failed to encode result: {}", e)))?
    } else {
        match (&result.usfm, args.format) {
            (Some(usfm), OutputFormat::Usfm) => usfm.clone(),
            _ => format!("{}\n  ({})", result.text, result.translation),
        }
    };
    emit(&body)
}

fn print_many(outcomes: &[ResourceOutcome], args: &Args) -> VerbumResult<()> {
    if args.json {
        let report: Vec<serde_json::Value> = outcomes
            .iter()
            .map(|outcome| match &outcome.result {
                Ok(result) => serde_json::json!({ "resource": outcome.resource, "result": result }),
                Err(e) => serde_json::json!({ "resource": outcome.resource, "error": e.to_string() }),
            })
            .collect();
        let body = serde_json::to_string_pretty(&report)
            .map_err(|e| VerbumError::internal(format!("Failed to encode results: {}", e)))?;
        return emit(&body);
    }

    let mut failures = 0;
    for outcome in outcomes {
        match &outcome.result {
            Ok(result) => print_one(result, args)?,
            Err(e) => {
                failures += 1;
                tracing::error!(resource = %outcome.resource, error = %e, "Lookup failed");
            }
        }
    }
    if failures == outcomes.len() && !outcomes.is_empty() {
        return Err(VerbumError::internal("Every resource lookup failed"));
    }
    Ok(())
}

fn emit(body: &str) -> VerbumResult<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", body)
        .map_err(|e| VerbumError::internal(format!("Failed to write output: {}", e)))
}
