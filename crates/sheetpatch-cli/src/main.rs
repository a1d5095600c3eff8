use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use sheetpatch_workbook::{
    BackendKind, CellAddress, JsonAdapter, PathResolver, UmyaAdapter, UpdaterConfig,
    WorkbookBackend, WorkbookUpdater,
};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sheetpatch", about = "Apply cell updates to spreadsheet files", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Copy an optional template to the output and write cell values into its first sheet.
    Apply(ApplyArgs),
    /// Validate A1 addresses and print their zero-based coordinates.
    Check(CheckArgs),
    /// Print the absolute path an output reference resolves to.
    Resolve(ResolveArgs),
}

#[derive(Parser, Debug)]
struct LocationArgs {
    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base directory for relative paths (overrides config and SHEETPATCH_BASE_DIR).
    #[arg(long = "base-dir")]
    base_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ApplyArgs {
    /// Destination workbook, absolute or relative to the base directory.
    #[arg(short, long)]
    output: String,

    /// Template file path or bundled resource name to seed the destination from.
    #[arg(short, long)]
    template: Option<String>,

    /// JSON object mapping addresses to values (`-` reads stdin).
    #[arg(short, long)]
    updates: Option<PathBuf>,

    /// Inline update such as `A1=42` or `B2="text"`; may be repeated.
    #[arg(long = "set", value_name = "ADDR=VALUE")]
    set: Vec<String>,

    /// Workbook format; inferred from the output extension when omitted.
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Print the result as JSON instead of the bare count.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    location: LocationArgs,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    #[arg(required = true)]
    addresses: Vec<String>,
}

#[derive(Parser, Debug)]
struct ResolveArgs {
    output: String,

    #[command(flatten)]
    location: LocationArgs,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Xlsx,
    Json,
}

impl From<Format> for BackendKind {
    fn from(value: Format) -> Self {
        match value {
            Format::Xlsx => BackendKind::Xlsx,
            Format::Json => BackendKind::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Apply(args) => apply(args),
        Command::Check(args) => check(args),
        Command::Resolve(args) => resolve(args),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(location: &LocationArgs) -> Result<UpdaterConfig> {
    let config = match &location.config {
        Some(path) => UpdaterConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => UpdaterConfig::default(),
    };
    let mut config = config.with_env_overrides();
    if let Some(dir) = &location.base_dir {
        config.base_dir = Some(dir.clone());
    }
    tracing::debug!(?config, "effective configuration");
    Ok(config)
}

fn apply(args: ApplyArgs) -> Result<()> {
    let config = load_config(&args.location)?;
    let updates = collect_updates(args.updates.as_deref(), &args.set)?;
    if updates.is_empty() {
        bail!("no updates given; use --updates <FILE> or --set ADDR=VALUE");
    }

    let backend = match args.format {
        Some(format) => format.into(),
        None if BackendKind::from_path(Path::new(&args.output)) == BackendKind::Json => {
            BackendKind::Json
        }
        None => config.backend,
    };

    let result = match backend {
        BackendKind::Xlsx => run::<UmyaAdapter>(&config, &args, &updates)?,
        BackendKind::Json => run::<JsonAdapter>(&config, &args, &updates)?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result.applied_count);
    }
    Ok(())
}

fn run<B: WorkbookBackend>(
    config: &UpdaterConfig,
    args: &ApplyArgs,
    updates: &Map<String, Value>,
) -> Result<sheetpatch_workbook::UpdateResult> {
    let updater = WorkbookUpdater::<B>::from_config(config)?;
    let result = updater
        .apply(args.template.as_deref(), &args.output, updates)
        .with_context(|| format!("failed to update {}", args.output))?;
    Ok(result)
}

/// Merge the updates file (if any) with inline `--set` pairs; inline pairs win.
fn collect_updates(file: Option<&Path>, inline: &[String]) -> Result<Map<String, Value>> {
    let mut updates = match file {
        Some(path) => {
            let text = if path == Path::new("-") {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read updates from stdin")?;
                buf
            } else {
                fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?
            };
            match serde_json::from_str::<Value>(&text)
                .with_context(|| format!("{} is not valid JSON", path.display()))?
            {
                Value::Object(map) => map,
                other => bail!(
                    "{} must contain a JSON object of address -> value, found {}",
                    path.display(),
                    json_kind(&other)
                ),
            }
        }
        None => Map::new(),
    };
    for entry in inline {
        let (address, value) = parse_assignment(entry)?;
        updates.insert(address, value);
    }
    Ok(updates)
}

/// `A1=42` → (`A1`, 42). The right-hand side is read as JSON when it parses,
/// otherwise taken as plain text.
fn parse_assignment(entry: &str) -> Result<(String, Value)> {
    let Some((address, raw)) = entry.split_once('=') else {
        bail!("invalid --set `{entry}` (expected ADDR=VALUE, e.g. A1=42)");
    };
    let address = address.trim();
    if address.is_empty() {
        bail!("invalid --set `{entry}` (missing cell address before '=')");
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((address.to_string(), value))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn check(args: CheckArgs) -> Result<()> {
    let mut invalid = 0usize;
    for address in &args.addresses {
        match CellAddress::parse(address) {
            Ok(addr) => println!("{address}\trow={}\tcol={}", addr.row, addr.col),
            Err(err) => {
                eprintln!("{err}");
                invalid += 1;
            }
        }
    }
    if invalid > 0 {
        bail!("{invalid} of {} addresses are invalid", args.addresses.len());
    }
    Ok(())
}

fn resolve(args: ResolveArgs) -> Result<()> {
    let config = load_config(&args.location)?;
    let resolver = PathResolver::from_config(&config)?;
    let resolved = resolver.resolve_destination(&args.output)?;
    println!("{}", resolved.path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn assignment_values_are_json_first() {
        assert_eq!(parse_assignment("A1=42").unwrap(), ("A1".into(), Value::from(42)));
        assert_eq!(parse_assignment("B2=true").unwrap(), ("B2".into(), Value::Bool(true)));
        assert_eq!(parse_assignment("C3=null").unwrap(), ("C3".into(), Value::Null));
        assert_eq!(
            parse_assignment("D4=\"007\"").unwrap(),
            ("D4".into(), Value::from("007"))
        );
        assert_eq!(
            parse_assignment("E5=hello world").unwrap(),
            ("E5".into(), Value::from("hello world"))
        );
        assert_eq!(parse_assignment("F6=a=b").unwrap(), ("F6".into(), Value::from("a=b")));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=1").is_err());
    }

    #[test]
    fn inline_updates_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("u.json");
        fs::write(&file, r#"{"A1": "from file", "B1": 1}"#).unwrap();

        let updates = collect_updates(Some(&file), &["A1=2".to_string()]).unwrap();
        assert_eq!(updates["A1"], Value::from(2));
        assert_eq!(updates["B1"], Value::from(1));
    }

    #[test]
    fn updates_file_must_be_an_object() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("u.json");
        fs::write(&file, "[1, 2]").unwrap();
        let err = collect_updates(Some(&file), &[]).unwrap_err();
        assert!(err.to_string().contains("an array"), "{err}");
    }
}
