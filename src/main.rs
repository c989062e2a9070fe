use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use jsonquery::catalog::operators_for;
use jsonquery::export::export;
use jsonquery::options::build_store;
use jsonquery::{
    derive_view, schema, source, AppConfig, Args, ConfigManager, ExportFormat, FieldType,
    QueryOptions, Schema, APP_NAME,
};
use std::path::Path;
use tracing::{debug, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

fn init_tracing(debug: bool) {
    let default_filter = if debug { "warn,jsonquery=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn render_operators(field_type: FieldType) -> String {
    operators_for(field_type)
        .iter()
        .map(|op| {
            let hint = op.hint.and_then(|h| h.placeholder()).unwrap_or("");
            format!("{:<6} {:<38} {} {}", op.code, op.label, op.operand_count, hint)
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn handle_early_exit_flags(args: &Args) -> Result<Option<()>> {
    if args.generate_config {
        match ConfigManager::new(APP_NAME) {
            Ok(config_manager) => match config_manager.write_default_config(args.force) {
                Ok(path) => {
                    println!("Config file written to {}", path.display());
                    return Ok(Some(()));
                }
                Err(e) => {
                    eprintln!("Error writing config file: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error initializing config manager: {}", e);
                std::process::exit(1);
            }
        }
    }

    if let Some(tag) = &args.list_operators {
        match FieldType::from_tag(tag) {
            Some(field_type) => {
                println!("{}", render_operators(field_type));
                return Ok(Some(()));
            }
            None => {
                eprintln!(
                    "Unknown field type '{}'. Expected one of: string, int, bool, date, array",
                    tag
                );
                std::process::exit(1);
            }
        }
    }

    Ok(None)
}

/// Explicit --format, then the --output extension, then the config default.
fn resolve_export_format(args: &Args, config: &AppConfig) -> ExportFormat {
    args.format
        .or_else(|| args.output.as_deref().and_then(ExportFormat::from_path))
        .unwrap_or_else(|| config.export_format())
}

fn load_schema(args: &Args, config: &AppConfig, records: &[jsonquery::Record]) -> Result<Schema> {
    match &args.schema {
        Some(path) => source::load_schema(path),
        None if config.loading.infer_schema => {
            let inferred = schema::infer(records);
            debug!(fields = inferred.len(), "inferred schema");
            Ok(inferred)
        }
        None => Err(eyre!(
            "No schema given. Pass --schema FILE or set loading.infer_schema = true"
        )),
    }
}

fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, text)
            .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e)),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

fn run(args: &Args, config: &AppConfig) -> Result<()> {
    let data_path = args
        .data
        .as_deref()
        .ok_or_else(|| eyre!("A data file is required"))?;
    let compression = args.compression.or_else(|| config.compression());
    let records = source::load_records(data_path, compression)?;
    debug!(records = records.len(), path = %data_path.display(), "loaded data");

    let schema = load_schema(args, config, &records)?;
    let options = QueryOptions::from_args(args, config)?;
    let store = build_store(schema, records, &options)?;
    let view = derive_view(store.state())?;

    if args.stats {
        let stats = view.stats();
        if stats.is_empty() {
            warn!("No groups to report statistics for");
        }
        for stat in stats {
            println!("{}: {}", stat.name, stat.value);
        }
        return Ok(());
    }

    let format = resolve_export_format(args, config);
    match export(&view, format, config.line_ending())? {
        Some(text) => write_output(&text, args.output.as_deref()),
        None => {
            warn!("Nothing to export: the result is empty");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(()) = handle_early_exit_flags(&args)? {
        return Ok(());
    }

    color_eyre::install()?;

    let (config, config_error) = match AppConfig::load(APP_NAME) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    init_tracing(args.debug || config.debug.enabled);
    if let Some(e) = config_error {
        warn!("Ignoring config: {}", e);
    }

    if let Err(e) = run(&args, &config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_export_format() {
        let config = AppConfig::default();
        let args = Args::parse_from(["jsonquery", "data.json"]);
        assert_eq!(resolve_export_format(&args, &config), ExportFormat::Json);

        let args = Args::parse_from(["jsonquery", "data.json", "-o", "out.csv"]);
        assert_eq!(resolve_export_format(&args, &config), ExportFormat::Csv);

        let args = Args::parse_from(["jsonquery", "data.json", "-o", "out.csv", "--format", "json"]);
        assert_eq!(resolve_export_format(&args, &config), ExportFormat::Json);

        let mut config = AppConfig::default();
        config.export.format = "csv".to_string();
        let args = Args::parse_from(["jsonquery", "data.json", "-o", "out.txt"]);
        assert_eq!(resolve_export_format(&args, &config), ExportFormat::Csv);
    }

    #[test]
    fn test_render_operators() {
        let table = render_operators(FieldType::Bool);
        assert_eq!(table.lines().count(), 4);
        assert!(table.starts_with("nl"));
        let table = render_operators(FieldType::Date);
        assert!(table.contains("YYYYMMDD"));
    }
}
