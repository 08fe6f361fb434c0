use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use schemaview::core::config::Config;
use schemaview::core::import::{ImportResult, SqlDialect, import_legacy, import_sql};
use schemaview::core::{
    Canvas, ModelDocument, SchemaModel, View, ViewCanvas, association_class_anchor,
    layout_relationship,
};

/// Multi-view schema modeling tools
#[derive(Parser, Debug)]
#[command(name = "schemaview")]
#[command(about = "Import schemas and lay out their relationships", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a DDL script or legacy export into a model document
    Import {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Input format
        #[arg(short, long, value_enum, default_value_t = InputFormat::Ddl)]
        format: InputFormat,

        /// SQL dialect (defaults to SCHEMAVIEW_SQL_DIALECT)
        #[arg(short, long)]
        dialect: Option<SqlDialect>,

        /// Model name (defaults to SCHEMAVIEW_MODEL_NAME)
        #[arg(short, long)]
        name: Option<String>,

        /// Output file; stdout when omitted
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Print connector paths of a model document for one view
    Paths {
        /// Model document
        #[arg(value_name = "DOCUMENT")]
        document: PathBuf,

        /// View to lay out
        #[arg(short, long, default_value_t = View::Physical)]
        view: View,

        /// Node width used for every entity
        #[arg(long, default_value_t = 200.0)]
        width: f64,

        /// Node height used for every entity
        #[arg(long, default_value_t = 120.0)]
        height: f64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InputFormat {
    Ddl,
    Legacy,
}

fn main() -> Result<(), String> {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Args::parse().command {
        Command::Import {
            input,
            format,
            dialect,
            name,
            output,
        } => {
            let source = std::fs::read_to_string(&input)
                .map_err(|e| format!("Failed to read input file: {}", e))?;
            let result = match format {
                InputFormat::Ddl => import_sql(&source, dialect.unwrap_or(config.sql_dialect)),
                InputFormat::Legacy => import_legacy(&source),
            }
            .map_err(|e| format!("Import failed: {}", e))?;

            write_import(result, name.unwrap_or(config.model_name), output)
        }
        Command::Paths {
            document,
            view,
            width,
            height,
        } => print_paths(&config, &document, view, width, height),
    }
}

fn write_import(result: ImportResult, name: String, output: Option<PathBuf>) -> Result<(), String> {
    let unmatched = result.warnings.unmatched_attribute_types;
    let json = result
        .into_document(name)
        .to_json()
        .map_err(|e| format!("Failed to serialize model: {}", e))?;

    match output {
        Some(path) => {
            std::fs::write(&path, json).map_err(|e| format!("Failed to write model: {}", e))?;
            eprintln!("Model saved to: {}", path.display());
        }
        None => println!("{}", json),
    }
    if unmatched > 0 {
        eprintln!(
            "Warning: {} attribute type(s) could not be mapped and were left undefined",
            unmatched
        );
    }
    Ok(())
}

fn print_paths(
    config: &Config,
    document: &Path,
    view: View,
    width: f64,
    height: f64,
) -> Result<(), String> {
    let json = std::fs::read_to_string(document)
        .map_err(|e| format!("Failed to read document: {}", e))?;
    let document =
        ModelDocument::from_json(&json).map_err(|e| format!("Failed to load document: {}", e))?;
    let model = SchemaModel::from_document(document);

    let sizes = HashMap::new();
    let canvas = ViewCanvas::new(&model, view, &sizes).with_default_size(width, height);

    for relationship in model.relationships() {
        let Some(connector) = layout_relationship(&canvas, relationship, &config.layout) else {
            tracing::debug!("Relationship '{}' is not visible in {}", relationship.id, view);
            continue;
        };
        println!("{}\t{}", relationship.id, connector.path);

        if let Some(class) = relationship
            .kind
            .association_class()
            .and_then(|class| canvas.node(class))
        {
            let (from, to) = association_class_anchor(connector.label, &class);
            println!(
                "{}:class\tM {} {} L {} {}",
                relationship.id, from.x, from.y, to.x, to.y
            );
        }
    }

    Ok(())
}
