//! # gridgraph-cli
//!
//! Command-line driver for gridgraph tables.
//!
//! Loads a schema and a data file of root objects, projects them onto a
//! table and exports it, applies an imported payload back onto the data,
//! or prints a single cell.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gridgraph_sheet::{
    RootRef, SerializationOptions, SourceRoot, Table, TableGenerator, TypeDesc, TypeRegistry,
};
use serde_json::{Map, Value as Json};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const GUID_KEY: &str = "$guid";
const PATH_KEY: &str = "$path";
const TYPE_KEY: &str = "$type";

/// gridgraph - edit object graphs as tables
#[derive(Parser, Debug)]
#[command(name = "gridgraph")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serialize the table built from the data file
    Export {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "tsv")]
        format: Format,

        /// Emit a header line of column names
        #[arg(long)]
        header: bool,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply a serialized payload to the data and write the result
    Import {
        #[command(flatten)]
        source: SourceArgs,

        /// Payload to apply
        #[arg(short, long)]
        input: PathBuf,

        /// Payload format; JSON payloads are detected regardless
        #[arg(short, long, value_enum, default_value = "tsv")]
        format: Format,

        /// The payload starts with a header line
        #[arg(long)]
        header: bool,

        /// Keep collection sizes instead of resizing to the payload
        #[arg(long)]
        no_resize: bool,

        /// Target column for each imported column, -1 to skip (e.g. 0,2,-1)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        map: Vec<i64>,

        /// Output data file (overwrites --data if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print one cell, addressed like B2 or B2.A1
    Show {
        #[command(flatten)]
        source: SourceArgs,

        /// Cell address
        #[arg(long)]
        cell: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "tsv")]
        format: Format,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Schema file describing enum and object types
    #[arg(long)]
    schema: PathBuf,

    /// Data file holding a root object or an array of them
    #[arg(long)]
    data: PathBuf,

    /// Object type of the root objects
    #[arg(long = "type", value_name = "TYPE")]
    type_name: String,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Format {
    #[default]
    Tsv,
    Csv,
    Json,
}

impl Format {
    fn options(self) -> SerializationOptions {
        match self {
            Format::Tsv => SerializationOptions::tsv(),
            Format::Csv => SerializationOptions::csv(),
            Format::Json => SerializationOptions::json(),
        }
    }
}

/// Roots loaded from a data file, together with the table over them.
struct Workspace {
    roots: Vec<RootRef>,
    table: Table,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    match cli.command {
        Command::Export {
            source,
            format,
            header,
            output,
        } => {
            let workspace = load(&source)?;
            let options = format.options().with_header(header);
            let text = workspace
                .table
                .export(&options)
                .context("Failed to serialize table")?;
            emit(&text, output.as_deref())?;
        }
        Command::Import {
            source,
            input,
            format,
            header,
            no_resize,
            map,
            output,
        } => {
            let mut workspace = load(&source)?;
            let payload = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read payload: {}", input.display()))?;
            let mut options = format
                .options()
                .with_header(header)
                .with_modify_sub_tables(!no_resize);
            if !map.is_empty() {
                options = options.with_column_mapping(map);
            }
            workspace
                .table
                .import(&payload, &options)
                .context("Failed to apply payload")?;

            let changed = workspace.roots.iter().filter(|r| r.is_dirty()).count();
            tracing::info!(changed, total = workspace.roots.len(), "applied payload");

            let target = output.unwrap_or(source.data);
            let text = serde_json::to_string_pretty(&data_json(
                workspace.table.generator().registry(),
                &workspace.roots,
            ))?;
            fs::write(&target, text + "\n")
                .with_context(|| format!("Failed to write data: {}", target.display()))?;
        }
        Command::Show {
            source,
            cell,
            format,
        } => {
            let workspace = load(&source)?;
            let cell = workspace
                .table
                .cell_at(&cell)
                .with_context(|| format!("No cell at {cell}"))?;
            let text = match format {
                Format::Json => serde_json::to_string_pretty(&cell.to_json())?,
                Format::Tsv | Format::Csv => cell.serialize(&format.options()),
            };
            println!("{text}");
        }
    }

    Ok(())
}

/// Load the schema and data and generate the table over the roots.
fn load(source: &SourceArgs) -> Result<Workspace> {
    let schema_text = fs::read_to_string(&source.schema)
        .with_context(|| format!("Failed to read schema: {}", source.schema.display()))?;
    let registry = TypeRegistry::from_json_str(&schema_text)
        .with_context(|| format!("Invalid schema: {}", source.schema.display()))?;
    if !registry.has_object(&source.type_name) {
        bail!("Unknown object type '{}'", source.type_name);
    }

    let data_text = fs::read_to_string(&source.data)
        .with_context(|| format!("Failed to read data: {}", source.data.display()))?;
    let data: Json = serde_json::from_str(&data_text)
        .with_context(|| format!("Invalid JSON in {}", source.data.display()))?;
    let items = match data {
        Json::Array(items) => items,
        object @ Json::Object(_) => vec![object],
        other => bail!("Expected an object or an array of objects, got {other}"),
    };

    let ty = TypeDesc::object(&source.type_name);
    let mut roots = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let guid = match item.get(GUID_KEY).and_then(Json::as_str) {
            Some(text) => Uuid::parse_str(text)
                .with_context(|| format!("Invalid {GUID_KEY} in item {i}"))?,
            None => Uuid::new_v4(),
        };
        let path = item.get(PATH_KEY).and_then(Json::as_str).map(str::to_string);
        let value = registry
            .value_from_json(item, &ty)
            .with_context(|| format!("Item {i} is not a valid {}", source.type_name))?;
        roots.push(SourceRoot::with_guid(guid, path, value));
    }

    let generator = TableGenerator::new(registry).into_ref();
    let table = generator
        .generate_for_roots(&source.type_name, &roots)
        .context("Failed to generate table")?;
    tracing::info!(
        rows = table.row_count(),
        columns = table.column_count(),
        "generated table"
    );
    Ok(Workspace { roots, table })
}

/// Data file contents for the roots, keeping their GUIDs and paths.
fn data_json(registry: &TypeRegistry, roots: &[RootRef]) -> Json {
    let items = roots
        .iter()
        .map(|root| {
            let value = root.value();
            let type_name = value.as_object().map(|o| o.type_name.clone());
            let fields = match &type_name {
                Some(name) => registry.value_to_json(&value, &TypeDesc::object(name)),
                None => value.to_json(),
            };
            let mut map = Map::new();
            map.insert(GUID_KEY.to_string(), Json::String(root.guid().to_string()));
            if let Some(path) = root.path() {
                map.insert(PATH_KEY.to_string(), Json::String(path.to_string()));
            }
            if let Some(type_name) = type_name {
                map.insert(TYPE_KEY.to_string(), Json::String(type_name));
            }
            if let Json::Object(fields) = fields {
                map.extend(fields);
            }
            Json::Object(map)
        })
        .collect();
    Json::Array(items)
}

fn emit(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
        }
        None => print!("{text}"),
    }
    Ok(())
}
