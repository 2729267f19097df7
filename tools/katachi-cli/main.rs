use clap::{Parser, Subcommand};
use katachi::prelude::*;
use katachi::rules::{ByElementId, ByFieldName, values_from_json};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Inspect, evaluate, snapshot and clone form-definition graphs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to an engine config JSON file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(short, long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the ordered forest of every page
    Tree {
        /// Path to the form graph JSON file
        graph: PathBuf,
    },
    /// Evaluate the conditional logic of every node against a set of values
    Eval {
        graph: PathBuf,
        /// Path to a JSON object of field values
        values: PathBuf,
        /// Values are keyed by field name instead of element id
        #[arg(long)]
        by_name: bool,
    },
    /// Print a snapshot of the graph
    Snapshot { graph: PathBuf },
    /// Replace the content of the graph with a snapshot and print the result
    Restore {
        graph: PathBuf,
        /// Path to the snapshot JSON file
        snapshot: PathBuf,
    },
    /// Copy the graph into a new form and print the copy
    Clone {
        graph: PathBuf,
        /// Name of the new form
        #[arg(short, long)]
        name: Option<String>,
        /// Create a template instead of a live form
        #[arg(long)]
        as_template: bool,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeVerdict {
    node: NodeHandle,
    label: String,
    visible: bool,
    reason: String,
}

#[derive(Serialize)]
struct WithReport<R: Serialize> {
    graph: FormGraph,
    report: R,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to load config: {}", e))),
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Tree { graph } => {
            let graph = load_graph(&graph);
            print_json(&graph.forests(), cli.pretty);
        }
        Command::Eval {
            graph,
            values,
            by_name,
        } => {
            let graph = load_graph(&graph);
            let values = values_from_json(read_json(&values));
            print_json(&evaluate_graph(&graph, &values, by_name), cli.pretty);
        }
        Command::Snapshot { graph } => {
            let graph = load_graph(&graph);
            print_json(&Snapshot::capture(&graph), cli.pretty);
        }
        Command::Restore { graph, snapshot } => {
            let raw = read_file(&snapshot);
            let snapshot = Snapshot::from_json(&raw)
                .unwrap_or_else(|e| exit_with_error(&format!("Invalid snapshot: {}", e)));
            let (mut store, form_id) = into_store(load_graph(&graph));
            let report = restore(&mut store, &config, form_id, &snapshot)
                .unwrap_or_else(|e| exit_with_error(&format!("Restore failed: {}", e)));
            let graph = export(&store, form_id);
            print_json(&WithReport { graph, report }, cli.pretty);
        }
        Command::Clone {
            graph,
            name,
            as_template,
        } => {
            let source = load_graph(&graph);
            let name = name.unwrap_or_else(|| format!("{} (copy)", source.form.name));
            let (mut store, form_id) = into_store(source);
            let report = if as_template {
                save_as_template(&mut store, &config, form_id, &name)
            } else {
                instantiate_template(&mut store, &config, form_id, &name)
            }
            .unwrap_or_else(|e| exit_with_error(&format!("Clone failed: {}", e)));
            let graph = export(&store, report.target);
            print_json(&WithReport { graph, report }, cli.pretty);
        }
    }
}

fn evaluate_graph(graph: &FormGraph, values: &ValueMap, by_name: bool) -> Vec<NodeVerdict> {
    let index = graph.field_index();
    let explain = |expr: Option<&RuleExpression>| {
        if by_name {
            RuleEvaluator::new(ByFieldName::new(&index), values).explain(expr)
        } else {
            RuleEvaluator::new(ByElementId::new(&index), values).explain(expr)
        }
    };

    let containers = graph.containers.iter().map(|c| {
        let verdict = explain(c.conditional_logic.as_ref());
        NodeVerdict {
            node: NodeHandle::Container(c.id),
            label: c.kind.to_string(),
            visible: verdict.visible,
            reason: verdict.reason(),
        }
    });
    let fields = graph.fields.iter().map(|f| {
        let verdict = explain(f.conditional_logic.as_ref());
        NodeVerdict {
            node: NodeHandle::Field(f.id),
            label: f.name.clone(),
            visible: verdict.visible,
            reason: verdict.reason(),
        }
    });
    containers.chain(fields).collect()
}

fn into_store(graph: FormGraph) -> (MemoryStore, FormId) {
    let mut store = MemoryStore::new();
    let form_id = store
        .import_graph(graph)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load graph: {}", e)));
    (store, form_id)
}

fn export(store: &MemoryStore, form_id: FormId) -> FormGraph {
    store
        .export_graph(form_id)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read graph back: {}", e)))
}

fn load_graph(path: &Path) -> FormGraph {
    let graph: FormGraph = serde_json::from_value(read_json(path)).unwrap_or_else(|e| {
        exit_with_error(&format!("Invalid form graph '{}': {}", path.display(), e))
    });
    for name in graph.duplicate_field_names() {
        tracing::warn!(name, "field name used more than once");
    }
    graph
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&read_file(path)).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to parse JSON '{}': {}", path.display(), e))
    })
}

fn read_file(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read file '{}': {}", path.display(), e))
    })
}

fn print_json<T: Serialize>(value: &T, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match rendered {
        Ok(json) => println!("{}", json),
        Err(e) => exit_with_error(&format!("Failed to encode output: {}", e)),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
