//! Compile every `fixtures/*.graph.json` and compare it with the sibling
//! `*.expected.json`. Pass a directory to run a different fixture set.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::Value;

use typegraph_schema::path_de::parse_graph_document;

const GRAPH_SUFFIX: &str = ".graph.json";
const EXPECTED_SUFFIX: &str = ".expected.json";

fn main() -> Result<()> {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("../fixtures"));

    let mut graphs: Vec<PathBuf> = fs::read_dir(&dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.to_string_lossy().ends_with(GRAPH_SUFFIX))
        .collect();
    graphs.sort();

    let mut failed = 0;
    for graph_path in &graphs {
        match run_fixture(graph_path) {
            Ok(None) => eprintln!("✅ {}", graph_path.display()),
            Ok(Some((actual, expected))) => {
                failed += 1;
                eprintln!("❌ {} differs", graph_path.display());
                eprintln!("{}\n{}", "— expected —".yellow(), serde_json::to_string_pretty(&expected)?);
                eprintln!("{}\n{}", "— actual —".yellow(), serde_json::to_string_pretty(&actual)?);
            }
            Err(error) => {
                failed += 1;
                eprintln!("❌ {}: {error:#}", graph_path.display());
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} fixture(s) failed", graphs.len());
    }
    eprintln!("{}", format!("all {} fixture(s) passed", graphs.len()).green());
    Ok(())
}

/// `Ok(None)` on a match, otherwise the actual and expected documents.
fn run_fixture(graph_path: &Path) -> Result<Option<(Value, Value)>> {
    let source = fs::read_to_string(graph_path)?;
    let mut document = parse_graph_document(&source)?;
    document.objects.link_implementations();
    let options = document.options.clone().unwrap_or_default();
    let compiled = typegraph_schema::build(&document.objects, &document.request, &options)?;

    let name = graph_path.to_string_lossy();
    let expected_path = PathBuf::from(format!("{}{EXPECTED_SUFFIX}", &name[..name.len() - GRAPH_SUFFIX.len()]));
    let expected: Value = serde_json::from_str(
        &fs::read_to_string(&expected_path)
            .with_context(|| format!("missing {}", expected_path.display()))?,
    )?;

    if compiled.document == expected {
        Ok(None)
    } else {
        Ok(Some((compiled.document, expected)))
    }
}
