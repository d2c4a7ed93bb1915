//! Minimal CLI: graph document(s) → (schema | hash)
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use tracing::info;

use typegraph_schema::options::DEFAULT_MAX_DEPTH;
use typegraph_schema::{path_de, CompileOptions, CompiledSchema, DictionaryKeyMode, GraphDocument};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// compile extractor type graphs into JSON Schema documents
#[derive(Parser, Debug)]
#[command(version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// compile each graph document into a JSON Schema
    Compile(CompileOut),
    /// print the structural hash of each graph's root
    Hash(HashOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// One or more graph documents. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// fill abstract nodes' implementation lists from `implements` declarations
    #[arg(long, default_value_t = false)]
    scan_implementations: bool,
}

#[derive(Args, Debug, Clone)]
struct OptionSettings {
    /// `$id` of the emitted document (single input only)
    #[arg(long)]
    id: Option<String>,

    /// how to treat maps whose keys are not strings
    #[arg(long, value_enum)]
    dictionary_keys: Option<DictionaryKeyMode>,

    /// recursion ceiling for one walk
    #[arg(long)]
    max_depth: Option<usize>,

    /// `$schema` dialect URI
    #[arg(long)]
    dialect: Option<String>,
}

#[derive(clap::Parser, Debug)]
struct CompileOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    option_settings: OptionSettings,

    /// output .json file, or a directory when compiling several inputs (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// exit with an error if any schema carries diagnostics
    #[arg(long)]
    deny_diagnostics: bool,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct HashOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

struct Outcome {
    source: PathBuf,
    compiled: CompiledSchema,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load(&self) -> Result<Vec<(PathBuf, GraphDocument)>> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        source_paths
            .into_par_iter()
            .map(|source_path| -> Result<(PathBuf, GraphDocument)> {
                let mut document = load_document(&source_path)?;
                if self.scan_implementations {
                    document.objects.link_implementations();
                }
                Ok((source_path, document))
            })
            .collect()
    }
}

impl OptionSettings {
    /// Flags override whatever the document itself carries.
    fn resolve(&self, document: &GraphDocument) -> CompileOptions {
        let mut options = document.options.clone().unwrap_or_default();
        if let Some(mode) = self.dictionary_keys {
            options = options.with_dictionary_keys(mode);
        }
        if let Some(max_depth) = self.max_depth {
            options = options.with_max_depth(max_depth);
        }
        if let Some(dialect) = &self.dialect {
            options = options.with_dialect(dialect.clone());
        }
        options
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Compile(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(());
                }
                let documents = target.input_settings.load()?;
                if target.option_settings.id.is_some() && documents.len() > 1 {
                    bail!("--id applies to a single input, got {}", documents.len());
                }

                // one walk per document, each with its own definitions table
                let outcomes = documents
                    .into_par_iter()
                    .map(|(source, mut document)| -> Result<Outcome> {
                        let options = target.option_settings.resolve(&document);
                        if let Some(id) = &target.option_settings.id {
                            document.request.id = Some(id.clone());
                        }
                        let compiled = typegraph_schema::build(&document.objects, &document.request, &options)
                            .with_context(|| format!("failed to compile {}", source.display()))?;
                        Ok(Outcome { source, compiled })
                    })
                    .collect::<Result<Vec<_>>>()?;

                let mut flagged = 0;
                for outcome in &outcomes {
                    report(outcome);
                    if !outcome.compiled.diagnostics.is_empty() {
                        flagged += 1;
                    }
                    write_outcome(outcome, target.out.as_deref(), outcomes.len() > 1)?;
                }
                if target.deny_diagnostics && flagged > 0 {
                    bail!("{flagged} schema(s) carry diagnostics");
                }
                Ok(())
            }
            Command::Hash(target) => {
                for (source, document) in target.input_settings.load()? {
                    let max_depth = document.options.as_ref().map(|options| options.max_depth);
                    let hash = document
                        .objects
                        .structural_hash_within(document.request.root, max_depth.unwrap_or(DEFAULT_MAX_DEPTH))
                        .with_context(|| format!("failed to hash {}", source.display()))?;
                    println!("{hash:016x}  {}", source.display());
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_document(source_path: &Path) -> Result<GraphDocument> {
    let source = std::fs::read_to_string(source_path)
        .with_context(|| format!("failed to read source file {}", source_path.display()))?;
    path_de::parse_graph_document(&source)
        .with_context(|| format!("failed to parse graph document {}", source_path.display()))
}

fn report(outcome: &Outcome) {
    let diagnostics = &outcome.compiled.diagnostics;
    let status = if diagnostics.is_empty() { "✓".green() } else { "!".yellow() };
    eprintln!(
        "{status} {} ({} definition(s), {} diagnostic(s))",
        outcome.source.display(),
        outcome.compiled.definitions(),
        diagnostics.len(),
    );
    for diagnostic in diagnostics {
        eprintln!("    {} {diagnostic}", "warning:".yellow());
    }
}

fn write_outcome(outcome: &Outcome, out: Option<&Path>, many: bool) -> Result<()> {
    let schema_src = serde_json::to_string_pretty(&outcome.compiled.document)?;
    let Some(out) = out else {
        println!("{schema_src}");
        return Ok(());
    };
    let target = if many || out.is_dir() {
        out.join(output_file_name(outcome))
    } else {
        out.to_path_buf()
    };
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&target, &schema_src).with_context(|| format!("failed to write {}", target.display()))?;
    info!(path = %target.display(), "schema written");
    Ok(())
}

/// The document's filename hint, else `<input stem>.schema.json`.
fn output_file_name(outcome: &Outcome) -> String {
    if let Some(hint) = &outcome.compiled.file_name {
        return hint.clone();
    }
    let stem = outcome
        .source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "schema".to_string());
    let stem = stem.strip_suffix(".graph").unwrap_or(&stem);
    format!("{stem}.schema.json")
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern).with_context(|| format!("bad glob pattern: {pattern}"))? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use typegraph_schema::{ObjectId, RootRequest};

    fn outcome(source: &str, file_name: Option<&str>) -> Outcome {
        Outcome {
            source: PathBuf::from(source),
            compiled: CompiledSchema {
                document: json!({}),
                file_name: file_name.map(str::to_string),
                diagnostics: Vec::new(),
            },
        }
    }

    #[test]
    fn output_names_prefer_the_hint() {
        assert_eq!(output_file_name(&outcome("in/person.graph.json", Some("p.json"))), "p.json");
        assert_eq!(output_file_name(&outcome("in/person.graph.json", None)), "person.schema.json");
        assert_eq!(output_file_name(&outcome("in/shapes.json", None)), "shapes.schema.json");
    }

    #[test]
    fn flags_override_document_options() {
        let document = GraphDocument {
            request: RootRequest::new(ObjectId(0)),
            options: Some(CompileOptions::default().with_dictionary_keys(DictionaryKeyMode::Silent).with_max_depth(7)),
            objects: Default::default(),
        };
        let settings = OptionSettings {
            id: None,
            dictionary_keys: Some(DictionaryKeyMode::Strict),
            max_depth: None,
            dialect: None,
        };
        let options = settings.resolve(&document);
        assert_eq!(options.dictionary_keys, DictionaryKeyMode::Strict);
        assert_eq!(options.max_depth, 7);
    }

    #[test]
    fn literal_paths_pass_through() {
        let paths = resolve_file_path_patterns(["a.json", "b/c.json"]).unwrap();
        assert_eq!(paths, vec![PathBuf::from("a.json"), PathBuf::from("b/c.json")]);
    }
}
