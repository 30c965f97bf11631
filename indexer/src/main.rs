use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use searchcore::analyzer::field_texts;
use searchcore::{Config, Engine, Filter, NewDocument, RemoveMode, Scope};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and manage scoped TF-IDF indexes", long_about = None)]
struct Cli {
    /// JSON config file; defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides the config's data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ScopeArgs {
    /// Tenant code
    #[arg(long)]
    code: String,
    /// Collection name
    #[arg(long)]
    collection: String,
}

impl ScopeArgs {
    fn scope(&self) -> Result<Scope> {
        Ok(Scope::new(&self.code, &self.collection)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Index documents from JSON/JSONL files or a directory of them
    Build {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Field weights as `field=weight,...`; falls back to the config
        #[arg(long)]
        weights: Option<String>,
        /// Skip the full idf recompute after loading
        #[arg(long, default_value_t = false)]
        no_rebuild: bool,
    },
    /// Drop documents from the index
    Remove {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Document id; repeat for several
        #[arg(long = "id", required = true)]
        ids: Vec<String>,
        /// Keep the records and only clear their vectors
        #[arg(long, default_value_t = false)]
        keep_record: bool,
    },
    /// Recompute the word index, idf table and vectors of a scope
    Rebuild {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Inspect or edit the term blacklist
    Blacklist {
        #[command(subcommand)]
        action: BlacklistAction,
    },
    /// Run a query and print the result as JSON
    Search {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long, value_enum, default_value_t = Mode::Fulltext)]
        mode: Mode,
        #[arg(long, default_value = "")]
        text: String,
        /// Field filter as a JSON object
        #[arg(long)]
        filter: Option<String>,
        /// Candidate cap for similarity search
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum BlacklistAction {
    Add { terms: Vec<String> },
    Remove { terms: Vec<String> },
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Fulltext,
    Similar,
    Simple,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.data_dir)?;
    let engine = Engine::open(&config)?;

    let res = match cli.command {
        Commands::Build { scope, input, weights, no_rebuild } => {
            let weights = match weights {
                Some(pairs) => parse_weights(&pairs)?,
                None => config.default_weights.clone(),
            };
            build_index(&engine, &scope.scope()?, &input, &weights, !no_rebuild)
        }
        Commands::Remove { scope, ids, keep_record } => {
            let scope = scope.scope()?;
            let mode = if keep_record { RemoveMode::ClearVector } else { RemoveMode::DeleteRecord };
            for id in ids {
                let removed = engine.remove(&scope, &id, mode)?;
                tracing::info!(%scope, %id, removed, "remove");
            }
            Ok(())
        }
        Commands::Rebuild { scope } => {
            let scope = scope.scope()?;
            let report = engine.rebuild(&scope)?;
            tracing::info!(%scope, documents = report.documents, terms = report.terms, "rebuild complete");
            Ok(())
        }
        Commands::Blacklist { action } => match action {
            BlacklistAction::Add { terms } => {
                let added = engine.blacklist().extend(terms)?;
                tracing::info!(added, "blacklist updated");
                Ok(())
            }
            BlacklistAction::Remove { terms } => {
                let removed = engine.blacklist().remove(terms)?;
                tracing::info!(removed, "blacklist updated");
                Ok(())
            }
            BlacklistAction::List => print_json(&engine.blacklist().terms()),
        },
        Commands::Search { scope, mode, text, filter, limit } => {
            let scope = scope.scope()?;
            let filter = parse_filter(filter.as_deref())?;
            match mode {
                Mode::Fulltext => print_json(&engine.full_text_search(&scope, &text, &filter)?),
                Mode::Similar => print_json(&engine.similarity_search(&scope, &text, &filter, limit)?),
                Mode::Simple => print_json(&engine.simple_search(&scope, &filter)?),
            }
        }
    };
    engine.flush()?;
    res
}

fn load_config(path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<Config> {
    let mut config = match path {
        Some(p) => Config::from_json_file(p).with_context(|| format!("reading config {}", p.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    Ok(config)
}

fn parse_weights(pairs: &str) -> Result<BTreeMap<String, f64>> {
    let mut weights = BTreeMap::new();
    for part in pairs.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (field, weight) = part.split_once('=').ok_or_else(|| anyhow!("expected field=weight, got {part:?}"))?;
        let weight: f64 = weight.trim().parse().with_context(|| format!("weight of {field}"))?;
        weights.insert(field.trim().to_string(), weight);
    }
    Ok(weights)
}

fn parse_filter(json: Option<&str>) -> Result<Filter> {
    match json {
        Some(s) => serde_json::from_str(s).context("parsing --filter"),
        None => Ok(Filter::new()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_index(engine: &Engine, scope: &Scope, input: &Path, weights: &BTreeMap<String, f64>, rebuild: bool) -> Result<()> {
    if weights.is_empty() {
        bail!("no field weights given; pass --weights or set default_weights in the config");
    }
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }

    let mut batch = Ingest::default();
    for file in &files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            index_jsonl(file, weights, &mut batch)?;
        } else {
            index_json(file, weights, &mut batch)?;
        }
    }
    tracing::info!(%scope, files = files.len(), documents = batch.docs.len(), skipped = batch.skipped, "ingested documents");

    let report = engine.add_batch(scope, batch.docs);
    for (id, err) in &report.failed {
        tracing::error!(%id, error = %err, "document not indexed");
    }
    if rebuild {
        engine.rebuild(scope)?;
    }
    tracing::info!(
        %scope,
        indexed = report.indexed,
        failed = report.failed.len() + batch.skipped,
        "index build complete"
    );
    Ok(())
}

/// Documents read so far. Malformed input documents are logged and skipped.
#[derive(Default)]
struct Ingest {
    docs: Vec<NewDocument>,
    skipped: usize,
}

impl Ingest {
    fn push(&mut self, value: serde_json::Value, weights: &BTreeMap<String, f64>, origin: impl FnOnce() -> String) {
        match ingest_doc(value, weights) {
            Ok(doc) => self.docs.push(doc),
            Err(e) => {
                tracing::warn!(origin = %origin(), error = %e, "skipping input document");
                self.skipped += 1;
            }
        }
    }
}

fn index_jsonl(file: &Path, weights: &BTreeMap<String, f64>, batch: &mut Ingest) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let origin = || format!("{}:{}", file.display(), n + 1);
        match serde_json::from_str::<serde_json::Value>(&line) {
            Ok(value) => batch.push(value, weights, origin),
            Err(e) => {
                tracing::warn!(origin = %origin(), error = %e, "skipping unparsable line");
                batch.skipped += 1;
            }
        }
    }
    Ok(())
}

fn index_json(file: &Path, weights: &BTreeMap<String, f64>, batch: &mut Ingest) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value =
        serde_json::from_reader(reader).with_context(|| format!("parsing {}", file.display()))?;
    match json {
        serde_json::Value::Array(arr) => {
            for (i, v) in arr.into_iter().enumerate() {
                batch.push(v, weights, || format!("{}[{i}]", file.display()));
            }
        }
        serde_json::Value::Object(_) => batch.push(json, weights, || file.display().to_string()),
        _ => tracing::warn!(file = %file.display(), "skipping non-object JSON"),
    }
    Ok(())
}

fn ingest_doc(value: serde_json::Value, weights: &BTreeMap<String, f64>) -> Result<NewDocument> {
    let serde_json::Value::Object(mut fields) = value else {
        bail!("document is not a JSON object");
    };
    let id = match fields.remove("id") {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => bail!("document without a string or numeric id"),
    };
    let texts = field_texts(&fields, weights)?;
    Ok(NewDocument { id, texts, fields })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn weights_parse_from_flag() {
        let w = parse_weights("title=10, body=1.5,").unwrap();
        assert_eq!(w["title"], 10.0);
        assert_eq!(w["body"], 1.5);
        assert!(parse_weights("title").is_err());
        assert!(parse_weights("title=x").is_err());
    }

    #[test]
    fn ingest_requires_id_and_keeps_fields() {
        let weights = parse_weights("title=2").unwrap();
        let doc = ingest_doc(json!({"id": 7, "title": "hello", "lang": "en"}), &weights).unwrap();
        assert_eq!(doc.id, "7");
        assert_eq!(doc.texts.len(), 1);
        assert_eq!(doc.texts[0].weight, 2.0);
        assert_eq!(doc.fields["lang"], "en");
        assert!(!doc.fields.contains_key("id"));
        assert!(ingest_doc(json!({"title": "x"}), &weights).is_err());
    }

    #[test]
    fn build_skips_malformed_documents() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        std::fs::create_dir_all(&input).unwrap();
        std::fs::write(
            input.join("a.json"),
            r#"[{"id":"a","title":"rust search"},{"title":"no id"},{"id":"b","title":{"nested":1}}]"#,
        )
        .unwrap();
        std::fs::write(input.join("c.jsonl"), "{\"id\":\"c\",\"title\":\"search engine\"}\n{not json\n").unwrap();

        let config = Config { data_dir: dir.path().join("data"), ..Default::default() };
        let engine = Engine::open(&config).unwrap();
        let scope = Scope::new("acme", "docs").unwrap();
        build_index(&engine, &scope, &input, &parse_weights("title=1").unwrap(), true).unwrap();

        assert_eq!(engine.store().count(&scope).unwrap(), 2);
        let hits = engine.full_text_search(&scope, "search", &Filter::new()).unwrap();
        assert_eq!(hits.ids, vec!["a", "c"]);
    }

    #[test]
    fn build_indexes_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        std::fs::create_dir_all(&input).unwrap();
        std::fs::write(input.join("a.json"), r#"[{"id":"a","title":"rust search"},{"id":"b","title":"rust compiler"}]"#).unwrap();
        std::fs::write(input.join("c.jsonl"), "{\"id\":\"c\",\"title\":\"search engine\"}\n\n").unwrap();
        std::fs::write(input.join("skip.txt"), "ignored").unwrap();

        let config = Config { data_dir: dir.path().join("data"), ..Default::default() };
        let engine = Engine::open(&config).unwrap();
        let scope = Scope::new("acme", "docs").unwrap();
        build_index(&engine, &scope, &input, &parse_weights("title=1").unwrap(), true).unwrap();

        assert_eq!(engine.store().count(&scope).unwrap(), 3);
        let hits = engine.full_text_search(&scope, "search", &Filter::new()).unwrap();
        assert_eq!(hits.ids, vec!["a", "c"]);
    }
}
