use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use prf_core::config::{DAMPING, DOCS_FOR_EXPANSION, IMPORTANCE_MULTIPLIER, RESULTS_PER_PAGE};
use prf_core::persist::{
    load_bundle, save_doc_id_map, save_doc_lengths, save_doc_tokens, save_docs, save_importance, save_meta,
    save_raw_index, IndexPaths, MetaFile, FORMAT_VERSION,
};
use prf_core::tokenizer::tokenize;
use prf_core::{
    compute_idf, to_tfidf, DocId, DocMeta, DocTokens, DocumentLengths, FeedbackConfig, ImportanceScores, RankerConfig,
    RawIndex, SearchOptions, SearchSession,
};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: String,
    title: String,
    body: String,
    url: Option<String>,
    /// Precomputed importance (page rank) in [0, 1].
    #[serde(default)]
    importance: Option<f32>,
}

#[derive(Parser)]
#[command(name = "prf-indexer")]
#[command(about = "Build the ranking artifacts and query them from the terminal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from input JSON/JSONL files or a directory
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output index directory
        #[arg(long)]
        output: String,
        /// Skip the document length table; sessions then compute it at startup
        #[arg(long, default_value_t = false)]
        no_lengths: bool,
    },
    /// Run one query against a built index
    Query(QueryArgs),
}

#[derive(Args)]
struct QueryArgs {
    /// Index directory path
    #[arg(long, default_value = "./index")]
    index: String,
    /// Free-text query
    query: String,
    /// Number of results to print
    #[arg(short, long, default_value_t = RESULTS_PER_PAGE)]
    k: usize,
    /// Expand the query with pseudo-relevance feedback
    #[arg(long, default_value_t = false)]
    prf: bool,
    /// Blend importance scores into the initial ranking
    #[arg(long, default_value_t = false)]
    importance: bool,
    /// Re-rank the final list by importance instead of blending early
    #[arg(long, default_value_t = false, conflicts_with = "importance")]
    post_hoc: bool,
    #[arg(long, default_value_t = DAMPING)]
    damping: f32,
    #[arg(long, default_value_t = IMPORTANCE_MULTIPLIER)]
    importance_multiplier: f32,
    #[arg(long, default_value_t = DOCS_FOR_EXPANSION)]
    feedback_docs: usize,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, no_lengths } => build_index(&input, &output, !no_lengths),
        Commands::Query(args) => run_query(&args),
    }
}

#[derive(Default)]
struct Corpus {
    raw: RawIndex,
    doc_tokens: DocTokens,
    importance: ImportanceScores,
    docs: HashMap<DocId, DocMeta>,
    doc_id_map: HashMap<String, DocId>,
    next_doc_id: DocId,
}

fn build_index(input: &str, output: &str, with_lengths: bool) -> Result<()> {
    let input_path = Path::new(input);
    let out_paths = IndexPaths::new(output);

    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        bail!("input {input} does not exist");
    }

    let mut corpus = Corpus::default();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            index_jsonl(&file, &mut corpus)?;
        } else {
            index_json(&file, &mut corpus)?;
        }
    }

    let num_docs = corpus.next_doc_id;
    if num_docs == 0 {
        bail!("no documents found under {input}");
    }
    tracing::info!(num_docs, num_terms = corpus.raw.num_terms(), "ingested documents");
    corpus.importance.validate(num_docs)?;

    if with_lengths {
        // Lengths need tf-idf weights; weigh a copy so the raw form can still be persisted.
        let idf = compute_idf(&corpus.raw, num_docs)?;
        let weighted = to_tfidf(corpus.raw.clone(), &idf)?;
        let lengths = DocumentLengths::compute(&weighted, &corpus.doc_tokens, num_docs);
        save_doc_lengths(&out_paths, &lengths)?;
    }

    save_raw_index(&out_paths, &corpus.raw)?;
    save_doc_tokens(&out_paths, &corpus.doc_tokens)?;
    save_importance(&out_paths, &corpus.importance)?;
    save_docs(&out_paths, &corpus.docs)?;
    save_doc_id_map(&out_paths, &corpus.doc_id_map)?;
    let meta = MetaFile {
        num_docs,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
    };
    save_meta(&out_paths, &meta)?;

    tracing::info!(output, with_lengths, "index build complete");
    Ok(())
}

fn index_jsonl(file: &Path, corpus: &mut Corpus) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: InputDoc = serde_json::from_str(&line)?;
        ingest_doc(doc, corpus)?;
    }
    Ok(())
}

fn index_json(file: &Path, corpus: &mut Corpus) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                let doc: InputDoc = serde_json::from_value(v)?;
                ingest_doc(doc, corpus)?;
            }
        }
        serde_json::Value::Object(_) => {
            let doc: InputDoc = serde_json::from_value(json)?;
            ingest_doc(doc, corpus)?;
        }
        _ => tracing::warn!(file = %file.display(), "skipping json that is neither an object nor an array"),
    }
    Ok(())
}

fn ingest_doc(doc: InputDoc, corpus: &mut Corpus) -> Result<()> {
    if corpus.doc_id_map.contains_key(&doc.id) {
        bail!("duplicate document id {}", doc.id);
    }
    let doc_id = corpus.next_doc_id;
    corpus.next_doc_id += 1;
    corpus.doc_id_map.insert(doc.id.clone(), doc_id);

    let tokens = tokenize(&doc.body);
    corpus.raw.add_document(doc_id, &tokens);
    corpus.doc_tokens.insert(doc_id, tokens);
    if let Some(score) = doc.importance {
        corpus.importance.insert(doc_id, score);
    }
    corpus.docs.insert(doc_id, DocMeta { external_id: doc.id, title: doc.title, url: doc.url });
    Ok(())
}

fn run_query(args: &QueryArgs) -> Result<()> {
    let bundle = load_bundle(&IndexPaths::new(&args.index))?;
    let ranker_config = RankerConfig {
        damping: args.damping,
        importance_multiplier: args.importance_multiplier,
        ..RankerConfig::new(bundle.meta.num_docs)
    };
    let feedback = FeedbackConfig { docs_for_expansion: args.feedback_docs, ..FeedbackConfig::default() };
    let session = SearchSession::from_parts(
        bundle.raw_index,
        bundle.doc_tokens,
        bundle.importance,
        bundle.doc_lengths,
        ranker_config,
        feedback,
    )?;

    let options = SearchOptions {
        k: args.k,
        pseudo_relevance: args.prf,
        blend_importance: args.importance,
        post_hoc_importance: args.post_hoc,
        ..SearchOptions::default()
    };
    let outcome = session.search(&tokenize(&args.query), &options)?;

    if args.prf {
        println!("Expanded query: {}", outcome.expansion_terms.join(" "));
    }
    println!("Results ({} hits):", outcome.total_hits);
    for (doc_id, score) in outcome.results {
        match bundle.docs.get(&doc_id) {
            Some(meta) => println!("{score:>9.4}  {}  {}", meta.title, meta.url.as_deref().unwrap_or("Unknown URL")),
            None => println!("{score:>9.4}  doc {doc_id}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn builds_artifacts_from_jsonl() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("docs.jsonl");
        std::fs::write(
            &input,
            concat!(
                "{\"id\":\"a\",\"title\":\"A\",\"body\":\"rust crates and cargo\",\"importance\":0.2}\n",
                "\n",
                "{\"id\":\"b\",\"title\":\"B\",\"body\":\"cargo ships\",\"url\":\"https://b.example\"}\n",
            ),
        )
        .unwrap();
        let out = dir.path().join("index");
        build_index(input.to_str().unwrap(), out.to_str().unwrap(), true).unwrap();

        let paths = IndexPaths::new(&out);
        let bundle = load_bundle(&paths).unwrap();
        assert_eq!(bundle.meta.num_docs, 2);
        assert_eq!(bundle.importance.score(0), 0.2);
        assert_eq!(bundle.doc_lengths.map(|l| l.len()), Some(2));
        assert_eq!(bundle.doc_id_map.get("b"), Some(&1));
    }

    #[test]
    fn rejects_out_of_range_importance() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("docs.json");
        std::fs::write(&input, r#"[{"id":"a","title":"A","body":"rust","importance":4.0}]"#).unwrap();
        let out = dir.path().join("index");
        assert!(build_index(input.to_str().unwrap(), out.to_str().unwrap(), true).is_err());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("docs.json");
        std::fs::write(&input, r#"[{"id":"a","title":"A","body":"x"},{"id":"a","title":"B","body":"y"}]"#).unwrap();
        let out = dir.path().join("index");
        assert!(build_index(input.to_str().unwrap(), out.to_str().unwrap(), true).is_err());
    }
}
