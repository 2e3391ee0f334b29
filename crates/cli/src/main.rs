use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::output;
use priorart_core::classifier::KeywordPredictor;
use priorart_core::compare;
use priorart_core::config::{self, AppConfig};
use priorart_core::graph::ClassificationGraph;
use priorart_core::pipeline;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Search {
            claim,
            claim_file,
            corpus,
            topk,
            pool,
            hops,
            fields,
            json,
        } => {
            let claim = output::read_claim(claim, claim_file.as_deref())?;
            run_search(cfg, &claim, corpus, topk, pool, hops, &fields, json).await
        }
        Commands::Expand { codes, hops, json } => run_expand(&cfg, codes, hops, json),
        Commands::Features { claim, json } => run_features(&cfg, &claim, json).await,
        Commands::Compare {
            claim_a,
            claim_b,
            json,
        } => run_compare(&cfg, &claim_a, &claim_b, json).await,
    }
}

#[derive(Parser)]
#[command(name = "priorart")]
#[command(about = "Prior-art search over patent claims", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a corpus and rank it against a query claim
    Search {
        /// Query claim text
        claim: Option<String>,
        /// Read the query claim from a file
        #[arg(long)]
        claim_file: Option<PathBuf>,
        /// Corpus JSON file (overrides corpus.path)
        #[arg(long)]
        corpus: Option<PathBuf>,
        /// Number of results
        #[arg(short, long, default_value_t = 5)]
        topk: usize,
        /// Candidates taken from each channel before rerank
        #[arg(long)]
        pool: Option<usize>,
        /// Classification graph hops used to widen predicted codes
        #[arg(long)]
        hops: Option<usize>,
        /// Restrict JSON output fields (comma-separated), e.g. id,score
        #[arg(long, value_delimiter = ',', num_args = 1.., default_values_t = Vec::<String>::new())]
        fields: Vec<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the classification codes reachable from the given codes
    Expand {
        /// Seed codes, e.g. G06F9/50
        #[arg(required = true)]
        codes: Vec<String>,
        #[arg(long, default_value_t = 2)]
        hops: usize,
        #[arg(long)]
        json: bool,
    },
    /// Show extracted features and predicted codes for a claim
    Features {
        claim: String,
        #[arg(long)]
        json: bool,
    },
    /// Compare the features of two claims
    Compare {
        claim_a: String,
        claim_b: String,
        #[arg(long)]
        json: bool,
    },
}

#[allow(clippy::too_many_arguments)]
async fn run_search(
    mut cfg: AppConfig,
    claim: &str,
    corpus: Option<PathBuf>,
    topk: usize,
    pool: Option<usize>,
    hops: Option<usize>,
    fields: &[String],
    json: bool,
) -> Result<()> {
    if let Some(pool) = pool {
        cfg.search.candidate_pool_size = pool;
    }
    if let Some(hops) = hops {
        cfg.search.expansion_hops = hops;
    }
    let corpus_path = corpus
        .or_else(|| cfg.corpus.path.as_ref().map(PathBuf::from))
        .context("no corpus given; pass --corpus or set corpus.path")?;

    let (engine, summary) = pipeline::prepare_engine(&cfg, Path::new(&corpus_path)).await?;
    tracing::info!(indexed = summary.indexed, "corpus ready");

    let hits = engine.search(claim, topk).await?;
    if json {
        let results = output::filter_fields(output::hits_to_json(&hits), fields);
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        println!("{}", output::render_hits(&hits));
    }
    Ok(())
}

fn run_expand(cfg: &AppConfig, codes: Vec<String>, hops: usize, json: bool) -> Result<()> {
    let graph = ClassificationGraph::from_relations(&cfg.classification.relations);
    let seeds: BTreeSet<String> = codes.into_iter().map(|c| c.trim().to_string()).collect();
    let expanded = graph.expand(&seeds, hops);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "seeds": seeds,
                "hops": hops,
                "expanded": expanded,
            }))?
        );
    } else {
        println!("{}", output::join_codes(&expanded));
    }
    Ok(())
}

async fn run_features(cfg: &AppConfig, claim: &str, json: bool) -> Result<()> {
    let extractor = pipeline::build_registry(cfg)
        .extractor(None)
        .context("resolve feature extractor")?;
    let features = extractor.extract(claim).await?;
    let codes = KeywordPredictor::from_config(&cfg.classification).predict_codes(claim);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "features": features,
                "codes": codes,
            }))?
        );
    } else {
        println!("Features:");
        for f in &features {
            println!("  - {f}");
        }
        println!("Codes: {}", output::join_codes(&codes));
    }
    Ok(())
}

async fn run_compare(cfg: &AppConfig, claim_a: &str, claim_b: &str, json: bool) -> Result<()> {
    let extractor = pipeline::build_registry(cfg)
        .extractor(None)
        .context("resolve feature extractor")?;
    let result = compare::compare_claims(extractor.as_ref(), claim_a, claim_b).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", output::render_comparison(&result));
    }
    Ok(())
}
