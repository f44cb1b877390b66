use anyhow::{bail, Context, Result};
use clap::Parser;
use cnf_oracle::config::{ExperimentConfig, NegMode};
use cnf_oracle::sampling::NegativeSource;
use cnf_oracle::{wire, Harness, TokenId, Vocabulary};
use log::{info, warn};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

/// Check a candidate grammar against positive and negative examples.
#[derive(Parser, Debug)]
#[command(name = "cnf-check", version)]
struct Cli {
    /// Experiment config (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Grammar (JSON `{n, var_rules, term_rules}`)
    #[arg(short, long)]
    grammar: PathBuf,

    /// Positive examples (JSON array of token-id arrays)
    #[arg(short, long)]
    examples: PathBuf,

    /// Parse trees for the examples, required when algo is "parse_tree"
    #[arg(short, long)]
    trees: Option<PathBuf>,

    /// Vocabulary (JSON array of words, word i has id i)
    #[arg(long)]
    vocab: Option<PathBuf>,

    /// Vocabulary size, overriding the vocabulary file
    #[arg(long)]
    vocab_size: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Info))
        .init();

    let config = ExperimentConfig::from_path(&cli.config)?;
    info!("Experiment: {}", config.name);

    let grammar = wire::parse_grammar(&read(&cli.grammar)?)
        .with_context(|| format!("failed to load grammar {}", cli.grammar.display()))?;
    let examples = wire::parse_examples(&read(&cli.examples)?)
        .with_context(|| format!("failed to load examples {}", cli.examples.display()))?;
    let trees = match &cli.trees {
        Some(path) => Some(
            wire::parse_trees(&read(path)?).with_context(|| format!("failed to load trees {}", path.display()))?,
        ),
        None => None,
    };
    let vocab = match &cli.vocab {
        Some(path) => {
            let words: Vec<String> = serde_json::from_str(&read(path)?)
                .with_context(|| format!("failed to load vocabulary {}", path.display()))?;
            Some(Vocabulary::from_words(words)?)
        }
        None => None,
    };

    let vocab_size = match (cli.vocab_size, &vocab) {
        (Some(size), _) => size,
        (None, Some(vocab)) => vocab.len(),
        (None, None) => {
            let size = examples.iter().flatten().max().map_or(0, |&t| t + 1);
            warn!("No vocabulary given; assuming vocab_size = {} from the examples", size);
            size
        }
    };

    let source = match config.neg_mode {
        Some(NegMode::Auto) => NegativeSource::Auto(config.sampling_config()),
        Some(NegMode::Manual) => {
            let Some(vocab) = &vocab else {
                bail!("neg_mode \"manual\" needs --vocab to encode the negatives");
            };
            let path = config.neg_data.as_deref().context("neg_data is not set")?;
            let sentences = vocab
                .encode_lines(&read(path)?)
                .with_context(|| format!("failed to encode negatives in {}", path.display()))?;
            NegativeSource::Manual(sentences)
        }
        None => NegativeSource::Manual(Vec::new()),
    };
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let negatives: Vec<Vec<TokenId>> = source.collect(vocab_size, &mut rng)?;
    info!("{} positives, {} negatives", examples.len(), negatives.len());

    let harness = Harness::new(&grammar, vocab_size, &config.grammar_config())?;
    let report = harness.check(config.algo, &examples, trees.as_deref(), &negatives)?;
    println!("{}", report);

    if !report.passed() {
        std::process::exit(1);
    }
    Ok(())
}
