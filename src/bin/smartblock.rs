//! smartblock: CLI tool for checking and trying out smart rule documents.

use chrono::{DateTime, FixedOffset, Local};
use clap::{Args, Parser, Subcommand};
use smartblock::{
    EngineConfig, LinkBlock, RequestSignals, RuleBook, RuleStore, SourcePrecedence, TrafficInfo,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "smartblock")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Evaluate and validate link block personalization rules", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Personalize a block list for one simulated visitor
    Eval {
        /// Rule document (.yaml, .yml or .json)
        #[arg(short, long)]
        rules: PathBuf,

        /// Block list (JSON or YAML array of {id, url, ...})
        #[arg(short, long)]
        blocks: PathBuf,

        #[command(flatten)]
        visitor: VisitorArgs,

        /// Disable the source-based fallback reorder
        #[arg(long)]
        no_auto_reorder: bool,

        /// Print matched rules alongside the blocks
        #[arg(long)]
        explain: bool,
    },

    /// Check a rule document for malformed rules
    Validate {
        /// Rule document (.yaml, .yml or .json)
        #[arg(short, long)]
        rules: PathBuf,
    },

    /// Show the traffic info derived for a simulated visitor
    Classify {
        /// Rule document providing custom traffic sources
        #[arg(short, long)]
        rules: Option<PathBuf>,

        #[command(flatten)]
        visitor: VisitorArgs,
    },
}

#[derive(Args)]
struct VisitorArgs {
    /// Referer header
    #[arg(long)]
    referer: Option<String>,

    /// User-Agent header
    #[arg(long)]
    user_agent: Option<String>,

    /// utm_source query parameter
    #[arg(long)]
    utm_source: Option<String>,

    /// Treat the visitor as returning
    #[arg(long)]
    returning: bool,

    /// ISO country code supplied by an upstream service
    #[arg(long)]
    country: Option<String>,

    /// Evaluation instant (RFC 3339); defaults to now
    #[arg(long)]
    at: Option<String>,

    /// Check custom sources before built-in platforms
    #[arg(long)]
    custom_first: bool,
}

impl VisitorArgs {
    fn signals(&self) -> RequestSignals {
        RequestSignals {
            referer: self.referer.clone(),
            user_agent: self.user_agent.clone(),
            utm_source: self.utm_source.clone(),
            is_returning: self.returning,
            country: self.country.clone(),
        }
    }

    fn instant(&self) -> Result<DateTime<FixedOffset>, Box<dyn std::error::Error>> {
        match &self.at {
            Some(at) => Ok(DateTime::parse_from_rfc3339(at)?),
            None => Ok(Local::now().fixed_offset()),
        }
    }

    fn precedence(&self) -> SourcePrecedence {
        if self.custom_first {
            SourcePrecedence::CustomFirst
        } else {
            SourcePrecedence::FixedFirst
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Eval {
            rules,
            blocks,
            visitor,
            no_auto_reorder,
            explain,
        } => eval(&rules, &blocks, &visitor, no_auto_reorder, explain),
        Commands::Validate { rules } => validate(&rules),
        Commands::Classify { rules, visitor } => classify(rules.as_deref(), &visitor),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_blocks(path: &Path) -> Result<Vec<LinkBlock>, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_yaml::from_str(&content)?)
    }
}

fn eval(
    rules: &Path,
    blocks: &Path,
    visitor: &VisitorArgs,
    no_auto_reorder: bool,
    explain: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = EngineConfig::no_cache().with_precedence(visitor.precedence());
    config.auto_reorder = !no_auto_reorder;

    let store = RuleStore::open(rules, config)?;
    let blocks = load_blocks(blocks)?;
    let outcome = store.evaluate_at(&blocks, &visitor.signals(), &visitor.instant()?);

    if explain {
        let report = serde_json::json!({
            "traffic": outcome.traffic,
            "matchedRules": outcome.matched_rules,
            "autoReordered": outcome.auto_reordered,
            "blocks": outcome.blocks,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&outcome.blocks)?);
    }

    Ok(())
}

fn validate(rules: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let book = RuleBook::from_path(rules)?;
    let problems = book.problems();

    if problems.is_empty() {
        println!(
            "{}: {} rules, {} custom sources, OK",
            rules.display(),
            book.rules.len(),
            book.custom_sources.len()
        );
        return Ok(());
    }

    for (label, problem) in &problems {
        println!("{}: {:?}: {}", rules.display(), label, problem);
    }
    Err(format!("{} problem(s) found", problems.len()).into())
}

fn classify(rules: Option<&Path>, visitor: &VisitorArgs) -> Result<(), Box<dyn std::error::Error>> {
    let book = match rules {
        Some(path) => RuleBook::from_path(path)?,
        None => RuleBook::default(),
    };
    let store = RuleStore::new(
        book,
        EngineConfig::no_cache().with_precedence(visitor.precedence()),
    );
    let info: TrafficInfo = store.classify_at(&visitor.signals(), &visitor.instant()?);
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
