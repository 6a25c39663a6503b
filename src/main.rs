//! waste-scanner - Classify waste materials and verify bin labels
//!
//! An on-device scanning pipeline: photograph an object to classify its
//! material, photograph the bin label to extract and match its text, then
//! validate the pair against the disposal rules and collect the card the
//! round earned.

mod app;
mod capture;
mod config;
mod matching;
mod ocr;
mod rules;
mod storage;
mod vision;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::app::{RoundEvent, ScanSession};
use crate::capture::{FileFrameSource, FrameSource};
use crate::config::AppConfig;
use crate::ocr::OcrClient;
use crate::rules::{CardPool, Outcome};
use crate::storage::ResultStore;
use crate::vision::MaterialClassifier;

/// Environment variable consulted when the config carries no OCR API key
const OCR_API_KEY_ENV: &str = "WASTE_SCANNER_OCR_API_KEY";

/// waste-scanner - material classification and bin label verification
#[derive(Parser, Debug)]
#[command(name = "waste-scanner")]
#[command(about = "Classify waste materials and verify bin labels against disposal rules")]
struct Args {
    /// Configuration file (defaults to config.toml in the config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the data directory holding persisted results
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify the material on an object photo and persist the prediction
    Classify {
        /// Path to the object photo
        #[arg(short, long)]
        image: PathBuf,
    },
    /// Extract text from a bin-label photo and persist the best match
    ScanLabel {
        /// Path to the bin-label photo
        #[arg(short, long)]
        image: PathBuf,
    },
    /// Validate the persisted material/bin pair and award a card
    Validate,
    /// Show which bins accept the last classified material
    Guidance,
    /// Show the collected cards
    Collection,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = load_or_create_config(args.config.as_deref());

    let store = match &args.data_dir {
        Some(dir) => ResultStore::open(dir)?,
        None => ResultStore::open_default()?,
    };
    info!("Results stored under {:?}", store.root());

    let mut classifier = MaterialClassifier::new(config.classifier.class_labels.clone());
    if matches!(args.command, Command::Classify { .. }) {
        classifier
            .load(&config.classifier.model_path)
            .context("Could not load the classification model")?;
    }

    let api_key = resolve_api_key(&config);
    let ocr = OcrClient::new(
        config.ocr.endpoint.clone(),
        api_key,
        config.ocr.language.clone(),
    );

    let vocabulary = read_vocabulary(&config.assets.bin_labels_path);
    let rule_text = read_rules(&config.assets.rules_path);
    let cards = CardPool::new(&config.assets.cards_dir);

    let mut session = ScanSession::new(
        store,
        classifier,
        ocr,
        vocabulary,
        rule_text,
        cards,
        config.classifier.input_resolution,
    );

    match args.command {
        Command::Classify { image } => run_classify(&mut session, &image),
        Command::ScanLabel { image } => run_scan_label(&mut session, &image),
        Command::Validate => run_validate(&mut session),
        Command::Guidance => run_guidance(&session),
        Command::Collection => run_collection(&session),
    }
}

fn run_classify(session: &mut ScanSession, image: &Path) -> Result<()> {
    let mut source = FileFrameSource::new(image);
    let event = session.classify_round(&mut source)?;
    source.stop();

    if let Some(RoundEvent::Classified(result)) = event {
        println!("Predicted: {}", result.label);
        println!("Confidence: {:.2}%", result.confidence_percent());
    }
    Ok(())
}

fn run_scan_label(session: &mut ScanSession, image: &Path) -> Result<()> {
    let mut source = FileFrameSource::new(image);
    let event = session.label_round(&mut source)?;
    source.stop();

    match event {
        Some(RoundEvent::LabelMatched {
            raw_text,
            best_match,
        }) => {
            println!("OCR Result: {}", raw_text);
            match best_match {
                Some(label) => println!("Best Match: {}", label),
                None => println!("Best Match: none"),
            }
        }
        Some(RoundEvent::NoTextFound) => println!("No text found."),
        _ => {}
    }
    Ok(())
}

fn run_validate(session: &mut ScanSession) -> Result<()> {
    match session.validate_round()? {
        RoundEvent::Validated {
            material,
            bin,
            outcome,
            card,
        } => {
            println!("Material: {}", material);
            println!("Bin: {}", bin);
            match outcome {
                Outcome::Correct => {
                    println!("Correct Bin");
                    println!("Gained 1 Playing Card");
                }
                Outcome::Incorrect => {
                    println!("Incorrect Bin");
                    println!("Gained 1 Debuff Card");
                }
            }
            if let Some(id) = card {
                println!("Card: {}", id);
            }
        }
        other => warn!("Unexpected validation event: {:?}", other),
    }
    Ok(())
}

fn run_guidance(session: &ScanSession) -> Result<()> {
    let (material, bins) = session.disposal_guidance();
    println!("Material: {}", material);
    if bins.is_empty() {
        println!("No matching bins.");
    } else {
        println!("Accepted bins: {}", bins.join(", "));
    }
    Ok(())
}

fn run_collection(session: &ScanSession) -> Result<()> {
    let cards = session.collection();
    if cards.is_empty() {
        println!("No cards collected yet.");
    } else {
        for card in cards {
            println!("{}", card);
        }
    }
    Ok(())
}

/// Load configuration from file or fall back to defaults
fn load_or_create_config(path: Option<&Path>) -> AppConfig {
    let path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => storage::default_config_dir()
            .ok()
            .map(|dir| dir.join("config.toml")),
    };

    if let Some(path) = path {
        if path.exists() {
            match config::load_config(&path) {
                Ok(config) => {
                    info!("Loaded configuration from {:?}", path);
                    return config;
                }
                Err(e) => warn!("Could not read configuration at {:?}: {:#}", path, e),
            }
        }
    }

    info!("Using default configuration");
    AppConfig::default()
}

/// API key from config, or from the environment as a fallback
fn resolve_api_key(config: &AppConfig) -> String {
    if !config.ocr.api_key.is_empty() {
        return config.ocr.api_key.clone();
    }
    match std::env::var(OCR_API_KEY_ENV) {
        Ok(key) => key,
        Err(_) => {
            warn!(
                "No OCR API key configured; set ocr.api_key or {}",
                OCR_API_KEY_ENV
            );
            String::new()
        }
    }
}

fn read_vocabulary(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => matching::load_vocabulary(&text),
        Err(e) => {
            warn!("Could not read bin-label vocabulary at {:?}: {}", path, e);
            Vec::new()
        }
    }
}

fn read_rules(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!("Could not read disposal rules at {:?}: {}", path, e);
            String::new()
        }
    }
}
