//! Pipeline Coordinator
//!
//! Runs the three rounds of a scan (classify the object, extract the bin
//! label, validate the pair) and hands state between them through the
//! result store. Rounds return events; what to show or where to navigate
//! next is the caller's decision.

use std::io::Cursor;

use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::capture::{FrameSource, PixelBuffer};
use crate::matching;
use crate::ocr::{Extraction, OcrClient};
use crate::rules::{CardPool, Outcome, RuleTable};
use crate::storage::ResultStore;
use crate::vision::{geometry, tensor, ClassificationResult, MaterialClassifier};

/// JPEG quality for uploaded bin-label snapshots
const LABEL_SNAPSHOT_QUALITY: u8 = 90;

/// What a completed round produced
#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    /// Material classified and persisted
    Classified(ClassificationResult),
    /// Label text extracted and matched against the vocabulary;
    /// `best_match` is `None` when nothing cleared its threshold
    LabelMatched {
        raw_text: String,
        best_match: Option<String>,
    },
    /// The OCR service processed the snapshot but found no text
    NoTextFound,
    /// Validation outcome; `card` is the awarded identifier, absent when
    /// the matching pool had nothing to give
    Validated {
        material: String,
        bin: String,
        outcome: Outcome,
        card: Option<String>,
    },
}

/// One scanning session: owns the pipeline pieces and the busy flag that
/// keeps at most one classification or upload in flight.
pub struct ScanSession {
    store: ResultStore,
    classifier: MaterialClassifier,
    ocr: OcrClient,
    vocabulary: Vec<String>,
    rule_text: String,
    cards: CardPool,
    resolution: u32,
    busy: bool,
}

impl ScanSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: ResultStore,
        classifier: MaterialClassifier,
        ocr: OcrClient,
        vocabulary: Vec<String>,
        rule_text: String,
        cards: CardPool,
        resolution: u32,
    ) -> Self {
        Self {
            store,
            classifier,
            ocr,
            vocabulary,
            rule_text,
            cards,
            resolution,
            busy: false,
        }
    }

    /// Capture a frame, classify its material and persist the prediction.
    /// Returns `None` when another round is already in flight; the trigger
    /// is dropped, not queued.
    pub fn classify_round(&mut self, source: &mut dyn FrameSource) -> Result<Option<RoundEvent>> {
        if self.busy {
            debug!("Classification already in flight, dropping trigger");
            return Ok(None);
        }

        self.busy = true;
        let result = self.run_classify(source);
        self.busy = false;
        result.map(Some)
    }

    fn run_classify(&mut self, source: &mut dyn FrameSource) -> Result<RoundEvent> {
        let frame = source.next_frame()?;
        debug!("Captured {}x{} frame", frame.width, frame.height);

        let square = geometry::normalize_for_classification(&frame, self.resolution);
        if let Err(e) = self.store.save_classify_snapshot(&square) {
            warn!("Could not save classification snapshot: {:#}", e);
        }

        let input = tensor::encode(&square, self.resolution)?;
        let result = self.classifier.infer(input)?;
        info!(
            "Predicted '{}' at {:.2}%",
            result.label,
            result.confidence_percent()
        );

        if let Err(e) = self.store.write_prediction(&result.label) {
            warn!("Could not persist prediction: {:#}", e);
        }

        Ok(RoundEvent::Classified(result))
    }

    /// Capture a bin-label frame, upload it for text extraction and persist
    /// the best vocabulary match. Returns `None` when another round is
    /// already in flight.
    pub fn label_round(&mut self, source: &mut dyn FrameSource) -> Result<Option<RoundEvent>> {
        if self.busy {
            debug!("Upload already in flight, dropping trigger");
            return Ok(None);
        }

        self.busy = true;
        let result = self.run_label(source);
        self.busy = false;
        result.map(Some)
    }

    fn run_label(&mut self, source: &mut dyn FrameSource) -> Result<RoundEvent> {
        let frame = source.next_frame()?;
        let normalized = geometry::normalize_label_snapshot(&frame);
        let jpeg = encode_jpeg(&normalized)?;

        if let Err(e) = self.store.save_label_snapshot(&jpeg) {
            warn!("Could not save label snapshot: {:#}", e);
        }

        let runtime = Runtime::new().context("Failed to create async runtime")?;
        let extraction = runtime.block_on(self.ocr.extract_text(&jpeg))?;

        match extraction {
            Extraction::Empty => {
                info!("OCR found no text in the snapshot");
                Ok(RoundEvent::NoTextFound)
            }
            Extraction::Text(raw_text) => {
                let best_match = matching::best_match(&raw_text, &self.vocabulary);
                info!(
                    "Extracted '{}', best match: {}",
                    raw_text,
                    best_match.unwrap_or("none")
                );

                if let Err(e) = self.store.write_ocr(best_match) {
                    warn!("Could not persist OCR result: {:#}", e);
                }

                Ok(RoundEvent::LabelMatched {
                    raw_text,
                    best_match: best_match.map(str::to_string),
                })
            }
        }
    }

    /// Validate the persisted (material, bin) pair against the rule table
    /// and append the awarded card to the collection log.
    pub fn validate_round(&mut self) -> Result<RoundEvent> {
        let material = self.store.read_prediction();
        let bin = self.store.read_ocr();
        let table = RuleTable::parse(&self.rule_text);

        let outcome = table.validate(&material, &bin);
        info!(
            "Validated material '{}' against bin '{}': {:?}",
            material, bin, outcome
        );

        let card = match outcome {
            Outcome::Correct => self.cards.pick_reward(&material),
            Outcome::Incorrect => self.cards.pick_debuff(),
        };

        match &card {
            Some(id) => {
                if let Err(e) = self.store.append_card(id) {
                    warn!("Could not append card to collection: {:#}", e);
                }
            }
            None => warn!("No card available for this outcome"),
        }

        Ok(RoundEvent::Validated {
            material,
            bin,
            outcome,
            card,
        })
    }

    /// Disposal guidance for the last classified material: the accepted
    /// bins from the rule table, in rule order.
    pub fn disposal_guidance(&self) -> (String, Vec<String>) {
        let material = self.store.read_prediction();
        let table = RuleTable::parse(&self.rule_text);
        let bins = table.bins_for(&material).to_vec();
        (material, bins)
    }

    /// The collected cards, oldest first
    pub fn collection(&self) -> Vec<String> {
        self.store.read_card_log()
    }
}

/// Encode a frame as JPEG for upload and diagnostics
fn encode_jpeg(frame: &PixelBuffer) -> Result<Vec<u8>> {
    let img = frame
        .to_image()
        .context("Frame buffer length does not match its dimensions")?;

    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(Cursor::new(&mut bytes), LABEL_SNAPSHOT_QUALITY);
    img.write_with_encoder(encoder)
        .context("Failed to encode snapshot as JPEG")?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::StaticFrameSource;
    use std::fs;
    use tempfile::TempDir;

    const RULES: &str = "plastic bottle:blue bin\nplastic bottle:recycling\npaper:paper bin";

    fn session_in(dir: &TempDir) -> ScanSession {
        let cards_dir = dir.path().join("cards");
        for pool in ["playing_cards/plastic_bottle", "debuff_cards"] {
            let path = cards_dir.join(pool);
            fs::create_dir_all(&path).unwrap();
            fs::write(path.join("card.png"), b"art").unwrap();
        }

        ScanSession::new(
            ResultStore::open(dir.path().join("data")).unwrap(),
            MaterialClassifier::new(vec!["paper".to_string()]),
            OcrClient::new(
                "http://localhost:1/parse/image".to_string(),
                "test".to_string(),
                "eng".to_string(),
            ),
            vec!["blue bin".to_string(), "paper bin".to_string()],
            RULES.to_string(),
            CardPool::new(cards_dir),
            8,
        )
    }

    #[test]
    fn test_validate_correct_pair_awards_card() {
        let dir = TempDir::new().unwrap();
        let mut session = session_in(&dir);
        session.store.write_prediction("plastic bottle").unwrap();
        session.store.write_ocr(Some("blue bin")).unwrap();

        match session.validate_round().unwrap() {
            RoundEvent::Validated { outcome, card, .. } => {
                assert_eq!(outcome, Outcome::Correct);
                assert_eq!(card, Some("card".to_string()));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(session.collection(), ["card"]);
    }

    #[test]
    fn test_validate_wrong_bin_awards_debuff() {
        let dir = TempDir::new().unwrap();
        let mut session = session_in(&dir);
        session.store.write_prediction("plastic bottle").unwrap();
        session.store.write_ocr(Some("paper bin")).unwrap();

        match session.validate_round().unwrap() {
            RoundEvent::Validated { outcome, .. } => assert_eq!(outcome, Outcome::Incorrect),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_validate_without_prediction_defaults_to_unknown() {
        let dir = TempDir::new().unwrap();
        let mut session = session_in(&dir);
        session.store.write_ocr(Some("blue bin")).unwrap();

        match session.validate_round().unwrap() {
            RoundEvent::Validated {
                material, outcome, ..
            } => {
                assert_eq!(material, "unknown");
                assert_eq!(outcome, Outcome::Incorrect);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_log_grows_once_per_validation() {
        let dir = TempDir::new().unwrap();
        let mut session = session_in(&dir);
        session.store.write_prediction("plastic bottle").unwrap();
        session.store.write_ocr(Some("blue bin")).unwrap();

        session.validate_round().unwrap();
        session.validate_round().unwrap();
        assert_eq!(session.collection().len(), 2);
    }

    #[test]
    fn test_classify_without_model_fails_round() {
        let dir = TempDir::new().unwrap();
        let mut session = session_in(&dir);
        let mut source = StaticFrameSource::new(PixelBuffer::filled(16, 16, 50));
        assert!(session.classify_round(&mut source).is_err());
    }

    #[test]
    fn test_classify_without_device_fails_round() {
        let dir = TempDir::new().unwrap();
        let mut session = session_in(&dir);
        let mut source = StaticFrameSource::new(PixelBuffer::filled(16, 16, 50));
        source.stop();
        assert!(session.classify_round(&mut source).is_err());
    }

    #[test]
    fn test_disposal_guidance_lists_bins_in_rule_order() {
        let dir = TempDir::new().unwrap();
        let session = {
            let mut s = session_in(&dir);
            s.store.write_prediction("plastic bottle").unwrap();
            s
        };
        let (material, bins) = session.disposal_guidance();
        assert_eq!(material, "plastic bottle");
        assert_eq!(bins, ["blue bin", "recycling"]);
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg_magic() {
        let frame = PixelBuffer::filled(8, 8, 120);
        let bytes = encode_jpeg(&frame).unwrap();
        assert_eq!(&bytes[..2], &[0xff, 0xd8]);
    }
}
