//! Disposal rules
//!
//! Maps material labels to the bins allowed to receive them and decides
//! whether a round was disposed of correctly.

pub mod cards;

use std::collections::HashMap;

use tracing::debug;

pub use cards::CardPool;

/// Outcome of validating one disposal round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The bin is an accepted destination for the material
    Correct,
    /// Wrong bin, or the material is not in the table at all
    Incorrect,
}

/// Material label → accepted bin labels. Built once per validation from the
/// rule text and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: HashMap<String, Vec<String>>,
}

impl RuleTable {
    /// Parse rule text, one `material:bin` pair per line. Both sides are
    /// trimmed and lowercased. Lines without exactly one colon are silently
    /// skipped. Repeated materials accumulate their bins as a set.
    pub fn parse(text: &str) -> Self {
        let mut rules: HashMap<String, Vec<String>> = HashMap::new();
        let mut skipped = 0usize;

        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split(':');
            match (fields.next(), fields.next(), fields.next()) {
                (Some(material), Some(bin), None) => {
                    let material = material.trim().to_lowercase();
                    let bin = bin.trim().to_lowercase();
                    let bins = rules.entry(material).or_default();
                    if !bins.contains(&bin) {
                        bins.push(bin);
                    }
                }
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!("Skipped {} malformed rule lines", skipped);
        }
        Self { rules }
    }

    /// Number of materials in the table
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Accepted bins for a material, in first-seen rule order.
    /// Empty for unknown materials.
    pub fn bins_for(&self, material: &str) -> &[String] {
        self.rules
            .get(&material.trim().to_lowercase())
            .map(|bins| bins.as_slice())
            .unwrap_or(&[])
    }

    /// Decide whether `bin` is an accepted destination for `material`.
    /// Inputs are normalized the same way the table was built.
    pub fn validate(&self, material: &str, bin: &str) -> Outcome {
        let material = material.trim().to_lowercase();
        let bin = bin.trim().to_lowercase();

        match self.rules.get(&material) {
            Some(bins) if bins.iter().any(|b| *b == bin) => Outcome::Correct,
            _ => Outcome::Incorrect,
        }
    }
}
