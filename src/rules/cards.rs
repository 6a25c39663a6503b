//! Card pools for round rewards
//!
//! A correct round awards a playing card, a wrong one a debuff card. Card
//! art lives on disk, one directory per material for playing cards and a
//! shared directory for debuffs; the awarded identifier is the file stem of
//! a randomly picked member. Which id gets logged is all the pipeline needs;
//! rendering the art is the presentation layer's job.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use tracing::warn;

/// Disk-backed pools of card identifiers
pub struct CardPool {
    root: PathBuf,
}

impl CardPool {
    /// `root` holds `playing_cards/<material>/` subdirectories and a
    /// `debuff_cards/` directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Pick a reward card for a material. Spaces in the material name map
    /// to underscores in the directory name.
    pub fn pick_reward(&self, material: &str) -> Option<String> {
        let dir = self
            .root
            .join("playing_cards")
            .join(material.replace(' ', "_"));
        self.pick_from(&dir)
    }

    /// Pick a debuff card from the shared pool
    pub fn pick_debuff(&self) -> Option<String> {
        self.pick_from(&self.root.join("debuff_cards"))
    }

    fn pick_from(&self, dir: &Path) -> Option<String> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("No card pool at {:?}: {}", dir, e);
                return None;
            }
        };

        let mut stems: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                entry
                    .path()
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .collect();
        stems.sort();

        if stems.is_empty() {
            warn!("Card pool at {:?} is empty", dir);
            return None;
        }

        stems.choose(&mut rand::thread_rng()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn pool_with_cards(cards: &[(&str, &str)]) -> (TempDir, CardPool) {
        let dir = TempDir::new().unwrap();
        for (subdir, name) in cards {
            let path = dir.path().join(subdir);
            fs::create_dir_all(&path).unwrap();
            fs::write(path.join(name), b"art").unwrap();
        }
        let pool = CardPool::new(dir.path());
        (dir, pool)
    }

    #[test]
    fn test_pick_reward_uses_material_directory() {
        let (_dir, pool) = pool_with_cards(&[(
            "playing_cards/plastic_bottle",
            "ace_of_bottles.png",
        )]);
        assert_eq!(
            pool.pick_reward("plastic bottle"),
            Some("ace_of_bottles".to_string())
        );
    }

    #[test]
    fn test_pick_debuff() {
        let (_dir, pool) = pool_with_cards(&[("debuff_cards", "soggy_boot.png")]);
        assert_eq!(pool.pick_debuff(), Some("soggy_boot".to_string()));
    }

    #[test]
    fn test_missing_pool_yields_none() {
        let dir = TempDir::new().unwrap();
        let pool = CardPool::new(dir.path());
        assert_eq!(pool.pick_reward("glass"), None);
        assert_eq!(pool.pick_debuff(), None);
    }

    #[test]
    fn test_pick_is_a_member_of_the_pool() {
        let (_dir, pool) = pool_with_cards(&[
            ("debuff_cards", "one.png"),
            ("debuff_cards", "two.png"),
            ("debuff_cards", "three.png"),
        ]);
        let picked = pool.pick_debuff().unwrap();
        assert!(["one", "two", "three"].contains(&picked.as_str()));
    }
}
