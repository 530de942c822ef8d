//! Canned-response catalogue.
//!
//! Three fixed lists of strings (error / greeting / limit-exceeded) loaded
//! from a TOML file at startup. Selection is a uniform-random index through
//! an injected RNG so callers can pin the choice in tests. Reloads replace
//! the whole catalogue atomically; readers see either the old or the new
//! list, never a partial one.

use arc_swap::ArcSwap;
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use rand::Rng;
use rand::seq::IndexedRandom as _;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{ResponsesError, Result};

const FALLBACK_ERROR: &str = "Something went wrong on my end. Try again in a bit.";
const FALLBACK_GREETING: &str = "Rooivalk online.";
const FALLBACK_LIMIT_EXCEEDED: &str =
    "That answer ran long, so I attached it as a file instead.";

/// The three canned-response lists.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseCatalogue {
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub greetings: Vec<String>,
    #[serde(default)]
    pub limit_exceeded: Vec<String>,
}

impl Default for ResponseCatalogue {
    fn default() -> Self {
        Self {
            errors: vec![
                FALLBACK_ERROR.into(),
                "My rotors jammed. Give it another go.".into(),
            ],
            greetings: vec![
                FALLBACK_GREETING.into(),
                "Rooivalk reporting for duty.".into(),
            ],
            limit_exceeded: vec![FALLBACK_LIMIT_EXCEEDED.into()],
        }
    }
}

impl ResponseCatalogue {
    /// Parse a catalogue from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text).map_err(ResponsesError::Parse)?)
    }

    pub fn error_reply<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        pick(&self.errors, FALLBACK_ERROR, rng)
    }

    pub fn greeting<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        pick(&self.greetings, FALLBACK_GREETING, rng)
    }

    pub fn limit_notice<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        pick(&self.limit_exceeded, FALLBACK_LIMIT_EXCEEDED, rng)
    }
}

/// Uniform-random pick, falling back to a fixed string for an empty list.
fn pick<'a, R: Rng + ?Sized>(list: &'a [String], fallback: &'a str, rng: &mut R) -> &'a str {
    list.choose(rng).map(String::as_str).unwrap_or(fallback)
}

/// Process-lifetime holder of the current catalogue.
///
/// The catalogue reference is swapped wholesale on reload; event handlers
/// load a snapshot per use and never observe a half-written list.
pub struct ResponseStore {
    catalogue: ArcSwap<ResponseCatalogue>,
    path: PathBuf,
}

impl std::fmt::Debug for ResponseStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ResponseStore {
    /// Load the catalogue from `path`. A missing or invalid file falls back
    /// to the built-in defaults; the service never refuses to start over
    /// canned strings.
    pub fn load(path: PathBuf) -> Self {
        let catalogue = match read_catalogue(&path) {
            Ok(catalogue) => {
                tracing::info!(path = %path.display(), "response catalogue loaded");
                catalogue
            }
            Err(error) => {
                tracing::warn!(%error, path = %path.display(), "using built-in response catalogue");
                ResponseCatalogue::default()
            }
        };

        Self {
            catalogue: ArcSwap::from_pointee(catalogue),
            path,
        }
    }

    /// Current catalogue snapshot.
    pub fn catalogue(&self) -> Arc<ResponseCatalogue> {
        self.catalogue.load_full()
    }

    /// Re-read the catalogue file and swap it in. Best-effort: a failed
    /// reload keeps the previous catalogue.
    pub fn reload(&self) {
        match read_catalogue(&self.path) {
            Ok(catalogue) => {
                self.catalogue.store(Arc::new(catalogue));
                tracing::info!(path = %self.path.display(), "response catalogue reloaded");
            }
            Err(error) => {
                tracing::warn!(%error, path = %self.path.display(), "catalogue reload failed, keeping previous");
            }
        }
    }

    /// Watch the catalogue file and reload on change.
    ///
    /// The returned watcher must be kept alive for the watch to stay active;
    /// the caller holds it for the life of the process.
    pub fn watch(self: &Arc<Self>) -> Result<RecommendedWatcher> {
        let store = Arc::clone(self);
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
            match event {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => store.reload(),
                Ok(_) => {}
                Err(error) => tracing::warn!(%error, "catalogue watcher error"),
            }
        })
        .map_err(|e| ResponsesError::Other(anyhow::anyhow!(e)))?;

        watcher
            .watch(&self.path, RecursiveMode::NonRecursive)
            .map_err(|e| ResponsesError::Other(anyhow::anyhow!(e)))?;

        tracing::debug!(path = %self.path.display(), "watching response catalogue");
        Ok(watcher)
    }
}

fn read_catalogue(path: &std::path::Path) -> Result<ResponseCatalogue> {
    let text = std::fs::read_to_string(path).map_err(|source| ResponsesError::Read {
        path: path.display().to_string(),
        source,
    })?;
    ResponseCatalogue::from_toml(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    #[test]
    fn parses_catalogue_from_toml() {
        let catalogue = ResponseCatalogue::from_toml(indoc! {r#"
            errors = ["boom", "bang"]
            greetings = ["hello"]
            limit_exceeded = ["too long"]
        "#})
        .unwrap();

        assert_eq!(catalogue.errors.len(), 2);
        assert_eq!(catalogue.greetings, vec!["hello"]);
        assert_eq!(catalogue.limit_exceeded, vec!["too long"]);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let catalogue = ResponseCatalogue::from_toml("errors = [\"only\"]").unwrap();
        assert!(catalogue.greetings.is_empty());
        // Empty lists fall back to the built-in string rather than panicking.
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(catalogue.greeting(&mut rng), FALLBACK_GREETING);
    }

    #[test]
    fn selection_is_deterministic_with_seeded_rng() {
        let catalogue = ResponseCatalogue {
            errors: vec!["a".into(), "b".into(), "c".into()],
            greetings: vec![],
            limit_exceeded: vec![],
        };

        let mut first = StdRng::seed_from_u64(42);
        let mut second = StdRng::seed_from_u64(42);
        assert_eq!(
            catalogue.error_reply(&mut first),
            catalogue.error_reply(&mut second)
        );
    }

    #[test]
    fn selection_draws_from_the_list() {
        let catalogue = ResponseCatalogue::default();
        let mut rng = StdRng::seed_from_u64(7);
        let chosen = catalogue.error_reply(&mut rng).to_string();
        assert!(catalogue.errors.iter().any(|entry| *entry == chosen));
    }

    #[test]
    fn reload_swaps_catalogue_atomically() {
        let dir = std::env::temp_dir().join("rooivalk-responses-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("responses.toml");
        std::fs::write(&path, "errors = [\"first\"]").unwrap();

        let store = ResponseStore::load(path.clone());
        assert_eq!(store.catalogue().errors, vec!["first"]);

        std::fs::write(&path, "errors = [\"second\"]").unwrap();
        store.reload();
        assert_eq!(store.catalogue().errors, vec!["second"]);

        // A broken file keeps the previous catalogue.
        std::fs::write(&path, "errors = not-toml").unwrap();
        store.reload();
        assert_eq!(store.catalogue().errors, vec!["second"]);

        std::fs::remove_file(&path).ok();
    }
}
