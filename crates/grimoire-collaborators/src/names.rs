// grimoire-collaborators/src/names.rs
// ============================================================================
// Module: Corpus Name Generator
// Description: Syllable-corpus backed name generation.
// Purpose: Give `name_generation` steps a concrete NameGenerator without an
//          external service dependency.
// Dependencies: grimoire-core, rand, serde_json
// ============================================================================

//! ## Overview
//! [`CorpusNameGenerator`] only knows the `wyrdbound-rng` generator engine —
//! the flow document's default — and a small set of built-in syllable
//! corpora. It composes syllables up to `settings.max_length`, the same
//! bounded-composition shape `decision-gate-providers`' time provider uses
//! for its own small, self-contained lookup tables.

use std::collections::BTreeMap;
use std::sync::Mutex;

use grimoire_core::host::CollaboratorError;
use grimoire_core::{NameGenerator, NameSettings};
use rand::Rng;
use rand::rngs::ThreadRng;
use serde_json::{Value, json};

const GENERIC_FANTASY: &[&str] = &["bel", "dor", "fen", "gal", "mir", "rhal", "thor", "wyn", "ae", "or", "ith", "ul"];
const GENERIC_SCIFI: &[&str] = &["zor", "vex", "qil", "neb", "tron", "axi", "ryn", "ova", "ix", "en", "ul", "ar"];

/// Generates names by concatenating random syllables from a fixed corpus.
pub struct CorpusNameGenerator {
    corpora: BTreeMap<String, Vec<&'static str>>,
    rng: Mutex<ThreadRng>,
}

impl CorpusNameGenerator {
    /// Creates a generator with the built-in `generic-fantasy` and
    /// `generic-scifi` corpora.
    #[must_use]
    pub fn new() -> Self {
        let mut corpora = BTreeMap::new();
        corpora.insert("generic-fantasy".to_string(), GENERIC_FANTASY.to_vec());
        corpora.insert("generic-scifi".to_string(), GENERIC_SCIFI.to_vec());
        Self { corpora, rng: Mutex::new(rand::thread_rng()) }
    }
}

impl Default for CorpusNameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl NameGenerator for CorpusNameGenerator {
    fn generate_name(&self, generator: &str, settings: &NameSettings) -> Result<Value, CollaboratorError> {
        if generator != "wyrdbound-rng" {
            return Err(CollaboratorError::Generator(format!("unknown name generator `{generator}`")));
        }
        let syllables = self
            .corpora
            .get(&settings.corpus)
            .ok_or_else(|| CollaboratorError::Generator(format!("unknown corpus `{}`", settings.corpus)))?;

        let mut rng = self.rng.lock().map_err(|_| CollaboratorError::Generator("name rng mutex poisoned".to_string()))?;
        let syllable_count = rng.gen_range(2..=3);
        let mut name = String::new();
        for _ in 0..syllable_count {
            let index = rng.gen_range(0..syllables.len());
            name.push_str(syllables[index]);
            if name.len() as u32 >= settings.max_length {
                break;
            }
        }
        name.truncate(settings.max_length as usize);
        let mut capitalized = name;
        if let Some(first) = capitalized.get_mut(0..1) {
            first.make_ascii_uppercase();
        }

        Ok(json!({
            "name": capitalized,
            "corpus": settings.corpus,
            "segmenter": settings.segmenter,
            "algorithm": settings.algorithm,
        }))
    }
}
