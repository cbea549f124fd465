//! Scored creation-intent classifier.

use crate::coordinates::extract_coordinates;
use crate::error::IntentError;
use crate::lexicon::{
    ACTION_VERBS, BLOCK_NOUN_FILLERS, NEGATIONS, QUESTION_PREFIXES, QUESTION_SUFFIXES,
    is_word_char,
};
use drift_catalog::ResourceCatalog;
use drift_core::{
    CreationIntentDecision, IntentConfig, IntentSlots, PlayerContext, ResourceCategory,
};
use regex::Regex;
use std::ops::Range;
use std::sync::{Arc, LazyLock};

const W_ACTION_VERB: f64 = 0.4;
const W_PREVIOUS_VERB: f64 = 0.2;
const W_MATERIAL: f64 = 0.3;
const W_COORDINATES: f64 = 0.3;
const W_NEGATION: f64 = -0.5;
const W_QUESTION: f64 = -0.2;

static CANONICAL_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-z][a-z0-9_.\-]*:[a-z0-9_][a-z0-9_./\-]*").expect("canonical id pattern is valid")
});

static ASCII_BLOCK_NOUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[a-z][a-z0-9_]*_block\b").expect("block noun pattern is valid")
});

/// Classifies utterances against the catalog vocabulary.
pub struct IntentClassifier {
    catalog: Arc<ResourceCatalog>,
    config: IntentConfig,
}

impl IntentClassifier {
    pub fn new(catalog: Arc<ResourceCatalog>, config: IntentConfig) -> Self {
        Self { catalog, config }
    }

    pub fn config(&self) -> &IntentConfig {
        &self.config
    }

    /// Reject messages the pipeline cannot process at all.
    pub fn check_message(&self, message: &str) -> Result<(), IntentError> {
        let chars = message.chars().count();
        if chars > self.config.max_message_chars {
            return Err(IntentError::BadInput(format!(
                "message has {} characters, limit is {}",
                chars, self.config.max_message_chars
            )));
        }
        if message
            .chars()
            .any(|c| c.is_control() && !c.is_whitespace())
        {
            return Err(IntentError::BadInput(
                "message contains control characters".to_string(),
            ));
        }
        Ok(())
    }

    /// Classify a JSON value received from the API layer.
    ///
    /// Anything other than a string is `BadInput`.
    pub fn classify_value(
        &self,
        value: &serde_json::Value,
        context: &PlayerContext,
    ) -> Result<CreationIntentDecision, IntentError> {
        let Some(message) = value.as_str() else {
            return Err(IntentError::BadInput(format!(
                "message must be a string, got {}",
                json_kind(value)
            )));
        };
        self.check_message(message)?;
        Ok(self.classify(message, context))
    }

    /// Classify an utterance. Never fails; unclear input yields
    /// `is_creation = false`.
    pub fn classify(&self, utterance: &str, context: &PlayerContext) -> CreationIntentDecision {
        let text = utterance.trim().to_lowercase();
        if text.is_empty() {
            return CreationIntentDecision::not_creation("empty_message");
        }

        let mut scanner = Scanner::new(&text);
        let materials = self.extract_materials(&mut scanner);
        let mut actions = extract_actions(&mut scanner);
        let materials = {
            let mut all = materials;
            all.extend(extract_block_nouns(&mut scanner));
            all.sort_by_key(|(start, _)| *start);
            all.into_iter().map(|(_, token)| token).collect::<Vec<_>>()
        };

        let mut score = 0.0;
        let mut reasons = Vec::new();

        if !actions.is_empty() {
            score += W_ACTION_VERB;
            reasons.push("action_verb_present".to_string());
        } else if !materials.is_empty() {
            let previous = context
                .previous_message
                .as_deref()
                .map(|m| m.trim().to_lowercase())
                .unwrap_or_default();
            let previous_actions = extract_actions(&mut Scanner::new(&previous));
            if !previous_actions.is_empty() {
                score += W_PREVIOUS_VERB;
                reasons.push("action_verb_in_previous_message".to_string());
                actions = previous_actions;
            }
        }

        if !materials.is_empty() {
            score += W_MATERIAL;
            reasons.push("material_noun_present".to_string());
        }

        let coordinates = extract_coordinates(utterance);
        if coordinates.is_some() {
            score += W_COORDINATES;
            reasons.push("coordinate_triple_present".to_string());
        }

        if scanner.contains_any(NEGATIONS) {
            score += W_NEGATION;
            reasons.push("negation_present".to_string());
        }

        if is_question(&text) {
            score += W_QUESTION;
            reasons.push("question_form".to_string());
        }

        let confidence = round4(score.clamp(0.0, 1.0));
        let is_creation = round4(score) >= self.config.creation_threshold;

        let mut slots = IntentSlots {
            materials,
            actions: actions.into_iter().map(|(_, verb)| verb).collect(),
            ..Default::default()
        };
        slots.extra.insert(
            "language".to_string(),
            serde_json::Value::String(
                context
                    .language_hint
                    .clone()
                    .unwrap_or_else(|| detect_language(&text).to_string()),
            ),
        );
        if let Some(c) = coordinates {
            slots.extra.insert(
                "coordinates".to_string(),
                serde_json::json!({ "x": c.x, "y": c.y, "z": c.z }),
            );
        }

        tracing::debug!(
            is_creation,
            confidence,
            reasons = ?reasons,
            materials = ?slots.materials,
            actions = ?slots.actions,
            "Classified utterance"
        );

        CreationIntentDecision {
            is_creation,
            confidence,
            reasons,
            slots,
        }
    }

    /// True when at least one extracted material resolves to a block.
    ///
    /// Entities, items and effects do not count: "召唤一下盔甲架" asks for an
    /// armor stand, which is not a block request.
    pub fn is_block_request(&self, decision: &CreationIntentDecision) -> bool {
        decision.slots.materials.iter().any(|token| {
            let resolution = self.catalog.resolve(token);
            resolution
                .resource_id
                .as_deref()
                .and_then(|id| self.catalog.category_of(id))
                == Some(ResourceCategory::Block)
        })
    }

    /// Canonical ids typed verbatim, then catalog aliases (longest first).
    fn extract_materials(&self, scanner: &mut Scanner<'_>) -> Vec<(usize, String)> {
        let mut found = Vec::new();

        let canonical: Vec<Range<usize>> = CANONICAL_ID
            .find_iter(scanner.text)
            .map(|m| m.range())
            .collect();
        for range in canonical {
            if scanner.bounded(&range) && scanner.is_free(&range) {
                found.push((range.start, scanner.text[range.clone()].to_string()));
                scanner.take(range);
            }
        }

        for alias in self.catalog.aliases() {
            for range in scanner.take_all(&alias) {
                found.push((range.start, alias.clone()));
            }
        }

        found
    }
}

/// Verbs from the fixed table, longest surface form first.
fn extract_actions(scanner: &mut Scanner<'_>) -> Vec<(usize, String)> {
    let mut table: Vec<&(&str, &str)> = ACTION_VERBS.iter().collect();
    table.sort_by_key(|(surface, _)| std::cmp::Reverse(surface.chars().count()));

    let mut found = Vec::new();
    for (surface, verb) in table {
        for range in scanner.take_all(surface) {
            found.push((range.start, verb.to_string()));
        }
    }
    found.sort_by_key(|(start, _)| *start);
    found
}

/// `<noun>_block` and `<noun>块` patterns not already claimed.
fn extract_block_nouns(scanner: &mut Scanner<'_>) -> Vec<(usize, String)> {
    let mut found = Vec::new();

    let ascii: Vec<Range<usize>> = ASCII_BLOCK_NOUN
        .find_iter(scanner.text)
        .map(|m| m.range())
        .collect();
    for range in ascii {
        if scanner.is_free(&range) {
            found.push((range.start, scanner.text[range.clone()].to_string()));
            scanner.take(range);
        }
    }

    let suffixes: Vec<usize> = scanner
        .text
        .match_indices('块')
        .map(|(idx, _)| idx)
        .collect();
    for end in suffixes {
        let block_range = end..end + '块'.len_utf8();
        if !scanner.is_free(&block_range) {
            continue;
        }

        let mut start = end;
        let mut taken = 0;
        for (idx, c) in scanner.text[..end].char_indices().rev() {
            let range = idx..idx + c.len_utf8();
            if taken == 3 || !is_han(c) || BLOCK_NOUN_FILLERS.contains(&c) || !scanner.is_free(&range)
            {
                break;
            }
            start = idx;
            taken += 1;
        }

        if taken > 0 {
            let range = start..block_range.end;
            found.push((start, scanner.text[range.clone()].to_string()));
            scanner.take(range);
        }
    }

    found
}

fn is_question(text: &str) -> bool {
    if text.contains('?') || text.contains('？') {
        return true;
    }
    if QUESTION_PREFIXES.iter().any(|p| text.starts_with(p)) {
        return true;
    }
    let stripped = text.trim_end_matches(|c: char| c.is_ascii_punctuation() || "。！，～".contains(c));
    QUESTION_SUFFIXES.iter().any(|s| stripped.ends_with(s))
}

fn is_han(c: char) -> bool {
    matches!(c, '\u{4e00}'..='\u{9fff}' | '\u{3400}'..='\u{4dbf}')
}

fn detect_language(text: &str) -> &'static str {
    if text.chars().any(is_han) { "zh" } else { "en" }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// Tracks which byte ranges of the utterance have been claimed.
struct Scanner<'a> {
    text: &'a str,
    taken: Vec<Range<usize>>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            taken: Vec::new(),
        }
    }

    fn is_free(&self, range: &Range<usize>) -> bool {
        self.taken
            .iter()
            .all(|t| range.end <= t.start || range.start >= t.end)
    }

    fn take(&mut self, range: Range<usize>) {
        self.taken.push(range);
    }

    /// ASCII word edges must not touch other word characters.
    fn bounded(&self, range: &Range<usize>) -> bool {
        let needle = &self.text[range.clone()];
        let starts_word = needle.chars().next().is_some_and(is_word_char);
        let ends_word = needle.chars().next_back().is_some_and(is_word_char);

        let before_ok = !starts_word
            || !self.text[..range.start]
                .chars()
                .next_back()
                .is_some_and(is_word_char);
        let after_ok = !ends_word
            || !self.text[range.end..]
                .chars()
                .next()
                .is_some_and(is_word_char);
        before_ok && after_ok
    }

    /// Claim every free, bounded occurrence of `needle`.
    fn take_all(&mut self, needle: &str) -> Vec<Range<usize>> {
        if needle.is_empty() {
            return Vec::new();
        }
        let hits: Vec<Range<usize>> = self
            .text
            .match_indices(needle)
            .map(|(start, m)| start..start + m.len())
            .collect();

        let mut claimed = Vec::new();
        for range in hits {
            if self.bounded(&range) && self.is_free(&range) {
                self.take(range.clone());
                claimed.push(range);
            }
        }
        claimed
    }

    /// Whether any needle occurs on word boundaries, claimed or not.
    fn contains_any(&self, needles: &[&str]) -> bool {
        needles.iter().any(|needle| {
            self.text
                .match_indices(needle)
                .any(|(start, m)| self.bounded(&(start..start + m.len())))
        })
    }
}
