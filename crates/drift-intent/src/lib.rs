//! # drift-intent
//!
//! Decides whether a player utterance is a creation request and extracts
//! the materials and actions it mentions.
//!
//! The decision is a scored sum of named signals:
//!
//! | Signal                            | Weight |
//! |-----------------------------------|--------|
//! | `action_verb_present`             | +0.4   |
//! | `action_verb_in_previous_message` | +0.2   |
//! | `material_noun_present`           | +0.3   |
//! | `coordinate_triple_present`       | +0.3   |
//! | `negation_present`                | -0.5   |
//! | `question_form`                   | -0.2   |
//!
//! An utterance is a creation request when the score reaches the configured
//! threshold (0.45 by default). The previous-message signal only fires when
//! the utterance itself has no verb.

pub mod classifier;
pub mod coordinates;
pub mod error;
pub mod lexicon;

pub use classifier::IntentClassifier;
pub use coordinates::extract_coordinates;
pub use error::IntentError;
