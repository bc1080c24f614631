//! Vector indexer rule pack.

use crate::rules::{PositiveIntegerSetting, RulePack, SinkFieldSelected};

/// The index embeds `text_field`, so the input must keep that field.
pub const TEXT_FIELD_EXCLUDED: &str = "indexer.text-field-excluded";
/// Embedding width must be a positive integer.
pub const DIMENSIONS_INVALID: &str = "indexer.dimensions-invalid";

pub fn indexer_rules() -> RulePack {
    RulePack::new()
        .with_rule(SinkFieldSelected::new(TEXT_FIELD_EXCLUDED, "text_field"))
        .with_rule(PositiveIntegerSetting::new(DIMENSIONS_INVALID, "dimensions"))
}
