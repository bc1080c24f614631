//! Canonizer rule pack.

use crate::rules::{DeclaredPair, RequiredSourceSetting, RulePack};

/// The source/transform pair must come from a declared mapping.
pub const UNDECLARED_MAPPING: &str = "canonizer.undeclared-mapping";
/// A transform run needs a concrete `input` file.
pub const INPUT_REQUIRED: &str = "canonizer.input-required";

pub fn canonizer_rules() -> RulePack {
    RulePack::new()
        .with_rule(DeclaredPair::new(UNDECLARED_MAPPING))
        .with_rule(RequiredSourceSetting::new(INPUT_REQUIRED, "input"))
}
