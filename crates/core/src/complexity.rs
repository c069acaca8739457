#![forbid(unsafe_code)]

use crate::tree::{CharacteristicArena, leaf_context_count};

pub const DEFAULT_MAX_CHARACTERISTICS: usize = 5;
pub const DEFAULT_MAX_LEAF_CONTEXTS: usize = 25;
pub const DEFAULT_MAX_EXAMPLES: usize = 50;

/// Policy knobs: reaching any one of them flags a method. They are guidance, not derived
/// limits, so callers are expected to override them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComplexityThresholds {
    pub max_characteristics: usize,
    pub max_leaf_contexts: usize,
    pub max_examples: usize,
}

impl Default for ComplexityThresholds {
    fn default() -> Self {
        Self {
            max_characteristics: DEFAULT_MAX_CHARACTERISTICS,
            max_leaf_contexts: DEFAULT_MAX_LEAF_CONTEXTS,
            max_examples: DEFAULT_MAX_EXAMPLES,
        }
    }
}

impl ComplexityThresholds {
    pub fn is_exceeded(&self, metrics: &ComplexityMetrics) -> bool {
        metrics.characteristics >= self.max_characteristics
            || metrics.leaf_contexts >= self.max_leaf_contexts
            || metrics.estimated_examples >= self.max_examples
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComplexityMetrics {
    pub characteristics: usize,
    pub leaf_contexts: usize,
    pub side_effects: usize,
    pub estimated_examples: usize,
}

/// `characteristic_count` is the raw length of the method's list, which can be larger than
/// the arena's slice when malformed entries were filtered out before the build.
pub fn estimate(
    arena: &CharacteristicArena<'_>,
    characteristic_count: usize,
    side_effects: usize,
) -> ComplexityMetrics {
    let leaf_contexts = leaf_context_count(arena);
    ComplexityMetrics {
        characteristics: characteristic_count,
        leaf_contexts,
        side_effects,
        estimated_examples: leaf_contexts.saturating_mul(side_effects.saturating_add(1)),
    }
}
