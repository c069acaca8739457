#![forbid(unsafe_code)]

use super::{CharacteristicArena, LeafCell};
use std::collections::BTreeSet;

/// Characteristics some root path activates. Nothing is active under a terminal value.
pub fn reachable_characteristics(arena: &CharacteristicArena<'_>) -> BTreeSet<usize> {
    let mut seen = BTreeSet::new();
    let mut stack = arena.roots().to_vec();
    while let Some(pos) = stack.pop() {
        if !seen.insert(pos) {
            continue;
        }
        let Some(characteristic) = arena.get(pos) else {
            continue;
        };
        for (value_pos, value) in characteristic.values.iter().enumerate() {
            if value.terminal {
                continue;
            }
            stack.extend(
                arena
                    .children_of(pos, value_pos)
                    .iter()
                    .copied()
                    .filter(|child| !seen.contains(child)),
            );
        }
    }
    seen
}

/// Leaf cells of every reachable characteristic, in list order.
///
/// A cell reached through several parent states is listed once: it is one entry in the
/// document, whatever number of context blocks it ends.
pub fn leaf_cells(arena: &CharacteristicArena<'_>) -> Vec<LeafCell> {
    let mut out = Vec::new();
    for pos in reachable_characteristics(arena) {
        let Some(characteristic) = arena.get(pos) else {
            continue;
        };
        for value_pos in 0..characteristic.values.len() {
            if arena.is_leaf(pos, value_pos) {
                out.push(LeafCell {
                    characteristic: pos,
                    value: value_pos,
                });
            }
        }
    }
    out
}

/// Number of root-to-leaf paths, i.e. leaf contexts in the generated suite.
///
/// Counted bottom-up by descending level: a leaf value is one path, any other value is the
/// sum of the paths of its active children. Neither the path count nor the chain depth
/// grows the call stack. Saturates at `usize::MAX`.
pub fn leaf_context_count(arena: &CharacteristicArena<'_>) -> usize {
    let characteristics = arena.characteristics();
    let mut order = (0..characteristics.len()).collect::<Vec<_>>();
    order.sort_by(|a, b| characteristics[*b].level.cmp(&characteristics[*a].level));

    // Paths below one activation of each characteristic.
    let mut paths = vec![0usize; characteristics.len()];
    for pos in order {
        let mut total = 0usize;
        for value_pos in 0..characteristics[pos].values.len() {
            let below = if arena.is_leaf(pos, value_pos) {
                1
            } else {
                arena
                    .children_of(pos, value_pos)
                    .iter()
                    .fold(0usize, |acc, &child| acc.saturating_add(paths[child]))
            };
            total = total.saturating_add(below);
        }
        paths[pos] = total;
    }

    arena
        .roots()
        .iter()
        .fold(0usize, |acc, &root| acc.saturating_add(paths[root]))
}
