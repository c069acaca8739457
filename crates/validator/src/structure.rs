#![forbid(unsafe_code)]

use crate::methods::MethodView;
use crate::schema::{Diagnostics, FindingKind};
use mv_core::model::Characteristic;
use mv_core::tree::{CharacteristicArena, reachable_characteristics};
use std::collections::BTreeSet;

fn char_label(method: &MethodView<'_>, characteristic: &Characteristic) -> String {
    format!(
        "methods[{}].characteristics[{}] ({})",
        method.index, characteristic.index, characteristic.name
    )
}

/// Checks `level`/`depends_on`/`when_parent` wiring and returns the method's arena.
///
/// Returns `None` when the characteristic list is malformed; the schema pass has already
/// reported why.
pub(crate) fn check_structure<'m>(
    method: &'m MethodView<'_>,
    diags: &mut Diagnostics,
) -> Option<CharacteristicArena<'m>> {
    if !method.tree_ready {
        return None;
    }
    let chars = method.characteristics.as_slice();
    let arena = CharacteristicArena::build(chars);
    let mut explained = BTreeSet::new();

    for (pos, characteristic) in chars.iter().enumerate() {
        let label = char_label(method, characteristic);
        let mut problems = Vec::new();
        match characteristic.depends_on.as_deref() {
            None => {
                if characteristic.level != 1 {
                    problems.push(format!(
                        "{label} has depends_on: null but level {}; root characteristics sit at level 1",
                        characteristic.level
                    ));
                }
                if !characteristic.when_parent.is_empty() {
                    problems.push(format!(
                        "{label} is a root characteristic and must not declare when_parent"
                    ));
                }
            }
            Some(parent_name) if parent_name == characteristic.name => {
                problems.push(format!("{label} depends on itself"));
            }
            Some(parent_name) => match arena.position_of(parent_name).and_then(|p| arena.get(p)) {
                None => problems.push(format!(
                    "{label} depends_on `{parent_name}`, which is not a characteristic of method {}",
                    method.display_name()
                )),
                Some(parent) => {
                    let expected = parent.level.saturating_add(1);
                    if characteristic.level != expected {
                        problems.push(format!(
                            "{label} has level {} but its parent `{parent_name}` is level {}; expected level {expected}",
                            characteristic.level, parent.level
                        ));
                    }
                    if characteristic.when_parent.is_empty() {
                        problems.push(format!(
                            "{label} depends_on `{parent_name}` but lists no when_parent states"
                        ));
                    }
                    for state in &characteristic.when_parent {
                        match parent.value_position(state) {
                            None => problems.push(format!(
                                "{label} when_parent value `{state}` is not a value of `{parent_name}`"
                            )),
                            Some(value_pos) if parent.values[value_pos].terminal => {
                                problems.push(format!(
                                    "{label} when_parent value `{state}` is terminal in `{parent_name}`; nothing can branch under it"
                                ))
                            }
                            Some(_) => {}
                        }
                    }
                }
            },
        }
        if !problems.is_empty() {
            explained.insert(pos);
        }
        for problem in problems {
            diags.error(FindingKind::Structural, problem);
        }
    }

    let reachable = reachable_characteristics(&arena);
    for (pos, characteristic) in chars.iter().enumerate() {
        if reachable.contains(&pos) || has_explained_ancestor(&arena, pos, &explained) {
            continue;
        }
        diags.error(
            FindingKind::Structural,
            format!(
                "{} is unreachable: no root path activates it",
                char_label(method, characteristic)
            ),
        );
    }

    Some(arena)
}

/// True when `pos` or one of its `depends_on` ancestors already carries a specific error.
fn has_explained_ancestor(
    arena: &CharacteristicArena<'_>,
    pos: usize,
    explained: &BTreeSet<usize>,
) -> bool {
    let mut current = Some(pos);
    let mut hops = 0usize;
    while let Some(at) = current {
        if explained.contains(&at) {
            return true;
        }
        hops += 1;
        if hops > arena.characteristics().len() {
            return false;
        }
        current = arena
            .get(at)
            .and_then(|c| c.depends_on.as_deref())
            .and_then(|parent| arena.position_of(parent));
    }
    false
}
