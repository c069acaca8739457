#![forbid(unsafe_code)]

use crate::model::Characteristic;
use std::collections::{BTreeSet, HashMap};

/// Index over a method's flat `characteristics[]` list.
///
/// Built in one pass: a `name -> position` map plus an adjacency list keyed by
/// `(parent position, parent value position)`. A child is attached under a parent state
/// only when its `level` is exactly one below the parent's and its `when_parent` names
/// that state, which reproduces the level-by-level scan without re-filtering the list.
///
/// Levels strictly increase along every edge, so the adjacency is acyclic and the walks in
/// `leaves` can run bottom-up by level instead of materializing paths.
#[derive(Clone, Debug)]
pub struct CharacteristicArena<'a> {
    characteristics: &'a [Characteristic],
    by_name: HashMap<&'a str, usize>,
    roots: Vec<usize>,
    children: HashMap<(usize, usize), Vec<usize>>,
}

impl<'a> CharacteristicArena<'a> {
    pub fn build(characteristics: &'a [Characteristic]) -> Self {
        let mut by_name = HashMap::<&'a str, usize>::new();
        for (pos, characteristic) in characteristics.iter().enumerate() {
            // Duplicate names are reported upstream; the first entry owns the name.
            by_name.entry(characteristic.name.as_str()).or_insert(pos);
        }

        let mut roots = Vec::new();
        let mut children = HashMap::<(usize, usize), Vec<usize>>::new();
        for (pos, characteristic) in characteristics.iter().enumerate() {
            let Some(parent_name) = characteristic.depends_on.as_deref() else {
                if characteristic.level == 1 {
                    roots.push(pos);
                }
                continue;
            };
            let Some(&parent) = by_name.get(parent_name) else {
                continue;
            };
            let parent_char = &characteristics[parent];
            if parent_char.level.checked_add(1) != Some(characteristic.level) {
                continue;
            }
            let mut states = BTreeSet::new();
            for state in &characteristic.when_parent {
                if let Some(value_pos) = parent_char.value_position(state)
                    && states.insert(value_pos)
                {
                    children.entry((parent, value_pos)).or_default().push(pos);
                }
            }
        }

        Self {
            characteristics,
            by_name,
            roots,
            children,
        }
    }

    pub fn characteristics(&self) -> &'a [Characteristic] {
        self.characteristics
    }

    pub fn get(&self, pos: usize) -> Option<&'a Characteristic> {
        self.characteristics.get(pos)
    }

    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Characteristics active under `value_pos` of `parent`, in list order.
    pub fn children_of(&self, parent: usize, value_pos: usize) -> &[usize] {
        self.children
            .get(&(parent, value_pos))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when nothing branches under `value_pos`: the value is terminal, or no active
    /// child characteristic has any values to offer.
    pub fn is_leaf(&self, pos: usize, value_pos: usize) -> bool {
        let Some(value) = self.get(pos).and_then(|c| c.values.get(value_pos)) else {
            return false;
        };
        value.terminal
            || self
                .children_of(pos, value_pos)
                .iter()
                .all(|&child| self.characteristics[child].values.is_empty())
    }
}
