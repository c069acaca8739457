#![forbid(unsafe_code)]

/// A `(characteristic, value)` cell that ends at least one root path.
///
/// Both fields are positions into the slice the arena was built from, so a cell resolves
/// back to its source entry without cloning strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct LeafCell {
    pub characteristic: usize,
    pub value: usize,
}
