#![forbid(unsafe_code)]

pub mod complexity;
pub mod tree;

pub mod model {
    /// One branching factor of a method, reduced to the fields the tree builder keys on.
    ///
    /// `index` is the position in the method's `characteristics[]` array; it stays stable
    /// even when malformed entries are left out of the slice handed to the builder.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct Characteristic {
        pub index: usize,
        pub name: String,
        pub level: u64,
        pub depends_on: Option<String>,
        pub when_parent: Vec<String>,
        pub values: Vec<CharacteristicValue>,
    }

    impl Characteristic {
        pub fn value_position(&self, state: &str) -> Option<usize> {
            self.values.iter().position(|v| v.value == state)
        }
    }

    /// A value cell. `value` holds canonical text, so a YAML `true` and `"true"` are equal.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct CharacteristicValue {
        pub value: String,
        pub terminal: bool,
        pub behavior_id: Option<String>,
    }

    impl CharacteristicValue {
        pub fn bound_behavior(&self) -> Option<&str> {
            self.behavior_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
        }
    }
}
