// Switch case tables. During lowering each switch statement contributes one
// case map keyed by its literal type; values are handles of provisional
// instructions. The finalizer concretizes the maps by replacing every handle
// with the target's final instruction number. Double keys are stored by bit
// pattern so they can live in a hash map.

//! Abstract and concretized switch case tables.

use std::collections::HashMap;
use std::hash::Hash;

use super::inst::InstId;

/// An `f64` switch key, stored by bit pattern so it is `Eq + Hash`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DoubleKey(u64);

impl DoubleKey {
    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

impl From<f64> for DoubleKey {
    fn from(v: f64) -> Self {
        DoubleKey(v.to_bits())
    }
}

impl std::fmt::Display for DoubleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// One switch statement's dispatch table, in abstract form.
pub type CaseMap<K> = HashMap<K, InstId>;

/// All case maps of one key type, in switch-statement order.
pub type CaseMaps<K> = Vec<CaseMap<K>>;

/// A dispatch table with final instruction numbers.
pub type FinalCaseMap<K> = HashMap<K, usize>;

pub type FinalCaseMaps<K> = Vec<FinalCaseMap<K>>;

/// Replace every instruction reference with its final instruction number.
pub fn concretize_case_tables<K>(
    tables: &CaseMaps<K>,
    num_of: impl Fn(InstId) -> usize,
) -> FinalCaseMaps<K>
where
    K: Clone + Eq + Hash,
{
    tables
        .iter()
        .map(|table| {
            table
                .iter()
                .map(|(key, &target)| (key.clone(), num_of(target)))
                .collect()
        })
        .collect()
}
