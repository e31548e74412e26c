// THEORY:
// A `Region` is a maximal patch of the sensing field that shares one exact
// set of covering nodes. Regions are the unit the coverage oracle reasons
// about: once the grid's pixels are merged into regions, evaluating a sleep
// candidate no longer depends on the grid resolution at all. Like the other
// leaf data types in this crate, `Region` is a "dumb" container; all the
// merging intelligence lives in the `RegionsConverter`.

use crate::core_modules::grid::NodeId;

/// A maximal area segment owned by one exact set of covering nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    /// Accumulated area in square meters, always ≥ 0.
    pub area: f64,
    /// The covering node ids, sorted ascending, never empty. Two regions in
    /// the same snapshot never share the same owner set.
    pub owners: Vec<NodeId>,
}

impl Region {
    pub fn new(area: f64, owners: Vec<NodeId>) -> Self {
        Self { area, owners }
    }

    /// A region covered by exactly one node. Exclusive regions move into the
    /// per-node exclusive table during extraction; the rest stay in the
    /// overlap list.
    pub fn is_exclusive(&self) -> bool {
        self.owners.len() == 1
    }
}
