use log::debug;
use plexi_core::LinkAddr;

/// Neighbors known to the node, in discovery order.
///
/// The table is filled by neighbor discovery; the resource layer only
/// reads it.
#[derive(Debug, Default, Clone)]
pub struct NeighborTable {
    neighbors: Vec<LinkAddr>,
}

impl NeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `neighbor` was already known.
    pub fn insert(&mut self, neighbor: LinkAddr) -> bool {
        if self.contains(neighbor) {
            return false;
        }
        self.neighbors.push(neighbor);
        debug!("neighbor {neighbor} discovered");
        true
    }

    pub fn remove(&mut self, neighbor: LinkAddr) -> bool {
        let Some(index) = self.neighbors.iter().position(|n| *n == neighbor) else {
            return false;
        };
        self.neighbors.remove(index);
        debug!("neighbor {neighbor} lost");
        true
    }

    pub fn contains(&self, neighbor: LinkAddr) -> bool {
        self.neighbors.contains(&neighbor)
    }

    pub fn iter(&self) -> impl Iterator<Item = LinkAddr> + '_ {
        self.neighbors.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }
}
