use super::message::{SpotMap, SpotStatus};

/// The last occupancy snapshot a view has applied.
///
/// Snapshots replace the map wholesale; nothing is merged. The view keeps
/// its data through disconnects, so a dropped channel leaves the last known
/// state on screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OccupancyView {
    spots: SpotMap,
    updates: u64,
}

impl OccupancyView {
    /// Creates an empty view.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current map with `snapshot`.
    pub fn apply(&mut self, snapshot: SpotMap) {
        self.spots = snapshot;
        self.updates += 1;
    }

    /// Status of one spot.
    pub fn get(&self, spot: &str) -> Option<&SpotStatus> {
        self.spots.get(spot)
    }

    /// The whole map.
    pub fn spots(&self) -> &SpotMap {
        &self.spots
    }

    /// Spot ids in sorted order.
    pub fn spot_names(&self) -> Vec<&str> {
        self.spots.keys().map(String::as_str).collect()
    }

    /// Spots with a vehicle in them.
    pub fn occupied_count(&self) -> usize {
        self.spots.values().filter(|s| s.occupied).count()
    }

    /// Spots without one.
    pub fn free_count(&self) -> usize {
        self.spots.len() - self.occupied_count()
    }

    /// Spots currently flagged as violations.
    pub fn violations(&self) -> Vec<&str> {
        self.spots
            .iter()
            .filter(|(_, s)| s.violation)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// How many snapshots have been applied.
    pub fn updates(&self) -> u64 {
        self.updates
    }

    /// True before the first snapshot (or after an empty one).
    pub fn is_empty(&self) -> bool {
        self.spots.is_empty()
    }
}
