//! Coverage accounting for an interpolation run.

use serde::{Deserialize, Serialize};

/// Per-surface cell accounting, exposed for observability.
///
/// Gaps are not fatal: the run continues, the summary records them, and
/// downstream consumers treat the uninterpolated cells as no-data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Every cell of the target grid.
    pub total_cells: usize,
    /// Cells excluded by the province mask.
    pub masked_out: usize,
    /// Cells that received an interpolated value.
    pub interpolated: usize,
    /// Candidate cells with no station inside the search radius.
    pub no_stations_in_range: usize,
    /// Candidate cells skipped because terrain data was missing.
    pub missing_terrain_data: usize,
}

impl CoverageSummary {
    /// Cells that were eligible for interpolation.
    pub fn candidates(&self) -> usize {
        self.total_cells - self.masked_out
    }

    /// True when some candidate cells came up empty.
    pub fn has_gaps(&self) -> bool {
        self.no_stations_in_range > 0 || self.missing_terrain_data > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidates_and_gaps() {
        let summary = CoverageSummary {
            total_cells: 100,
            masked_out: 40,
            interpolated: 55,
            no_stations_in_range: 5,
            missing_terrain_data: 0,
        };
        assert_eq!(summary.candidates(), 60);
        assert!(summary.has_gaps());

        let clean = CoverageSummary {
            total_cells: 10,
            masked_out: 0,
            interpolated: 10,
            no_stations_in_range: 0,
            missing_terrain_data: 0,
        };
        assert!(!clean.has_gaps());
    }

    #[test]
    fn test_serializes_for_observability() {
        let summary = CoverageSummary {
            total_cells: 4,
            masked_out: 1,
            interpolated: 2,
            no_stations_in_range: 1,
            missing_terrain_data: 0,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"no_stations_in_range\":1"));
    }
}
