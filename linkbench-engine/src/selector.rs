//! Maps uniform draws to operation kinds.
//!
//! The operation mix is configured as ten percentages, one per selectable [`OperationKind`]. They
//! are accumulated into thresholds in the fixed order of [`OperationKind::SELECTABLE`], and a draw
//! `r` in `[0, 100)` selects the first kind whose threshold is at least `r`.

use linkbench_types::OperationKind;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum distance of the last cumulative threshold from `100.0`.
const TOTAL_TOLERANCE: f64 = 1e-5;

/// Index of [`OperationKind::GetLinksList`] in [`OperationKind::SELECTABLE`], the last link
/// operation.
const LAST_LINK_OPERATION: usize = 5;

/// Percentages of each operation kind in the request mix.
///
/// The ten values must add up to 100. Node operations default to `0`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OperationMix {
    /// Percentage of link inserts.
    pub add_link: f64,
    /// Percentage of link deletes.
    pub delete_link: f64,
    /// Percentage of link updates.
    pub update_link: f64,
    /// Percentage of link counts.
    pub count_link: f64,
    /// Percentage of multiget link reads.
    pub multiget_link: f64,
    /// Percentage of link-list reads.
    pub get_link_list: f64,
    /// Percentage of node inserts.
    pub add_node: f64,
    /// Percentage of node updates.
    pub update_node: f64,
    /// Percentage of node deletes.
    pub delete_node: f64,
    /// Percentage of node reads.
    pub get_node: f64,
}

impl OperationMix {
    /// Returns the running sums of the percentages, in threshold order.
    pub fn cumulative(&self) -> [f64; 10] {
        let percentages = [
            self.add_link,
            self.delete_link,
            self.update_link,
            self.count_link,
            self.multiget_link,
            self.get_link_list,
            self.add_node,
            self.update_node,
            self.delete_node,
            self.get_node,
        ];

        let mut total = 0.0;
        percentages.map(|pc| {
            total += pc;
            total
        })
    }
}

/// Selects operation kinds from cumulative thresholds.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationSelector {
    thresholds: [f64; 10],
}

impl OperationSelector {
    /// Validates cumulative thresholds, one per kind in [`OperationKind::SELECTABLE`] order.
    ///
    /// Thresholds must be non-decreasing and the last one must be `100` within `1e-5`. Node
    /// operations with non-zero probability require `node_store`.
    pub fn new(thresholds: &[f64], node_store: bool) -> Result<Self, ConfigError> {
        let thresholds: [f64; 10] = thresholds.try_into().map_err(|_| {
            ConfigError::OperationMix(format!(
                "expected 10 cumulative thresholds, got {}",
                thresholds.len()
            ))
        })?;

        if thresholds.iter().any(|t| !t.is_finite()) {
            return Err(ConfigError::OperationMix(
                "thresholds must be finite".to_owned(),
            ));
        }

        if let Some(pos) = thresholds.windows(2).position(|w| w[1] < w[0]) {
            return Err(ConfigError::OperationMix(format!(
                "threshold of {} is below the threshold of {}",
                OperationKind::SELECTABLE[pos + 1],
                OperationKind::SELECTABLE[pos],
            )));
        }

        let total = thresholds[9];
        if (total - 100.0).abs() > TOTAL_TOLERANCE {
            return Err(ConfigError::OperationMix(format!(
                "percentages of request types do not add to 100, only {total}"
            )));
        }

        let selector = Self { thresholds };
        if selector.has_node_operations() && !node_store {
            return Err(ConfigError::MissingNodeStore);
        }

        Ok(selector)
    }

    /// Validates the thresholds of an operation mix.
    pub fn from_mix(mix: &OperationMix, node_store: bool) -> Result<Self, ConfigError> {
        Self::new(&mix.cumulative(), node_store)
    }

    /// Builds a selector from thresholds without validating them.
    #[cfg(test)]
    pub(crate) fn with_thresholds(thresholds: [f64; 10]) -> Self {
        Self { thresholds }
    }

    /// Returns `true` if node operations have a non-zero probability.
    pub fn has_node_operations(&self) -> bool {
        self.thresholds[9] > self.thresholds[LAST_LINK_OPERATION]
    }

    /// Selects the operation kind for a draw in `[0, 100)`.
    ///
    /// Returns [`OperationKind::Unknown`] if the draw exceeds the last threshold, which can only
    /// happen within the tolerance allowed for the total.
    pub fn select(&self, r: f64) -> OperationKind {
        self.thresholds
            .iter()
            .position(|&threshold| r <= threshold)
            .map_or(OperationKind::Unknown, |i| OperationKind::SELECTABLE[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link_mix() -> OperationMix {
        OperationMix {
            add_link: 10.0,
            delete_link: 10.0,
            update_link: 10.0,
            count_link: 10.0,
            multiget_link: 30.0,
            get_link_list: 30.0,
            ..Default::default()
        }
    }

    #[test]
    fn selects_first_matching_threshold() {
        let selector = OperationSelector::from_mix(&link_mix(), false).unwrap();

        assert_eq!(selector.select(0.0), OperationKind::AddLink);
        assert_eq!(selector.select(15.0), OperationKind::DeleteLink);
        assert_eq!(selector.select(65.0), OperationKind::MultigetLink);
        assert_eq!(selector.select(99.999), OperationKind::GetLinksList);
    }

    #[test]
    fn boundary_selects_threshold_kind() {
        let selector = OperationSelector::from_mix(&link_mix(), false).unwrap();

        assert_eq!(selector.select(10.0), OperationKind::AddLink);
        assert_eq!(selector.select(20.0), OperationKind::DeleteLink);
        assert_eq!(selector.select(40.0), OperationKind::CountLink);
        assert_eq!(selector.select(70.0), OperationKind::MultigetLink);
    }

    #[test]
    fn zero_percentages_are_never_selected() {
        let mix = OperationMix {
            add_link: 50.0,
            get_node: 50.0,
            ..Default::default()
        };
        let selector = OperationSelector::from_mix(&mix, true).unwrap();

        for r in [0.0, 25.0, 50.0] {
            assert_eq!(selector.select(r), OperationKind::AddLink);
        }
        for r in [50.001, 75.0, 99.9] {
            assert_eq!(selector.select(r), OperationKind::GetNode);
        }
    }

    #[test]
    fn accepts_total_within_tolerance() {
        let mut thresholds = link_mix().cumulative();
        for t in &mut thresholds[5..] {
            *t = 100.0 - 5e-6;
        }
        assert!(OperationSelector::new(&thresholds, false).is_ok());

        for t in &mut thresholds[5..] {
            *t = 100.0 + 5e-6;
        }
        assert!(OperationSelector::new(&thresholds, false).is_ok());
    }

    #[test]
    fn tiny_node_mass_requires_node_store() {
        let mut thresholds = link_mix().cumulative();
        for t in &mut thresholds[5..] {
            *t = 100.0 - 5e-6;
        }
        thresholds[9] = 100.0 + 5e-6;

        let result = OperationSelector::new(&thresholds, false);
        assert!(matches!(result, Err(ConfigError::MissingNodeStore)));
        assert!(OperationSelector::new(&thresholds, true).is_ok());
    }

    #[test]
    fn rejects_wrong_total() {
        let mut mix = link_mix();
        mix.get_link_list = 20.0;
        let result = OperationSelector::from_mix(&mix, false);
        assert!(matches!(result, Err(ConfigError::OperationMix(_))));

        let mut thresholds = link_mix().cumulative();
        thresholds[9] = 100.0 + 2e-5;
        assert!(OperationSelector::new(&thresholds, false).is_err());
    }

    #[test]
    fn rejects_decreasing_thresholds() {
        let thresholds = [10.0, 5.0, 30.0, 40.0, 70.0, 100.0, 100.0, 100.0, 100.0, 100.0];
        let result = OperationSelector::new(&thresholds, false);
        assert!(matches!(result, Err(ConfigError::OperationMix(_))));
    }

    #[test]
    fn rejects_wrong_threshold_count() {
        let result = OperationSelector::new(&[50.0, 100.0], false);
        assert!(matches!(result, Err(ConfigError::OperationMix(_))));
    }

    #[test]
    fn node_operations_require_node_store() {
        let mix = OperationMix {
            get_link_list: 90.0,
            get_node: 10.0,
            ..Default::default()
        };

        let result = OperationSelector::from_mix(&mix, false);
        assert!(matches!(result, Err(ConfigError::MissingNodeStore)));
        assert!(OperationSelector::from_mix(&mix, true).is_ok());
    }

    #[test]
    fn gap_above_last_threshold_is_unknown() {
        let mut thresholds = link_mix().cumulative();
        for t in &mut thresholds[5..] {
            *t = 100.0 - 5e-6;
        }
        let selector = OperationSelector::new(&thresholds, false).unwrap();

        assert_eq!(selector.select(99.999_999), OperationKind::Unknown);
        assert_eq!(selector.select(99.0), OperationKind::GetLinksList);
    }
}
