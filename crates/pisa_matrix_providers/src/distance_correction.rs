use fxhash::FxHashMap;
use geo::{Distance as _, Euclidean, Point};

use crate::travel_distances::{Distance, TravelDistanceError, TravelDistanceRow, TravelDistanceTable};

/// Policy applied to a distance table before it reaches the optimizer.
///
/// Road networks are coarse around the origin: a household a few meters from a
/// clinic can be snapped to a node far away. Producers plug a policy here
/// instead of baking thresholds into the distance computation.
pub trait DistanceCorrection {
    fn correct(&self, row: &TravelDistanceRow) -> Result<Distance, TravelDistanceError>;
}

pub struct NoCorrection;

impl DistanceCorrection for NoCorrection {
    fn correct(&self, row: &TravelDistanceRow) -> Result<Distance, TravelDistanceError> {
        Ok(row.distance)
    }
}

/// Replaces the network distance by the straight-line distance whenever the
/// straight line is shorter than `cutoff`.
pub struct StraightLineBelow {
    cutoff: Distance,
    demands: FxHashMap<usize, Point>,
    facilities: FxHashMap<usize, Point>,
}

impl StraightLineBelow {
    pub fn new(
        cutoff: Distance,
        demands: impl IntoIterator<Item = (usize, [f64; 2])>,
        facilities: impl IntoIterator<Item = (usize, [f64; 2])>,
    ) -> Result<Self, TravelDistanceError> {
        if !cutoff.is_finite() || cutoff < 0.0 {
            return Err(TravelDistanceError::InvalidMaxDistance(cutoff));
        }

        Ok(Self {
            cutoff,
            demands: demands
                .into_iter()
                .map(|(id, [x, y])| (id, Point::new(x, y)))
                .collect(),
            facilities: facilities
                .into_iter()
                .map(|(id, [x, y])| (id, Point::new(x, y)))
                .collect(),
        })
    }

    pub fn cutoff(&self) -> Distance {
        self.cutoff
    }
}

impl DistanceCorrection for StraightLineBelow {
    fn correct(&self, row: &TravelDistanceRow) -> Result<Distance, TravelDistanceError> {
        let demand = self.demands.get(&row.demand_id).ok_or(
            TravelDistanceError::MissingCoordinates {
                kind: "demand",
                id: row.demand_id,
            },
        )?;
        let facility = self.facilities.get(&row.facility_id).ok_or(
            TravelDistanceError::MissingCoordinates {
                kind: "facility",
                id: row.facility_id,
            },
        )?;

        let straight_line = Euclidean.distance(*demand, *facility);
        if straight_line < self.cutoff {
            Ok(straight_line)
        } else {
            Ok(row.distance)
        }
    }
}

/// Builds a corrected copy of `table`.
pub fn apply_correction<C>(
    table: &TravelDistanceTable,
    correction: &C,
) -> Result<TravelDistanceTable, TravelDistanceError>
where
    C: DistanceCorrection + ?Sized,
{
    table
        .iter()
        .map(|row| {
            correction
                .correct(row)
                .map(|distance| TravelDistanceRow { distance, ..*row })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(TravelDistanceTable::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TravelDistanceTable {
        TravelDistanceTable::new(vec![
            TravelDistanceRow::new(0, 0, 900.0),
            TravelDistanceRow::new(1, 0, 2500.0),
        ])
    }

    #[test]
    fn test_no_correction_is_identity() {
        let corrected = apply_correction(&table(), &NoCorrection).unwrap();
        assert_eq!(corrected, table());
    }

    #[test]
    fn test_straight_line_below_cutoff() {
        let policy = StraightLineBelow::new(
            500.0,
            vec![(0, [30.0, 40.0]), (1, [0.0, 2000.0])],
            vec![(0, [0.0, 0.0])],
        )
        .unwrap();

        let input = table();
        let corrected = apply_correction(&input, &policy).unwrap();

        // 3-4-5 triangle, 50 < 500
        assert_eq!(corrected.rows()[0].distance, 50.0);
        assert_eq!(corrected.rows()[1].distance, 2500.0);
        assert_eq!(input.rows()[0].distance, 900.0);
    }

    #[test]
    fn test_straight_line_missing_coordinates() {
        let policy = StraightLineBelow::new(500.0, vec![(0, [0.0, 0.0])], vec![]).unwrap();

        let result = apply_correction(&table(), &policy);

        assert!(matches!(
            result,
            Err(TravelDistanceError::MissingCoordinates {
                kind: "facility",
                id: 0
            })
        ));
    }

    #[test]
    fn test_straight_line_rejects_negative_cutoff() {
        assert!(StraightLineBelow::new(-1.0, vec![], vec![]).is_err());
    }
}
