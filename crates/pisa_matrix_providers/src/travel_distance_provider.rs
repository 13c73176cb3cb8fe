use std::{fs::File, io::BufReader, path::PathBuf};

use geo::{Distance as _, Euclidean, Point};
use rstar::{RTree, primitives::GeomWithData};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::travel_distances::{
    Distance, TravelDistanceColumns, TravelDistanceError, TravelDistanceRow, TravelDistanceTable,
};

type IndexedPoint = GeomWithData<[f64; 2], usize>;

#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum TravelDistanceProvider {
    /// JSON file holding either an array of rows or the columnar layout
    File { path: PathBuf },

    Rows { rows: Vec<TravelDistanceRow> },

    Columns(TravelDistanceColumns),

    /// Straight-line distances between planar coordinates. Demand and
    /// facility ids are the positions in their arrays; only pairs closer
    /// than `max_distance` are emitted.
    AsTheCrowFlies {
        demands: Vec<[f64; 2]>,
        facilities: Vec<[f64; 2]>,
        max_distance: Distance,
    },
}

impl TravelDistanceProvider {
    #[instrument(skip_all, level = "debug")]
    pub fn load(&self) -> Result<TravelDistanceTable, TravelDistanceError> {
        let table = match self {
            TravelDistanceProvider::File { path } => {
                debug!("Reading travel distances from {:?}", path);
                let file = File::open(path)?;
                TravelDistanceTable::from_reader(BufReader::new(file))?
            }
            TravelDistanceProvider::Rows { rows } => {
                let table = TravelDistanceTable::new(rows.clone());
                table.validate()?;
                table
            }
            TravelDistanceProvider::Columns(columns) => {
                let table = TravelDistanceTable::from_columns(columns.clone())?;
                table.validate()?;
                table
            }
            TravelDistanceProvider::AsTheCrowFlies {
                demands,
                facilities,
                max_distance,
            } => as_the_crow_flies(demands, facilities, *max_distance)?,
        };

        info!("Loaded {} travel distance rows", table.len());
        Ok(table)
    }
}

pub fn as_the_crow_flies(
    demands: &[[f64; 2]],
    facilities: &[[f64; 2]],
    max_distance: Distance,
) -> Result<TravelDistanceTable, TravelDistanceError> {
    if max_distance.is_nan() || max_distance < 0.0 {
        return Err(TravelDistanceError::InvalidMaxDistance(max_distance));
    }

    let tree: RTree<IndexedPoint> = RTree::bulk_load(
        demands
            .iter()
            .enumerate()
            .map(|(id, point)| IndexedPoint::new(*point, id))
            .collect(),
    );

    let mut rows = Vec::new();
    for (facility_id, facility) in facilities.iter().enumerate() {
        let first = rows.len();
        rows.extend(
            tree.locate_within_distance(*facility, max_distance * max_distance)
                .map(|demand| {
                    let distance =
                        Euclidean.distance(Point::from(*demand.geom()), Point::from(*facility));
                    TravelDistanceRow::new(demand.data, facility_id, distance)
                }),
        );

        // The tree yields neighbours in no particular order
        rows[first..].sort_unstable_by_key(|row| row.demand_id);
    }

    Ok(TravelDistanceTable::new(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_the_crow_flies_keeps_pairs_within_distance() {
        let demands = [[0.0, 0.0], [3.0, 4.0], [10.0, 0.0]];
        let facilities = [[0.0, 0.0], [10.0, 1.0]];

        let table = as_the_crow_flies(&demands, &facilities, 6.0).unwrap();

        assert_eq!(
            table.rows(),
            &[
                TravelDistanceRow::new(0, 0, 0.0),
                TravelDistanceRow::new(1, 0, 5.0),
                TravelDistanceRow::new(2, 1, 1.0),
            ]
        );
    }

    #[test]
    fn test_as_the_crow_flies_agrees_with_straight_line_correction() {
        let demands = [[0.0, 0.0], [1.5, 2.5]];
        let facilities = [[0.7, 0.3]];

        let table = as_the_crow_flies(&demands, &facilities, 10.0).unwrap();
        let correction = crate::distance_correction::StraightLineBelow::new(
            10.0,
            demands.iter().copied().enumerate(),
            facilities.iter().copied().enumerate(),
        )
        .unwrap();
        let network = TravelDistanceTable::new(
            table
                .rows()
                .iter()
                .map(|row| TravelDistanceRow::new(row.demand_id, row.facility_id, 1_000.0))
                .collect(),
        );

        let corrected =
            crate::distance_correction::apply_correction(&network, &correction).unwrap();

        assert_eq!(corrected.rows(), table.rows());
    }

    #[test]
    fn test_as_the_crow_flies_invalid_distance() {
        let result = as_the_crow_flies(&[[0.0, 0.0]], &[[0.0, 0.0]], -1.0);
        assert!(matches!(
            result,
            Err(TravelDistanceError::InvalidMaxDistance(_))
        ));
    }

    #[test]
    fn test_provider_from_json() {
        let json = r#"{"type": "rows", "rows": [{"demand_id": 2, "facility_id": 0, "distance": 4.5}]}"#;
        let provider: TravelDistanceProvider = serde_json::from_str(json).unwrap();

        let table = provider.load().unwrap();

        assert_eq!(table.rows(), &[TravelDistanceRow::new(2, 0, 4.5)]);
    }

    #[test]
    fn test_provider_columns_validates() {
        let provider = TravelDistanceProvider::Columns(TravelDistanceColumns {
            demand_ids: vec![0],
            facility_ids: vec![0],
            distances: vec![-3.0],
        });

        assert!(provider.load().is_err());
    }
}
