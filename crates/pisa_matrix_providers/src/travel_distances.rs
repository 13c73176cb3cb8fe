use std::io::Read;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Distance = f64;

#[derive(Debug, Error)]
pub enum TravelDistanceError {
    #[error("Invalid distance {distance} between demand {demand_id} and facility {facility_id}")]
    InvalidDistance {
        demand_id: usize,
        facility_id: usize,
        distance: Distance,
    },

    #[error(
        "Column lengths differ: {demand_ids} demand ids, {facility_ids} facility ids, {distances} distances"
    )]
    ColumnLengthMismatch {
        demand_ids: usize,
        facility_ids: usize,
        distances: usize,
    },

    #[error("Invalid maximum distance: {0}")]
    InvalidMaxDistance(Distance),

    #[error("Missing coordinates for {kind} {id}")]
    MissingCoordinates { kind: &'static str, id: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// One entry of the pairwise travel distance table: the network distance from a
/// demand point to a facility.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields, rename = "TravelDistanceRow")]
pub struct TravelDistanceRow {
    pub demand_id: usize,
    pub facility_id: usize,
    pub distance: Distance,
}

impl TravelDistanceRow {
    pub fn new(demand_id: usize, facility_id: usize, distance: Distance) -> Self {
        Self {
            demand_id,
            facility_id,
            distance,
        }
    }
}

/// Columnar form of the table, the layout most distance producers dump.
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, Default)]
#[serde(rename = "TravelDistanceColumns")]
pub struct TravelDistanceColumns {
    pub demand_ids: Vec<usize>,
    pub facility_ids: Vec<usize>,
    pub distances: Vec<Distance>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TravelDistanceFile {
    Rows(Vec<TravelDistanceRow>),
    Columns(TravelDistanceColumns),
}

/// The raw `(demand, facility, distance)` table. Rows are kept as produced:
/// duplicates and unsorted ids are allowed, consumers deduplicate.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct TravelDistanceTable {
    rows: Vec<TravelDistanceRow>,
}

impl TravelDistanceTable {
    pub fn new(rows: Vec<TravelDistanceRow>) -> Self {
        Self { rows }
    }

    pub fn from_columns(columns: TravelDistanceColumns) -> Result<Self, TravelDistanceError> {
        let TravelDistanceColumns {
            demand_ids,
            facility_ids,
            distances,
        } = columns;

        if demand_ids.len() != facility_ids.len() || demand_ids.len() != distances.len() {
            return Err(TravelDistanceError::ColumnLengthMismatch {
                demand_ids: demand_ids.len(),
                facility_ids: facility_ids.len(),
                distances: distances.len(),
            });
        }

        let rows = demand_ids
            .into_iter()
            .zip(facility_ids)
            .zip(distances)
            .map(|((demand_id, facility_id), distance)| {
                TravelDistanceRow::new(demand_id, facility_id, distance)
            })
            .collect();

        Ok(Self { rows })
    }

    /// Reads a JSON table, either an array of rows or the columnar layout.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TravelDistanceError> {
        let table = match serde_json::from_reader(reader)? {
            TravelDistanceFile::Rows(rows) => Self::new(rows),
            TravelDistanceFile::Columns(columns) => Self::from_columns(columns)?,
        };

        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<(), TravelDistanceError> {
        match self
            .rows
            .iter()
            .find(|row| row.distance.is_nan() || row.distance < 0.0)
        {
            Some(row) => Err(TravelDistanceError::InvalidDistance {
                demand_id: row.demand_id,
                facility_id: row.facility_id,
                distance: row.distance,
            }),
            None => Ok(()),
        }
    }

    pub fn rows(&self) -> &[TravelDistanceRow] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &TravelDistanceRow> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn max_distance(&self) -> Distance {
        self.rows
            .iter()
            .map(|row| row.distance)
            .fold(0.0, f64::max)
    }
}

impl FromIterator<TravelDistanceRow> for TravelDistanceTable {
    fn from_iter<T: IntoIterator<Item = TravelDistanceRow>>(iter: T) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
