use std::path::PathBuf;

use clap::Subcommand;
use pisa_matrix_providers::travel_distance_provider::TravelDistanceProvider;
use pisa_optimizer::{
    json::types::{JsonCoverageProblem, JsonWeights},
    problem::facility::FacilityId,
};
use rand::{Rng, SeedableRng, rngs::SmallRng};

#[derive(Subcommand)]
pub enum GenerateSubcommands {
    JsonSchema {
        /// Output file of the problem schema
        #[arg(long, short = 'o')]
        out: PathBuf,
    },
    /// Random problem over straight-line distances in a square area
    Instance {
        #[arg(long, short = 'o')]
        out: PathBuf,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        #[arg(long, default_value_t = 500)]
        demands: usize,

        #[arg(long, default_value_t = 50)]
        facilities: usize,

        /// Side of the square area
        #[arg(long, default_value_t = 10_000.0)]
        size: f64,

        /// Facilities already open, taken from the first ones
        #[arg(long, default_value_t = 0)]
        already_open: usize,
    },
}

pub fn run(subcommand: GenerateSubcommands) -> Result<(), anyhow::Error> {
    let (out, content) = match subcommand {
        GenerateSubcommands::JsonSchema { out } => {
            let schema = pisa_optimizer::json::schema::generate_json_schema()?;
            (out, schema)
        }
        GenerateSubcommands::Instance {
            out,
            seed,
            demands,
            facilities,
            size,
            already_open,
        } => {
            let problem = random_problem(seed, demands, facilities, size, already_open);
            (out, serde_json::to_string_pretty(&problem)?)
        }
    };

    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(out, content)?;

    Ok(())
}

fn random_problem(
    seed: u64,
    num_demands: usize,
    num_facilities: usize,
    size: f64,
    already_open: usize,
) -> JsonCoverageProblem {
    let mut rng = SmallRng::seed_from_u64(seed);
    let point = |rng: &mut SmallRng| [rng.random_range(0.0..size), rng.random_range(0.0..size)];

    let demands: Vec<[f64; 2]> = (0..num_demands).map(|_| point(&mut rng)).collect();
    let facilities: Vec<[f64; 2]> = (0..num_facilities).map(|_| point(&mut rng)).collect();
    let weights = (0..num_demands)
        .map(|_| rng.random_range(1..=100) as f64)
        .collect();

    let thresholds = vec![size / 20.0, size / 10.0, size / 5.0];
    let budgets = [1, 2, 5, 10]
        .into_iter()
        .filter(|budget| already_open + budget <= num_facilities)
        .collect();

    JsonCoverageProblem {
        id: Some(format!("random-{seed}")),
        distances: TravelDistanceProvider::AsTheCrowFlies {
            demands,
            facilities,
            max_distance: thresholds.iter().copied().fold(0.0, f64::max),
        },
        weights: JsonWeights::Dense(weights),
        already_open: (0..already_open.min(num_facilities))
            .map(FacilityId::new)
            .collect(),
        budgets,
        thresholds,
        pre_covered: Vec::new(),
        correction: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_problem_builds() {
        let problem = random_problem(7, 40, 8, 1000.0, 2).build_problem().unwrap();

        assert_eq!(problem.weights.len(), 40);
        assert_eq!(problem.already_open.len(), 2);
        assert_eq!(problem.budgets, vec![1, 2, 5]);
        assert_eq!(problem.thresholds, vec![50.0, 100.0, 200.0]);
        assert!(problem.table.rows().iter().all(|row| row.distance <= 200.0));
    }
}
