use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use clap::{Args, ValueEnum};
use comfy_table::{Table, presets::UTF8_FULL};
use indicatif::{ProgressBar, ProgressStyle};
use pisa_optimizer::{
    json::types::{JsonCoverageProblem, JsonSweepResult},
    problem::coverage_problem::CoverageProblem,
    solver::{
        backend::{
            CoveringBackend, branch_and_bound::BranchAndBoundBackend, highs_backend::HighsBackend,
        },
        solution_record::SolutionRecord,
        solver::{Algorithm, CoverageSolver},
        solver_params::{SolverParams, Threads},
    },
};
use tracing::info;

use crate::{
    file_utils::{read_folder, result_path},
    parsers,
};

#[derive(Args)]
pub struct OptimizeArgs {
    /// Problem file, or a folder of problem files
    #[arg(short, long)]
    input: PathBuf,

    /// Output folder receiving one .result.json file per problem
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Time limit of a single solve (e.g., "30s", "5m", "PT1H30M")
    #[arg(short, long, value_parser = parsers::parse_duration, default_value = "5m")]
    timeout: jiff::SignedDuration,

    /// Relative optimality gap at which a solve stops
    #[arg(short, long, value_parser = parsers::parse_gap, default_value = "0.001")]
    gap: f64,

    /// Solver threads (default: every available core)
    #[arg(short = 'j', long, env = "PISA_THREADS")]
    threads: Option<usize>,

    #[arg(long, value_enum, default_value_t = BackendKind::Highs)]
    backend: BackendKind,

    #[arg(short, long, value_enum, default_value_t = AlgorithmKind::Mip)]
    algorithm: AlgorithmKind,

    /// Prefer the smallest facility set among equal coverage solutions
    #[arg(long)]
    parsimonious: bool,

    /// Forward the backend log
    #[arg(long)]
    trace: bool,

    /// Skip the recomputation of every record from the coverage index
    #[arg(long)]
    no_verify: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendKind {
    Highs,
    Bnb,
}

#[derive(Clone, Copy, ValueEnum)]
enum AlgorithmKind {
    Mip,
    Greedy,
    GreedyLs,
}

impl From<AlgorithmKind> for Algorithm {
    fn from(kind: AlgorithmKind) -> Self {
        match kind {
            AlgorithmKind::Mip => Algorithm::Exact,
            AlgorithmKind::Greedy => Algorithm::Greedy,
            AlgorithmKind::GreedyLs => Algorithm::GreedyLocalSearch,
        }
    }
}

impl OptimizeArgs {
    fn solver_params(&self) -> SolverParams {
        SolverParams {
            optimality_gap: self.gap,
            max_time_per_solve: self.timeout,
            trace: self.trace,
            parsimonious: self.parsimonious,
            threads: match self.threads {
                Some(1) => Threads::Single,
                Some(threads) => Threads::Multi(threads),
                None => Threads::Auto,
            },
            verify: !self.no_verify,
        }
    }
}

pub fn run(args: OptimizeArgs) -> Result<(), anyhow::Error> {
    let paths = if args.input.is_file() {
        vec![args.input.clone()]
    } else {
        read_folder(&args.input)?
    };

    let algorithm = Algorithm::from(args.algorithm);

    for path in paths {
        info!("Optimizing {:?}", path);

        let file = File::open(&path)?;
        let json: JsonCoverageProblem = serde_json::from_reader(BufReader::new(file))?;
        let problem = json.build_problem()?;

        let params = args.solver_params();
        let (backend, records) = match args.backend {
            BackendKind::Highs => sweep::<HighsBackend>(&problem, params, algorithm)?,
            BackendKind::Bnb => sweep::<BranchAndBoundBackend>(&problem, params, algorithm)?,
        };

        println!("{}", summary_table(&records));

        let result = JsonSweepResult::new(&problem, algorithm, backend, records);
        match &args.output {
            Some(output) => write_result(&result_path(output, &path), &result)?,
            None => println!("{}", serde_json::to_string_pretty(&result)?),
        }
    }

    Ok(())
}

fn sweep<B>(
    problem: &CoverageProblem,
    params: SolverParams,
    algorithm: Algorithm,
) -> Result<(&'static str, Vec<SolutionRecord>), anyhow::Error>
where
    B: CoveringBackend + Default,
{
    let backend = B::default().name();

    let bar = ProgressBar::new(problem.num_records() as u64);
    bar.set_style(ProgressStyle::default_bar().template("[{bar:40}] {pos}/{len} {msg}")?);

    let mut solver = CoverageSolver::<B>::new(params)
        .with_algorithm(algorithm)
        .with_pre_covered(problem.pre_covered.iter().copied());

    let progress = bar.clone();
    solver.on_progress(move |record| {
        progress.inc(1);
        progress.set_message(format!(
            "threshold {} budget {}: {:.2}",
            record.threshold(),
            record.budget(),
            record.objective_value()
        ));
    });

    let records = solver.solve_thresholds(
        &problem.table,
        &problem.weights,
        &problem.already_open,
        &problem.thresholds,
        &problem.budgets,
    );

    bar.finish_and_clear();

    Ok((backend, records?))
}

fn summary_table(records: &[SolutionRecord]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Threshold",
        "Budget",
        "Objective",
        "Open",
        "Covered",
        "Gap",
        "Termination",
        "Solving time",
    ]);

    for record in records {
        table.add_row(vec![
            record.threshold().to_string(),
            format!("{} (+{})", record.budget(), record.additional_budget()),
            format!("{:.3}", record.objective_value()),
            record.open_facility_ids().len().to_string(),
            record.covered_demand_ids().len().to_string(),
            record
                .gap()
                .map_or_else(|| String::from("-"), |gap| format!("{:.4}", gap)),
            format!("{:?}", record.termination()),
            format!("{:#}", record.solving_time()),
        ]);
    }

    table
}

fn write_result(path: &Path, result: &JsonSweepResult) -> Result<(), anyhow::Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), result)?;
    info!("Wrote {:?}", path);

    Ok(())
}
