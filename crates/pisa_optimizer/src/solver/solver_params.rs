use jiff::SignedDuration;

#[derive(Clone, Debug)]
pub struct SolverParams {
    /// Relative MIP gap at which a solve stops.
    pub optimality_gap: f64,

    /// Soft wall clock limit of a single solve. The incumbent found when it
    /// runs out is accepted.
    pub max_time_per_solve: SignedDuration,

    /// Forwards the backend's own log output.
    pub trace: bool,

    /// Penalizes every open facility with `1 / (max_budget + 1)` so that the
    /// smallest of several equal coverage solutions is chosen.
    pub parsimonious: bool,

    pub threads: Threads,

    /// Recompute every record from the coverage index before it is accepted.
    pub verify: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Threads {
    Single,
    Auto,
    Multi(usize),
}

impl Threads {
    pub fn number_of_threads(&self) -> usize {
        match self {
            Threads::Single => 1,
            Threads::Multi(num) => *num,
            Threads::Auto => std::thread::available_parallelism().map_or(1, |n| n.get()),
        }
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            optimality_gap: 0.001,
            max_time_per_solve: SignedDuration::from_mins(5),
            trace: false,
            parsimonious: false,
            threads: Threads::Auto,
            verify: true,
        }
    }
}

impl SolverParams {
    pub fn time_limit_seconds(&self) -> f64 {
        self.max_time_per_solve.as_secs_f64().max(0.0)
    }
}
