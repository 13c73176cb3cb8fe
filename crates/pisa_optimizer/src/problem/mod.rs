pub mod coverage_index;
pub mod coverage_problem;
pub mod demand;
pub mod facility;
