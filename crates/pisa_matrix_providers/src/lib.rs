pub mod distance_correction;
pub mod travel_distance_provider;
pub mod travel_distances;
