use crate::modules::predictor::CachePerformance;

use super::direction::Direction;
use super::elevator_state::ElevatorState;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct CacheStatus {
    pub cache_performance: CachePerformance,
    pub most_frequent_floors: Vec<(u8, u64)>,
    pub predicted_next_floor: Option<u8>,
}

/// Point-in-time view of a scheduler.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct ElevatorStatus {
    pub current_floor: u8,
    pub state: ElevatorState,
    pub direction: Direction,
    pub pending_requests: Vec<u8>,
    pub up_queue: Vec<u8>,
    /// Highest floor first.
    pub down_queue: Vec<u8>,
    pub total_movements: u64,
    pub energy_saved: f64,
    pub cache: Option<CacheStatus>,
}
