pub mod modules;
pub mod utilities;

pub use modules::dispatch::{Dispatch, Step};
pub use modules::predictor::{CachePerformance, CacheSnapshot, UsagePredictor};
pub use modules::scheduler::RequestScheduler;
pub use utilities::clock::{Clock, ManualClock, SystemClock};
pub use utilities::config::{Config, ConfigError, SchedulerSettings};
pub use utilities::direction::Direction;
pub use utilities::elevator_state::ElevatorState;
pub use utilities::elevator_status::{CacheStatus, ElevatorStatus};
