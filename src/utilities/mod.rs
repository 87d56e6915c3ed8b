pub mod clock;
pub mod config;
pub mod debug;
pub mod direction;
pub mod elevator_state;
pub mod elevator_status;
pub mod observation;
