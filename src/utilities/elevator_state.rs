use super::direction::Direction;

#[derive(serde::Serialize, serde::Deserialize, PartialEq, Eq, Debug, Clone, Copy)]
pub enum ElevatorState {
    Idle,
    MovingUp,
    MovingDown,
    DoorOpen,
    PrePositioned,
}

impl ElevatorState {
    pub fn as_string(&self) -> String {
        match self {
            ElevatorState::Idle => String::from("idle"),
            ElevatorState::MovingUp => String::from("movingUp"),
            ElevatorState::MovingDown => String::from("movingDown"),
            ElevatorState::DoorOpen => String::from("doorOpen"),
            ElevatorState::PrePositioned => String::from("prePositioned"),
        }
    }

    /// Moving state for a trip in `direction`. A zero-length trip has no moving state.
    pub fn moving(direction: Direction) -> Option<Self> {
        match direction {
            Direction::Up => Some(ElevatorState::MovingUp),
            Direction::Down => Some(ElevatorState::MovingDown),
            Direction::Idle => None,
        }
    }
}
