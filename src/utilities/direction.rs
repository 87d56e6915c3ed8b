#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Down,
    Idle,
    Up,
}

impl Direction {
    pub fn as_string(self) -> String {
        match self {
            Direction::Down => String::from("down"),
            Direction::Idle => String::from("idle"),
            Direction::Up => String::from("up"),
        }
    }

    /// Direction of travel needed to get from `from` to `to`.
    pub fn between(from: u8, to: u8) -> Self {
        if to > from {
            Direction::Up
        } else if to < from {
            Direction::Down
        } else {
            Direction::Idle
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn between_follows_sign_of_travel() {
        assert_eq!(Direction::between(1, 4), Direction::Up);
        assert_eq!(Direction::between(4, 1), Direction::Down);
        assert_eq!(Direction::between(3, 3), Direction::Idle);
    }
}
