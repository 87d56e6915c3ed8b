use chrono::{Datelike, NaiveDateTime, Timelike};

/// One admitted request, as remembered by the predictor.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct UsageObservation {
    pub origin_floor: u8,
    pub destination_floor: u8,
    pub requester_id: Option<String>,
    pub timestamp: NaiveDateTime,
    pub hour_of_day: u8,
    /// Monday = 0.
    pub day_of_week: u8,
}

impl UsageObservation {
    pub fn new(
        origin_floor: u8,
        destination_floor: u8,
        requester_id: Option<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        UsageObservation {
            origin_floor: origin_floor,
            destination_floor: destination_floor,
            requester_id: requester_id,
            timestamp: timestamp,
            hour_of_day: timestamp.hour() as u8,
            day_of_week: timestamp.weekday().num_days_from_monday() as u8,
        }
    }
}
