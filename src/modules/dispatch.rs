/// ----- DISPATCH MODULE -----
/// Drives one pass of the scheduler's SCAN loop as an iterator. Each call to
/// `next` advances the car by at most one event, so the caller decides how
/// far to run. Dropping the iterator early leaves the remaining requests
/// queued for the next pass, and a trip cut off before its doors opened is
/// completed first when that pass starts.

use std::fmt;
use std::iter::FusedIterator;

use crate::modules::scheduler::RequestScheduler;
use crate::utilities::direction::Direction;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub enum Step {
    Moving { from: u8, to: u8, direction: Direction },
    DoorOpen { floor: u8 },
    Completed,
    PrePositioned { from: u8, to: u8, energy_saved: f64 },
    NoRequests,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Moving { from, to, .. } => write!(f, "Moving from floor {} to floor {}", from, to),
            Step::DoorOpen { floor } => write!(f, "Arrived at floor {} - Doors open", floor),
            Step::Completed => write!(f, "All requests completed - Elevator idle"),
            Step::PrePositioned { from, to, energy_saved } => write!(
                f,
                "Pre-positioned from floor {} to floor {} (predicted high traffic, energy saved: {:.1})",
                from, to, energy_saved
            ),
            Step::NoRequests => write!(f, "No requests to process"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Start,
    Serving,
    Arriving(u8),
    Done,
}

pub struct Dispatch<'a> {
    scheduler: &'a mut RequestScheduler,
    phase: Phase,
}

impl<'a> Dispatch<'a> {
    pub(crate) fn new(scheduler: &'a mut RequestScheduler) -> Self {
        Dispatch { scheduler: scheduler, phase: Phase::Start }
    }

    /// Runs the pass to the end and returns the human-readable log.
    pub fn describe(self) -> Vec<String> {
        self.map(|step| step.to_string()).collect()
    }
}

impl Iterator for Dispatch<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        match self.phase {
            Phase::Start => {
                if let Some(floor) = self.scheduler.interrupted_arrival() {
                    self.phase = Phase::Serving;
                    return Some(self.scheduler.arrive(floor));
                }
                if !self.scheduler.has_pending() {
                    self.phase = Phase::Done;
                    return Some(self.scheduler.pre_position().unwrap_or(Step::NoRequests));
                }
                self.phase = Phase::Serving;
                self.next()
            },
            Phase::Serving => {
                if self.scheduler.has_pending() {
                    if let Some((from, to, direction)) = self.scheduler.begin_trip() {
                        self.phase = Phase::Arriving(to);
                        return Some(Step::Moving { from: from, to: to, direction: direction });
                    }
                }
                self.phase = Phase::Done;
                Some(self.scheduler.finish())
            },
            Phase::Arriving(floor) => {
                self.phase = Phase::Serving;
                Some(self.scheduler.arrive(floor))
            },
            Phase::Done => None,
        }
    }
}

impl FusedIterator for Dispatch<'_> {}
