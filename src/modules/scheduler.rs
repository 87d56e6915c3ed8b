/// ----- SCHEDULER MODULE -----
/// Owns the car: its floor, direction and the two directional queues.
/// Requests above the car go to the up queue (served lowest first), requests
/// below go to the down queue (served highest first). The car finishes one
/// direction before reversing.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use chrono::NaiveDateTime;
use log::{debug, info, warn};

use crate::modules::dispatch::{Dispatch, Step};
use crate::modules::predictor::UsagePredictor;
use crate::utilities::clock::{Clock, SystemClock};
use crate::utilities::config::{ConfigError, SchedulerSettings};
use crate::utilities::direction::Direction;
use crate::utilities::elevator_state::ElevatorState;
use crate::utilities::elevator_status::{CacheStatus, ElevatorStatus};

/// Energy credited per extra pending request when a trip serves a batch.
const BATCHING_BONUS: f64 = 0.1;
/// Share of the repositioning distance credited when there is no prediction.
const BASELINE_SAVING_RATE: f64 = 0.3;
const STATUS_TOP_FLOORS: usize = 5;

pub struct RequestScheduler {
    settings: SchedulerSettings,
    current_floor: u8,
    state: ElevatorState,
    direction: Direction,
    pending_requests: HashSet<u8>,
    up_requests: BinaryHeap<Reverse<u8>>,
    down_requests: BinaryHeap<u8>,
    predictor: Option<UsagePredictor>,
    clock: Box<dyn Clock>,
    last_request_time: NaiveDateTime,
    total_movements: u64,
    /// Floor the car has moved to but not yet opened its doors at.
    arriving: Option<u8>,
}

impl RequestScheduler {
    pub fn new(settings: SchedulerSettings) -> Result<Self, ConfigError> {
        Self::with_clock(settings, Box::new(SystemClock))
    }

    pub fn with_clock(settings: SchedulerSettings, clock: Box<dyn Clock>) -> Result<Self, ConfigError> {
        settings.validate()?;
        let predictor = if settings.enable_caching {
            Some(UsagePredictor::new(settings.max_history))
        } else {
            None
        };
        let now = clock.now();
        Ok(RequestScheduler {
            current_floor: settings.starting_floor,
            settings: settings,
            state: ElevatorState::Idle,
            direction: Direction::Idle,
            pending_requests: HashSet::new(),
            up_requests: BinaryHeap::new(),
            down_requests: BinaryHeap::new(),
            predictor: predictor,
            clock: clock,
            last_request_time: now,
            total_movements: 0,
            arriving: None,
        })
    }

    /// Admits a request for `floor`. Returns false for floors outside the
    /// building. The current floor is accepted without queueing anything.
    /// `origin_floor` overrides where the trip is recorded as starting.
    pub fn admit_request(&mut self, floor: u8, requester_id: Option<&str>, origin_floor: Option<u8>) -> bool {
        if !self.is_valid_floor(floor) {
            return self.reject_floor(floor as u32);
        }

        if floor == self.current_floor {
            if let Some(predictor) = &mut self.predictor {
                predictor.record_hit();
            }
            return true;
        }

        let now = self.clock.now();
        if let Some(predictor) = &mut self.predictor {
            let origin = origin_floor.unwrap_or(self.current_floor);
            predictor.record_observation(origin, floor, requester_id, Some(now));
            predictor.record_hit();
        }
        self.last_request_time = now;

        if self.pending_requests.insert(floor) {
            self.enqueue(floor);
            debug!("queued floor {} (pending: {:?})", floor, self.pending_requests());
        }
        true
    }

    /// Admission for floor numbers that may not even fit a `u8`, as typed
    /// by an operator. Anything outside the building is a rejected request.
    pub fn admit_floor_number(&mut self, floor: u32, requester_id: Option<&str>, origin_floor: Option<u8>) -> bool {
        match u8::try_from(floor) {
            Ok(floor) => self.admit_request(floor, requester_id, origin_floor),
            Err(_) => self.reject_floor(floor),
        }
    }

    pub fn admit_many(&mut self, floors: &[u8]) -> Vec<bool> {
        floors.iter().map(|floor| self.admit_request(*floor, None, None)).collect()
    }

    /// Serves every pending request, yielding one step at a time. With
    /// nothing pending the car may instead be pre-positioned.
    pub fn process_requests(&mut self) -> Dispatch<'_> {
        Dispatch::new(self)
    }

    pub fn clear(&mut self) {
        self.pending_requests.clear();
        self.up_requests.clear();
        self.down_requests.clear();
        self.state = ElevatorState::Idle;
        self.direction = Direction::Idle;
        self.arriving = None;
        info!("cleared all requests");
    }

    pub fn status(&self) -> ElevatorStatus {
        let mut up_queue: Vec<u8> = self.up_requests.iter().map(|Reverse(floor)| *floor).collect();
        up_queue.sort_unstable();
        let mut down_queue: Vec<u8> = self.down_requests.iter().copied().collect();
        down_queue.sort_unstable_by(|a, b| b.cmp(a));

        ElevatorStatus {
            current_floor: self.current_floor,
            state: self.state,
            direction: self.direction,
            pending_requests: self.pending_requests(),
            up_queue: up_queue,
            down_queue: down_queue,
            total_movements: self.total_movements,
            energy_saved: self.energy_saved(),
            cache: self.predictor.as_ref().map(|predictor| CacheStatus {
                cache_performance: predictor.cache_performance(),
                most_frequent_floors: predictor.most_frequent_floors(STATUS_TOP_FLOORS),
                predicted_next_floor: predictor.peek_next_floor(self.current_floor, self.clock.now()),
            }),
        }
    }

    /// Relocates the car without serving anything. Pending floors are
    /// re-sorted against the new position; one equal to it counts as served.
    pub fn set_current_floor(&mut self, floor: u8) -> bool {
        if !self.is_valid_floor(floor) {
            return false;
        }
        self.current_floor = floor;
        self.arriving = None;
        self.pending_requests.remove(&floor);
        self.up_requests.clear();
        self.down_requests.clear();
        let mut pending: Vec<u8> = self.pending_requests.iter().copied().collect();
        pending.sort_unstable();
        for pending_floor in pending {
            self.enqueue(pending_floor);
        }
        if (self.direction == Direction::Up && self.up_requests.is_empty())
            || (self.direction == Direction::Down && self.down_requests.is_empty()) {
            self.direction = Direction::Idle;
        }
        true
    }

    pub fn set_last_request_time(&mut self, instant: NaiveDateTime) {
        self.last_request_time = instant;
    }

    pub fn set_pre_position(&mut self, enabled: bool) {
        self.settings.pre_position = enabled;
    }

    pub fn last_request_time(&self) -> NaiveDateTime {
        self.last_request_time
    }

    pub fn current_floor(&self) -> u8 {
        self.current_floor
    }

    pub fn num_floors(&self) -> u8 {
        self.settings.num_floors
    }

    pub fn state(&self) -> ElevatorState {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pending_requests(&self) -> Vec<u8> {
        let mut pending: Vec<u8> = self.pending_requests.iter().copied().collect();
        pending.sort_unstable();
        pending
    }

    pub fn total_movements(&self) -> u64 {
        self.total_movements
    }

    pub fn energy_saved(&self) -> f64 {
        self.predictor.as_ref().map_or(0.0, |predictor| predictor.metrics().energy_saved)
    }

    pub fn caching_enabled(&self) -> bool {
        self.predictor.is_some()
    }

    pub fn predictor(&self) -> Option<&UsagePredictor> {
        self.predictor.as_ref()
    }

    pub fn predictor_mut(&mut self) -> Option<&mut UsagePredictor> {
        self.predictor.as_mut()
    }

    /// Trip whose doors never opened because the previous pass was dropped.
    pub(crate) fn interrupted_arrival(&self) -> Option<u8> {
        self.arriving
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending_requests.is_empty()
    }

    /// Picks the next stop and moves the car there. Returns the trip, or
    /// None when there is nowhere to go.
    pub(crate) fn begin_trip(&mut self) -> Option<(u8, u8, Direction)> {
        let next_floor = self.next_stop()?;
        if next_floor == self.current_floor {
            return None;
        }

        let from = self.current_floor;
        let travel = Direction::between(from, next_floor);
        if let Some(moving) = ElevatorState::moving(travel) {
            self.state = moving;
        }
        self.total_movements += from.abs_diff(next_floor) as u64;

        let pending = self.pending_requests.len();
        if let Some(predictor) = &mut self.predictor {
            if pending > 1 {
                predictor.record_energy_saved((pending - 1) as f64 * BATCHING_BONUS);
            }
        }

        self.current_floor = next_floor;
        self.pending_requests.remove(&next_floor);
        self.arriving = Some(next_floor);
        debug!("moving {} -> {}", from, next_floor);
        Some((from, next_floor, travel))
    }

    pub(crate) fn arrive(&mut self, floor: u8) -> Step {
        self.state = ElevatorState::DoorOpen;
        self.arriving = None;
        if let Some(predictor) = &mut self.predictor {
            predictor.update_idle_position(floor);
        }
        Step::DoorOpen { floor: floor }
    }

    pub(crate) fn finish(&mut self) -> Step {
        self.state = ElevatorState::Idle;
        self.direction = Direction::Idle;
        Step::Completed
    }

    /// Moves the idle car straight to the predicted high-traffic floor.
    pub(crate) fn pre_position(&mut self) -> Option<Step> {
        if !self.should_pre_position() {
            return None;
        }
        let now = self.clock.now();
        let predictor = self.predictor.as_mut()?;
        let optimal_floor = predictor.optimal_idle_position();
        if optimal_floor == self.current_floor {
            return None;
        }

        let old_floor = self.current_floor;
        let energy_saved = match predictor.predict_next_floor(old_floor, Some(now)) {
            Some(predicted) if predicted != old_floor => {
                let original_distance = old_floor.abs_diff(predicted) as i32;
                let optimal_distance = optimal_floor.abs_diff(predicted) as i32;
                (original_distance - optimal_distance).max(0) as f64
            },
            _ => old_floor.abs_diff(optimal_floor) as f64 * BASELINE_SAVING_RATE,
        };
        predictor.record_energy_saved(energy_saved);

        self.state = ElevatorState::PrePositioned;
        self.current_floor = optimal_floor;
        self.total_movements += old_floor.abs_diff(optimal_floor) as u64;
        info!("pre-positioned {} -> {}, energy saved {:.1}", old_floor, optimal_floor, energy_saved);
        Some(Step::PrePositioned { from: old_floor, to: optimal_floor, energy_saved: energy_saved })
    }

    fn should_pre_position(&self) -> bool {
        if self.predictor.is_none() || !self.settings.pre_position {
            return false;
        }
        let idle_seconds = (self.clock.now() - self.last_request_time).num_seconds();
        idle_seconds > self.settings.idle_threshold_seconds as i64
            && self.state == ElevatorState::Idle
            && self.pending_requests.is_empty()
    }

    fn next_stop(&mut self) -> Option<u8> {
        match self.direction {
            Direction::Up => {
                if let Some(Reverse(floor)) = self.up_requests.pop() {
                    return Some(floor);
                }
            },
            Direction::Down => {
                if let Some(floor) = self.down_requests.pop() {
                    return Some(floor);
                }
            },
            Direction::Idle => (),
        }
        if let Some(Reverse(floor)) = self.up_requests.pop() {
            self.direction = Direction::Up;
            return Some(floor);
        }
        if let Some(floor) = self.down_requests.pop() {
            self.direction = Direction::Down;
            return Some(floor);
        }
        self.direction = Direction::Idle;
        None
    }

    fn enqueue(&mut self, floor: u8) {
        if floor > self.current_floor {
            self.up_requests.push(Reverse(floor));
        } else if floor < self.current_floor {
            self.down_requests.push(floor);
        }
    }

    fn reject_floor(&mut self, floor: u32) -> bool {
        warn!("rejected request for floor {} (building has {} floors)", floor, self.settings.num_floors);
        if let Some(predictor) = &mut self.predictor {
            predictor.record_miss();
        }
        false
    }

    fn is_valid_floor(&self, floor: u8) -> bool {
        1 <= floor && floor <= self.settings.num_floors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    use crate::utilities::clock::ManualClock;

    fn morning() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    fn scheduler(num_floors: u8, starting_floor: u8) -> (RequestScheduler, ManualClock) {
        let clock = ManualClock::new(morning());
        let scheduler = RequestScheduler::with_clock(
            SchedulerSettings::new(num_floors, starting_floor),
            Box::new(clock.clone()),
        ).unwrap();
        (scheduler, clock)
    }

    #[test]
    fn rejects_invalid_settings() {
        assert!(RequestScheduler::new(SchedulerSettings::new(1, 1)).is_err());
        assert!(RequestScheduler::new(SchedulerSettings::new(4, 9)).is_err());
    }

    #[test]
    fn caching_can_be_disabled() {
        let settings = SchedulerSettings { enable_caching: false, ..SchedulerSettings::default() };
        let mut scheduler = RequestScheduler::new(settings).unwrap();
        assert!(!scheduler.caching_enabled());
        assert!(scheduler.admit_request(5, None, None));
        assert!(!scheduler.admit_request(15, None, None));
        assert!(scheduler.status().cache.is_none());
        assert_eq!(scheduler.energy_saved(), 0.0);
    }

    #[test]
    fn sorts_requests_into_directional_queues() {
        let (mut scheduler, _) = scheduler(10, 5);
        scheduler.admit_many(&[8, 2, 6, 1, 9]);
        let status = scheduler.status();
        assert_eq!(status.pending_requests, vec![1, 2, 6, 8, 9]);
        assert_eq!(status.up_queue, vec![6, 8, 9]);
        assert_eq!(status.down_queue, vec![2, 1]);
    }

    #[test]
    fn duplicate_admission_is_idempotent() {
        let (mut scheduler, _) = scheduler(10, 1);
        assert!(scheduler.admit_request(5, None, None));
        assert!(scheduler.admit_request(5, None, None));
        let status = scheduler.status();
        assert_eq!(status.pending_requests, vec![5]);
        assert_eq!(status.up_queue, vec![5]);
        // both requests are still learned from
        assert_eq!(scheduler.predictor().unwrap().floor_frequency(5), 2);
    }

    #[test]
    fn current_floor_request_is_already_satisfied() {
        let (mut scheduler, _) = scheduler(10, 3);
        assert!(scheduler.admit_request(3, None, None));
        assert!(scheduler.pending_requests().is_empty());
        let predictor = scheduler.predictor().unwrap();
        assert_eq!(predictor.metrics().cache_hits, 1);
        assert_eq!(predictor.history_len(), 0);
    }

    #[test]
    fn hit_and_miss_tracking() {
        let (mut scheduler, _) = scheduler(10, 1);
        assert!(scheduler.admit_request(5, None, None));
        assert!(!scheduler.admit_request(15, None, None));
        assert!(!scheduler.admit_request(0, None, None));
        let metrics = scheduler.predictor().unwrap().metrics();
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.cache_misses, 2);
    }

    #[test]
    fn records_trip_with_origin_override() {
        let (mut scheduler, _) = scheduler(10, 3);
        scheduler.admit_request(5, Some("test_user"), Some(1));
        let predictor = scheduler.predictor().unwrap();
        assert_eq!(predictor.floor_frequency(5), 1);
        assert_eq!(predictor.pair_frequency(1, 5), 1);
        assert_eq!(predictor.pair_frequency(3, 5), 0);
        assert_eq!(predictor.requester_frequency("test_user", 5), 1);
    }

    #[test]
    fn admission_refreshes_idle_timer() {
        let (mut scheduler, clock) = scheduler(10, 1);
        clock.advance(Duration::seconds(12));
        scheduler.admit_request(4, None, None);
        assert_eq!(scheduler.last_request_time(), morning() + Duration::seconds(12));
    }

    #[test]
    fn clear_resets_queues_but_not_counters() {
        let (mut scheduler, _) = scheduler(10, 5);
        scheduler.admit_many(&[2, 8]);
        scheduler.clear();
        let status = scheduler.status();
        assert!(status.pending_requests.is_empty());
        assert!(status.up_queue.is_empty());
        assert!(status.down_queue.is_empty());
        assert_eq!(status.state, ElevatorState::Idle);
        assert_eq!(status.direction, Direction::Idle);
        assert_eq!(scheduler.predictor().unwrap().metrics().cache_hits, 2);
    }

    #[test]
    fn relocation_resorts_pending_floors() {
        let (mut scheduler, _) = scheduler(10, 5);
        scheduler.admit_many(&[2, 7, 9]);
        assert!(scheduler.set_current_floor(7));
        let status = scheduler.status();
        assert_eq!(status.pending_requests, vec![2, 9]);
        assert_eq!(status.up_queue, vec![9]);
        assert_eq!(status.down_queue, vec![2]);
        assert!(!scheduler.set_current_floor(11));
    }

    #[test]
    fn movements_and_batching_bonus() {
        let (mut scheduler, _) = scheduler(10, 1);
        scheduler.admit_many(&[5, 8]);
        let steps: Vec<Step> = scheduler.process_requests().collect();
        assert_eq!(steps.len(), 5);
        assert_eq!(scheduler.total_movements(), 7);
        // first trip leaves one request behind
        assert!((scheduler.energy_saved() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn no_pre_positioning_before_threshold() {
        let (mut scheduler, clock) = scheduler(10, 1);
        for _ in 0..10 {
            scheduler.predictor_mut().unwrap().update_idle_position(5);
        }
        clock.advance(Duration::seconds(30));
        let steps: Vec<Step> = scheduler.process_requests().collect();
        assert_eq!(steps, vec![Step::NoRequests]);
        assert_eq!(scheduler.current_floor(), 1);

        clock.advance(Duration::seconds(1));
        let steps: Vec<Step> = scheduler.process_requests().collect();
        assert!(matches!(steps[..], [Step::PrePositioned { from: 1, to: 5, .. }]));
    }

    #[test]
    fn pre_positioning_can_be_switched_off() {
        let (mut scheduler, clock) = scheduler(10, 1);
        scheduler.predictor_mut().unwrap().update_idle_position(5);
        scheduler.set_pre_position(false);
        clock.advance(Duration::seconds(60));
        let steps: Vec<Step> = scheduler.process_requests().collect();
        assert_eq!(steps, vec![Step::NoRequests]);
    }

    #[test]
    fn pre_positioning_credits_distance_to_prediction() {
        let (mut scheduler, clock) = scheduler(10, 1);
        {
            let predictor = scheduler.predictor_mut().unwrap();
            for _ in 0..4 {
                predictor.record_observation(1, 8, None, Some(morning()));
            }
            for _ in 0..3 {
                predictor.update_idle_position(6);
            }
        }
        clock.advance(Duration::seconds(31));
        let steps: Vec<Step> = scheduler.process_requests().collect();
        // predicted 8: 7 floors away from 1, 2 floors away from 6
        assert_eq!(steps, vec![Step::PrePositioned { from: 1, to: 6, energy_saved: 5.0 }]);
        assert_eq!(scheduler.state(), ElevatorState::PrePositioned);
        assert_eq!(scheduler.predictor().unwrap().metrics().predictions_made, 1);
    }

    #[test]
    fn stays_put_when_already_at_idle_position() {
        let (mut scheduler, clock) = scheduler(10, 1);
        clock.advance(Duration::seconds(31));
        let steps: Vec<Step> = scheduler.process_requests().collect();
        assert_eq!(steps, vec![Step::NoRequests]);
        assert_eq!(scheduler.state(), ElevatorState::Idle);
    }

    #[test]
    fn rejects_floor_numbers_beyond_u8() {
        let (mut scheduler, _) = scheduler(10, 1);
        assert!(!scheduler.admit_floor_number(300, None, None));
        assert!(!scheduler.admit_floor_number(11, None, None));
        assert!(scheduler.admit_floor_number(4, Some("alice"), None));
        let metrics = scheduler.predictor().unwrap().metrics();
        assert_eq!(metrics.cache_misses, 2);
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(scheduler.pending_requests(), vec![4]);
    }

    #[test]
    fn pre_positioning_falls_back_to_baseline_when_prediction_is_here() {
        let (mut scheduler, clock) = scheduler(10, 1);
        {
            let predictor = scheduler.predictor_mut().unwrap();
            for _ in 0..5 {
                predictor.record_observation(3, 1, None, Some(morning()));
            }
            for _ in 0..3 {
                predictor.update_idle_position(6);
            }
            assert_eq!(predictor.peek_next_floor(1, morning()), Some(1));
        }
        clock.advance(Duration::seconds(31));
        let steps: Vec<Step> = scheduler.process_requests().collect();
        let saved = match steps[..] {
            [Step::PrePositioned { from: 1, to: 6, energy_saved }] => energy_saved,
            _ => panic!("expected a single pre-positioning step, got {:?}", steps),
        };
        assert!((saved - 1.5).abs() < 1e-9);
        assert!((scheduler.energy_saved() - 1.5).abs() < 1e-9);
        assert!((scheduler.predictor().unwrap().metrics().energy_saved - 1.5).abs() < 1e-9);
    }

    #[test]
    fn pre_positioning_away_from_prediction_saves_nothing() {
        let (mut scheduler, clock) = scheduler(10, 4);
        {
            let predictor = scheduler.predictor_mut().unwrap();
            for _ in 0..5 {
                predictor.record_observation(1, 3, None, Some(morning()));
            }
            for _ in 0..3 {
                predictor.update_idle_position(9);
            }
        }
        clock.advance(Duration::seconds(31));
        let steps: Vec<Step> = scheduler.process_requests().collect();
        // predicted 3: 1 floor from 4, 6 floors from 9
        assert_eq!(steps, vec![Step::PrePositioned { from: 4, to: 9, energy_saved: 0.0 }]);
        assert_eq!(scheduler.predictor().unwrap().metrics().energy_saved, 0.0);
        assert_eq!(scheduler.current_floor(), 9);
    }

    #[test]
    fn status_prediction_is_read_only() {
        let (mut scheduler, _) = scheduler(10, 1);
        for _ in 0..5 {
            scheduler.predictor_mut().unwrap().record_observation(1, 7, None, Some(morning()));
        }
        let status = scheduler.status();
        let cache = status.cache.unwrap();
        assert_eq!(cache.predicted_next_floor, Some(7));
        assert_eq!(cache.most_frequent_floors, vec![(7, 5)]);
        assert_eq!(scheduler.predictor().unwrap().metrics().predictions_made, 0);
    }
}
