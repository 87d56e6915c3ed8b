/// ----- PREDICTOR MODULE -----
/// Learns from admitted requests and answers two questions for the
/// dispatcher: which floor is likely to be requested next, and where the car
/// should wait while there is nothing to do. Also keeps the hit/miss and
/// prediction counters reported in status.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{NaiveDateTime, Timelike};
use log::debug;

use crate::utilities::clock::{Clock, SystemClock};
use crate::utilities::observation::UsageObservation;

const HOURLY_WEIGHT: f64 = 0.4;
const FREQUENCY_WEIGHT: f64 = 0.3;
const PAIR_WEIGHT: f64 = 0.2;
const TREND_WEIGHT: f64 = 0.1;
const TREND_WINDOW: usize = 20;

pub const DEFAULT_MAX_HISTORY: usize = 1000;

type FloorCounts = BTreeMap<u8, u64>;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PredictorMetrics {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub predictions_made: u64,
    pub predictions_correct: u64,
    pub energy_saved: f64,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct CachePerformance {
    pub hit_rate: f64,
    pub prediction_accuracy: f64,
    pub total_requests_cached: usize,
    pub unique_floors_seen: usize,
    pub most_frequent_floor: Option<u8>,
}

/// Key-value view of the learned tables for an external store.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct CacheSnapshot {
    pub floor_frequency: FloorCounts,
    /// Keyed `"origin-destination"`.
    pub floor_pair_frequency: BTreeMap<String, u64>,
    pub hourly_patterns: BTreeMap<u8, FloorCounts>,
    pub cache_performance: CachePerformance,
}

#[derive(Debug, Clone)]
pub struct UsagePredictor {
    max_history: usize,
    floor_frequency: FloorCounts,
    floor_pair_frequency: BTreeMap<(u8, u8), u64>,
    hourly_patterns: BTreeMap<u8, FloorCounts>,
    daily_patterns: BTreeMap<u8, FloorCounts>,
    requester_patterns: HashMap<String, FloorCounts>,
    recent_requests: VecDeque<UsageObservation>,
    idle_position_stats: FloorCounts,
    metrics: PredictorMetrics,
}

impl Default for UsagePredictor {
    fn default() -> Self {
        UsagePredictor::new(DEFAULT_MAX_HISTORY)
    }
}

impl UsagePredictor {
    pub fn new(max_history: usize) -> Self {
        UsagePredictor {
            max_history: max_history.max(1),
            floor_frequency: BTreeMap::new(),
            floor_pair_frequency: BTreeMap::new(),
            hourly_patterns: BTreeMap::new(),
            daily_patterns: BTreeMap::new(),
            requester_patterns: HashMap::new(),
            recent_requests: VecDeque::new(),
            idle_position_stats: BTreeMap::new(),
            metrics: PredictorMetrics::default(),
        }
    }

    /// Records a trip. `timestamp` defaults to the current local time.
    pub fn record_observation(
        &mut self,
        origin: u8,
        destination: u8,
        requester_id: Option<&str>,
        timestamp: Option<NaiveDateTime>,
    ) {
        let timestamp = timestamp.unwrap_or_else(|| SystemClock.now());
        let observation = UsageObservation::new(
            origin,
            destination,
            requester_id.map(String::from),
            timestamp,
        );

        *self.floor_frequency.entry(destination).or_insert(0) += 1;
        if origin != destination {
            *self.floor_pair_frequency.entry((origin, destination)).or_insert(0) += 1;
        }
        *self.hourly_patterns
            .entry(observation.hour_of_day)
            .or_default()
            .entry(destination)
            .or_insert(0) += 1;
        *self.daily_patterns
            .entry(observation.day_of_week)
            .or_default()
            .entry(destination)
            .or_insert(0) += 1;
        if let Some(id) = requester_id {
            *self.requester_patterns
                .entry(id.to_string())
                .or_default()
                .entry(destination)
                .or_insert(0) += 1;
        }

        self.recent_requests.push_back(observation);
        while self.recent_requests.len() > self.max_history {
            self.recent_requests.pop_front();
        }
        debug!("recorded trip {} -> {}", origin, destination);
    }

    /// Destination floors by request count, most requested first. Equal
    /// counts are ordered by floor number.
    pub fn most_frequent_floors(&self, limit: usize) -> Vec<(u8, u64)> {
        let mut floors: Vec<(u8, u64)> = self.floor_frequency.iter().map(|(f, c)| (*f, *c)).collect();
        floors.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        floors.truncate(limit);
        floors
    }

    /// Predicts the next requested floor and counts the prediction.
    pub fn predict_next_floor(&mut self, current_floor: u8, at: Option<NaiveDateTime>) -> Option<u8> {
        self.metrics.predictions_made += 1;
        let at = at.unwrap_or_else(|| SystemClock.now());
        self.peek_next_floor(current_floor, at)
    }

    /// Weighted score over every floor seen so far:
    /// hour-of-day match 0.4, overall frequency 0.3, transitions out of
    /// `current_floor` 0.2, share of the last 20 destinations 0.1. Each
    /// factor is normalised by its own maximum. Equal scores resolve to the
    /// lowest floor. Does not touch the counters.
    pub fn peek_next_floor(&self, current_floor: u8, at: NaiveDateTime) -> Option<u8> {
        let mut floor_scores: BTreeMap<u8, f64> = BTreeMap::new();

        if let Some(hourly) = self.hourly_patterns.get(&(at.hour() as u8)) {
            add_normalised(&mut floor_scores, hourly.iter(), HOURLY_WEIGHT);
        }

        add_normalised(&mut floor_scores, self.floor_frequency.iter(), FREQUENCY_WEIGHT);

        if let Some(max_pair_count) = self.floor_pair_frequency.values().max().copied() {
            for ((from, to), count) in &self.floor_pair_frequency {
                if *from == current_floor {
                    *floor_scores.entry(*to).or_insert(0.0) +=
                        (*count as f64 / max_pair_count as f64) * PAIR_WEIGHT;
                }
            }
        }

        let recent: Vec<u8> = self.recent_requests
            .iter()
            .rev()
            .take(TREND_WINDOW)
            .map(|observation| observation.destination_floor)
            .collect();
        if !recent.is_empty() {
            let mut recent_counts = FloorCounts::new();
            for floor in &recent {
                *recent_counts.entry(*floor).or_insert(0) += 1;
            }
            for (floor, count) in recent_counts {
                *floor_scores.entry(floor).or_insert(0.0) +=
                    (count as f64 / recent.len() as f64) * TREND_WEIGHT;
            }
        }

        let mut best: Option<(u8, f64)> = None;
        for (floor, score) in floor_scores {
            match best {
                Some((_, best_score)) if score <= best_score => (),
                _ => best = Some((floor, score)),
            }
        }
        best.map(|(floor, _)| floor)
    }

    /// Where to wait while idle: the floor the car has come to rest at most
    /// often, else the most requested floor, else the lobby.
    pub fn optimal_idle_position(&self) -> u8 {
        most_counted(&self.idle_position_stats)
            .or_else(|| most_counted(&self.floor_frequency))
            .unwrap_or(1)
    }

    pub fn update_idle_position(&mut self, floor: u8) {
        *self.idle_position_stats.entry(floor).or_insert(0) += 1;
    }

    pub fn validate_prediction(&mut self, predicted: u8, actual: u8) {
        if predicted == actual {
            self.metrics.predictions_correct += 1;
        }
    }

    pub fn record_hit(&mut self) {
        self.metrics.cache_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.metrics.cache_misses += 1;
    }

    pub fn record_energy_saved(&mut self, amount: f64) {
        self.metrics.energy_saved += amount;
    }

    pub fn cache_performance(&self) -> CachePerformance {
        let metrics = &self.metrics;
        CachePerformance {
            hit_rate: metrics.cache_hits as f64 / (metrics.cache_hits + metrics.cache_misses).max(1) as f64,
            prediction_accuracy: metrics.predictions_correct as f64 / metrics.predictions_made.max(1) as f64,
            total_requests_cached: self.recent_requests.len(),
            unique_floors_seen: self.floor_frequency.len(),
            most_frequent_floor: most_counted(&self.floor_frequency),
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            floor_frequency: self.floor_frequency.clone(),
            floor_pair_frequency: self.floor_pair_frequency
                .iter()
                .map(|((from, to), count)| (format!("{}-{}", from, to), *count))
                .collect(),
            hourly_patterns: self.hourly_patterns.clone(),
            cache_performance: self.cache_performance(),
        }
    }

    /// Forgets everything learned, counters included.
    pub fn reset(&mut self) {
        *self = UsagePredictor::new(self.max_history);
    }

    pub fn metrics(&self) -> &PredictorMetrics {
        &self.metrics
    }

    pub fn floor_frequency(&self, floor: u8) -> u64 {
        self.floor_frequency.get(&floor).copied().unwrap_or(0)
    }

    pub fn pair_frequency(&self, origin: u8, destination: u8) -> u64 {
        self.floor_pair_frequency.get(&(origin, destination)).copied().unwrap_or(0)
    }

    pub fn hourly_frequency(&self, hour: u8, floor: u8) -> u64 {
        nested_count(self.hourly_patterns.get(&hour), floor)
    }

    /// `day` counts from Monday = 0.
    pub fn daily_frequency(&self, day: u8, floor: u8) -> u64 {
        nested_count(self.daily_patterns.get(&day), floor)
    }

    pub fn requester_frequency(&self, requester_id: &str, floor: u8) -> u64 {
        nested_count(self.requester_patterns.get(requester_id), floor)
    }

    pub fn idle_position_count(&self, floor: u8) -> u64 {
        self.idle_position_stats.get(&floor).copied().unwrap_or(0)
    }

    pub fn recent_requests(&self) -> impl Iterator<Item = &UsageObservation> {
        self.recent_requests.iter()
    }

    pub fn history_len(&self) -> usize {
        self.recent_requests.len()
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }
}

fn add_normalised<'a>(
    floor_scores: &mut BTreeMap<u8, f64>,
    counts: impl Iterator<Item = (&'a u8, &'a u64)> + Clone,
    weight: f64,
) {
    let max_count = match counts.clone().map(|(_, count)| *count).max() {
        Some(max) if max > 0 => max,
        _ => return,
    };
    for (floor, count) in counts {
        *floor_scores.entry(*floor).or_insert(0.0) += (*count as f64 / max_count as f64) * weight;
    }
}

/// Highest count, lowest floor on ties.
fn most_counted(counts: &FloorCounts) -> Option<u8> {
    let mut best: Option<(u8, u64)> = None;
    for (floor, count) in counts {
        match best {
            Some((_, best_count)) if *count <= best_count => (),
            _ => best = Some((*floor, *count)),
        }
    }
    best.map(|(floor, _)| floor)
}

fn nested_count(counts: Option<&FloorCounts>, floor: u8) -> u64 {
    counts.and_then(|c| c.get(&floor)).copied().unwrap_or(0)
}
