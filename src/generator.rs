//! Synthetic telemetry generation.
//!
//! Each source performs an independent random walk over the globe: every
//! step picks a speed and a pacing delay, travels `speed * delay` along a
//! random bearing and reports the new position.

use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;
use telemetry_cache::Record;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// One generated record and how long its producer should wait before
/// asking for the next one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Generated {
    pub record: Record,
    pub delay: Duration,
}

/// Pull interface used by producers, one call per production cycle.
pub trait Generator: Send + Sync + 'static {
    fn next(&self, source_id: u32) -> Generated;
}

#[derive(Debug, Clone, Copy)]
struct Position {
    latitude: f64,
    longitude: f64,
}

impl Position {
    fn random(rng: &mut impl Rng) -> Self {
        Self {
            latitude: rng.gen_range(-90.0..90.0),
            longitude: rng.gen_range(-180.0..180.0),
        }
    }

    /// Point reached after travelling `distance_km` along `bearing_deg` on a
    /// great circle.
    fn destination(&self, distance_km: f64, bearing_deg: f64) -> Self {
        let angular = distance_km / EARTH_RADIUS_KM;
        let bearing = bearing_deg.to_radians();
        let lat1 = self.latitude.to_radians();
        let lon1 = self.longitude.to_radians();

        let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
        let lon2 = lon1
            + (bearing.sin() * angular.sin() * lat1.cos())
                .atan2(angular.cos() - lat1.sin() * lat2.sin());

        Self {
            latitude: lat2.to_degrees().clamp(-90.0, 90.0),
            longitude: normalize_longitude(lon2.to_degrees()),
        }
    }
}

fn normalize_longitude(degrees: f64) -> f64 {
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    wrapped.clamp(-180.0, 180.0)
}

/// Random-walk generator with per-source position state.
#[derive(Debug)]
pub struct RandomWalkGenerator {
    max_speed: u32,
    max_time_step: Duration,
    positions: Mutex<HashMap<u32, Position>>,
}

impl RandomWalkGenerator {
    /// `max_speed` and `max_time_step` are exclusive upper bounds and must
    /// be non-zero.
    pub fn new(max_speed: u32, max_time_step: Duration) -> Self {
        Self {
            max_speed,
            max_time_step,
            positions: Mutex::new(HashMap::new()),
        }
    }
}

impl Generator for RandomWalkGenerator {
    fn next(&self, source_id: u32) -> Generated {
        let mut rng = rand::thread_rng();

        let delay = self.max_time_step.mul_f64(rng.gen::<f64>());
        let speed = rng.gen_range(0..self.max_speed.max(1));
        let distance_km = speed as f64 * delay.as_secs_f64() / 3600.0;
        let bearing = rng.gen_range(0.0..360.0);

        let mut positions = self.positions.lock();
        let current = *positions
            .entry(source_id)
            .or_insert_with(|| Position::random(&mut rng));
        let next = current.destination(distance_km, bearing);
        positions.insert(source_id, next);

        Generated {
            record: Record::new(source_id, speed, next.latitude, next.longitude),
            delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_values_in_range() {
        let generator = RandomWalkGenerator::new(100, Duration::from_secs(10));

        for _ in 0..1000 {
            let generated = generator.next(99);
            let data = generated.record;
            assert_eq!(data.source_id, 99);
            assert!(data.speed < 100);
            assert!((-90.0..=90.0).contains(&data.latitude));
            assert!((-180.0..=180.0).contains(&data.longitude));
            assert!(generated.delay < Duration::from_secs(10));
        }
    }

    #[test]
    fn test_walk_is_continuous_per_source() {
        let generator = RandomWalkGenerator::new(180, Duration::from_secs(5));
        let first = generator.next(1).record;
        let second = generator.next(1).record;

        // 180 km/h for under 5 s covers well under a kilometre.
        assert!((first.latitude - second.latitude).abs() < 0.01);
    }

    #[test]
    fn test_destination_due_north() {
        let start = Position {
            latitude: 0.0,
            longitude: 0.0,
        };
        let quarter = std::f64::consts::PI * EARTH_RADIUS_KM / 2.0;
        let pole = start.destination(quarter, 0.0);
        assert!((pole.latitude - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_longitude() {
        assert!((normalize_longitude(190.0) + 170.0).abs() < 1e-9);
        assert!((normalize_longitude(-190.0) - 170.0).abs() < 1e-9);
        assert!((normalize_longitude(45.0) - 45.0).abs() < 1e-9);
    }
}
