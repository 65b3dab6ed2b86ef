//! Frame pair acquisition
//!
//! Every sub-frame holds a sensor lease that is returned on drop, so the
//! early returns below give back whatever was already locked.

use tracing::trace;

use crate::capture::frame::{FramePair, StreamType};
use crate::capture::sensor::{FrameArrival, Sensor};
use crate::error::TickError;

/// Acquire the color and depth sub-frames belonging to one arrival.
///
/// Never yields a one-sided pair: if either sub-frame is missing the other is
/// released before returning [`TickError::IncompletePair`].
pub fn acquire_pair<S: Sensor>(
    sensor: &mut S,
    arrival: &FrameArrival,
) -> Result<FramePair, TickError> {
    let bundle = sensor
        .acquire_bundle(arrival)
        .ok_or(TickError::NoFrame)?;

    let color = sensor.acquire_sub_frame(&bundle, StreamType::Color);
    let depth = sensor.acquire_sub_frame(&bundle, StreamType::Depth);
    drop(bundle);

    let (color, depth) = match (color, depth) {
        (Some(color), Some(depth)) => (color, depth),
        (color, depth) => {
            trace!(
                tick = arrival.captured.tick(),
                color = color.is_some(),
                depth = depth.is_some(),
                "dropping incomplete pair"
            );
            return Err(TickError::IncompletePair {
                color: color.is_some(),
                depth: depth.is_some(),
            });
        }
    };

    if color.captured != depth.captured {
        return Err(TickError::Desynchronized {
            color: color.captured,
            depth: depth.captured,
        });
    }

    Ok(FramePair { color, depth })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::synthetic::{SyntheticSensor, TickPlan};
    use crate::SensorConfig;

    fn sensor(schedule: Vec<TickPlan>) -> SyntheticSensor {
        let config = SensorConfig {
            color_width: 8,
            color_height: 4,
            depth_width: 4,
            depth_height: 2,
            fps: 0,
        };
        let mut sensor = SyntheticSensor::new(config).with_schedule(schedule);
        sensor.open().unwrap();
        sensor
    }

    #[test]
    fn full_bundle_yields_pair_from_same_tick() {
        let mut sensor = sensor(vec![TickPlan::FULL]);
        let arrival = sensor.trigger().unwrap();

        let pair = acquire_pair(&mut sensor, &arrival).unwrap();
        assert_eq!(pair.color.captured, arrival.captured);
        assert_eq!(pair.depth.captured, arrival.captured);
        assert_eq!(pair.color.stream, StreamType::Color);
        assert_eq!(pair.depth.stream, StreamType::Depth);
        assert_eq!(sensor.stats().outstanding(), 2);

        pair.release();
        assert_eq!(sensor.stats().outstanding(), 0);
    }

    #[test]
    fn expired_bundle_is_no_frame() {
        let mut sensor = sensor(vec![TickPlan::EXPIRED]);
        let arrival = sensor.trigger().unwrap();

        assert_eq!(
            acquire_pair(&mut sensor, &arrival).unwrap_err(),
            TickError::NoFrame
        );
        assert_eq!(sensor.stats().acquired(), 0);
    }

    #[test]
    fn one_sided_pair_releases_what_was_acquired() {
        let mut sensor = sensor(vec![TickPlan::DEPTH_ONLY, TickPlan::COLOR_ONLY]);

        let arrival = sensor.trigger().unwrap();
        assert_eq!(
            acquire_pair(&mut sensor, &arrival).unwrap_err(),
            TickError::IncompletePair {
                color: false,
                depth: true
            }
        );

        let arrival = sensor.trigger().unwrap();
        assert_eq!(
            acquire_pair(&mut sensor, &arrival).unwrap_err(),
            TickError::IncompletePair {
                color: true,
                depth: false
            }
        );

        assert_eq!(sensor.stats().acquired(), 2);
        assert_eq!(sensor.stats().released(), 2);
    }

    #[test]
    fn mismatched_instants_are_desynchronized() {
        let mut sensor = sensor(vec![TickPlan::DESYNCED]);
        sensor.trigger().unwrap();
        let arrival = sensor.trigger().unwrap();

        match acquire_pair(&mut sensor, &arrival).unwrap_err() {
            TickError::Desynchronized { color, depth } => {
                assert_eq!(color, arrival.captured);
                assert!(depth < color);
            }
            other => panic!("expected Desynchronized, got {other:?}"),
        }
        assert_eq!(sensor.stats().acquired(), 2);
        assert_eq!(sensor.stats().acquired(), sensor.stats().released());
    }

    #[test]
    fn pairs_never_exceed_ticks() {
        let schedule = vec![
            TickPlan::FULL,
            TickPlan::EXPIRED,
            TickPlan::COLOR_ONLY,
            TickPlan::FULL,
            TickPlan::DEPTH_ONLY,
        ];
        let mut sensor = sensor(schedule);

        let mut pairs = 0;
        for _ in 0..50 {
            let arrival = sensor.trigger().unwrap();
            if let Ok(pair) = acquire_pair(&mut sensor, &arrival) {
                assert_eq!(pair.color.captured, pair.depth.captured);
                assert_eq!(pair.captured(), arrival.captured);
                pairs += 1;
            }
        }

        assert_eq!(pairs, 20);
        assert_eq!(sensor.stats().acquired(), sensor.stats().released());
    }
}
