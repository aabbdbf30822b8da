//! Threshold evaluation for device samples.
//!
//! Pure logic with no state and no I/O. Each `evaluate_*` function maps one
//! sample to an optional [`Anomaly`]; deciding whether a sample is new and
//! whether to notify is left to the caller.

use std::fmt;

use crate::alert::{AlertSeverity, Anomaly};
use crate::sensor::{HeartbeatSample, KnockSample, MotionSample, SensorKind};

/// Raw reading of an untouched KY-039 sensor.
pub const BASELINE_RAW: i64 = 2500;

/// Raw reading that maps to [`MAX_BPM`].
pub const MAX_RAW: i64 = 4000;

/// Readings within this distance of [`BASELINE_RAW`] count as "no touch".
pub const BASELINE_TOLERANCE: u64 = 100;

pub const MIN_BPM: f64 = 0.0;
pub const MAX_BPM: f64 = 100.0;

/// A touched reading below this is a low heart rate.
pub const LOW_BPM: u8 = 50;

/// A touched reading above this is a high heart rate.
pub const HIGH_BPM: u8 = 120;

/// Angular velocity (per axis, absolute) above which movement is dramatic.
pub const GYRO_THRESHOLD: f64 = 1000.0;

// ---------------------------------------------------------------------------
// Heart rate
// ---------------------------------------------------------------------------

/// Clinical classification of a heart-rate reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartStatus {
    /// The sensor is idle; never alerting.
    NoTouch,
    Low,
    Normal,
    High,
}

impl fmt::Display for HeartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            HeartStatus::NoTouch => "No Touch Detected",
            HeartStatus::Low => "Low Heart Rate",
            HeartStatus::Normal => "Normal",
            HeartStatus::High => "High Heart Rate",
        };
        f.write_str(text)
    }
}

/// A heart-rate sample converted to BPM and classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartRateReading {
    /// Always within `[0, 100]`.
    pub bpm: u8,
    pub touched: bool,
    pub status: HeartStatus,
}

impl HeartRateReading {
    pub fn is_alert(&self) -> bool {
        matches!(self.status, HeartStatus::Low | HeartStatus::High)
    }
}

/// Convert a raw KY-039 value to BPM.
///
/// Values within [`BASELINE_TOLERANCE`] of the baseline are "no touch" and
/// map to 0. Everything else is mapped linearly from
/// `[BASELINE_RAW, MAX_RAW]` onto `[MIN_BPM, MAX_BPM]`, clamped and rounded.
pub fn convert_raw_to_bpm(raw_value: i64) -> u8 {
    if raw_value.abs_diff(BASELINE_RAW) <= BASELINE_TOLERANCE {
        return 0;
    }

    let bpm = MIN_BPM
        + (raw_value as f64 - BASELINE_RAW as f64) * (MAX_BPM - MIN_BPM)
            / (MAX_RAW - BASELINE_RAW) as f64;

    bpm.clamp(MIN_BPM, MAX_BPM).round() as u8
}

/// Convert and classify a heart-rate sample.
pub fn assess_heart_rate(sample: &HeartbeatSample) -> HeartRateReading {
    let bpm = convert_raw_to_bpm(sample.raw_value);
    let touched = bpm > 0;

    let status = if !touched {
        HeartStatus::NoTouch
    } else if bpm < LOW_BPM {
        HeartStatus::Low
    } else if bpm > HIGH_BPM {
        HeartStatus::High
    } else {
        HeartStatus::Normal
    };

    HeartRateReading {
        bpm,
        touched,
        status,
    }
}

/// High-severity anomaly when the reading is touched and outside the normal
/// range.
pub fn evaluate_heartbeat(sample: &HeartbeatSample) -> Option<Anomaly> {
    let reading = assess_heart_rate(sample);
    if !reading.is_alert() {
        return None;
    }

    Some(Anomaly {
        sensor: SensorKind::Heartbeat,
        severity: AlertSeverity::High,
        message: format!("{}: {} BPM", reading.status, reading.bpm),
    })
}

// ---------------------------------------------------------------------------
// Motion
// ---------------------------------------------------------------------------

/// `true` when any gyroscope axis strictly exceeds [`GYRO_THRESHOLD`].
///
/// Acceleration is displayed but never evaluated.
pub fn is_dramatic_movement(sample: &MotionSample) -> bool {
    sample.gyro_x.abs() > GYRO_THRESHOLD
        || sample.gyro_y.abs() > GYRO_THRESHOLD
        || sample.gyro_z.abs() > GYRO_THRESHOLD
}

/// High-severity anomaly on dramatic movement.
pub fn evaluate_motion(sample: &MotionSample) -> Option<Anomaly> {
    if !is_dramatic_movement(sample) {
        return None;
    }

    Some(Anomaly {
        sensor: SensorKind::Motion,
        severity: AlertSeverity::High,
        message: "Dramatic movement detected".to_string(),
    })
}

// ---------------------------------------------------------------------------
// Knock
// ---------------------------------------------------------------------------

/// A knock alerts on `detected` alone; `count` is informational.
pub fn evaluate_knock(sample: &KnockSample) -> Option<Anomaly> {
    if !sample.detected {
        return None;
    }

    Some(Anomaly {
        sensor: SensorKind::Knock,
        severity: AlertSeverity::Medium,
        message: format!("Patient fall detected (knock #{})", sample.count),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn heartbeat(raw_value: i64) -> HeartbeatSample {
        HeartbeatSample {
            raw_value,
            timestamp: 0,
        }
    }

    fn motion(gyro_x: f64, gyro_y: f64, gyro_z: f64) -> MotionSample {
        MotionSample {
            accel_x: 5000.0,
            accel_y: -5000.0,
            accel_z: 5000.0,
            gyro_x,
            gyro_y,
            gyro_z,
            timestamp: 0,
        }
    }

    #[test]
    fn no_touch_band_maps_to_zero() {
        for raw in 2400..=2600 {
            assert_eq!(convert_raw_to_bpm(raw), 0, "raw {raw}");
        }
    }

    #[test]
    fn endpoints_map_to_bounds() {
        assert_eq!(convert_raw_to_bpm(2500), 0);
        assert_eq!(convert_raw_to_bpm(4000), 100);
    }

    #[test]
    fn touched_range_is_bounded_and_monotonic() {
        let mut previous = 0;
        for raw in 2601..=4000 {
            let bpm = convert_raw_to_bpm(raw);
            assert!(bpm <= 100, "raw {raw} gave {bpm}");
            assert!(bpm >= previous, "raw {raw} decreased from {previous} to {bpm}");
            previous = bpm;
        }
    }

    #[test]
    fn out_of_domain_values_are_clamped() {
        assert_eq!(convert_raw_to_bpm(0), 0);
        assert_eq!(convert_raw_to_bpm(10_000), 100);
        assert_eq!(convert_raw_to_bpm(i64::MIN), 0);
        assert_eq!(convert_raw_to_bpm(i64::MAX), 100);
    }

    #[test]
    fn full_scale_reading_is_normal() {
        let reading = assess_heart_rate(&heartbeat(4000));
        assert_eq!(reading.bpm, 100);
        assert!(reading.touched);
        assert_eq!(reading.status, HeartStatus::Normal);
        assert!(evaluate_heartbeat(&heartbeat(4000)).is_none());
    }

    #[test]
    fn low_reading_alerts() {
        let reading = assess_heart_rate(&heartbeat(2900));
        assert_eq!(reading.bpm, 27);
        assert_eq!(reading.status, HeartStatus::Low);

        let anomaly = evaluate_heartbeat(&heartbeat(2900)).expect("low heart rate alerts");
        assert_eq!(anomaly.sensor, SensorKind::Heartbeat);
        assert_eq!(anomaly.severity, AlertSeverity::High);
        assert_eq!(anomaly.message, "Low Heart Rate: 27 BPM");
    }

    #[test]
    fn untouched_never_alerts() {
        for raw in [2500, 2450, 2600, 1000, -5] {
            let reading = assess_heart_rate(&heartbeat(raw));
            assert!(!reading.touched, "raw {raw}");
            assert_eq!(reading.status, HeartStatus::NoTouch);
            assert!(evaluate_heartbeat(&heartbeat(raw)).is_none());
        }
    }

    #[test]
    fn normal_band_boundary() {
        // 3250 -> 50 BPM, the first non-alerting touched value.
        assert_eq!(convert_raw_to_bpm(3250), 50);
        assert!(evaluate_heartbeat(&heartbeat(3250)).is_none());
        // 3235 -> 49 BPM.
        assert_eq!(convert_raw_to_bpm(3235), 49);
        assert!(evaluate_heartbeat(&heartbeat(3235)).is_some());
    }

    #[test]
    fn dramatic_movement_is_strictly_above_threshold() {
        assert!(!is_dramatic_movement(&motion(1000.0, -1000.0, 1000.0)));
        assert!(is_dramatic_movement(&motion(1000.5, 0.0, 0.0)));
        assert!(is_dramatic_movement(&motion(0.0, -1001.0, 0.0)));
        assert!(is_dramatic_movement(&motion(0.0, 0.0, 2000.0)));
    }

    #[test]
    fn acceleration_is_not_evaluated() {
        assert!(evaluate_motion(&motion(10.0, 10.0, 10.0)).is_none());
    }

    #[test]
    fn knock_alerts_only_when_detected() {
        let idle = KnockSample {
            count: 12,
            detected: false,
            timestamp: 0,
        };
        assert!(evaluate_knock(&idle).is_none());

        let knocked = KnockSample {
            detected: true,
            ..idle
        };
        let anomaly = evaluate_knock(&knocked).expect("detected knock alerts");
        assert_eq!(anomaly.sensor, SensorKind::Knock);
        assert_eq!(anomaly.severity, AlertSeverity::Medium);
    }
}
