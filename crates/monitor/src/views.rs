//! Text rendering of the dashboard.
//!
//! Views are plain data built from an immutable [`DashboardSession`] and
//! rendered through `Display`. Building a screen never mutates the session.

use std::fmt;

use carewatch_core::evaluator::{
    assess_heart_rate, convert_raw_to_bpm, is_dramatic_movement, HeartRateReading,
};
use carewatch_core::history::CHART_WINDOW;
use carewatch_core::types::EpochMillis;
use carewatch_core::{Alert, HeartbeatSample, KnockSample, MotionSample};
use chrono::DateTime;

use crate::session::DashboardSession;

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Full-screen state of the dashboard.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardScreen {
    /// Nothing received yet.
    Loading,
    /// The device feed failed before any data arrived.
    ConnectionError(String),
    Live(LiveView),
}

impl DashboardScreen {
    /// Pick the screen for the current session state.
    ///
    /// The loading and error screens only show while no snapshot is held;
    /// once data has arrived it is displayed regardless of later errors.
    pub fn build(session: &DashboardSession, device_path: &str) -> Self {
        if session.snapshot().is_none() {
            if session.is_loading() {
                return DashboardScreen::Loading;
            }
            if let Some(error) = session.error() {
                return DashboardScreen::ConnectionError(error.to_string());
            }
        }
        DashboardScreen::Live(LiveView::build(session, device_path))
    }
}

impl fmt::Display for DashboardScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardScreen::Loading => writeln!(f, "Loading dashboard..."),
            DashboardScreen::ConnectionError(message) => {
                writeln!(f, "Connection Error")?;
                writeln!(f, "{message}")?;
                writeln!(
                    f,
                    "Please check the database configuration and network connection."
                )
            }
            DashboardScreen::Live(view) => write!(f, "{view}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveView {
    pub data_path: String,
    pub last_updated: Option<EpochMillis>,
    pub heartbeat: Option<HeartbeatPanel>,
    pub motion: Option<MotionPanel>,
    pub status: Option<StatusPanel>,
    pub alerts: Vec<Alert>,
}

impl LiveView {
    pub fn build(session: &DashboardSession, device_path: &str) -> Self {
        let snapshot = session.snapshot();

        let heartbeat = snapshot.and_then(|s| s.heartbeat.as_deref()).map(|sample| {
            let chart = session
                .heartbeat_history()
                .slice_last(CHART_WINDOW)
                .map(|h| convert_raw_to_bpm(h.raw_value))
                .collect();
            HeartbeatPanel::new(*sample, chart)
        });

        let motion = snapshot.and_then(|s| s.motion.as_deref()).map(|sample| {
            let chart = session
                .motion_history()
                .slice_last(CHART_WINDOW)
                .map(|m| peak_gyro(m))
                .collect();
            MotionPanel::new(*sample, chart)
        });

        let status = snapshot
            .and_then(|s| s.knock.as_deref())
            .map(|knock| StatusPanel { knock: *knock });

        Self {
            data_path: device_path.to_string(),
            last_updated: snapshot.map(|s| s.last_updated),
            heartbeat,
            motion,
            status,
            alerts: session.alerts().to_vec(),
        }
    }
}

impl fmt::Display for LiveView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Elderly Care Dashboard")?;
        match self.last_updated {
            Some(ts) => writeln!(
                f,
                "Connected | Data Path: {} | Last Update: {}",
                self.data_path,
                format_time(ts)
            )?,
            None => writeln!(
                f,
                "No data received | Data Path: {} | Check that the device is sending data",
                self.data_path
            )?,
        }

        if self.heartbeat.is_none() && self.motion.is_none() {
            writeln!(f)?;
            writeln!(f, "No Sensor Data Available")?;
            writeln!(f, "Heartbeat and motion sensors are not sending data yet.")?;
        }
        if let Some(panel) = &self.heartbeat {
            writeln!(f)?;
            write!(f, "{panel}")?;
        }
        if let Some(panel) = &self.motion {
            writeln!(f)?;
            write!(f, "{panel}")?;
        }
        if let Some(panel) = &self.status {
            writeln!(f)?;
            write!(f, "{panel}")?;
        }

        if !self.alerts.is_empty() {
            writeln!(f)?;
            writeln!(f, "Alerts ({})", self.alerts.len())?;
            for alert in &self.alerts {
                writeln!(
                    f,
                    "  [{:?}] {}: {} ({}){}",
                    alert.severity,
                    alert.kind,
                    alert.message,
                    alert.timestamp,
                    if alert.acknowledged { " acknowledged" } else { "" }
                )?;
            }
        }
        Ok(())
    }
}

/// Heart-rate monitor panel.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatPanel {
    pub sample: HeartbeatSample,
    pub reading: HeartRateReading,
    /// BPM of the last [`CHART_WINDOW`] samples, oldest first.
    pub chart: Vec<u8>,
}

impl HeartbeatPanel {
    pub fn new(sample: HeartbeatSample, chart: Vec<u8>) -> Self {
        Self {
            reading: assess_heart_rate(&sample),
            sample,
            chart,
        }
    }
}

impl fmt::Display for HeartbeatPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let alert = if self.reading.is_alert() { "  [Alert]" } else { "" };
        writeln!(f, "Heart Rate Monitor{alert}")?;
        if self.reading.touched {
            writeln!(f, "  {} BPM  {}", self.reading.bpm, self.reading.status)?;
        } else {
            writeln!(f, "  -- BPM  {}", self.reading.status)?;
        }
        writeln!(
            f,
            "  Raw: {} | Converted: {} BPM | Last updated: {}",
            self.sample.raw_value,
            self.reading.bpm,
            format_time(self.sample.timestamp)
        )?;
        writeln!(
            f,
            "  {}",
            sparkline(self.chart.iter().map(|&bpm| f64::from(bpm)), 100.0)
        )
    }
}

/// Motion and fall detection panel.
#[derive(Debug, Clone, PartialEq)]
pub struct MotionPanel {
    pub sample: MotionSample,
    pub dramatic: bool,
    /// Peak absolute angular velocity of the last [`CHART_WINDOW`] samples.
    pub chart: Vec<f64>,
}

impl MotionPanel {
    pub fn new(sample: MotionSample, chart: Vec<f64>) -> Self {
        Self {
            dramatic: is_dramatic_movement(&sample),
            sample,
            chart,
        }
    }
}

impl fmt::Display for MotionPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.sample;
        writeln!(f, "Motion & Fall Detection")?;
        writeln!(
            f,
            "  Dramatic Movement: {}  {}",
            if self.dramatic { "YES" } else { "NO" },
            if self.dramatic { "DRAMATIC MOVEMENT" } else { "Normal Movement" }
        )?;
        writeln!(
            f,
            "  Accel X/Y/Z: {:.2} / {:.2} / {:.2}",
            s.accel_x, s.accel_y, s.accel_z
        )?;
        writeln!(
            f,
            "  Gyro  X/Y/Z: {:.2} / {:.2} / {:.2}",
            s.gyro_x, s.gyro_y, s.gyro_z
        )?;
        writeln!(f, "  Last updated: {}", format_time(s.timestamp))?;
        let ceiling = self.chart.iter().copied().fold(1.0_f64, f64::max);
        writeln!(f, "  {}", sparkline(self.chart.iter().copied(), ceiling))
    }
}

/// Knock sensor status panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPanel {
    pub knock: KnockSample,
}

impl fmt::Display for StatusPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status Indicators")?;
        writeln!(
            f,
            "  Knock Sensor: {} | Count: {} | {}",
            if self.knock.detected { "DETECTED" } else { "No Knock" },
            self.knock.count,
            format_time(self.knock.timestamp)
        )?;
        if self.knock.detected {
            writeln!(f, "  Knock detected! Someone may be at the door.")?;
        }
        Ok(())
    }
}

fn peak_gyro(sample: &MotionSample) -> f64 {
    sample
        .gyro_x
        .abs()
        .max(sample.gyro_y.abs())
        .max(sample.gyro_z.abs())
}

/// Render `values` as a block sparkline scaled to `[0, ceiling]`.
fn sparkline(values: impl Iterator<Item = f64>, ceiling: f64) -> String {
    let top = (SPARK_LEVELS.len() - 1) as f64;
    values
        .map(|v| {
            let level = (v / ceiling).clamp(0.0, 1.0) * top;
            SPARK_LEVELS[level.round() as usize]
        })
        .collect()
}

/// Wall-clock time (UTC) of an epoch-millisecond timestamp.
fn format_time(ts: EpochMillis) -> String {
    match DateTime::from_timestamp_millis(ts) {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparkline_scales_to_ceiling() {
        assert_eq!(sparkline([0.0, 50.0, 100.0].into_iter(), 100.0), "▁▅█");
        assert_eq!(sparkline([250.0].into_iter(), 100.0), "█");
        assert_eq!(sparkline(std::iter::empty(), 100.0), "");
    }

    #[test]
    fn format_time_uses_utc_clock() {
        assert_eq!(format_time(0), "00:00:00");
        assert_eq!(format_time(3_723_000), "01:02:03");
    }

    #[test]
    fn untouched_heartbeat_shows_dashes() {
        let panel = HeartbeatPanel::new(
            HeartbeatSample {
                raw_value: 2500,
                timestamp: 0,
            },
            vec![0],
        );
        let text = panel.to_string();
        assert!(text.contains("-- BPM  No Touch Detected"));
        assert!(!text.contains("[Alert]"));
    }

    #[test]
    fn low_heart_rate_is_flagged() {
        let panel = HeartbeatPanel::new(
            HeartbeatSample {
                raw_value: 2900,
                timestamp: 0,
            },
            Vec::new(),
        );
        let text = panel.to_string();
        assert!(text.contains("[Alert]"));
        assert!(text.contains("27 BPM  Low Heart Rate"));
    }

    #[test]
    fn detected_knock_shows_banner() {
        let panel = StatusPanel {
            knock: KnockSample {
                count: 3,
                detected: true,
                timestamp: 0,
            },
        };
        let text = panel.to_string();
        assert!(text.contains("DETECTED | Count: 3"));
        assert!(text.contains("Someone may be at the door"));
    }
}
