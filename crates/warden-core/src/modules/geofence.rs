//! Geofence breach evaluation and episode tracking.
//!
//! Signal attenuation is the detection proxy for "device physically moved
//! away": a thief carrying a laptop out of WiFi range is the expected threat
//! model. This is a deliberate heuristic, not a positioning system, and
//! false positives from normal roaming are an accepted trade-off.
//!
//! [`evaluate`] is stateless (sample in, breach verdict out);
//! [`BreachTracker`] layers the episode state machine on top so a continuous
//! breach produces exactly one alarm transition until the device returns in
//! bounds or the owner manually clears.

use warden_types::models::{GeofenceConfig, GeofenceMode};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (haversine).
pub fn haversine_meters(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// One observation of the device's surroundings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeofenceSample {
    /// Currently connected SSID, None when disconnected
    pub ssid: Option<String>,
    /// Signal strength percent for the connected network
    pub signal_percent: Option<i32>,
    /// Position fix, when one is available
    pub location: Option<(f64, f64)>,
}

/// Why a sample breached the configured zone.
#[derive(Debug, Clone, PartialEq)]
pub enum BreachReason {
    /// Disconnected from, or connected to something other than, the
    /// configured network
    WrongNetwork {
        required_ssid: String,
        current_ssid: Option<String>,
    },
    /// Connected to the right network but the signal dropped below the
    /// configured threshold
    WeakSignal {
        signal_percent: i32,
        threshold_percent: i32,
    },
    /// Position fix beyond the configured radius from the reference point
    OutsideRadius { distance_m: f64, radius_m: f64 },
}

impl std::fmt::Display for BreachReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongNetwork { required_ssid, current_ssid } => write!(
                f,
                "disconnected from required network '{}' (current: {})",
                required_ssid,
                current_ssid.as_deref().unwrap_or("DISCONNECTED")
            ),
            Self::WeakSignal { signal_percent, threshold_percent } => write!(
                f,
                "signal strength {}% below threshold {}%",
                signal_percent, threshold_percent
            ),
            Self::OutsideRadius { distance_m, radius_m } => {
                write!(f, "{:.0}m from reference point exceeds {:.0}m radius", distance_m, radius_m)
            }
        }
    }
}

/// Evaluate one sample against the configured zone.
///
/// Returns `None` when the geofence is disabled, incompletely configured, or
/// the sample lacks the data the configured mode needs (an absent position
/// fix is not a breach).
pub fn evaluate(config: &GeofenceConfig, sample: &GeofenceSample) -> Option<BreachReason> {
    if !config.enabled {
        return None;
    }

    match config.mode {
        GeofenceMode::Wifi => {
            let required = config.wifi_ssid.as_deref()?;
            match sample.ssid.as_deref() {
                Some(current) if current == required => {
                    let threshold = config.signal_threshold_percent.unwrap_or(30);
                    match sample.signal_percent {
                        Some(signal) if signal < threshold => Some(BreachReason::WeakSignal {
                            signal_percent: signal,
                            threshold_percent: threshold,
                        }),
                        _ => None,
                    }
                }
                other => Some(BreachReason::WrongNetwork {
                    required_ssid: required.to_string(),
                    current_ssid: other.map(str::to_string),
                }),
            }
        }
        GeofenceMode::Location => {
            let center_lat = config.center_lat?;
            let center_lng = config.center_lng?;
            let radius_m = config.radius_m?;
            let (lat, lng) = sample.location?;

            let distance_m = haversine_meters(center_lat, center_lng, lat, lng);
            if distance_m > radius_m {
                Some(BreachReason::OutsideRadius { distance_m, radius_m })
            } else {
                None
            }
        }
    }
}

/// Outcome of feeding one verdict into the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum BreachTransition {
    /// A new breach episode started; raise the alarm exactly once
    Triggered(BreachReason),
    /// The device returned in bounds; the episode ended
    Cleared,
    /// No state change (still breached, or still in bounds)
    Unchanged,
}

/// Episode state machine over successive [`evaluate`] verdicts.
#[derive(Debug, Clone, Default)]
pub struct BreachTracker {
    in_breach: bool,
}

impl BreachTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one verdict; a breach only triggers on the edge into the episode.
    pub fn observe(&mut self, verdict: Option<BreachReason>) -> BreachTransition {
        match (self.in_breach, verdict) {
            (false, Some(reason)) => {
                self.in_breach = true;
                BreachTransition::Triggered(reason)
            }
            (true, None) => {
                self.in_breach = false;
                BreachTransition::Cleared
            }
            _ => BreachTransition::Unchanged,
        }
    }

    /// Forget the current episode (owner manually cleared the alarm). A
    /// still-breached next sample starts a fresh episode.
    pub fn reset(&mut self) {
        self.in_breach = false;
    }

    pub const fn in_breach(&self) -> bool {
        self.in_breach
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wifi_config() -> GeofenceConfig {
        GeofenceConfig {
            enabled: true,
            mode: GeofenceMode::Wifi,
            wifi_ssid: Some("HomeNet".to_string()),
            signal_threshold_percent: Some(30),
            center_lat: None,
            center_lng: None,
            radius_m: None,
        }
    }

    fn location_config() -> GeofenceConfig {
        GeofenceConfig {
            enabled: true,
            mode: GeofenceMode::Location,
            wifi_ssid: None,
            signal_threshold_percent: None,
            center_lat: Some(2.1896),
            center_lng: Some(102.2501),
            radius_m: Some(200.0),
        }
    }

    fn sample(ssid: Option<&str>, signal: Option<i32>) -> GeofenceSample {
        GeofenceSample {
            ssid: ssid.map(str::to_string),
            signal_percent: signal,
            location: None,
        }
    }

    #[test]
    fn test_haversine_known_distance() {
        // Kuala Lumpur -> Singapore, roughly 316 km
        let d = haversine_meters(3.139, 101.6869, 1.3521, 103.8198);
        assert!((300_000.0..330_000.0).contains(&d), "got {}", d);
        // Zero distance
        assert!(haversine_meters(3.139, 101.6869, 3.139, 101.6869) < 1.0);
    }

    #[test]
    fn test_disabled_never_breaches() {
        let mut config = wifi_config();
        config.enabled = false;
        assert_eq!(evaluate(&config, &sample(None, None)), None);
    }

    #[test]
    fn test_wrong_network_breaches() {
        let verdict = evaluate(&wifi_config(), &sample(Some("CafeWifi"), Some(90)));
        assert!(matches!(verdict, Some(BreachReason::WrongNetwork { .. })));

        let disconnected = evaluate(&wifi_config(), &sample(None, None));
        assert!(matches!(disconnected, Some(BreachReason::WrongNetwork { .. })));
    }

    #[test]
    fn test_signal_threshold_boundary() {
        // At the threshold is still in bounds; below it breaches
        assert_eq!(evaluate(&wifi_config(), &sample(Some("HomeNet"), Some(30))), None);
        let verdict = evaluate(&wifi_config(), &sample(Some("HomeNet"), Some(29)));
        assert!(matches!(verdict, Some(BreachReason::WeakSignal { .. })));
    }

    #[test]
    fn test_unknown_signal_on_right_network_is_fine() {
        assert_eq!(evaluate(&wifi_config(), &sample(Some("HomeNet"), None)), None);
    }

    #[test]
    fn test_location_radius() {
        let config = location_config();
        let inside = GeofenceSample {
            location: Some((2.1897, 102.2502)),
            ..Default::default()
        };
        assert_eq!(evaluate(&config, &inside), None);

        let outside = GeofenceSample {
            // ~1.1km away
            location: Some((2.1996, 102.2501)),
            ..Default::default()
        };
        assert!(matches!(evaluate(&config, &outside), Some(BreachReason::OutsideRadius { .. })));

        // No fix: nothing to evaluate
        assert_eq!(evaluate(&config, &GeofenceSample::default()), None);
    }

    #[test]
    fn test_continuous_breach_triggers_exactly_once() {
        let config = wifi_config();
        let mut tracker = BreachTracker::new();
        let mut triggers = 0;

        // Five consecutive below-threshold samples
        for _ in 0..5 {
            let verdict = evaluate(&config, &sample(Some("HomeNet"), Some(10)));
            if matches!(tracker.observe(verdict), BreachTransition::Triggered(_)) {
                triggers += 1;
            }
        }
        assert_eq!(triggers, 1);

        // Signal recovers: episode clears
        let verdict = evaluate(&config, &sample(Some("HomeNet"), Some(80)));
        assert_eq!(tracker.observe(verdict), BreachTransition::Cleared);

        // A later breach starts a new episode
        let verdict = evaluate(&config, &sample(None, None));
        assert!(matches!(tracker.observe(verdict), BreachTransition::Triggered(_)));
    }

    #[test]
    fn test_manual_reset_starts_new_episode() {
        let config = wifi_config();
        let mut tracker = BreachTracker::new();

        let verdict = evaluate(&config, &sample(None, None));
        assert!(matches!(tracker.observe(verdict), BreachTransition::Triggered(_)));

        // Owner clears the alarm while still out of range
        tracker.reset();
        let verdict = evaluate(&config, &sample(None, None));
        assert!(matches!(tracker.observe(verdict), BreachTransition::Triggered(_)));
    }
}
