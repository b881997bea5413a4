// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of HelioWatch.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Daylight predicate used by the detectors.
///
/// The default implementation approximates sunrise/sunset with a fixed local
/// window. Replacing it with real solar-position math keyed by the unit's
/// coordinates only needs another implementation of this trait; the detector
/// contracts stay unchanged.
pub trait DaylightPolicy: Send + Sync {
    /// Whether `at` falls inside the daylight window at a location with the
    /// given timezone
    fn is_daytime(&self, at: DateTime<Utc>, tz: Tz) -> bool;
}

/// Fixed 06:00-18:00 local window as a sunrise/sunset proxy.
#[derive(Debug, Clone, Copy)]
pub struct FixedWindowDaylight {
    /// First daytime hour (inclusive)
    pub start_hour: u32,
    /// First evening hour (exclusive)
    pub end_hour: u32,
}

impl Default for FixedWindowDaylight {
    fn default() -> Self {
        Self {
            start_hour: 6,
            end_hour: 18,
        }
    }
}

impl DaylightPolicy for FixedWindowDaylight {
    fn is_daytime(&self, at: DateTime<Utc>, tz: Tz) -> bool {
        let hour = at.with_timezone(&tz).hour();
        hour >= self.start_hour && hour < self.end_hour
    }
}

/// Resolve a unit's IANA timezone name, falling back to UTC when the name is
/// missing or unknown.
pub fn resolve_timezone(name: Option<&str>) -> Tz {
    match name {
        Some(name) => name.parse::<Tz>().unwrap_or_else(|_| {
            warn!("Unknown timezone '{name}', falling back to UTC");
            Tz::UTC
        }),
        None => Tz::UTC,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_window_boundaries_utc() {
        let policy = FixedWindowDaylight::default();
        assert!(!policy.is_daytime(at(5, 59), Tz::UTC));
        assert!(policy.is_daytime(at(6, 0), Tz::UTC));
        assert!(policy.is_daytime(at(12, 0), Tz::UTC));
        assert!(policy.is_daytime(at(17, 59), Tz::UTC));
        assert!(!policy.is_daytime(at(18, 0), Tz::UTC));
        assert!(!policy.is_daytime(at(23, 30), Tz::UTC));
    }

    #[test]
    fn test_window_uses_local_time() {
        let policy = FixedWindowDaylight::default();
        let prague = chrono_tz::Europe::Prague;

        // 04:30 UTC is 06:30 in Prague during summer (UTC+2)
        assert!(policy.is_daytime(at(4, 30), prague));
        assert!(!policy.is_daytime(at(4, 30), Tz::UTC));

        // 16:30 UTC is 18:30 in Prague
        assert!(!policy.is_daytime(at(16, 30), prague));
        assert!(policy.is_daytime(at(16, 30), Tz::UTC));
    }

    #[test]
    fn test_custom_window() {
        let policy = FixedWindowDaylight {
            start_hour: 8,
            end_hour: 16,
        };
        assert!(!policy.is_daytime(at(7, 59), Tz::UTC));
        assert!(policy.is_daytime(at(8, 0), Tz::UTC));
        assert!(!policy.is_daytime(at(16, 0), Tz::UTC));
    }

    #[test]
    fn test_resolve_timezone() {
        assert_eq!(
            resolve_timezone(Some("Europe/Prague")),
            chrono_tz::Europe::Prague
        );
        assert_eq!(resolve_timezone(Some("not-a-zone")), Tz::UTC);
        assert_eq!(resolve_timezone(None), Tz::UTC);
    }
}
