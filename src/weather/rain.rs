//! Rain detection heuristic and the rain-or-not job.
//!
//! Forecast hours are bucketed by local wall-clock hour. Morning means
//! 8–13, afternoon 14–18; an hour counts as rain when its condition text
//! contains a configured keyword. Pushes only fire inside their
//! configured local-time windows, so a 7am cron run warns about the
//! morning and a 1pm run about the afternoon.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Timelike, Utc};

use crate::config::WeatherConfig;
use crate::notify::WebhookNotifier;
use crate::secrets::SecretStore;

use super::{GridWeatherClient, HourlyForecast, WeatherError};

/// Local hours scanned for morning rain.
const MORNING_HOURS: RangeInclusive<u32> = 8..=13;

/// Local hours scanned for afternoon rain.
const AFTERNOON_HOURS: RangeInclusive<u32> = 14..=18;

/// Rain expectation across all checked locations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RainOutlook {
    pub morning: bool,
    pub afternoon: bool,
}

/// Index hourly forecasts by their local wall-clock hour.
///
/// Unparseable forecast times are warned about and skipped; one bad
/// entry should not sink the whole report.
pub fn bucket_by_local_hour(
    hourly: &[HourlyForecast],
    offset: FixedOffset,
) -> BTreeMap<u32, HourlyForecast> {
    let mut buckets = BTreeMap::new();
    for item in hourly {
        let Ok(parsed) = DateTime::parse_from_str(&item.fx_time, "%Y-%m-%dT%H:%M%:z") else {
            eprintln!("Warning: unparseable forecast time: {}", item.fx_time);
            continue;
        };
        buckets.insert(parsed.with_timezone(&offset).hour(), item.clone());
    }
    buckets
}

/// Scan the morning and afternoon hour ranges for rain keywords.
pub fn detect_rain(
    buckets: &BTreeMap<u32, HourlyForecast>,
    keywords: &[String],
) -> RainOutlook {
    let is_rainy = |hour: u32| {
        buckets
            .get(&hour)
            .is_some_and(|f| keywords.iter().any(|k| f.text.contains(k.as_str())))
    };
    RainOutlook {
        morning: MORNING_HOURS.into_iter().any(is_rainy),
        afternoon: AFTERNOON_HOURS.into_iter().any(is_rainy),
    }
}

/// Decide whether the current local hour warrants a push, and which one.
pub fn push_message(
    outlook: RainOutlook,
    local_hour: u32,
    config: &WeatherConfig,
) -> Option<&'static str> {
    if (config.morning_push_start..config.morning_push_end).contains(&local_hour)
        && outlook.morning
    {
        return Some("上午可能有雨");
    }
    if (config.afternoon_push_start..config.afternoon_push_end).contains(&local_hour)
        && outlook.afternoon
    {
        return Some("下午可能有雨");
    }
    None
}

/// The rain report job: check every configured location and push a
/// notification when rain is expected in the relevant window.
pub struct RainReport {
    client: GridWeatherClient,
    notifier: WebhookNotifier,
    config: WeatherConfig,
}

impl RainReport {
    pub fn new(
        secrets: Arc<SecretStore>,
        notifier: WebhookNotifier,
        config: WeatherConfig,
    ) -> Self {
        Self {
            client: GridWeatherClient::new(secrets),
            notifier,
            config,
        }
    }

    fn local_offset(&self) -> FixedOffset {
        // Offsets beyond ±23h are invalid; clamping keeps east_opt total.
        FixedOffset::east_opt(self.config.utc_offset_hours.clamp(-23, 23) * 3600)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap())
    }

    /// Check every location; any location raining counts.
    ///
    /// A failed location is reported and skipped so a flaky coordinate
    /// does not hide rain elsewhere.
    pub async fn check_locations(&self) -> Result<RainOutlook, WeatherError> {
        let locations = if self.config.locations.is_empty() {
            self.client.location_list()?
        } else {
            self.config.locations.clone()
        };
        if locations.is_empty() {
            return Err(WeatherError::NoLocations);
        }

        let offset = self.local_offset();
        let mut outlook = RainOutlook::default();
        for location in &locations {
            match self.client.grid_weather_24h(location).await {
                Ok(response) => {
                    let buckets = bucket_by_local_hour(&response.hourly, offset);
                    let here = detect_rain(&buckets, &self.config.rain_keywords);
                    if here.morning {
                        println!("location {location}: rain expected in the morning");
                        outlook.morning = true;
                    }
                    if here.afternoon {
                        println!("location {location}: rain expected in the afternoon");
                        outlook.afternoon = true;
                    }
                }
                Err(e) => eprintln!("Warning: skipping location {location}: {e}"),
            }
        }
        Ok(outlook)
    }

    /// Run the full report and push a notification if warranted.
    pub async fn rain_or_not(&self) -> Result<String, WeatherError> {
        let outlook = self.check_locations().await?;
        let local_hour = Utc::now().with_timezone(&self.local_offset()).hour();

        match push_message(outlook, local_hour, &self.config) {
            Some(message) => {
                self.notifier.send(message).await?;
                Ok(format!("pushed: {message}"))
            }
            None => Ok(format!(
                "no push (morning rain: {}, afternoon rain: {})",
                outlook.morning, outlook.afternoon
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hour(fx_time: &str, text: &str) -> HourlyForecast {
        HourlyForecast {
            fx_time: fx_time.to_string(),
            temp: "25".to_string(),
            icon: "100".to_string(),
            text: text.to_string(),
        }
    }

    fn keywords() -> Vec<String> {
        WeatherConfig::default().rain_keywords
    }

    fn east8() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    #[test]
    fn buckets_convert_utc_to_local_hours() {
        // 01:00 UTC is 09:00 at +08:00.
        let hourly = vec![hour("2026-08-29T01:00+00:00", "晴")];
        let buckets = bucket_by_local_hour(&hourly, east8());
        assert!(buckets.contains_key(&9));
    }

    #[test]
    fn buckets_skip_unparseable_times() {
        let hourly = vec![
            hour("not-a-time", "小雨"),
            hour("2026-08-29T10:00+08:00", "晴"),
        ];
        let buckets = bucket_by_local_hour(&hourly, east8());
        assert_eq!(buckets.len(), 1);
    }

    #[test]
    fn morning_rain_detected() {
        let hourly = vec![
            hour("2026-08-29T09:00+08:00", "小雨"),
            hour("2026-08-29T15:00+08:00", "晴"),
        ];
        let outlook = detect_rain(&bucket_by_local_hour(&hourly, east8()), &keywords());
        assert!(outlook.morning);
        assert!(!outlook.afternoon);
    }

    #[test]
    fn afternoon_rain_detected() {
        let hourly = vec![
            hour("2026-08-29T09:00+08:00", "多云"),
            hour("2026-08-29T16:00+08:00", "雷阵雨"),
        ];
        let outlook = detect_rain(&bucket_by_local_hour(&hourly, east8()), &keywords());
        assert!(!outlook.morning);
        assert!(outlook.afternoon);
    }

    #[test]
    fn english_keyword_matches_too() {
        let hourly = vec![hour("2026-08-29T10:00+08:00", "light rain")];
        let outlook = detect_rain(&bucket_by_local_hour(&hourly, east8()), &keywords());
        assert!(outlook.morning);
    }

    #[test]
    fn hours_outside_windows_are_ignored() {
        // 7am and 7pm rain falls outside both detection ranges.
        let hourly = vec![
            hour("2026-08-29T07:00+08:00", "小雨"),
            hour("2026-08-29T19:00+08:00", "小雨"),
        ];
        let outlook = detect_rain(&bucket_by_local_hour(&hourly, east8()), &keywords());
        assert_eq!(outlook, RainOutlook::default());
    }

    #[test]
    fn push_fires_only_inside_configured_windows() {
        let config = WeatherConfig::default();
        let both = RainOutlook {
            morning: true,
            afternoon: true,
        };
        assert_eq!(push_message(both, 7, &config), Some("上午可能有雨"));
        assert_eq!(push_message(both, 13, &config), Some("下午可能有雨"));
        // Outside both windows: silence, even though rain is expected.
        assert_eq!(push_message(both, 10, &config), None);
        assert_eq!(push_message(both, 20, &config), None);
    }

    #[test]
    fn no_rain_means_no_push() {
        let config = WeatherConfig::default();
        assert_eq!(push_message(RainOutlook::default(), 7, &config), None);
        assert_eq!(push_message(RainOutlook::default(), 13, &config), None);
    }
}
