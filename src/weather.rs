//! Thin current-weather fetcher (Open-Meteo) for scheduled greetings.

use crate::error::Result;
use anyhow::Context as _;
use serde::Deserialize;

/// Client for the Open-Meteo current-weather endpoint. No API key required.
pub struct WeatherClient {
    http_client: reqwest::Client,
}

/// Current conditions at the configured coordinates.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherReport {
    #[serde(rename = "temperature")]
    pub temperature_c: f64,
    #[serde(rename = "windspeed")]
    pub wind_speed_kmh: f64,
}

#[derive(Deserialize)]
struct WeatherResponse {
    current_weather: WeatherReport,
}

impl std::fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.1} degrees C, wind {:.0} km/h",
            self.temperature_c, self.wind_speed_kmh
        )
    }
}

impl WeatherClient {
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .with_context(|| "failed to build HTTP client")?;

        Ok(Self { http_client })
    }

    /// Fetch current conditions for the given coordinates.
    pub async fn current(&self, latitude: f64, longitude: f64) -> Result<WeatherReport> {
        let response: WeatherResponse = self
            .http_client
            .get("https://api.open-meteo.com/v1/forecast")
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("current_weather", "true".to_string()),
            ])
            .send()
            .await
            .with_context(|| "weather request failed")?
            .error_for_status()
            .with_context(|| "weather request rejected")?
            .json()
            .await
            .with_context(|| "weather response did not parse")?;

        Ok(response.current_weather)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_renders_for_prompt_injection() {
        let report = WeatherReport {
            temperature_c: 13.46,
            wind_speed_kmh: 11.8,
        };
        assert_eq!(report.to_string(), "13.5 degrees C, wind 12 km/h");
    }

    #[test]
    fn response_parses_open_meteo_shape() {
        let body = r#"{"current_weather":{"temperature":18.2,"windspeed":7.0,"weathercode":2}}"#;
        let parsed: WeatherResponse = serde_json::from_str(body).unwrap();
        assert!((parsed.current_weather.temperature_c - 18.2).abs() < 1e-9);
    }
}
