//! Place name → coordinates, for location-radius filters.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use estate_index_core::filter::GeoPoint;

use crate::config::GeocodingConfig;

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the place is unknown or geocoding is disabled.
    async fn locate(&self, place: &str) -> Result<Option<GeoPoint>>;
}

pub struct DisabledGeocoder;

#[async_trait]
impl Geocoder for DisabledGeocoder {
    async fn locate(&self, _place: &str) -> Result<Option<GeoPoint>> {
        Ok(None)
    }
}

/// OpenStreetMap Nominatim `/search` client.
pub struct NominatimGeocoder {
    base_url: String,
    client: reqwest::Client,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build geocoding HTTP client")?;
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn locate(&self, place: &str) -> Result<Option<GeoPoint>> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("limit", "1"), ("q", place)])
            .send()
            .await
            .context("geocoding request failed")?;
        let status = response.status();
        if !status.is_success() {
            bail!("geocoding error {}", status);
        }
        let body: Value = response.json().await?;
        parse_nominatim(&body)
    }
}

/// First hit of a Nominatim result array. Coordinates arrive as strings.
fn parse_nominatim(body: &Value) -> Result<Option<GeoPoint>> {
    let hits = body
        .as_array()
        .ok_or_else(|| anyhow!("unexpected geocoding response"))?;
    let Some(first) = hits.first() else {
        return Ok(None);
    };
    let coord = |key: &str| -> Result<f64> {
        let v = first
            .get(key)
            .ok_or_else(|| anyhow!("geocoding hit missing '{}'", key))?;
        match v {
            Value::String(s) => s
                .parse()
                .with_context(|| format!("invalid '{}' in geocoding hit", key)),
            other => other
                .as_f64()
                .ok_or_else(|| anyhow!("invalid '{}' in geocoding hit", key)),
        }
    };
    Ok(Some(GeoPoint {
        lat: coord("lat")?,
        lon: coord("lon")?,
    }))
}

pub fn create_geocoder(config: &GeocodingConfig) -> Result<Box<dyn Geocoder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledGeocoder)),
        "nominatim" => Ok(Box::new(NominatimGeocoder::new(config)?)),
        other => bail!("Unknown geocoding provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_nominatim() {
        let body = json!([{"lat": "35.6585805", "lon": "139.7454329", "display_name": "Tokyo Tower"}]);
        let point = parse_nominatim(&body).unwrap().unwrap();
        assert!((point.lat - 35.6585805).abs() < 1e-9);
        assert!((point.lon - 139.7454329).abs() < 1e-9);

        assert_eq!(parse_nominatim(&json!([])).unwrap(), None);
        assert!(parse_nominatim(&json!({"error": "bad"})).is_err());
        assert!(parse_nominatim(&json!([{"lat": "north"}])).is_err());
    }

    #[tokio::test]
    async fn test_disabled_geocoder() {
        let geocoder = create_geocoder(&GeocodingConfig::default()).unwrap();
        assert_eq!(geocoder.locate("Shibuya").await.unwrap(), None);
    }
}
