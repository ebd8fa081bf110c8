//! Reverse geocoding against a Nominatim-compatible `/reverse` endpoint.

use crate::config::GeocoderConfig;
use crate::geo::Coordinates;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider answered with HTTP {0}")]
    Status(u16),
    #[error("unexpected response body: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Place {
    pub display_name: String,
    pub city: Option<String>,
    pub county: Option<String>,
}

#[derive(Debug)]
pub enum GeocodeOutcome {
    Found(Place),
    /// The provider answered but has nothing at these coordinates.
    NotFound,
    Failed(GeocodeError),
}

pub trait ReverseGeocoder {
    fn reverse(&self, coordinates: Coordinates) -> GeocodeOutcome;
}

pub struct NominatimGeocoder {
    client: Client,
    endpoint: String,
    language: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            language: config
                .language
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string),
        })
    }

    fn fetch(&self, coordinates: Coordinates) -> Result<String, GeocodeError> {
        let mut request = self.client.get(&self.endpoint).query(&[
            ("format", "jsonv2".to_string()),
            ("lat", format!("{:.7}", coordinates.latitude)),
            ("lon", format!("{:.7}", coordinates.longitude)),
        ]);
        if let Some(language) = &self.language {
            request = request.query(&[("accept-language", language.as_str())]);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }
        Ok(response.text()?)
    }
}

impl ReverseGeocoder for NominatimGeocoder {
    fn reverse(&self, coordinates: Coordinates) -> GeocodeOutcome {
        match self.fetch(coordinates) {
            Ok(body) => parse_reverse_response(&body),
            Err(err) => GeocodeOutcome::Failed(err),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    #[serde(default)]
    address: Address,
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
}

pub fn parse_reverse_response(body: &str) -> GeocodeOutcome {
    let parsed = match serde_json::from_str::<ReverseResponse>(body) {
        Ok(parsed) => parsed,
        Err(err) => return GeocodeOutcome::Failed(GeocodeError::Decode(err.to_string())),
    };

    if parsed.error.is_some() {
        return GeocodeOutcome::NotFound;
    }
    let Some(display_name) = non_empty(parsed.display_name) else {
        return GeocodeOutcome::NotFound;
    };

    let address = parsed.address;
    let city = non_empty(address.city)
        .or_else(|| non_empty(address.town))
        .or_else(|| non_empty(address.village))
        .or_else(|| non_empty(address.municipality));

    GeocodeOutcome::Found(Place {
        display_name,
        city,
        county: non_empty(address.county),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_city_and_county() {
        let body = r#"{
            "place_id": 1,
            "display_name": "Marienplatz, Altstadt, München, Bayern, Deutschland",
            "address": {"road": "Marienplatz", "city": "München", "county": "Oberbayern"}
        }"#;
        match parse_reverse_response(body) {
            GeocodeOutcome::Found(place) => {
                assert_eq!(place.city.as_deref(), Some("München"));
                assert_eq!(place.county.as_deref(), Some("Oberbayern"));
                assert!(place.display_name.starts_with("Marienplatz"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn tolerates_missing_address_fields() {
        let body = r#"{"display_name": "Atlantic Ocean"}"#;
        match parse_reverse_response(body) {
            GeocodeOutcome::Found(place) => {
                assert_eq!(place.city, None);
                assert_eq!(place.county, None);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn town_stands_in_for_missing_city() {
        let body = r#"{"display_name": "x", "address": {"town": "Bad Tölz"}}"#;
        match parse_reverse_response(body) {
            GeocodeOutcome::Found(place) => assert_eq!(place.city.as_deref(), Some("Bad Tölz")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn provider_error_body_is_not_found() {
        let body = r#"{"error": "Unable to geocode"}"#;
        assert!(matches!(
            parse_reverse_response(body),
            GeocodeOutcome::NotFound
        ));
    }

    #[test]
    fn garbage_body_is_a_failure() {
        assert!(matches!(
            parse_reverse_response("<html>busy</html>"),
            GeocodeOutcome::Failed(GeocodeError::Decode(_))
        ));
    }
}
