//! Nominatim / OpenStreetMap reverse geocoder client.
//!
//! The public instance allows at most one request per second; callers make
//! a single request per lookup and never retry.
//!
//! See <https://nominatim.org/release-docs/develop/api/Reverse/>

use parkendd_models::Coordinate;

use crate::GeocodeError;

/// Address components that name a locality, most specific first.
const LOCALITY_KEYS: &[&str] = &["city", "town", "village", "hamlet", "municipality"];

/// Reverse geocodes a coordinate and returns the locality of the match.
///
/// # Errors
///
/// Returns [`GeocodeError`] if the HTTP request or response parsing fails.
pub async fn reverse_locality(
    client: &reqwest::Client,
    base_url: &reqwest::Url,
    zoom: u8,
    coordinate: &Coordinate,
) -> Result<Option<String>, GeocodeError> {
    let url = base_url.join("reverse").map_err(|e| GeocodeError::Parse {
        message: format!("Invalid Nominatim base URL {base_url}: {e}"),
    })?;

    let resp = client
        .get(url)
        .query(&[
            ("format", "jsonv2".to_string()),
            ("lat", coordinate.latitude.to_string()),
            ("lon", coordinate.longitude.to_string()),
            ("zoom", zoom.to_string()),
            ("addressdetails", "1".to_string()),
        ])
        .send()
        .await?;

    if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(GeocodeError::RateLimited);
    }
    let resp = resp.error_for_status()?;

    let body: serde_json::Value = resp.json().await?;
    parse_reverse(&body)
}

/// Parses a Nominatim `reverse` response.
///
/// An `{"error": ..}` body means nothing was found at that position.
fn parse_reverse(body: &serde_json::Value) -> Result<Option<String>, GeocodeError> {
    let object = body.as_object().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an object".to_string(),
    })?;

    if object.contains_key("error") {
        return Ok(None);
    }

    let Some(address) = object.get("address").and_then(serde_json::Value::as_object) else {
        return Ok(None);
    };

    Ok(LOCALITY_KEYS
        .iter()
        .find_map(|key| address.get(*key).and_then(serde_json::Value::as_str))
        .filter(|name| !name.is_empty())
        .map(String::from))
}
