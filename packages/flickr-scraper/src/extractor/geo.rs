//! Geolocation parsing.
//!
//! Coordinates show up in two places: `data-latitude` / `data-longitude`
//! attributes on listing nodes, and `"latitude":..,"longitude":..` pairs in
//! the model-export script of a photo's detail page.

use regex::Regex;
use std::sync::LazyLock;

/// A JSON number token, exponent forms included.
const NUMBER: &str = r"-?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?";

static LATITUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#""latitude"\s*:\s*"?({NUMBER})"?"#)).expect("latitude pattern")
});

static LONGITUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#""longitude"\s*:\s*"?({NUMBER})"?"#)).expect("longitude pattern")
});

/// Both values parse and fall inside the valid ranges.
pub fn valid_pair(latitude: f64, longitude: f64) -> Option<(f64, f64)> {
    let in_range = (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude);
    in_range.then_some((latitude, longitude))
}

/// Parse a pair of attribute values. Either missing means no location.
pub fn parse_attribute_pair(latitude: Option<&str>, longitude: Option<&str>) -> Option<(f64, f64)> {
    let latitude = latitude?.trim().parse::<f64>().ok()?;
    let longitude = longitude?.trim().parse::<f64>().ok()?;
    valid_pair(latitude, longitude)
}

/// Read coordinates from a photo detail page.
///
/// Looks inside the model-export script when present, otherwise scans the
/// whole markup. Returns `None` when the photo is not geotagged.
pub fn parse_coordinates(markup: &str) -> Option<(f64, f64)> {
    let haystack = super::model_export::script_text(markup);
    let haystack = haystack.as_deref().unwrap_or(markup);

    let latitude = LATITUDE
        .captures(haystack)?
        .get(1)?
        .as_str()
        .parse::<f64>()
        .ok()?;
    let longitude = LONGITUDE
        .captures(haystack)?
        .get(1)?
        .as_str()
        .parse::<f64>()
        .ok()?;

    valid_pair(latitude, longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinates_from_model_export() {
        let html = r#"
            <html><body>
            <script class="modelExport">
                modelExport: {"photo-models":[{"id":"42","location":{"latitude":48.858093,"longitude":2.294694,"accuracy":16}}]}
            </script>
            </body></html>
        "#;
        assert_eq!(parse_coordinates(html), Some((48.858093, 2.294694)));
    }

    #[test]
    fn test_parse_coordinates_negative_values() {
        let html = r#"<script class="modelExport">{"latitude":-33.8568,"longitude":151.2153}</script>"#;
        assert_eq!(parse_coordinates(html), Some((-33.8568, 151.2153)));
    }

    #[test]
    fn test_parse_coordinates_exponent_form() {
        let html = r#"<script class="modelExport">{"latitude":1e-5,"longitude":-2.5E1}</script>"#;
        assert_eq!(parse_coordinates(html), Some((0.00001, -25.0)));
    }

    #[test]
    fn test_parse_coordinates_absent() {
        let html = r#"<script class="modelExport">{"photo-models":[{"id":"42"}]}</script>"#;
        assert_eq!(parse_coordinates(html), None);
    }

    #[test]
    fn test_attribute_pair_requires_both() {
        assert_eq!(parse_attribute_pair(Some("48.85"), Some("2.29")), Some((48.85, 2.29)));
        assert_eq!(parse_attribute_pair(Some("48.85"), None), None);
        assert_eq!(parse_attribute_pair(Some("abc"), Some("2.29")), None);
        assert_eq!(parse_attribute_pair(Some("95.0"), Some("2.29")), None);
    }
}
