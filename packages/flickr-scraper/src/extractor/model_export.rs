//! Records embedded in the page's model-export script.
//!
//! Search pages ship a `<script class="modelExport">` whose body contains
//! `"photos":{"_data":[ ... ]}`. Each array element describes one photo:
//!
//! ```json
//! {"id":"53094478123","ownerNsid":"12345@N00",
//!  "sizes":{"w":{"url":"//live.staticflickr.com/65535/53094478123_9f2c1d_w.jpg"}}}
//! ```

use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

use super::geo;
use super::urls::{absolutize, full_size_url, is_photo_id};
use super::NodeOutcome;
use crate::types::record::ImageRecord;

static SCRIPT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("script.modelExport").expect("model export selector"));

const PHOTOS_MARKER: &str = r#""photos":{"_data":"#;

/// Preferred thumbnail sizes, smallest useful first.
const SIZE_PREFERENCE: &[&str] = &["w", "n", "m", "z", "c", "l", "b", "q", "s", "t", "sq"];

/// Text of the model-export script, if the markup has one.
pub fn script_text(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);
    document
        .select(&SCRIPT)
        .next()
        .map(|el| el.text().collect::<String>())
        .filter(|text| !text.trim().is_empty())
}

/// Raw photo objects from the script's `_data` array.
///
/// Deserializes only the array that follows the marker, so trailing
/// script content does not matter.
pub fn photo_objects(script: &str) -> Option<Vec<Value>> {
    let start = script.find(PHOTOS_MARKER)? + PHOTOS_MARKER.len();
    let mut stream = serde_json::Deserializer::from_str(&script[start..]).into_iter::<Vec<Value>>();
    stream.next()?.ok()
}

/// Turn one photo object into a record.
pub(crate) fn record_from_object(object: &Value, site_base: &Url, size_suffix: &str) -> NodeOutcome {
    if !object.is_object() {
        return NodeOutcome::Skipped("photo object is null");
    }

    let Some(identifier) = string_field(object, "id") else {
        return NodeOutcome::Skipped("photo object has no id");
    };
    if !is_photo_id(&identifier) {
        return NodeOutcome::Skipped("photo object id is not numeric");
    }

    let Some(thumbnail) = thumbnail_url(object).and_then(|raw| absolutize(raw, site_base)) else {
        return NodeOutcome::Skipped("photo object has no usable size url");
    };

    let owner_id = string_field(object, "ownerNsid")
        .or_else(|| string_field(object, "owner"))
        .unwrap_or_default();

    let source_url = full_size_url(&thumbnail, size_suffix);
    let mut record = ImageRecord::new(identifier, owner_id, source_url.to_string());

    let latitude = object.get("latitude").and_then(Value::as_f64);
    let longitude = object.get("longitude").and_then(Value::as_f64);
    if let Some((lat, lon)) = latitude
        .zip(longitude)
        .and_then(|(lat, lon)| geo::valid_pair(lat, lon))
    {
        record = record.with_location(lat, lon);
    }

    NodeOutcome::Extracted(record)
}

fn string_field(object: &Value, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn thumbnail_url(object: &Value) -> Option<&str> {
    let sizes = object.get("sizes")?;
    SIZE_PREFERENCE
        .iter()
        .find_map(|size| sizes.get(*size)?.get("url")?.as_str())
        .filter(|url| !url.trim().is_empty())
}
