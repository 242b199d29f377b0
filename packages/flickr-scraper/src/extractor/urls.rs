//! URL helpers for listing links and image hosts.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static BACKGROUND_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*['"]?([^'")]+)['"]?\s*\)"#).expect("background url pattern")
});

/// Size codes the image host appends as `_{code}` before the extension.
const SIZE_CODES: &[&str] = &[
    "s", "q", "t", "m", "n", "w", "z", "c", "b", "h", "k", "l", "o", "sq", "3k", "4k", "5k", "6k",
];

/// Resolve protocol-relative and site-relative URLs to absolute https URLs.
pub fn absolutize(raw: &str, site_base: &Url) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return Url::parse(&format!("https://{}", rest)).ok();
    }
    site_base.join(raw).ok()
}

/// Pull `(owner, identifier)` out of a `/photos/{owner}/{id}/` link.
///
/// The identifier must be numeric; album, gallery and tag links are rejected.
pub fn photo_path_ids(href: &str, site_base: &Url) -> Option<(String, String)> {
    let url = absolutize(href, site_base)?;
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    if segments.next()? != "photos" {
        return None;
    }
    let owner = segments.next()?;
    let identifier = segments.next()?;

    if !is_photo_id(identifier) {
        return None;
    }

    Some((owner.to_string(), identifier.to_string()))
}

/// Photo identifiers are non-empty runs of ASCII digits.
///
/// Identifiers become object keys, so anything else is refused.
pub fn is_photo_id(identifier: &str) -> bool {
    !identifier.is_empty() && identifier.bytes().all(|b| b.is_ascii_digit())
}

/// First `url(...)` inside an inline style attribute.
pub fn background_image(style: &str) -> Option<&str> {
    BACKGROUND_URL
        .captures(style)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

/// Rewrite a thumbnail URL to the requested size.
///
/// Image file names look like `{id}_{secret}_{size}.{ext}`; the default
/// medium size omits the `_{size}` part. Names that do not follow the
/// pattern are returned unchanged.
pub fn full_size_url(thumbnail: &Url, size_suffix: &str) -> Url {
    let mut url = thumbnail.clone();
    let Some(file_name) = thumbnail
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
    else {
        return url;
    };

    let Some((stem, extension)) = file_name.rsplit_once('.') else {
        return url;
    };

    let parts: Vec<&str> = stem.split('_').collect();
    let base = match parts.as_slice() {
        [id, secret] => format!("{}_{}", id, secret),
        [id, secret, size] if SIZE_CODES.contains(size) => format!("{}_{}", id, secret),
        _ => return url,
    };

    let rewritten = if size_suffix.is_empty() {
        format!("{}.{}", base, extension)
    } else {
        format!("{}_{}.{}", base, size_suffix, extension)
    };

    let dir = thumbnail.path().strip_suffix(file_name).unwrap_or("/");
    url.set_path(&format!("{}{}", dir, rewritten));
    url
}

/// Lower-cased file extension of a URL's last path segment.
pub fn file_extension(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    let name = url.path_segments()?.last()?;
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
