//! Records from the DOM listing nodes of a search page.
//!
//! Each result is rendered as
//!
//! ```html
//! <div class="view photo-list-photo-view" data-latitude=".." data-longitude=".."
//!      style="background-image: url(//live.staticflickr.com/65535/{id}_{secret}_n.jpg)">
//!   <div class="interaction-view">
//!     <a class="overlay" href="/photos/{owner}/{id}/"></a>
//!   </div>
//! </div>
//! ```
//!
//! Geolocation attributes are optional and often missing.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

use super::geo::parse_attribute_pair;
use super::urls::{absolutize, background_image, full_size_url, photo_path_ids};
use super::NodeOutcome;
use crate::types::record::ImageRecord;

static CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.photo-list-photo-view").expect("container selector"));

static LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a.overlay[href], a[href*="/photos/"]"#).expect("link selector")
});

static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img[src]").expect("img selector"));

/// Listing container nodes in document order.
pub fn listing_nodes(document: &Html) -> Vec<ElementRef<'_>> {
    document.select(&CONTAINER).collect()
}

/// Turn one listing node into a record.
pub(crate) fn record_from_node(node: ElementRef<'_>, site_base: &Url, size_suffix: &str) -> NodeOutcome {
    let Some((owner_id, identifier)) = node
        .select(&LINK)
        .filter_map(|link| link.value().attr("href"))
        .find_map(|href| photo_path_ids(href, site_base))
    else {
        return NodeOutcome::Skipped("listing has no photo link");
    };

    let Some(thumbnail) = thumbnail_url(node).and_then(|raw| absolutize(&raw, site_base)) else {
        return NodeOutcome::Skipped("listing has no thumbnail");
    };

    let source_url = full_size_url(&thumbnail, size_suffix);
    let mut record = ImageRecord::new(identifier, owner_id, source_url.to_string());

    if let Some((latitude, longitude)) = location(node) {
        record = record.with_location(latitude, longitude);
    }

    NodeOutcome::Extracted(record)
}

fn thumbnail_url(node: ElementRef<'_>) -> Option<String> {
    if let Some(url) = node.value().attr("style").and_then(background_image) {
        return Some(url.to_string());
    }
    node.select(&IMG)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

/// Coordinates from the container, or from any descendant carrying both attributes.
fn location(node: ElementRef<'_>) -> Option<(f64, f64)> {
    let pair = |el: ElementRef<'_>| {
        parse_attribute_pair(el.value().attr("data-latitude"), el.value().attr("data-longitude"))
    };

    pair(node).or_else(|| node.descendants().filter_map(ElementRef::wrap).find_map(pair))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site() -> Url {
        Url::parse("https://www.flickr.com/search/").unwrap()
    }

    fn first_outcome(html: &str) -> NodeOutcome {
        let document = Html::parse_document(html);
        let nodes = listing_nodes(&document);
        assert_eq!(nodes.len(), 1);
        record_from_node(nodes[0], &site(), "b")
    }

    #[test]
    fn test_node_with_background_thumbnail() {
        let html = r#"
            <div class="view photo-list-photo-view awake"
                 style="transform: translate(0px, 0px); background-image: url(//live.staticflickr.com/65535/42_abc_n.jpg)">
              <div class="interaction-view"><a class="overlay" href="/photos/alice/42/"></a></div>
            </div>
        "#;

        let NodeOutcome::Extracted(record) = first_outcome(html) else {
            panic!("expected a record");
        };
        assert_eq!(record.identifier, "42");
        assert_eq!(record.owner_id, "alice");
        assert_eq!(record.source_url, "https://live.staticflickr.com/65535/42_abc_b.jpg");
        assert!(!record.has_location());
    }

    #[test]
    fn test_node_with_img_and_location() {
        let html = r#"
            <div class="photo-list-photo-view" data-latitude="48.8584" data-longitude="2.2945">
              <a href="https://www.flickr.com/photos/bob/7/"><img src="https://live.staticflickr.com/1/7_def.jpg"></a>
            </div>
        "#;

        let NodeOutcome::Extracted(record) = first_outcome(html) else {
            panic!("expected a record");
        };
        assert_eq!(record.source_url, "https://live.staticflickr.com/1/7_def_b.jpg");
        assert_eq!(record.latitude, Some(48.8584));
        assert_eq!(record.longitude, Some(2.2945));
    }

    #[test]
    fn test_node_without_link_is_skipped() {
        let html = r#"
            <div class="photo-list-photo-view" style="background-image: url(//live.staticflickr.com/1/7_def.jpg)"></div>
        "#;
        assert!(matches!(first_outcome(html), NodeOutcome::Skipped(_)));
    }

    #[test]
    fn test_node_without_thumbnail_is_skipped() {
        let html = r#"
            <div class="photo-list-photo-view"><a class="overlay" href="/photos/bob/7/"></a></div>
        "#;
        assert!(matches!(first_outcome(html), NodeOutcome::Skipped(_)));
    }
}
