//! Upstream sensor feed.
//!
//! The feed serves pages shaped as `{ "results": [..], "next_cursor": ".." }`.
//! Items that do not decode as a reading are logged and skipped; the rest of
//! the page still counts.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::models::RawSensorReading;

// ---

#[derive(Debug, Clone)]
pub struct SensorFeed {
    // ---
    client: reqwest::Client,
    base_url: String,
    max_pages: u32,
}

impl SensorFeed {
    // ---
    pub fn new(base_url: impl Into<String>, max_pages: u32) -> Self {
        // ---
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            max_pages,
        }
    }

    /// Follow cursors until the feed is exhausted or `max_pages` is reached.
    pub async fn fetch_all(&self) -> Result<Vec<RawSensorReading>> {
        // ---
        let mut all_data = Vec::new();
        let mut cursor: Option<String> = None;
        let mut page_count = 0;

        loop {
            if page_count >= self.max_pages {
                debug!(
                    "Hit page limit of {}, stopping pagination. Fetched {} records so far.",
                    self.max_pages,
                    all_data.len()
                );
                break;
            }
            page_count += 1;

            let mut request = self.client.get(&self.base_url);
            if let Some(ref cursor) = cursor {
                request = request.query(&[("cursor", cursor)]);
            }

            debug!("Fetching page {} (cursor {:?})", page_count, cursor);

            let page: serde_json::Value = request
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .with_context(|| format!("Failed to fetch feed page {page_count}"))?
                .json()
                .await
                .with_context(|| format!("Page {page_count} is not valid JSON"))?;

            let (readings, skipped) = parse_page(&page);
            debug!(
                "Page {} decoded {} readings, skipped {}",
                page_count,
                readings.len(),
                skipped
            );
            all_data.extend(readings);

            cursor = next_cursor(&page);
            if cursor.is_none() {
                break;
            }
        }

        info!(
            "Finished fetching {} total records from {} pages",
            all_data.len(),
            page_count
        );
        Ok(all_data)
    }
}

/// Decode the `results` array of one page; returns the readings and the
/// number of items that were skipped.
fn parse_page(page: &serde_json::Value) -> (Vec<RawSensorReading>, usize) {
    // ---
    let Some(items) = page.get("results").and_then(|d| d.as_array()) else {
        debug!("Page response missing 'results' field or not an array");
        return (Vec::new(), 0);
    };

    let mut readings = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for (i, item) in items.iter().enumerate() {
        match serde_json::from_value::<RawSensorReading>(item.clone()) {
            Ok(reading) => readings.push(reading),
            Err(e) => {
                skipped += 1;
                debug!("Failed to parse item {}: {} - Raw item: {}", i, e, item);
            }
        }
    }
    (readings, skipped)
}

fn next_cursor(page: &serde_json::Value) -> Option<String> {
    // ---
    page.get("next_cursor")
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::{RawTimestamp, SensorType};
    use serde_json::json;

    #[test]
    fn test_parse_page_skips_bad_items() {
        // ---
        let page = json!({
            "results": [
                {"type": "humidity", "value": 61.5, "unit": "%", "location": "Zone Nord",
                 "timestamp": {"seconds": 1735689600, "nanoseconds": 0}},
                {"type": "pressure", "value": 1013},
                {"type": "water", "value": 44, "timestamp": "2025-01-01T10:00:00Z",
                 "sensorId": "c-7"}
            ],
            "next_cursor": "abc"
        });

        let (readings, skipped) = parse_page(&page);
        assert_eq!(skipped, 1);
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].sensor_type, SensorType::Humidity);
        assert!(matches!(
            readings[0].timestamp,
            Some(RawTimestamp::Seconds {
                seconds: 1_735_689_600,
                ..
            })
        ));
        assert_eq!(readings[1].sensor_id.as_deref(), Some("c-7"));
        assert_eq!(next_cursor(&page).as_deref(), Some("abc"));
    }

    #[test]
    fn test_last_page() {
        // ---
        let page = json!({ "results": [], "next_cursor": null });
        assert_eq!(parse_page(&page), (Vec::new(), 0));
        assert_eq!(next_cursor(&page), None);

        let empty_cursor = json!({ "results": [], "next_cursor": "" });
        assert_eq!(next_cursor(&empty_cursor), None);

        let malformed = json!({ "data": [] });
        assert_eq!(parse_page(&malformed).0.len(), 0);
    }
}
