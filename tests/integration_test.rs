//! End-to-end checks against a running server.
//!
//! Start the service first, then run with:
//! `BASE_URL=http://localhost:8080 cargo test --test integration_test -- --ignored`

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

const OWNER_HEADER: &str = "x-owner-id";

#[derive(Debug, Deserialize)]
struct SensorReading {
    #[serde(rename = "type")]
    sensor_type: String,
    value: f64,
    location: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct AlertList {
    unread: usize,
    alerts: Vec<serde_json::Value>,
}

fn base_url() -> String {
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into())
}

/// Fresh owner per run so repeated runs do not see each other's data.
fn test_owner(tag: &str) -> String {
    format!("it-{tag}-{}", Utc::now().timestamp_millis())
}

#[tokio::test]
#[ignore = "needs a running server"]
async fn posted_readings_come_back_filtered() -> Result<()> {
    // ---
    let base = base_url();
    let owner = test_owner("readings");
    let client = Client::new();

    for (sensor_type, value, location) in [
        ("temperature", 21.0, "Zone Nord"),
        ("temperature", 22.5, "Zone Nord"),
        ("water", 64.0, "Zone Sud"),
    ] {
        let response = client
            .post(format!("{base}/readings"))
            .header(OWNER_HEADER, &owner)
            .json(&json!({
                "type": sensor_type,
                "value": value,
                "unit": if sensor_type == "water" { "%" } else { "°C" },
                "location": location,
            }))
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let readings: Vec<SensorReading> = client
        .get(format!("{base}/readings?type=temperature&order=desc"))
        .header(OWNER_HEADER, &owner)
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(readings.len(), 2, "unexpected readings: {readings:?}");
    assert!(readings.iter().all(|r| r.sensor_type == "temperature"));
    assert!(readings.iter().all(|r| r.location == "Zone Nord"));
    assert!(
        readings[0].timestamp > readings[1].timestamp,
        "newest first"
    );

    let locations: Vec<String> = client
        .get(format!("{base}/locations"))
        .header(OWNER_HEADER, &owner)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(locations, vec!["Zone Nord", "Zone Sud"]);

    Ok(())
}

#[tokio::test]
#[ignore = "needs a running server"]
async fn alerts_round_trip() -> Result<()> {
    // ---
    let base = base_url();
    let owner = test_owner("alerts");
    let client = Client::new();

    let dry = json!({ "type": "water", "value": 12.0, "unit": "%", "location": "Zone Sud" });
    let response = client
        .post(format!("{base}/readings"))
        .header(OWNER_HEADER, &owner)
        .json(&dry)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let list: AlertList = client
        .get(format!("{base}/alerts?view=unread"))
        .header(OWNER_HEADER, &owner)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(list.unread, 1);
    let id = list.alerts[0]["id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    assert!(!id.is_empty());

    for _ in 0..2 {
        let response = client
            .put(format!("{base}/alerts/{id}/read"))
            .header(OWNER_HEADER, &owner)
            .send()
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let list: AlertList = client
        .get(format!("{base}/alerts"))
        .header(OWNER_HEADER, &owner)
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(list.unread, 0);
    assert_eq!(list.alerts.len(), 1);

    Ok(())
}

#[tokio::test]
#[ignore = "needs a running server"]
async fn csv_export_downloads() -> Result<()> {
    // ---
    let base = base_url();
    let owner = test_owner("export");
    let client = Client::new();

    let humid = json!({ "type": "humidity", "value": 61.5, "unit": "%", "location": "Zone Est" });
    client
        .post(format!("{base}/readings"))
        .header(OWNER_HEADER, &owner)
        .json(&humid)
        .send()
        .await?
        .error_for_status()?;

    let response = client
        .get(format!("{base}/readings/export?format=csv"))
        .header(OWNER_HEADER, &owner)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let csv = response.text().await?;
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Type,Valeur,Unité,Emplacement,Date"));
    let row = lines.next().unwrap_or_default();
    assert!(row.starts_with("humidity,61.5,%,Zone Est,"), "row: {row}");

    let value: f64 = row.split(',').nth(1).unwrap_or_default().parse()?;
    assert!((value - 61.5).abs() < f64::EPSILON);

    Ok(())
}
