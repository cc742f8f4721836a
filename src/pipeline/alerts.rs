//! Threshold evaluation and alert list views.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::models::{AlertEvent, SensorReading, SensorType, Severity, StoredAlert, Thresholds};

// ---

/// Check one reading against its type's band. Strictly below `min` or
/// strictly above `max` raises a high-severity alert stamped with the
/// reading's own timestamp; a type without a threshold never alerts.
pub fn evaluate_reading(reading: &SensorReading, thresholds: &Thresholds) -> Option<AlertEvent> {
    // ---
    let band = thresholds.get(reading.sensor_type)?;
    let label = reading.sensor_type.label();
    let (value, unit) = (reading.value, &reading.unit);

    let (min, max) = (band.min(), band.max());

    let message = if value < min {
        format!("{label} sous le seuil minimum ({value}{unit} < {min})")
    } else if value > max {
        format!("{label} au-dessus du seuil maximum ({value}{unit} > {max})")
    } else {
        return None;
    };

    Some(AlertEvent {
        sensor_type: reading.sensor_type,
        severity: Severity::High,
        message,
        location: reading.location.clone(),
        timestamp: reading.timestamp,
        is_read: false,
        owner_id: reading.owner_id.clone(),
    })
}

/// Evaluate the latest reading of every type, in sensor-type order.
pub fn evaluate_thresholds(
    latest_per_type: &BTreeMap<SensorType, SensorReading>,
    thresholds: &Thresholds,
) -> Vec<AlertEvent> {
    // ---
    latest_per_type
        .values()
        .filter_map(|reading| evaluate_reading(reading, thresholds))
        .collect()
}

/// Which alerts an alert list shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertView {
    // ---
    #[default]
    All,
    Unread,
    High,
}

/// Alerts for a view, newest first.
pub fn select_alerts(alerts: Vec<StoredAlert>, view: AlertView) -> Vec<StoredAlert> {
    // ---
    let mut selected: Vec<StoredAlert> = alerts
        .into_iter()
        .filter(|a| match view {
            AlertView::All => true,
            AlertView::Unread => !a.event.is_read,
            AlertView::High => a.event.severity == Severity::High,
        })
        .collect();
    selected.sort_by(|a, b| b.event.timestamp.cmp(&a.event.timestamp));
    selected
}

pub fn unread_count(alerts: &[StoredAlert]) -> usize {
    alerts.iter().filter(|a| !a.event.is_read).count()
}

/// The fixed set of demonstration alerts injected on request.
pub fn demo_alerts(owner_id: &str, now: DateTime<Utc>) -> Vec<AlertEvent> {
    // ---
    let alert = |sensor_type, message: &str, severity, location: &str, hours_ago| AlertEvent {
        sensor_type,
        severity,
        message: message.to_string(),
        location: location.to_string(),
        timestamp: now - Duration::hours(hours_ago),
        is_read: false,
        owner_id: owner_id.to_string(),
    };

    vec![
        alert(
            SensorType::Temperature,
            "Température élevée détectée",
            Severity::High,
            "Zone Nord",
            0,
        ),
        alert(
            SensorType::Humidity,
            "Niveau d'humidité bas",
            Severity::Medium,
            "Zone Est",
            1,
        ),
        alert(
            SensorType::Water,
            "Niveau d'eau critique",
            Severity::High,
            "Zone Sud",
            2,
        ),
    ]
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::AlertThreshold;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 15, 0, 0).unwrap()
    }

    fn reading(sensor_type: SensorType, value: f64) -> SensorReading {
        // ---
        SensorReading {
            id: format!("{sensor_type}-{value}"),
            sensor_id: None,
            sensor_type,
            value,
            unit: "°C".to_string(),
            location: "Zone Ouest".to_string(),
            timestamp: now() - Duration::minutes(5),
            owner_id: "farm-1".to_string(),
        }
    }

    #[test]
    fn test_band_edges_do_not_alert() {
        // ---
        let thresholds = Thresholds::default();
        let temp = |value| reading(SensorType::Temperature, value);
        assert!(evaluate_reading(&temp(15.0), &thresholds).is_none());
        assert!(evaluate_reading(&temp(30.0), &thresholds).is_none());
        assert!(evaluate_reading(&temp(22.0), &thresholds).is_none());
    }

    #[test]
    fn test_excursions_raise_high_alerts() {
        // ---
        let thresholds = Thresholds::default();
        let temp = |value| reading(SensorType::Temperature, value);

        let hot = evaluate_reading(&temp(30.1), &thresholds).unwrap();
        assert_eq!(hot.severity, Severity::High);
        assert_eq!(hot.location, "Zone Ouest");
        assert_eq!(hot.timestamp, now() - Duration::minutes(5));
        assert!(!hot.is_read);
        assert_eq!(
            hot.message,
            "Température au-dessus du seuil maximum (30.1°C > 30)"
        );

        let cold = evaluate_reading(&temp(14.5), &thresholds).unwrap();
        assert_eq!(
            cold.message,
            "Température sous le seuil minimum (14.5°C < 15)"
        );
    }

    #[test]
    fn test_unconfigured_type_never_alerts() {
        // ---
        let mut thresholds = Thresholds::empty();
        let band = AlertThreshold::new(30.0, 90.0).unwrap();
        thresholds.set(SensorType::Water, band);

        let latest = BTreeMap::from([
            (SensorType::Temperature, reading(SensorType::Temperature, 99.0)),
            (SensorType::Water, reading(SensorType::Water, 12.0)),
        ]);

        let alerts = evaluate_thresholds(&latest, &thresholds);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].sensor_type, SensorType::Water);
    }

    #[test]
    fn test_views_and_unread_count() {
        // ---
        let mut stored: Vec<StoredAlert> = demo_alerts("farm-1", now())
            .into_iter()
            .enumerate()
            .map(|(i, event)| StoredAlert {
                id: format!("a{i}"),
                event,
            })
            .collect();
        stored.reverse();
        stored[0].event.mark_read();

        assert_eq!(unread_count(&stored), 2);

        let all = select_alerts(stored.clone(), AlertView::All);
        let ids: Vec<&str> = all.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a0", "a1", "a2"]);

        let unread = select_alerts(stored.clone(), AlertView::Unread);
        assert_eq!(unread.len(), 2);
        assert!(unread.iter().all(|a| a.id != "a2"));

        let high = select_alerts(stored, AlertView::High);
        let ids: Vec<&str> = high.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a0", "a2"]);
    }

    #[test]
    fn test_demo_alerts() {
        // ---
        let alerts = demo_alerts("demo", now());
        assert_eq!(alerts.len(), 3);
        assert!(alerts.iter().all(|a| a.owner_id == "demo" && !a.is_read));
        assert_eq!(alerts[1].severity, Severity::Medium);
        assert_eq!(alerts[2].timestamp, now() - Duration::hours(2));
    }
}
