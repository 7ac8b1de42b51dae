//! WebSocket frames, `{"event": "...", "data": {...}}`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Advice attached to every expiry notification
pub const EXPIRY_RECOMMENDATIONS: [&str; 3] = [
    "Check whether you need to move your vehicle",
    "Consider extending your parking time if possible",
    "Watch out for parking tickets",
];

/// Commands accepted from clients
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    StartParkingTimer {
        #[serde(rename = "parkingId", deserialize_with = "parking_id")]
        parking_id: i32,
        duration: Option<i64>,
    },
    CancelParkingTimer,
    GetTimerStatus,
}

/// Parking ids arrive as numbers or numeric strings
fn parking_id<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i32),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(id) => Ok(id),
        RawId::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Events pushed to clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected(Connected),
    TimerStarted(TimerStarted),
    TimerCancelled(TimerCancelled),
    TimerStatus(TimerStatus),
    TimerError(TimerErrorEvent),
    ParkingTimeExpired(ParkingTimeExpired),
    Notification(Notification),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connected {
    pub message: String,
    pub user_id: i32,
    pub connection_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

impl Connected {
    pub fn new(user_id: i32, connection_id: Uuid) -> Self {
        Self {
            message: "WebSocket connection established".to_string(),
            user_id,
            connection_id,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStarted {
    pub message: String,
    pub parking_id: i32,
    pub duration: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerCancelled {
    pub message: String,
    pub parking_id: i32,
    pub timestamp: DateTime<Utc>,
}

/// Snapshot of a user's timer. Inactive snapshots carry only a message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TimerStatus {
    pub fn inactive() -> Self {
        Self {
            active: false,
            parking_id: None,
            duration: None,
            elapsed: None,
            remaining: None,
            start_time: None,
            message: Some("No active timer".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerErrorEvent {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking_id: Option<i32>,
    pub timestamp: DateTime<Utc>,
}

impl TimerErrorEvent {
    pub fn new(error: impl Into<String>, parking_id: Option<i32>) -> Self {
        Self {
            error: error.into(),
            parking_id,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingTimeExpired {
    pub message: String,
    pub parking_id: i32,
    pub location: String,
    pub duration: u64,
    pub expired_at: DateTime<Utc>,
    pub recommendations: Vec<String>,
}

impl ParkingTimeExpired {
    pub fn new(parking_id: i32, location: String, duration: u64) -> Self {
        Self {
            message: "Parking time expired".to_string(),
            parking_id,
            location,
            duration,
            expired_at: Utc::now(),
            recommendations: EXPIRY_RECOMMENDATIONS
                .iter()
                .map(|r| r.to_string())
                .collect(),
        }
    }
}

/// Free-form message pushed to every connection of a user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(mut payload: Map<String, Value>) -> Self {
        payload.remove("timestamp");
        Self {
            payload,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_command() {
        let command: ClientCommand = serde_json::from_str(
            r#"{"event":"start_parking_timer","data":{"parkingId":7,"duration":5}}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            ClientCommand::StartParkingTimer {
                parking_id: 7,
                duration: Some(5)
            }
        );

        let command: ClientCommand =
            serde_json::from_str(r#"{"event":"start_parking_timer","data":{"parkingId":7}}"#)
                .unwrap();
        assert_eq!(
            command,
            ClientCommand::StartParkingTimer {
                parking_id: 7,
                duration: None
            }
        );
    }

    #[test]
    fn test_parse_string_parking_id() {
        let command: ClientCommand = serde_json::from_str(
            r#"{"event":"start_parking_timer","data":{"parkingId":"7","duration":5}}"#,
        )
        .unwrap();
        assert_eq!(
            command,
            ClientCommand::StartParkingTimer {
                parking_id: 7,
                duration: Some(5)
            }
        );

        assert!(
            serde_json::from_str::<ClientCommand>(
                r#"{"event":"start_parking_timer","data":{"parkingId":"seven"}}"#
            )
            .is_err()
        );
    }

    #[test]
    fn test_parse_unit_commands() {
        let command: ClientCommand =
            serde_json::from_str(r#"{"event":"cancel_parking_timer"}"#).unwrap();
        assert_eq!(command, ClientCommand::CancelParkingTimer);

        let command: ClientCommand =
            serde_json::from_str(r#"{"event":"get_timer_status","data":null}"#).unwrap();
        assert_eq!(command, ClientCommand::GetTimerStatus);
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(serde_json::from_str::<ClientCommand>(r#"{"event":"pause_timer"}"#).is_err());
        assert!(serde_json::from_str::<ClientCommand>("not json").is_err());
    }

    #[test]
    fn test_expired_event_shape() {
        let event = ServerEvent::ParkingTimeExpired(ParkingTimeExpired::new(
            7,
            "12 Rue de Rivoli".to_string(),
            5,
        ));

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "parking_time_expired");
        assert_eq!(json["data"]["parkingId"], 7);
        assert_eq!(json["data"]["location"], "12 Rue de Rivoli");
        assert_eq!(json["data"]["recommendations"].as_array().unwrap().len(), 3);
        assert!(json["data"]["expiredAt"].is_string());
    }

    #[test]
    fn test_notification_shape() {
        let mut payload = Map::new();
        payload.insert("title".to_string(), Value::from("Street cleaning"));
        payload.insert("timestamp".to_string(), Value::from("forged"));

        let json =
            serde_json::to_value(ServerEvent::Notification(Notification::new(payload))).unwrap();
        assert_eq!(json["event"], "notification");
        assert_eq!(json["data"]["title"], "Street cleaning");
        assert_ne!(json["data"]["timestamp"], "forged");
    }

    #[test]
    fn test_inactive_status_shape() {
        let json = serde_json::to_value(ServerEvent::TimerStatus(TimerStatus::inactive())).unwrap();
        assert_eq!(json["event"], "timer_status");
        assert_eq!(json["data"]["active"], false);
        assert!(json["data"].get("remaining").is_none());
    }

    #[test]
    fn test_error_event_omits_missing_parking() {
        let json = serde_json::to_value(ServerEvent::TimerError(TimerErrorEvent::new(
            "No active timer to cancel",
            None,
        )))
        .unwrap();
        assert_eq!(json["event"], "timer_error");
        assert!(json["data"].get("parkingId").is_none());
    }
}
