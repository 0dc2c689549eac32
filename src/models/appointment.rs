use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub contact_no: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AcType {
    #[serde(rename = "SPLIT")]
    Split,
    #[serde(rename = "WINDOW")]
    Window,
    /// Only meaningful when an inventory item is attached to the appointment.
    #[serde(rename = "NONE")]
    Unspecified,
}

impl AcType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcType::Split => "SPLIT",
            AcType::Window => "WINDOW",
            AcType::Unspecified => "NONE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SPLIT" => Some(AcType::Split),
            "WINDOW" => Some(AcType::Window),
            "NONE" => Some(AcType::Unspecified),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AcType::Split => "Split",
            AcType::Window => "Window",
            AcType::Unspecified => "None",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceKind {
    Cleaning,
    Repair,
    Installation,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Cleaning => "CLEANING",
            ServiceKind::Repair => "REPAIR",
            ServiceKind::Installation => "INSTALLATION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CLEANING" => Some(ServiceKind::Cleaning),
            "REPAIR" => Some(ServiceKind::Repair),
            "INSTALLATION" => Some(ServiceKind::Installation),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::Cleaning => "Cleaning",
            ServiceKind::Repair => "Repair",
            ServiceKind::Installation => "Installation",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppointmentStatus {
    Todo,
    Done,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Todo => "TODO",
            AppointmentStatus::Done => "DONE",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TODO" => Some(AppointmentStatus::Todo),
            "DONE" => Some(AppointmentStatus::Done),
            "CANCELLED" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Only open appointments move, and only forward.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        matches!(
            (self, next),
            (AppointmentStatus::Todo, AppointmentStatus::Done)
                | (AppointmentStatus::Todo, AppointmentStatus::Cancelled)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Appointment {
    pub id: i64,
    pub customer: Customer,
    pub address: String,
    pub ac_type: AcType,
    pub ac_unit: Option<i64>,
    pub service: ServiceKind,
    pub quantity: u8,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

/// A validated appointment payload that has not been written yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewAppointment {
    pub customer: Customer,
    pub address: String,
    pub ac_type: AcType,
    pub ac_unit: Option<i64>,
    pub service: ServiceKind,
    pub quantity: u8,
    pub scheduled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use AppointmentStatus::*;
        assert!(Todo.can_transition_to(Done));
        assert!(Todo.can_transition_to(Cancelled));
        assert!(!Todo.can_transition_to(Todo));
        assert!(!Done.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Done));
        assert!(!Done.can_transition_to(Todo));
        assert!(!Cancelled.can_transition_to(Todo));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(AppointmentStatus::parse("cancelled"), Some(AppointmentStatus::Cancelled));
        assert_eq!(ServiceKind::parse("installation"), Some(ServiceKind::Installation));
        assert_eq!(AcType::parse("split"), Some(AcType::Split));
        assert_eq!(AcType::parse("NONE"), Some(AcType::Unspecified));
        assert_eq!(AppointmentStatus::parse("pending"), None);
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&AcType::Unspecified).unwrap();
        assert_eq!(json, "\"NONE\"");
        let status: AppointmentStatus = serde_json::from_str("\"DONE\"").unwrap();
        assert_eq!(status, AppointmentStatus::Done);
    }
}
