use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A person listed in the meeting metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl Attendee {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            role: None,
        }
    }

    pub fn with_role(name: &str, role: &str) -> Self {
        Self {
            name: name.to_string(),
            role: Some(role.to_string()),
        }
    }
}

/// Attendance as supplied by the request layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attendance {
    /// A flat list; everyone in it counts as present
    Present(Vec<Attendee>),
    Split {
        #[serde(default)]
        present: Vec<Attendee>,
        #[serde(default)]
        absent: Vec<Attendee>,
    },
}

impl Default for Attendance {
    fn default() -> Self {
        Attendance::Split {
            present: vec![],
            absent: vec![],
        }
    }
}

impl Attendance {
    pub fn present(&self) -> &[Attendee] {
        match self {
            Attendance::Split { present, .. } => present,
            Attendance::Present(present) => present,
        }
    }

    pub fn absent(&self) -> &[Attendee] {
        match self {
            Attendance::Split { absent, .. } => absent,
            Attendance::Present(_) => &[],
        }
    }
}

/// Meeting metadata used by the refine stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeetingMetadata {
    #[serde(default)]
    pub title: Option<String>,
    /// Meeting date, YYYY-MM-DD
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub organizer: Option<String>,
    #[serde(default)]
    pub participants: Attendance,
    #[serde(default)]
    pub agenda: Vec<String>,
}

impl MeetingMetadata {
    pub const DEFAULT_TITLE: &'static str = "Meeting Protocol";

    pub fn title_or_default(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(Self::DEFAULT_TITLE)
    }

    /// The meeting date if present and well-formed
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d").ok())
    }

    /// True when a date was given but is not YYYY-MM-DD
    pub fn has_malformed_date(&self) -> bool {
        self.date.is_some() && self.parsed_date().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_split_attendance() {
        let json = r#"{
            "title": "Quarterly review",
            "date": "2025-07-20",
            "participants": {
                "present": [{"name": "Anna", "role": "Chair"}, {"name": "Boris"}],
                "absent": [{"name": "Clara"}]
            },
            "agenda": ["Budget", "Hiring"]
        }"#;
        let meta: MeetingMetadata = serde_json::from_str(json).unwrap();

        assert_eq!(meta.title_or_default(), "Quarterly review");
        assert_eq!(meta.participants.present().len(), 2);
        assert_eq!(meta.participants.present()[0], Attendee::with_role("Anna", "Chair"));
        assert_eq!(meta.participants.absent(), &[Attendee::new("Clara")]);
        assert_eq!(meta.parsed_date(), NaiveDate::from_ymd_opt(2025, 7, 20));
    }

    #[test]
    fn test_parse_flat_attendance() {
        let json = r#"{"participants": [{"name": "Anna"}]}"#;
        let meta: MeetingMetadata = serde_json::from_str(json).unwrap();

        assert_eq!(meta.participants.present().len(), 1);
        assert!(meta.participants.absent().is_empty());
        assert_eq!(meta.title_or_default(), MeetingMetadata::DEFAULT_TITLE);
    }

    #[test]
    fn test_malformed_date() {
        let meta = MeetingMetadata {
            date: Some("20.07.2025".to_string()),
            ..Default::default()
        };
        assert!(meta.has_malformed_date());
        assert!(meta.parsed_date().is_none());
    }
}
