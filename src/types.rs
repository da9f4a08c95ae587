use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Group,
    #[serde(other)]
    Individual,
}

impl SessionType {
    pub fn is_group(self) -> bool {
        self == SessionType::Group
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Online,
    Offline,
}

impl SessionMode {
    pub fn is_online(self) -> bool {
        self == SessionMode::Online
    }
}

/// The bookable offering a slot belongs to. Owned by another system, this
/// service only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub session_type: SessionType,
    pub session_mode: SessionMode,
}

/// One (label, link) pair shown to attendees of an online session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct OnlineSessionDetail {
    #[serde(rename = "Name")]
    #[validate(length(min = 3, max = 25))]
    pub name: String,
    #[serde(rename = "Value")]
    #[validate(length(min = 3, max = 255))]
    pub value: String,
}

impl OnlineSessionDetail {
    pub fn preset(name: &str) -> Self {
        Self {
            name: name.into(),
            value: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSlot {
    pub id: Uuid,
    pub slot_code: String,
    pub session_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub seats: u32,
    pub available_seats: u32,
    pub booked_seats: u32,
    pub online_session_details: Vec<OnlineSessionDetail>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A submission that passed form validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotInput {
    pub session_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub seats: u32,
    pub online_session_details: Vec<OnlineSessionDetail>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCancellation {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub reason: String,
    pub cancelled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRating {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub rating: u8,
    pub review: String,
    pub created_at: DateTime<Utc>,
}
