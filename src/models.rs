use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reaction id (`"like"`, `"love"`, ...) to the ids of users holding it.
pub type Reactions = BTreeMap<String, Vec<String>>;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub price: f64,
    pub max_attendees: u32,
    pub current_attendees: u32,
    pub image_url: String,
    pub organizer_id: String,
    pub organizer_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub virtual_link: Option<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_types: Option<Vec<TicketType>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_methods: Option<Vec<String>>,
}

impl Event {
    pub fn is_free(&self) -> bool {
        self.price <= 0.0
    }

    pub fn is_full(&self) -> bool {
        self.current_attendees >= self.max_attendees
    }

    pub fn spots_left(&self) -> u32 {
        self.max_attendees.saturating_sub(self.current_attendees)
    }

    pub fn is_attending(&self, user_id: &str) -> bool {
        self.attendees.iter().any(|id| id == user_id)
    }

    pub fn find_comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    /// Image shown on cards: the primary media image, falling back to `imageUrl`.
    pub fn cover_image(&self) -> &str {
        self.media
            .iter()
            .find(|m| m.is_primary && m.kind == MediaKind::Image)
            .map(|m| m.url.as_str())
            .unwrap_or(&self.image_url)
    }
}

/// Caller-supplied fields for a new event; the store fills in the rest.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub price: f64,
    pub max_attendees: u32,
    pub image_url: String,
    pub organizer_id: String,
    pub organizer_name: String,
    pub tags: Vec<String>,
    pub is_virtual: bool,
    pub virtual_link: Option<String>,
    pub media: Vec<MediaItem>,
    pub ticket_types: Option<Vec<TicketType>>,
    pub payment_methods: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub name: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub author: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Reactions,
    #[serde(default)]
    pub replies: Vec<Reply>,
    #[serde(default)]
    pub is_edited: bool,
}

impl Comment {
    pub fn reaction_count(&self) -> usize {
        self.reactions.values().map(Vec::len).sum()
    }

    pub fn find_reply(&self, reply_id: &str) -> Option<&Reply> {
        self.replies.iter().find(|r| r.id == reply_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: String,
    pub parent_id: String,
    pub user_id: String,
    pub author: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub reactions: Reactions,
}

/// Point-in-time copy of an event, kept in the user's saved list.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedEvent {
    #[serde(flatten)]
    pub event: Event,
    pub saved_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketType {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub quantity: u32,
    pub available: u32,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub is_limited: bool,
    #[serde(default)]
    pub sold: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub notification_prefs: NotificationPrefs,
    #[serde(default)]
    pub privacy_settings: PrivacySettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name shown on comments and organizer cards.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.email
        } else {
            &self.name
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationPrefs {
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub sms_notifications: bool,
    pub event_reminders: bool,
    pub weekly_digest: bool,
    pub promotional_emails: bool,
    pub comment_notifications: bool,
    pub follower_notifications: bool,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            email_notifications: true,
            push_notifications: true,
            sms_notifications: false,
            event_reminders: true,
            weekly_digest: true,
            promotional_emails: false,
            comment_notifications: true,
            follower_notifications: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProfileVisibility {
    #[default]
    Public,
    Friends,
    Private,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivacySettings {
    pub profile_visibility: ProfileVisibility,
    pub show_email: bool,
    pub show_phone: bool,
    pub show_attended_events: bool,
    pub show_created_events: bool,
    pub allow_messages: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            profile_visibility: ProfileVisibility::Public,
            show_email: false,
            show_phone: false,
            show_attended_events: true,
            show_created_events: true,
            allow_messages: true,
        }
    }
}
