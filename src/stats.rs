use serde::Serialize;

use crate::backing::KeyValueStore;
use crate::models::{Event, User};
use crate::store::EventStore;

/// Dashboard figures over the events the current user created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizerStats {
    pub total_events: usize,
    pub total_attendees: u64,
    /// Sum of `price * currentAttendees`, in dollars.
    pub total_revenue: f64,
    /// Attendees per event; 0 without events.
    pub average_attendance: f64,
}

impl OrganizerStats {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut stats = Self::default();
        for event in events {
            stats.total_events += 1;
            stats.total_attendees += u64::from(event.current_attendees);
            stats.total_revenue += event.price * f64::from(event.current_attendees);
        }
        if stats.total_events > 0 {
            stats.average_attendance = stats.total_attendees as f64 / stats.total_events as f64;
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountStats {
    pub events_created: usize,
    pub events_attended: usize,
    pub events_saved: usize,
    /// Percentage of filled profile fields, 0..=100.
    pub profile_completeness: u8,
}

impl<B: KeyValueStore> EventStore<B> {
    /// Counts come from the live catalog entry of each created event; the
    /// `userEvents` snapshot is used only when the event left the catalog.
    pub fn organizer_stats(&self) -> OrganizerStats {
        OrganizerStats::from_events(
            self.user_events
                .iter()
                .map(|created| self.get_event(&created.id).unwrap_or(created)),
        )
    }

    pub fn account_stats(&self, user: Option<&User>) -> AccountStats {
        AccountStats {
            events_created: self.user_events.len(),
            events_attended: self.attended_events.len(),
            events_saved: self.saved_events.len(),
            profile_completeness: user.map_or(0, profile_completeness),
        }
    }
}

pub fn profile_completeness(user: &User) -> u8 {
    let filled = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());
    let fields = [
        !user.name.trim().is_empty(),
        !user.email.trim().is_empty(),
        filled(&user.bio),
        filled(&user.location),
        filled(&user.profile_picture),
        !user.interests.is_empty(),
        filled(&user.phone),
        filled(&user.occupation),
    ];
    let done = fields.iter().filter(|f| **f).count();
    ((done * 100) as f64 / fields.len() as f64).round() as u8
}
