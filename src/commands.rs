use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backing::KeyValueStore;
use crate::checkout::{
    complete_booking, BookingConfirmation, BookingSummary, CurrencyConverter, CustomerDetails,
};
use crate::comments::{sort_comments, CommentSort, ReactionTarget};
use crate::config::AppConfig;
use crate::identity::{IdentityProvider, ProfileUpdate, Registration};
use crate::mock::EventSource;
use crate::models::{
    Comment, Event, MediaItem, NewEvent, Reactions, Reply, SavedEvent, TicketType, User,
};
use crate::search::{saved_counts, SavedEventsQuery, SearchFilters};
use crate::stats::{AccountStats, OrganizerStats};
use crate::store::EventStore;
use crate::tickets::ticket_types_for;
use crate::utils;

/// Create-event form as submitted. `tags` is the raw comma separated input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub price: f64,
    pub max_attendees: u32,
    pub image_url: String,
    pub tags: String,
    pub is_virtual: bool,
    pub virtual_link: String,
    pub media: Vec<MediaItem>,
    pub ticket_types: Vec<TicketType>,
    pub payment_methods: Vec<String>,
}

pub type FormErrors = BTreeMap<&'static str, &'static str>;

impl EventForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::new();
        if self.title.trim().is_empty() {
            errors.insert("title", "Event title is required");
        }
        if self.description.trim().is_empty() {
            errors.insert("description", "Event description is required");
        }
        if self.category.is_empty() {
            errors.insert("category", "Category is required");
        }
        if self.location.trim().is_empty() && !self.is_virtual {
            errors.insert("location", "Location is required for physical events");
        }
        if self.start_date.is_none() {
            errors.insert("startDate", "Start date is required");
        }
        match (self.start_date, self.end_date) {
            (_, None) => {
                errors.insert("endDate", "End date is required");
            }
            (Some(start), Some(end)) if end <= start => {
                errors.insert("endDate", "End date must be after start date");
            }
            _ => {}
        }
        if self.max_attendees < 1 {
            errors.insert("maxAttendees", "Maximum attendees must be at least 1");
        }
        if self.is_virtual && self.virtual_link.trim().is_empty() {
            errors.insert("virtualLink", "Virtual link is required for virtual events");
        }
        if self.media.is_empty() && self.image_url.trim().is_empty() {
            errors.insert(
                "media",
                "Please add at least one image or provide an image URL",
            );
        }
        let paid = self.price > 0.0 || self.ticket_types.iter().any(|t| t.price > 0.0);
        if paid && self.payment_methods.is_empty() {
            errors.insert(
                "paymentMethods",
                "Please select at least one payment method for paid events",
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Normalizes the form into store input for `organizer`: media order and
    /// primary flag follow list position, the cover falls back to the first
    /// media item, and a general tier is added when no ticket types were set.
    /// The listed price becomes the cheapest tier.
    pub fn into_new_event(self, organizer: &User) -> NewEvent {
        let media: Vec<MediaItem> = self
            .media
            .into_iter()
            .enumerate()
            .map(|(index, mut item)| {
                item.is_primary = index == 0;
                item.order = u32::try_from(index).unwrap_or(u32::MAX);
                item
            })
            .collect();

        let image_url = media
            .first()
            .map(|m| m.url.clone())
            .unwrap_or(self.image_url);

        let ticket_types = if self.ticket_types.is_empty() {
            vec![TicketType {
                id: "general".to_string(),
                name: "General Admission".to_string(),
                description: "Standard event access".to_string(),
                price: self.price,
                quantity: self.max_attendees,
                available: self.max_attendees,
                benefits: vec!["Event access".to_string()],
                is_limited: false,
                sold: 0,
            }]
        } else {
            self.ticket_types
        };
        let price = ticket_types
            .iter()
            .map(|t| t.price)
            .fold(f64::INFINITY, f64::min);

        let start_date = self.start_date.unwrap_or_default();
        NewEvent {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category,
            location: self.location.trim().to_string(),
            start_date,
            end_date: self.end_date.unwrap_or(start_date),
            price: if price.is_finite() { price } else { self.price },
            max_attendees: self.max_attendees,
            image_url,
            organizer_id: organizer.id.clone(),
            organizer_name: organizer.display_name().to_string(),
            tags: self
                .tags
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            is_virtual: self.is_virtual,
            virtual_link: Some(self.virtual_link.trim().to_string()).filter(|l| !l.is_empty()),
            media,
            ticket_types: Some(ticket_types),
            payment_methods: Some(self.payment_methods).filter(|m| !m.is_empty()),
        }
    }
}

fn join_errors(errors: &FormErrors) -> String {
    errors
        .values()
        .copied()
        .collect::<Vec<_>>()
        .join("; ")
}

/// Application state behind the UI. Every command returns a display-ready
/// error string.
pub struct App<B: KeyValueStore> {
    store: EventStore<Arc<B>>,
    identity: IdentityProvider<Arc<B>>,
    config: AppConfig,
}

impl<B: KeyValueStore> App<B> {
    pub fn open(
        backing: B,
        config: AppConfig,
        source: &mut dyn EventSource,
    ) -> Result<Self, String> {
        let shared = Arc::new(backing);
        let namespace = config.storage_namespace.as_str();
        let store = EventStore::load(Arc::clone(&shared), namespace, source)
            .map_err(|e| format!("failed to load events: {e}"))?;
        let identity = IdentityProvider::load(shared, namespace)
            .map_err(|e| format!("failed to restore session: {e}"))?;
        Ok(Self {
            store,
            identity,
            config,
        })
    }

    pub fn store(&self) -> &EventStore<Arc<B>> {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn converter(&self) -> CurrencyConverter {
        CurrencyConverter::new(self.config.usd_to_sll_rate)
    }

    fn require_user(&self, action: &str) -> Result<User, String> {
        self.identity
            .current_user()
            .cloned()
            .ok_or_else(|| format!("Please sign in to {action}"))
    }

    // Session

    pub fn current_user(&self) -> Option<&User> {
        self.identity.current_user()
    }

    pub fn register(&mut self, registration: Registration) -> Result<User, String> {
        if registration.email.trim().is_empty() {
            return Err("Email is required".into());
        }
        self.identity.register(registration).map_err(|e| e.to_string())
    }

    pub fn login(&mut self, user: User) -> Result<(), String> {
        self.identity.login(user).map_err(|e| e.to_string())
    }

    pub fn logout(&mut self) -> Result<(), String> {
        self.identity.logout().map_err(|e| e.to_string())
    }

    pub fn update_profile(&mut self, update: ProfileUpdate) -> Result<User, String> {
        self.require_user("update your profile")?;
        self.identity.update_user(update).map_err(|e| e.to_string())
    }

    // Catalog

    pub fn list_events(&self) -> Vec<Event> {
        self.store.events().to_vec()
    }

    pub fn event(&self, event_id: &str) -> Result<Event, String> {
        self.store
            .get_event(event_id)
            .cloned()
            .ok_or_else(|| format!("event {event_id} not found"))
    }

    pub fn search(&self, query: &str, filters: &SearchFilters) -> Vec<Event> {
        self.store.search_events(query.trim(), filters)
    }

    /// Events the signed-in user organizes.
    pub fn my_events(&self) -> Vec<Event> {
        match self.identity.current_user() {
            Some(user) => self
                .store
                .user_events()
                .iter()
                .filter(|e| e.organizer_id == user.id)
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Dashboard figures for the signed-in organizer.
    pub fn organizer_stats(&self) -> Result<OrganizerStats, String> {
        self.require_user("view your dashboard")?;
        Ok(self.store.organizer_stats())
    }

    pub fn account_stats(&self) -> Result<AccountStats, String> {
        let user = self.require_user("view your account")?;
        Ok(self.store.account_stats(Some(&user)))
    }

    pub fn create_event(&mut self, form: EventForm) -> Result<Event, String> {
        let user = self.require_user("create events")?;
        form.validate().map_err(|errors| join_errors(&errors))?;
        let data = form.into_new_event(&user);
        self.store.create_event(data).map_err(|e| e.to_string())
    }

    // Attendance

    pub fn attend(&mut self, event_id: &str) -> Result<bool, String> {
        let user = self.require_user("attend events")?;
        self.store
            .attend_event(event_id, &user.id)
            .map_err(|e| e.to_string())
    }

    pub fn unattend(&mut self, event_id: &str) -> Result<(), String> {
        let user = self.require_user("manage attendance")?;
        self.store
            .unattend_event(event_id, &user.id)
            .map_err(|e| e.to_string())
    }

    // Saved events

    /// Saves or unsaves, returning whether the event is saved afterwards.
    pub fn toggle_save(&mut self, event_id: &str) -> Result<bool, String> {
        self.require_user("save events")?;
        if self.store.is_event_saved(event_id) {
            self.store.unsave_event(event_id).map_err(|e| e.to_string())?;
            Ok(false)
        } else if self.store.save_event(event_id).map_err(|e| e.to_string())? {
            Ok(true)
        } else {
            Err(format!("event {event_id} not found"))
        }
    }

    pub fn saved_view(&self, query: &SavedEventsQuery) -> (Vec<SavedEvent>, (usize, usize)) {
        let now = Utc::now();
        let saved = self.store.saved_events();
        (query.apply(saved, now), saved_counts(saved, now))
    }

    pub fn clear_saved(&mut self) -> Result<(), String> {
        self.store.clear_all_saved_events().map_err(|e| e.to_string())
    }

    // Comments

    pub fn comments(&self, event_id: &str, sort: CommentSort) -> Result<Vec<Comment>, String> {
        let event = self.event(event_id)?;
        Ok(sort_comments(&event.comments, sort))
    }

    pub fn post_comment(&mut self, event_id: &str, content: &str) -> Result<Comment, String> {
        let user = self.require_user("comment")?;
        let content = non_empty(content)?;
        let comment = Comment {
            id: utils::next_id(),
            event_id: event_id.to_string(),
            user_id: user.id.clone(),
            author: user.display_name().to_string(),
            content,
            timestamp: Utc::now(),
            reactions: Reactions::new(),
            replies: Vec::new(),
            is_edited: false,
        };
        self.store
            .add_comment(event_id, comment.clone())
            .map_err(|e| e.to_string())?;
        Ok(comment)
    }

    pub fn post_reply(
        &mut self,
        event_id: &str,
        comment_id: &str,
        content: &str,
    ) -> Result<Reply, String> {
        let user = self.require_user("reply")?;
        let content = non_empty(content)?;
        let reply = Reply {
            id: utils::next_id(),
            parent_id: comment_id.to_string(),
            user_id: user.id.clone(),
            author: user.display_name().to_string(),
            content,
            timestamp: Utc::now(),
            reactions: Reactions::new(),
        };
        self.store
            .reply_to_comment(event_id, comment_id, reply.clone())
            .map_err(|e| e.to_string())?;
        Ok(reply)
    }

    pub fn react(
        &mut self,
        event_id: &str,
        target: ReactionTarget<'_>,
        reaction_id: &str,
    ) -> Result<(), String> {
        let user = self.require_user("react")?;
        self.store
            .react_to_comment(event_id, target, reaction_id, &user.id)
            .map_err(|e| e.to_string())
    }

    pub fn edit_comment(
        &mut self,
        event_id: &str,
        comment_id: &str,
        content: &str,
    ) -> Result<(), String> {
        self.require_author(event_id, comment_id)?;
        let content = non_empty(content)?;
        self.store
            .edit_comment(event_id, comment_id, &content)
            .map_err(|e| e.to_string())
    }

    pub fn delete_comment(&mut self, event_id: &str, comment_id: &str) -> Result<(), String> {
        self.require_author(event_id, comment_id)?;
        self.store
            .delete_comment(event_id, comment_id)
            .map_err(|e| e.to_string())
    }

    pub fn report_comment(&self, event_id: &str, comment_id: &str) -> Result<(), String> {
        self.store
            .report_comment(event_id, comment_id)
            .map_err(|e| e.to_string())
    }

    fn require_author(&self, event_id: &str, comment_id: &str) -> Result<(), String> {
        let user = self.require_user("manage comments")?;
        let event = self.event(event_id)?;
        let comment = event
            .find_comment(comment_id)
            .ok_or_else(|| format!("comment {comment_id} not found"))?;
        if comment.user_id != user.id {
            return Err("Only the author can change this comment".into());
        }
        Ok(())
    }

    // Ticketing

    pub fn ticket_options(&self, event_id: &str) -> Result<Vec<TicketType>, String> {
        Ok(ticket_types_for(&self.event(event_id)?))
    }

    pub fn book_tickets(
        &self,
        event_id: &str,
        selections: &BTreeMap<String, i64>,
        customer: CustomerDetails,
        method_id: &str,
    ) -> Result<BookingConfirmation, String> {
        self.require_user("book tickets")?;
        let event = self.event(event_id)?;
        let summary = BookingSummary::build(&event, selections, &self.converter())
            .map_err(|e| e.to_string())?;
        complete_booking(&event, summary, customer, method_id).map_err(|e| e.to_string())
    }
}

fn non_empty(content: &str) -> Result<String, String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err("Comment cannot be empty".into());
    }
    Ok(trimmed.to_string())
}
