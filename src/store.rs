use chrono::Utc;

use crate::backing::{read_json, write_json, KeyValueStore};
use crate::error::{Result, StoreError};
use crate::mock::EventSource;
use crate::models::{Event, NewEvent, SavedEvent};
use crate::utils;

/// Persisted key names under one namespace prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub events: String,
    pub user_events: String,
    pub attended_events: String,
    pub saved_events: String,
    pub user: String,
}

impl StorageKeys {
    pub fn new(namespace: &str) -> Self {
        Self {
            events: format!("{namespace}_events"),
            user_events: format!("{namespace}_userEvents"),
            attended_events: format!("{namespace}_attendedEvents"),
            saved_events: format!("{namespace}_savedEvents"),
            user: format!("{namespace}_user"),
        }
    }
}

/// Canonical event collection plus the current user's derived lists.
///
/// Every mutation rewrites the affected collections to the backing store
/// before returning. Operations that target an absent id return
/// [`StoreError::NotFound`] and leave both memory and backing untouched.
pub struct EventStore<B: KeyValueStore> {
    pub(crate) backing: B,
    pub(crate) keys: StorageKeys,
    pub(crate) events: Vec<Event>,
    pub(crate) user_events: Vec<Event>,
    pub(crate) attended_events: Vec<Event>,
    pub(crate) saved_events: Vec<SavedEvent>,
}

impl<B: KeyValueStore> EventStore<B> {
    /// Restore persisted collections, seeding `events` from `source` when the
    /// backing store has never held them.
    pub fn load(backing: B, namespace: &str, source: &mut dyn EventSource) -> Result<Self> {
        let keys = StorageKeys::new(namespace);

        let events = match read_json::<Vec<Event>, _>(&backing, &keys.events)? {
            Some(events) => {
                log::info!("loaded {} events from {}", events.len(), keys.events);
                events
            }
            None => {
                let seeded = source.generate();
                write_json(&backing, &keys.events, &seeded)?;
                log::info!("seeded {} events into {}", seeded.len(), keys.events);
                seeded
            }
        };
        let user_events = read_json(&backing, &keys.user_events)?.unwrap_or_default();
        let attended_events = read_json(&backing, &keys.attended_events)?.unwrap_or_default();
        let saved_events = read_json(&backing, &keys.saved_events)?.unwrap_or_default();

        Ok(Self {
            backing,
            keys,
            events,
            user_events,
            attended_events,
            saved_events,
        })
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn user_events(&self) -> &[Event] {
        &self.user_events
    }

    pub fn attended_events(&self) -> &[Event] {
        &self.attended_events
    }

    pub fn saved_events(&self) -> &[SavedEvent] {
        &self.saved_events
    }

    pub fn get_event(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn create_event(&mut self, data: NewEvent) -> Result<Event> {
        validate_new_event(&data)?;

        let event = Event {
            id: utils::next_id(),
            title: data.title,
            description: data.description,
            category: data.category,
            location: data.location,
            start_date: data.start_date,
            end_date: data.end_date,
            price: data.price,
            max_attendees: data.max_attendees,
            current_attendees: 0,
            image_url: data.image_url,
            organizer_id: data.organizer_id,
            organizer_name: data.organizer_name,
            tags: data.tags,
            created_at: Utc::now(),
            attendees: Vec::new(),
            is_virtual: data.is_virtual,
            virtual_link: data.virtual_link,
            comments: Vec::new(),
            media: data.media,
            ticket_types: data.ticket_types,
            payment_methods: data.payment_methods,
        };

        self.events.push(event.clone());
        self.user_events.push(event.clone());
        self.persist_events()?;
        self.persist_user_events()?;

        log::debug!("created event {} ({})", event.id, event.title);
        Ok(event)
    }

    /// Returns `Ok(false)` when the user already attends or the event is full.
    pub fn attend_event(&mut self, event_id: &str, user_id: &str) -> Result<bool> {
        require_id("user id", user_id)?;
        let event = self.event_mut(event_id)?;
        if event.is_attending(user_id) || event.is_full() {
            return Ok(false);
        }

        let snapshot = event.clone();
        event.attendees.push(user_id.to_string());
        event.current_attendees += 1;

        if !self.attended_events.iter().any(|e| e.id == event_id) {
            self.attended_events.push(snapshot);
        }
        self.persist_events()?;
        self.persist_attended_events()?;

        log::debug!("user {user_id} attending event {event_id}");
        Ok(true)
    }

    /// Drops the event from `attendedEvents` even when the user was not
    /// listed as an attendee.
    pub fn unattend_event(&mut self, event_id: &str, user_id: &str) -> Result<()> {
        let event = self.event_mut(event_id)?;
        if event.is_attending(user_id) {
            event.attendees.retain(|id| id != user_id);
            event.current_attendees = event.current_attendees.saturating_sub(1);
        }

        self.attended_events.retain(|e| e.id != event_id);
        self.persist_events()?;
        self.persist_attended_events()?;

        log::debug!("user {user_id} no longer attending event {event_id}");
        Ok(())
    }

    /// `false` when the event does not exist or is already saved.
    pub fn save_event(&mut self, event_id: &str) -> Result<bool> {
        if self.is_event_saved(event_id) {
            return Ok(false);
        }
        let Some(event) = self.get_event(event_id) else {
            return Ok(false);
        };

        let saved = SavedEvent {
            event: event.clone(),
            saved_at: Utc::now(),
        };
        log::info!("event \"{}\" saved", saved.event.title);
        self.saved_events.push(saved);
        self.persist_saved_events()?;
        Ok(true)
    }

    /// Always `true`, whether or not a snapshot was removed.
    pub fn unsave_event(&mut self, event_id: &str) -> Result<bool> {
        let before = self.saved_events.len();
        self.saved_events.retain(|saved| saved.event.id != event_id);
        if self.saved_events.len() != before {
            log::info!("event {event_id} removed from saved events");
        }
        self.persist_saved_events()?;
        Ok(true)
    }

    pub fn is_event_saved(&self, event_id: &str) -> bool {
        self.saved_events.iter().any(|saved| saved.event.id == event_id)
    }

    pub fn clear_all_saved_events(&mut self) -> Result<()> {
        self.saved_events.clear();
        self.backing.remove(&self.keys.saved_events)?;
        log::info!("all saved events cleared");
        Ok(())
    }

    pub fn saved_events_count(&self) -> usize {
        self.saved_events.len()
    }

    pub fn saved_events_by_category(&self, category: &str) -> Vec<&SavedEvent> {
        self.saved_events
            .iter()
            .filter(|saved| saved.event.category == category)
            .collect()
    }

    pub(crate) fn event_mut(&mut self, event_id: &str) -> Result<&mut Event> {
        self.events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| StoreError::not_found("event", event_id))
    }

    pub(crate) fn persist_events(&self) -> Result<()> {
        write_json(&self.backing, &self.keys.events, &self.events)
    }

    fn persist_user_events(&self) -> Result<()> {
        write_json(&self.backing, &self.keys.user_events, &self.user_events)
    }

    fn persist_attended_events(&self) -> Result<()> {
        write_json(&self.backing, &self.keys.attended_events, &self.attended_events)
    }

    fn persist_saved_events(&self) -> Result<()> {
        write_json(&self.backing, &self.keys.saved_events, &self.saved_events)
    }
}

pub(crate) fn require_id(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{what} must not be empty")));
    }
    Ok(())
}

fn validate_new_event(data: &NewEvent) -> Result<()> {
    if !data.price.is_finite() || data.price < 0.0 {
        return Err(StoreError::Validation(format!(
            "price must be a non-negative number, got {}",
            data.price
        )));
    }
    if data.max_attendees == 0 {
        return Err(StoreError::Validation(
            "maxAttendees must be at least 1".to_string(),
        ));
    }
    for ticket in data.ticket_types.iter().flatten() {
        if !ticket.price.is_finite() || ticket.price < 0.0 {
            return Err(StoreError::Validation(format!(
                "ticket type {} has an invalid price",
                ticket.id
            )));
        }
        if ticket.quantity == 0 || ticket.available > ticket.quantity {
            return Err(StoreError::Validation(format!(
                "ticket type {} must have quantity > 0 and available <= quantity",
                ticket.id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backing::MemoryBacking;
    use chrono::{Duration, TimeZone};

    pub(crate) fn sample_event(id: &str, category: &str, price: f64, max: u32) -> Event {
        let start = Utc.with_ymd_and_hms(2030, 3, 1, 18, 0, 0).unwrap();
        Event {
            id: id.to_string(),
            title: format!("{category} night {id}"),
            description: "An evening in Freetown".to_string(),
            category: category.to_string(),
            location: "Freetown, Western Area".to_string(),
            start_date: start,
            end_date: start + Duration::hours(3),
            price,
            max_attendees: max,
            current_attendees: 0,
            image_url: String::new(),
            organizer_id: "org".to_string(),
            organizer_name: "Organizer".to_string(),
            tags: Vec::new(),
            created_at: start - Duration::days(10),
            attendees: Vec::new(),
            is_virtual: false,
            virtual_link: None,
            comments: Vec::new(),
            media: Vec::new(),
            ticket_types: None,
            payment_methods: None,
        }
    }

    pub(crate) fn store_with(events: Vec<Event>) -> EventStore<MemoryBacking> {
        let mut seed = events;
        EventStore::load(MemoryBacking::new(), "test", &mut seed).unwrap()
    }

    fn new_event(max: u32) -> NewEvent {
        let start = Utc.with_ymd_and_hms(2030, 5, 1, 10, 0, 0).unwrap();
        NewEvent {
            title: "Tech Meetup".to_string(),
            description: "Talks".to_string(),
            category: "Technology".to_string(),
            location: "Freetown, Western Area".to_string(),
            start_date: start,
            end_date: start + Duration::hours(2),
            max_attendees: max,
            organizer_id: "u1".to_string(),
            organizer_name: "Aminata".to_string(),
            ..NewEvent::default()
        }
    }

    #[test]
    fn keys_follow_namespace() {
        let keys = StorageKeys::new("sierraHub");
        assert_eq!(keys.events, "sierraHub_events");
        assert_eq!(keys.user_events, "sierraHub_userEvents");
        assert_eq!(keys.attended_events, "sierraHub_attendedEvents");
        assert_eq!(keys.saved_events, "sierraHub_savedEvents");
        assert_eq!(keys.user, "sierraHub_user");
    }

    #[test]
    fn load_seeds_only_when_events_key_missing() {
        let backing = MemoryBacking::new();
        let mut seed = vec![sample_event("1", "Music", 0.0, 10)];
        let store = EventStore::load(&backing, "test", &mut seed).unwrap();
        assert_eq!(store.events().len(), 1);

        let mut other_seed = vec![
            sample_event("7", "Arts", 0.0, 10),
            sample_event("8", "Arts", 0.0, 10),
        ];
        let reloaded = EventStore::load(&backing, "test", &mut other_seed).unwrap();
        assert_eq!(reloaded.events().len(), 1);
        assert_eq!(reloaded.events()[0].id, "1");
    }

    #[test]
    fn create_event_fills_system_fields_and_persists() {
        let mut store = store_with(Vec::new());
        let event = store.create_event(new_event(5)).unwrap();

        assert!(!event.id.is_empty());
        assert_eq!(event.current_attendees, 0);
        assert!(event.attendees.is_empty());
        assert!(event.comments.is_empty());
        assert_eq!(store.events().len(), 1);
        assert_eq!(store.user_events().len(), 1);

        let persisted: Vec<Event> = read_json(store.backing(), &store.keys().user_events)
            .unwrap()
            .unwrap();
        assert_eq!(persisted, vec![event]);
    }

    #[test]
    fn create_event_ids_are_distinct() {
        let mut store = store_with(Vec::new());
        let a = store.create_event(new_event(5)).unwrap();
        let b = store.create_event(new_event(5)).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn create_event_rejects_negative_price() {
        let mut store = store_with(Vec::new());
        let mut data = new_event(5);
        data.price = -1.0;
        let err = store.create_event(data).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.events().is_empty());
    }

    #[test]
    fn create_event_rejects_oversold_ticket_type() {
        let mut store = store_with(Vec::new());
        let mut ticket = crate::tickets::custom_ticket("VIP", "", 30.0, 10, &[], false).unwrap();
        ticket.available = 11;
        let mut data = new_event(5);
        data.ticket_types = Some(vec![ticket]);

        let err = store.create_event(data).unwrap_err();
        assert!(err.to_string().contains("quantity > 0 and available <= quantity"));
        assert!(store.events().is_empty());
    }

    #[test]
    fn create_event_accepts_sparse_payload() {
        let mut store = store_with(Vec::new());
        let data = NewEvent {
            max_attendees: 1,
            ..NewEvent::default()
        };
        assert!(store.create_event(data).is_ok());
    }

    #[test]
    fn capacity_one_admits_a_single_attendee() {
        let mut store = store_with(Vec::new());
        let id = store.create_event(new_event(1)).unwrap().id;

        assert!(store.attend_event(&id, "u1").unwrap());
        assert!(!store.attend_event(&id, "u2").unwrap());

        let event = store.get_event(&id).unwrap();
        assert_eq!(event.current_attendees, 1);
        assert_eq!(event.attendees, vec!["u1"]);
    }

    #[test]
    fn attend_is_idempotent() {
        let mut store = store_with(vec![sample_event("1", "Music", 0.0, 10)]);
        store.attend_event("1", "u1").unwrap();
        store.attend_event("1", "u1").unwrap();

        let event = store.get_event("1").unwrap();
        assert_eq!(event.attendees, vec!["u1"]);
        assert_eq!(event.current_attendees, 1);
        assert_eq!(store.attended_events().len(), 1);
    }

    #[test]
    fn attended_snapshot_is_pre_mutation() {
        let mut store = store_with(vec![sample_event("1", "Music", 0.0, 10)]);
        store.attend_event("1", "u1").unwrap();
        assert!(store.attended_events()[0].attendees.is_empty());
    }

    #[test]
    fn attend_missing_event_is_not_found() {
        let mut store = store_with(Vec::new());
        let err = store.attend_event("nope", "u1").unwrap_err();
        assert!(err.is_not_found());
        assert!(store.attended_events().is_empty());
    }

    #[test]
    fn attendee_count_tracks_list_through_sequences() {
        let mut store = store_with(vec![sample_event("1", "Music", 0.0, 3)]);
        let steps: [(&str, bool); 7] = [
            ("a", true),
            ("b", true),
            ("a", false),
            ("c", true),
            ("d", true),
            ("b", false),
            ("zz", false),
        ];
        for (user, attend) in steps {
            if attend {
                store.attend_event("1", user).unwrap();
            } else {
                store.unattend_event("1", user).unwrap();
            }
            let event = store.get_event("1").unwrap();
            assert_eq!(event.current_attendees as usize, event.attendees.len());
            assert!(event.current_attendees <= event.max_attendees);
        }
    }

    #[test]
    fn unattend_removes_from_attended_even_if_not_attending() {
        let mut store = store_with(vec![
            sample_event("1", "Music", 0.0, 10),
            sample_event("2", "Music", 0.0, 10),
        ]);
        store.attend_event("1", "u1").unwrap();
        store.unattend_event("1", "someone-else").unwrap();

        assert!(store.attended_events().is_empty());
        assert_eq!(store.get_event("1").unwrap().attendees, vec!["u1"]);
    }

    #[test]
    fn save_then_unsave() {
        let mut store = store_with(vec![sample_event("1", "Music", 0.0, 10)]);
        assert!(store.save_event("1").unwrap());
        assert!(store.is_event_saved("1"));
        assert!(!store.save_event("1").unwrap());
        assert_eq!(store.saved_events_count(), 1);

        assert!(store.unsave_event("1").unwrap());
        assert!(!store.is_event_saved("1"));
        assert!(store.unsave_event("1").unwrap());
    }

    #[test]
    fn save_missing_event_returns_false() {
        let mut store = store_with(vec![sample_event("1", "Music", 0.0, 10)]);
        assert!(!store.save_event("42").unwrap());
        assert!(store.saved_events().is_empty());
        assert!(store
            .backing()
            .get(&store.keys().saved_events)
            .unwrap()
            .is_none());
    }

    #[test]
    fn saved_snapshot_does_not_follow_canonical_event() {
        let mut store = store_with(vec![sample_event("1", "Music", 0.0, 10)]);
        store.save_event("1").unwrap();
        store.attend_event("1", "u1").unwrap();
        assert!(store.saved_events()[0].event.attendees.is_empty());
    }

    #[test]
    fn clear_all_removes_key() {
        let mut store = store_with(vec![
            sample_event("1", "Music", 0.0, 10),
            sample_event("2", "Arts", 0.0, 10),
        ]);
        store.save_event("1").unwrap();
        store.save_event("2").unwrap();
        assert_eq!(store.saved_events_by_category("Arts").len(), 1);

        store.clear_all_saved_events().unwrap();
        assert_eq!(store.saved_events_count(), 0);
        assert!(store
            .backing()
            .get(&store.keys().saved_events)
            .unwrap()
            .is_none());
    }
}
