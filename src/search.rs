use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backing::KeyValueStore;
use crate::models::{Event, SavedEvent};
use crate::store::EventStore;

/// All set filters must match. Ranges are inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    pub category: Option<String>,
    pub location: Option<String>,
    pub price_range: Option<(f64, f64)>,
    pub date_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl SearchFilters {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(category) = &self.category {
            if &event.category != category {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if &event.location != location {
                return false;
            }
        }
        if let Some((min, max)) = self.price_range {
            if event.price < min || event.price > max {
                return false;
            }
        }
        if let Some((start, end)) = self.date_range {
            if event.start_date < start || event.start_date > end {
                return false;
            }
        }
        true
    }
}

pub fn matches_query(event: &Event, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    [
        &event.title,
        &event.description,
        &event.category,
        &event.location,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&needle))
}

impl<B: KeyValueStore> EventStore<B> {
    /// Matching events in catalog order.
    pub fn search_events(&self, query: &str, filters: &SearchFilters) -> Vec<Event> {
        self.events
            .iter()
            .filter(|event| matches_query(event, query) && filters.matches(event))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SavedWhen {
    #[default]
    All,
    Upcoming,
    Past,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SavedSort {
    #[default]
    DateAdded,
    EventDate,
    Title,
}

/// Search, filter and sort over the saved list, as the saved-events page does.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SavedEventsQuery {
    pub query: String,
    pub when: SavedWhen,
    pub sort: SavedSort,
}

impl SavedEventsQuery {
    pub fn apply(&self, saved: &[SavedEvent], now: DateTime<Utc>) -> Vec<SavedEvent> {
        let needle = self.query.to_lowercase();
        let mut out: Vec<SavedEvent> = saved
            .iter()
            .filter(|s| {
                needle.is_empty()
                    || [&s.event.title, &s.event.category, &s.event.location]
                        .iter()
                        .any(|field| field.to_lowercase().contains(&needle))
            })
            .filter(|s| match self.when {
                SavedWhen::All => true,
                SavedWhen::Upcoming => s.event.start_date >= now,
                SavedWhen::Past => s.event.start_date < now,
            })
            .cloned()
            .collect();

        match self.sort {
            SavedSort::DateAdded => out.sort_by_key(|s| Reverse(s.saved_at)),
            SavedSort::EventDate => out.sort_by_key(|s| s.event.start_date),
            SavedSort::Title => out.sort_by(|a, b| a.event.title.cmp(&b.event.title)),
        }
        out
    }
}

/// (upcoming, past) relative to `now`.
pub fn saved_counts(saved: &[SavedEvent], now: DateTime<Utc>) -> (usize, usize) {
    let upcoming = saved.iter().filter(|s| s.event.start_date >= now).count();
    (upcoming, saved.len() - upcoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{sample_event, store_with};
    use chrono::{Duration, TimeZone};

    fn catalog() -> Vec<Event> {
        let mut music = sample_event("1", "Music", 25.0, 100);
        music.title = "Afro Beats Live".to_string();
        let mut tech = sample_event("2", "Technology", 0.0, 50);
        tech.title = "Rust Workshop".to_string();
        tech.location = "Bo, Southern Province".to_string();
        tech.start_date = tech.start_date + Duration::days(30);
        let mut food = sample_event("3", "Food", 100.0, 20);
        food.title = "Street Food Fair".to_string();
        food.description = "Cassava leaves and more".to_string();
        vec![music, tech, food]
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn empty_search_returns_catalog_in_order() {
        let store = store_with(catalog());
        let found = store.search_events("", &SearchFilters::default());
        assert_eq!(found, store.events());
    }

    #[test]
    fn query_is_case_insensitive_over_text_fields() {
        let store = store_with(catalog());
        let none = SearchFilters::default();
        assert_eq!(ids(&store.search_events("RUST", &none)), ["2"]);
        assert_eq!(ids(&store.search_events("cassava", &none)), ["3"]);
        assert_eq!(ids(&store.search_events("southern", &none)), ["2"]);
        assert_eq!(ids(&store.search_events("music", &none)), ["1"]);
        assert!(store.search_events("opera", &none).is_empty());
    }

    #[test]
    fn filters_are_conjunctive() {
        let store = store_with(catalog());
        let filters = SearchFilters {
            location: Some("Freetown, Western Area".to_string()),
            price_range: Some((25.0, 100.0)),
            ..SearchFilters::default()
        };
        assert_eq!(ids(&store.search_events("", &filters)), ["1", "3"]);

        let filters = SearchFilters {
            category: Some("Food".to_string()),
            ..filters
        };
        assert_eq!(ids(&store.search_events("", &filters)), ["3"]);
        assert!(store.search_events("afro", &filters).is_empty());
    }

    #[test]
    fn category_match_is_exact() {
        let store = store_with(catalog());
        let filters = SearchFilters {
            category: Some("music".to_string()),
            ..SearchFilters::default()
        };
        assert!(store.search_events("", &filters).is_empty());
    }

    #[test]
    fn date_range_is_inclusive() {
        let store = store_with(catalog());
        let start = store.get_event("1").unwrap().start_date;
        let filters = SearchFilters {
            date_range: Some((start, start)),
            ..SearchFilters::default()
        };
        assert_eq!(ids(&store.search_events("", &filters)), ["1", "3"]);
    }

    #[test]
    fn saved_query_filters_and_sorts() {
        let now = Utc.with_ymd_and_hms(2030, 3, 15, 0, 0, 0).unwrap();
        let saved: Vec<SavedEvent> = catalog()
            .into_iter()
            .enumerate()
            .map(|(i, event)| SavedEvent {
                event,
                saved_at: now - Duration::days(i as i64),
            })
            .collect();

        let newest_first = SavedEventsQuery::default().apply(&saved, now);
        assert_eq!(newest_first[0].event.id, "1");

        let by_title = SavedEventsQuery {
            sort: SavedSort::Title,
            ..SavedEventsQuery::default()
        }
        .apply(&saved, now);
        let titles: Vec<_> = by_title.iter().map(|s| s.event.title.as_str()).collect();
        assert_eq!(titles, ["Afro Beats Live", "Rust Workshop", "Street Food Fair"]);

        let upcoming = SavedEventsQuery {
            when: SavedWhen::Upcoming,
            ..SavedEventsQuery::default()
        }
        .apply(&saved, now);
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].event.id, "2");
        assert_eq!(saved_counts(&saved, now), (1, 2));
    }
}
