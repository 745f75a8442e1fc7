use chrono::{Duration, Utc};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::models::{Event, MediaItem, MediaKind};

pub const CATEGORIES: [&str; 8] = [
    "Technology",
    "Business",
    "Arts",
    "Sports",
    "Music",
    "Food",
    "Education",
    "Health",
];

pub const LOCATIONS: [&str; 6] = [
    "Freetown, Western Area",
    "Bo, Southern Province",
    "Kenema, Eastern Province",
    "Makeni, Northern Province",
    "Koidu, Eastern Province",
    "Lungi, North West Province",
];

const EVENT_TYPES: [&str; 8] = [
    "Conference",
    "Workshop",
    "Meetup",
    "Festival",
    "Exhibition",
    "Seminar",
    "Concert",
    "Competition",
];

/// Supplies the initial catalog when nothing has been persisted yet.
pub trait EventSource {
    fn generate(&mut self) -> Vec<Event>;
}

/// Synthetic catalog from a seeded ChaCha stream, so the same seed always
/// yields the same events.
pub struct MockEventGenerator {
    count: usize,
    rng: ChaCha8Rng,
}

impl MockEventGenerator {
    pub fn new(count: usize, seed: u64) -> Self {
        Self {
            count,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn event(&mut self, index: usize) -> Event {
        let rng = &mut self.rng;
        let category = *CATEGORIES.choose(rng).unwrap_or(&CATEGORIES[0]);
        let location = *LOCATIONS.choose(rng).unwrap_or(&LOCATIONS[0]);
        let event_type = *EVENT_TYPES.choose(rng).unwrap_or(&EVENT_TYPES[0]);

        let now = Utc::now();
        let start_date = now + Duration::days(rng.gen_range(0..60));
        let end_date = start_date + Duration::hours(2 + rng.gen_range(0..6));

        let price = if rng.gen_bool(0.7) {
            f64::from(rng.gen_range(10u32..210))
        } else {
            0.0
        };
        let max_attendees: u32 = rng.gen_range(50..500);
        let current_attendees = rng.gen_range(0..100).min(max_attendees);
        let attendees = (0..current_attendees)
            .map(|n| format!("guest-{index}-{n}"))
            .collect();

        let is_virtual = rng.gen_bool(0.3);
        let virtual_link = rng
            .gen_bool(0.3)
            .then(|| "https://zoom.us/j/example".to_string());

        let media_count = if rng.gen_bool(0.5) {
            rng.gen_range(1..=4)
        } else {
            0
        };
        let media = (0..media_count)
            .map(|j| mock_media(rng, index, j))
            .collect();

        Event {
            id: index.to_string(),
            title: format!("{category} {event_type} {index}"),
            description: format!(
                "Join us for an amazing {} {} where you'll learn, network, and have a great time. \
                 This event brings together experts and enthusiasts to share knowledge and create \
                 lasting connections.",
                category.to_lowercase(),
                event_type.to_lowercase()
            ),
            category: category.to_string(),
            location: location.to_string(),
            start_date,
            end_date,
            price,
            max_attendees,
            current_attendees,
            image_url: format!("https://picsum.photos/400/300?random={index}"),
            organizer_id: "mock-organizer".to_string(),
            organizer_name: format!("Organizer {index}"),
            tags: vec![category.to_lowercase(), event_type.to_lowercase()],
            created_at: now,
            attendees,
            is_virtual,
            virtual_link,
            comments: Vec::new(),
            media,
            ticket_types: None,
            payment_methods: None,
        }
    }
}

impl EventSource for MockEventGenerator {
    fn generate(&mut self) -> Vec<Event> {
        (1..=self.count).map(|i| self.event(i)).collect()
    }
}

/// Fixed list, handy when a caller wants full control over the seed data.
impl EventSource for Vec<Event> {
    fn generate(&mut self) -> Vec<Event> {
        std::mem::take(self)
    }
}

fn mock_media(rng: &mut ChaCha8Rng, index: usize, j: u32) -> MediaItem {
    let is_video = rng.gen_bool(0.3);
    if is_video {
        MediaItem {
            id: format!("media_{index}_{j}"),
            url: format!("https://sample-videos.com/zip/10/mp4/480/sample_{}.mp4", j + 1),
            kind: MediaKind::Video,
            name: format!("Video {}.mp4", j + 1),
            is_primary: j == 0,
            order: j,
            thumbnail: Some(format!("https://picsum.photos/400/300?random={index}_{j}_thumb")),
        }
    } else {
        MediaItem {
            id: format!("media_{index}_{j}"),
            url: format!("https://picsum.photos/800/600?random={index}_{j}"),
            kind: MediaKind::Image,
            name: format!("Image {}.jpg", j + 1),
            is_primary: j == 0,
            order: j,
            thumbnail: None,
        }
    }
}
