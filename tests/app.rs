use std::collections::BTreeMap;

use sierra_hub_lib::checkout::{BookingStatus, CustomerDetails};
use sierra_hub_lib::commands::EventForm;
use sierra_hub_lib::identity::Registration;
use sierra_hub_lib::search::SearchFilters;
use sierra_hub_lib::{App, AppConfig, MockEventGenerator, SqliteBacking};

fn open(path: &std::path::Path) -> App<SqliteBacking> {
    let config = AppConfig {
        storage_namespace: "eventHub".to_string(),
        ..AppConfig::default()
    };
    let mut generator = MockEventGenerator::new(config.mock_event_count, config.mock_seed);
    App::open(SqliteBacking::open(path).unwrap(), config, &mut generator).unwrap()
}

#[test]
fn session_and_created_events_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.sqlite");

    let created = {
        let mut app = open(&path);
        app.register(Registration {
            name: "Ibrahim".to_string(),
            email: "ibrahim@example.sl".to_string(),
            interests: vec!["Technology".to_string()],
        })
        .unwrap();

        let start = chrono::Utc::now() + chrono::Duration::days(7);
        let event = app
            .create_event(EventForm {
                title: "Freetown Rust Meetup".to_string(),
                description: "Ownership and borrowing".to_string(),
                category: "Technology".to_string(),
                is_virtual: true,
                virtual_link: "https://meet.example/rust".to_string(),
                start_date: Some(start),
                end_date: Some(start + chrono::Duration::hours(2)),
                max_attendees: 30,
                image_url: "https://img.example/rust.png".to_string(),
                ..EventForm::default()
            })
            .unwrap();
        assert!(app.attend(&event.id).unwrap());
        event
    };

    let app = open(&path);
    assert_eq!(app.current_user().unwrap().name, "Ibrahim");
    assert_eq!(app.my_events().len(), 1);
    assert_eq!(app.event(&created.id).unwrap().current_attendees, 1);
    assert_eq!(app.search("rust meetup", &SearchFilters::default()).len(), 1);
    assert_eq!(app.config().mock_event_count + 1, app.list_events().len());
}

#[test]
fn free_event_booking_is_confirmed() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = open(&dir.path().join("app.sqlite"));
    app.register(Registration {
        name: "Hawa".to_string(),
        email: "hawa@example.sl".to_string(),
        interests: Vec::new(),
    })
    .unwrap();

    let start = chrono::Utc::now() + chrono::Duration::days(3);
    let free = app
        .create_event(EventForm {
            title: "Clean-up Day".to_string(),
            description: "Community beach clean-up".to_string(),
            category: "Health".to_string(),
            location: "Lumley, Freetown".to_string(),
            start_date: Some(start),
            end_date: Some(start + chrono::Duration::hours(3)),
            max_attendees: 50,
            image_url: "https://img.example/beach.png".to_string(),
            ..EventForm::default()
        })
        .unwrap();

    let booking = app
        .book_tickets(
            &free.id,
            &BTreeMap::from([("general".to_string(), 1)]),
            CustomerDetails {
                name: "Hawa".to_string(),
                email: "hawa@example.sl".to_string(),
                phone: "+232 30 000 000".to_string(),
                notes: String::new(),
            },
            "sll_cash",
        )
        .unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(booking.payment.amount, 0.0);
}
