mod common;

use std::{
    collections::HashSet,
    sync::{atomic::Ordering, Arc, Barrier},
    thread,
};

use nightlife_lib::{error::AppError, models::UserId, session::SearchSession};

#[test]
fn concurrent_first_toggles_create_the_venue_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = Arc::new(common::app(dir.path(), 5));
    app.register_user("ada", "Ada").unwrap();
    app.register_user("bob", "Bob").unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = ["ada", "bob"]
        .into_iter()
        .map(|name| {
            let app = Arc::clone(&app);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                app.toggle_attendance("venue-03", Some(&UserId::new(name)))
            })
        })
        .collect();

    for handle in handles {
        let outcome = handle.join().expect("thread").expect("toggle");
        assert!(outcome.attending);
    }

    let venues = app.user_venues(Some(&UserId::new("ada"))).unwrap();
    assert_eq!(venues.len(), 1);
    assert_eq!(venues[0].external_id, "venue-03");
    assert_eq!(venues[0].attendee_count(), 2);

    let bob_venues = app.user_venues(Some(&UserId::new("bob"))).unwrap();
    assert_eq!(bob_venues[0].id, venues[0].id, "one ledger row");
}

#[test]
fn merged_search_reports_ledger_counts_in_provider_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = common::app(dir.path(), 8);
    for name in ["ada", "bob", "cyd"] {
        app.register_user(name, &name.to_uppercase()).unwrap();
    }
    let ada = UserId::new("ada");

    app.toggle_attendance("venue-01", Some(&ada)).unwrap();
    app.toggle_attendance("venue-01", Some(&UserId::new("bob"))).unwrap();
    app.toggle_attendance("venue-05", Some(&UserId::new("cyd"))).unwrap();

    let results = app.search("Boise", None, 0, Some(&ada)).unwrap();
    assert_eq!(results.total, 8);
    assert_eq!(results.search_params.term, "bars");

    let ids: Vec<_> = results.venues.iter().map(|v| v.id.clone()).collect();
    let expected: Vec<_> = (0..8).map(|i| format!("venue-{i:02}")).collect();
    assert_eq!(ids, expected);

    for view in &results.venues {
        let (count, going) = match view.id.as_str() {
            "venue-01" => (2, true),
            "venue-05" => (1, false),
            _ => (0, false),
        };
        assert_eq!(view.attendee_count, count, "{}", view.id);
        assert_eq!(view.is_going, going, "{}", view.id);
    }
    assert_eq!(results.venues[1].attendees, vec!["ADA", "BOB"]);

    let anonymous = app.search("Boise", Some("  "), 0, None).unwrap();
    assert!(anonymous.venues.iter().all(|v| !v.is_going));
    assert_eq!(anonymous.venues[1].attendee_count, 2);
}

#[test]
fn pagination_pages_are_disjoint_and_exhaust_total() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = common::app(dir.path(), 30);

    let first = app.search("Boise", None, 0, None).unwrap();
    let second = app.search("Boise", None, 20, None).unwrap();
    assert_eq!(first.venues.len(), 20);
    assert_eq!(second.venues.len(), 10);

    let first_ids: HashSet<_> = first.venues.iter().map(|v| v.id.clone()).collect();
    assert!(second.venues.iter().all(|v| !first_ids.contains(&v.id)));
    assert_eq!(first.venues[0].id, "venue-00");
    assert_eq!(second.venues[0].id, "venue-20");
    assert_eq!(
        (first.venues.len() + second.venues.len()) as u32,
        first.total
    );

    let mut session = SearchSession::new();
    let request = session.begin("Boise").unwrap();
    app.fetch_page(&mut session, &request, None, None).unwrap();
    while let Some(next) = session.load_more() {
        app.fetch_page(&mut session, &next, None, None).unwrap();
    }
    assert_eq!(session.venues().len(), 30);
    assert!(!session.has_more());
    assert_eq!(app.provider().searches.load(Ordering::SeqCst), 4);
}

#[test]
fn unknown_venue_is_not_found_and_leaves_no_record() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = common::app(dir.path(), 3);
    app.register_user("ada", "Ada").unwrap();
    let ada = UserId::new("ada");

    let err = app.toggle_attendance("nope", Some(&ada)).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(app.user_venues(Some(&ada)).unwrap().is_empty());
    assert!(app.user(&ada).unwrap().unwrap().going_to.is_empty());

    let err = app.toggle_attendance("venue-00", None).unwrap_err();
    assert!(matches!(err, AppError::Unauthenticated));
}

#[test]
fn double_toggle_returns_to_original_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let app = common::app(dir.path(), 3);
    app.register_user("ada", "Ada").unwrap();
    app.register_user("bob", "Bob").unwrap();
    let ada = UserId::new("ada");

    app.toggle_attendance("venue-02", Some(&UserId::new("bob")))
        .unwrap();
    let before = app.search("Boise", None, 0, Some(&ada)).unwrap().venues[2].clone();

    let on = app.toggle_attendance("venue-02", Some(&ada)).unwrap();
    let off = app.toggle_attendance("venue-02", Some(&ada)).unwrap();
    assert!(on.attending);
    assert_eq!(on.attendee_count, 2);
    assert!(!off.attending);

    let after = app.search("Boise", None, 0, Some(&ada)).unwrap().venues[2].clone();
    assert_eq!(before.is_going, after.is_going);
    assert_eq!(before.attendee_count, after.attendee_count);
    assert_eq!(off.attendee_count, before.attendee_count);
    assert_eq!(app.provider().lookups.load(Ordering::SeqCst), 1);
}
