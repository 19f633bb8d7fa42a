//! Value store notification order across several listeners.

use std::sync::{Arc, Mutex};

use fde_model::{FormValues, ValueStore};
use serde_json::json;

#[test]
fn test_listeners_see_writes_of_earlier_listeners_in_the_next_round() {
    let store = ValueStore::new(FormValues::from([
        ("country", json!("DE")),
        ("vatNumber", json!("DE123")),
    ]));
    let seen = Arc::new(Mutex::new(Vec::new()));

    let writer = store.downgrade();
    let _normalize = store.subscribe(move |event| {
        if event.values.str("country") != Some("DE")
            && !event.values.is_field_empty("vatNumber")
            && let Some(store) = writer.upgrade()
        {
            store.set("vatNumber", "");
        }
    });
    let _record = store.subscribe({
        let seen = seen.clone();
        move |event| {
            seen.lock().unwrap().push((
                event.changed.iter().cloned().collect::<Vec<_>>(),
                event.values.value("vatNumber"),
            ));
        }
    });

    store.set("country", "FR");

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            (vec!["country".to_string()], json!("DE123")),
            (vec!["vatNumber".to_string()], json!("")),
        ]
    );
    assert_eq!(store.get().value("vatNumber"), json!(""));
}

#[test]
fn test_dropped_store_stops_writes_from_weak_handles() {
    let store = ValueStore::new(FormValues::new());
    let weak = store.downgrade();
    drop(store);
    assert!(weak.upgrade().is_none());
}
