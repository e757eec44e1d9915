use std::sync::{Arc, Mutex};

use anyhow::Result;

use storefront::cart::{CartItem, CartUpdated};
use storefront::events::{Channel, EventBus, Handler};

/// A second channel, to check channels never see each other's events.
struct SessionChanged;

impl Channel for SessionChanged {
    const NAME: &'static str = "sessionChanged";
    type Payload = Option<String>;
}

fn cart(ids: &[&str]) -> Vec<CartItem> {
    ids.iter().map(|id| CartItem::new(*id, 1)).collect()
}

#[test]
fn cart_updated_channel_name() {
    assert_eq!(CartUpdated::NAME, "cartUpdated");
}

#[test]
fn subscribers_receive_full_cart_in_order() {
    let bus = EventBus::new();
    let log: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));

    let subs: Vec<_> = (0..3)
        .map(|n| {
            let log = Arc::clone(&log);
            bus.on::<CartUpdated>(move |items| {
                log.lock().unwrap().push((n, items.len()));
                Ok(())
            })
        })
        .collect();

    assert_eq!(bus.publish::<CartUpdated>(&cart(&["a", "b"])), 3);
    assert_eq!(*log.lock().unwrap(), vec![(0, 2), (1, 2), (2, 2)]);
    assert_eq!(subs[1].channel(), "cartUpdated");
}

#[test]
fn late_subscriber_misses_earlier_events() {
    let bus = EventBus::new();
    bus.publish::<CartUpdated>(&cart(&["a"]));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _sub = bus.on::<CartUpdated>(move |items| {
        sink.lock().unwrap().push(items.clone());
        Ok(())
    });
    assert!(seen.lock().unwrap().is_empty());

    bus.publish::<CartUpdated>(&cart(&["b"]));
    assert_eq!(*seen.lock().unwrap(), vec![cart(&["b"])]);
}

#[test]
fn channels_do_not_cross() {
    let bus = EventBus::new();
    let hits = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&hits);
    let _sub = bus.on::<SessionChanged>(move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });

    assert_eq!(bus.publish::<CartUpdated>(&cart(&["a"])), 0);
    assert_eq!(bus.publish::<SessionChanged>(&Some("42".to_string())), 1);
    assert_eq!(*hits.lock().unwrap(), 1);
    assert_eq!(bus.subscriber_count::<CartUpdated>(), 0);
    assert_eq!(bus.subscriber_count::<SessionChanged>(), 1);
}

#[test]
fn unsubscribe_by_handler_on_cart_channel() {
    let bus = EventBus::new();
    let handler: Handler<CartUpdated> = Arc::new(|_: &Vec<CartItem>| -> Result<()> { Ok(()) });
    let _sub = bus.subscribe::<CartUpdated>(Arc::clone(&handler));

    assert!(bus.unsubscribe::<CartUpdated>(&handler));
    assert_eq!(bus.publish::<CartUpdated>(&Vec::new()), 0);
}

#[test]
fn handler_may_subscribe_during_publish() {
    let bus = Arc::new(EventBus::new());
    let weak = Arc::downgrade(&bus);
    let _sub = bus.on::<CartUpdated>(move |_| {
        if let Some(bus) = weak.upgrade() {
            let _ = bus.on::<CartUpdated>(|_| Ok(()));
        }
        Ok(())
    });

    // the new handler is not part of the current fan-out
    assert_eq!(bus.publish::<CartUpdated>(&Vec::new()), 1);
    assert_eq!(bus.subscriber_count::<CartUpdated>(), 2);
}

#[test]
fn subscription_outliving_bus_is_harmless() {
    let bus = EventBus::new();
    let sub = bus.on::<CartUpdated>(|_| Ok(()));
    drop(bus);
    assert!(!sub.unsubscribe());
}
