use super::*;

#[tokio::test]
async fn test_subscribers_receive_events() {
    let notifier = LifecycleNotifier::new();
    let mut first = notifier.subscribe();
    let mut second = notifier.subscribe();

    notifier.notify(LifecycleEvent::new(
        ExtensionId::from("motd"),
        ExtensionState::Loading,
    ));

    let received = first.recv().await.unwrap();
    assert_eq!(received.extension.as_str(), "motd");
    assert_eq!(received.state, ExtensionState::Loading);
    assert_eq!(second.recv().await.unwrap().state, ExtensionState::Loading);
}

#[test]
fn test_dropped_subscribers_are_pruned() {
    let notifier = LifecycleNotifier::new();
    let kept = notifier.subscribe();
    drop(notifier.subscribe());
    assert_eq!(notifier.subscriber_count(), 2);

    notifier.notify(LifecycleEvent::new(
        ExtensionId::from("motd"),
        ExtensionState::Loaded,
    ));
    assert_eq!(notifier.subscriber_count(), 1);
    drop(kept);
}

#[test]
fn test_clones_share_subscribers() {
    let notifier = LifecycleNotifier::new();
    let mut rx = notifier.subscribe();
    notifier.clone().notify(LifecycleEvent::new(
        ExtensionId::from("heartbeat"),
        ExtensionState::Unloaded,
    ));
    assert_eq!(rx.try_recv().unwrap().state, ExtensionState::Unloaded);
}
