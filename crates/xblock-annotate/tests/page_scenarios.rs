//! Whole-page scenarios: annotator, bridge and executor wired over one bus.

mod common;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use xblock_annotate::{CHECK_ICON, ERROR_CLASS, SUCCESS_CLASS, undo_button};
use xblock_protocols::{
    ActionErrorCode, ControlKind, IconPair, Settings, Stats,
};
use xblock_store::{IconStore, KeyValueStore, SettingsStore, full_reset};

use common::{Decline, Page, PageOptions, nav, tweet};

/// Past the initial forced pass.
async fn settle() {
    sleep(Duration::from_millis(400)).await;
}

async fn tick() {
    sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_block_round_trip_collapses_and_counts() {
    let page = Page::open(vec![nav("me"), tweet("alice")]).await;
    settle().await;

    let button = page.button("alice", ControlKind::Block);
    page.click(button);
    tick().await;

    assert!(page.has_class(button, SUCCESS_CLASS));
    assert_eq!(page.markup(button).as_deref(), Some(CHECK_ICON));
    assert_eq!(page.attr(button, "title").as_deref(), Some("Blocked @alice"));
    assert_eq!(page.toast().as_deref(), Some("Blocked @alice"));
    assert_eq!(page.stats().await, Stats { blocked: 1, muted: 0 });

    let requests = page.platform.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(request.url.ends_with("/i/api/1.1/blocks/create.json"));
    assert_eq!(request.body.as_deref(), Some("screen_name=alice"));
    assert!(request.header("authorization").unwrap().starts_with("Bearer "));
    assert_eq!(request.header("x-csrf-token"), Some("page-csrf"));

    sleep(Duration::from_millis(300)).await;
    let item = page.items()[0];
    let bar = page.bar_in(item).unwrap();
    let undo = undo_button(&page.doc.read(), bar).unwrap();
    assert_eq!(page.doc.read().text_content(undo), "Unblock");
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_mute_shows_error_then_clears() {
    let page = Page::open(vec![nav("me"), tweet("bob")]).await;
    settle().await;

    let button = page.button("bob", ControlKind::Mute);
    page.click(button);
    tick().await;

    let control = page.runtime.factory().control(button).unwrap();
    assert_eq!(control.error, Some(ActionErrorCode::RateLimited));
    assert!(!control.active);
    assert!(page.has_class(button, ERROR_CLASS));
    assert!(!page.has_class(button, SUCCESS_CLASS));
    assert!(!page.attr(button, "title").unwrap_or_default().is_empty());

    sleep(Duration::from_millis(3000)).await;
    assert!(!page.has_class(button, ERROR_CLASS));
    assert_eq!(page.runtime.factory().control(button).unwrap().error, None);
    assert_eq!(page.stats().await, Stats::default());
    assert!(page.bar_in(page.items()[0]).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_undo_restores_item_without_counting() {
    let page = Page::open(vec![nav("me"), tweet("alice")]).await;
    settle().await;

    let button = page.button("alice", ControlKind::Block);
    page.click(button);
    sleep(Duration::from_millis(301)).await;

    let item = page.items()[0];
    let bar = page.bar_in(item).unwrap();
    let undo = undo_button(&page.doc.read(), bar).unwrap();
    page.click(undo);
    tick().await;

    assert!(page.bar_in(item).is_none());
    assert!(!page.has_class(button, SUCCESS_CLASS));
    assert_eq!(page.markup(button).as_deref(), Some("<svg>block</svg>"));
    assert_eq!(page.attr(button, "title").as_deref(), Some("Block @alice"));
    assert_eq!(page.toast().as_deref(), Some("Unblocked @alice"));
    assert_eq!(page.stats().await, Stats { blocked: 1, muted: 0 });
    assert_eq!(
        page.platform.action_urls().last().map(|u| u.ends_with("blocks/destroy.json")),
        Some(true)
    );
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_renders_is_one_pass() {
    let page = Page::open(vec![nav("me")]).await;
    settle().await;
    let before = page.runtime.metrics().snapshot();

    for i in 0..50 {
        page.render(vec![tweet(&format!("user{i}"))]);
    }
    sleep(Duration::from_millis(20)).await;

    let after = page.runtime.metrics().snapshot();
    assert_eq!(after.signals - before.signals, 50);
    assert_eq!(after.frame_passes - before.frame_passes, 1);
    let doc_root = page.doc.read().root();
    assert_eq!(page.clusters_in(doc_root), 50);

    sleep(Duration::from_millis(250)).await;
    let settled = page.runtime.metrics().snapshot();
    assert_eq!(settled.trailing_passes - before.trailing_passes, 1);
    assert_eq!(page.clusters_in(doc_root), 50);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_passes_do_not_duplicate_controls() {
    let page = Page::open(vec![nav("me"), tweet("alice"), tweet("me")]).await;
    settle().await;
    let root = page.doc.read().root();
    assert_eq!(page.clusters_in(root), 1);

    page.runtime.annotator().run_pass();
    page.runtime.annotator().run_pass();
    assert_eq!(page.clusters_in(root), 1);
    assert_eq!(page.runtime.factory().control_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_settings_push_hides_mute_buttons() {
    let page = Page::open(vec![nav("me"), tweet("alice")]).await;
    settle().await;
    let mute = page.button("alice", ControlKind::Mute);

    let store: Arc<dyn KeyValueStore> = page.store.clone();
    let only_block = Settings {
        show_mute: false,
        ..Settings::default()
    };
    SettingsStore::new(store).save(&only_block).await.unwrap();
    tick().await;

    assert_eq!(page.doc.read().style(mute, "display"), Some("none"));
    assert!(!page.runtime.context().settings().show_mute);

    // Later anchors follow the new settings too.
    page.render(vec![tweet("carol")]);
    settle().await;
    let factory = page.runtime.factory();
    let carol = factory.buttons_for(&xblock_protocols::Identifier::parse("carol").unwrap());
    assert_eq!(carol.len(), 1);
    assert_eq!(factory.control(carol[0]).unwrap().kind, ControlKind::Block);
}

#[tokio::test(start_paused = true)]
async fn test_icon_push_refreshes_buttons() {
    let page = Page::open(vec![nav("me"), tweet("alice")]).await;
    settle().await;
    let block = page.button("alice", ControlKind::Block);
    assert_eq!(page.markup(block).as_deref(), Some("<svg>block</svg>"));

    let store: Arc<dyn KeyValueStore> = page.store.clone();
    let fresh = IconPair {
        block: "<svg>new-block</svg>".to_string(),
        mute: "<svg>new-mute</svg>".to_string(),
    };
    IconStore::new(store).save(&fresh).await.unwrap();
    tick().await;

    assert_eq!(page.markup(block).as_deref(), Some("<svg>new-block</svg>"));
    let mute = page.button("alice", ControlKind::Mute);
    assert_eq!(page.markup(mute).as_deref(), Some("<svg>new-mute</svg>"));
}

#[tokio::test(start_paused = true)]
async fn test_declined_confirmation_sends_no_block() {
    let options = PageOptions {
        settings: Settings {
            confirm_block_following: true,
            ..Settings::default()
        },
        confirm: Some(Arc::new(Decline)),
        ..PageOptions::default()
    };
    let page = Page::open_with(vec![nav("me"), tweet("friend")], options).await;
    settle().await;

    let button = page.button("friend", ControlKind::Block);
    page.click(button);
    tick().await;

    let requests = page.platform.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].url.contains("friendships/show.json"));
    assert!(page.platform.action_urls().is_empty());

    let control = page.runtime.factory().control(button).unwrap();
    assert!(!control.active);
    assert!(!control.pending);
    assert!(!page.doc.read().is_disabled(button));
    assert_eq!(page.stats().await, Stats::default());
}

#[tokio::test(start_paused = true)]
async fn test_full_reset_forgets_learned_icons() {
    let page = Page::open(vec![nav("me"), tweet("alice")]).await;
    settle().await;
    let block = page.button("alice", ControlKind::Block);
    assert!(!page.runtime.context().icons().is_empty());

    full_reset(page.store.as_ref()).await.unwrap();
    tick().await;

    assert!(page.runtime.context().icons().is_empty());
    assert_eq!(page.markup(block).as_deref(), Some(""));
    assert_eq!(page.stats().await, Stats::default());
}
