use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use xblock_dom::Document;
use xblock_protocols::{ActionFailure, IconPair, Settings};

use super::*;
use crate::annotator::Annotator;
use crate::collapse::undo_button;
use crate::test_support::*;

struct Fixture {
    factory: ControlFactory,
    bridge: Arc<ScriptedBridge>,
}

impl Fixture {
    fn new(body: Vec<xblock_dom::ElementSpec>, bridge: ScriptedBridge) -> Self {
        Self::build(body, bridge, Settings::default(), None)
    }

    fn build(
        body: Vec<xblock_dom::ElementSpec>,
        bridge: ScriptedBridge,
        settings: Settings,
        prompt: Option<Arc<RecordingPrompt>>,
    ) -> Self {
        let bridge = Arc::new(bridge);
        let mut ctx = context(page("https://x.com/home", body), bridge.clone()).with_settings(settings);
        if let Some(prompt) = prompt {
            ctx = ctx.with_confirm(prompt);
        }
        let factory = ControlFactory::new(Arc::new(ctx));
        Annotator::new(factory.clone()).run_pass();
        Self { factory, bridge }
    }

    fn button(&self, target: &str, kind: ControlKind) -> NodeId {
        self.factory
            .buttons_for(&id(target))
            .into_iter()
            .find(|b| self.factory.control(*b).is_some_and(|c| c.kind == kind))
            .unwrap()
    }

    fn click(&self, node: NodeId) {
        click(self.factory.context().doc(), node);
    }

    fn read<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        let doc = self.factory.context().doc().read();
        f(&*doc)
    }

    fn toast_text(&self) -> Option<String> {
        self.read(|doc| {
            doc.query(doc.root(), &selectors::toast())
                .map(|t| doc.text_content(t))
        })
    }

    fn bar(&self, scope: NodeId) -> Option<NodeId> {
        self.read(|doc| doc.query(scope, &selectors::hidden_bar()))
    }

    fn item(&self) -> NodeId {
        self.read(|doc| doc.query(doc.root(), &selectors::primary_item()).unwrap())
    }
}

fn tick() -> tokio::time::Sleep {
    sleep(Duration::from_millis(1))
}

#[test]
fn test_cluster_buttons_are_labelled() {
    let factory = factory(Document::new("https://x.com/home"), Arc::new(ScriptedBridge::default()));
    let mut icons = IconPair::default();
    icons.set(ControlKind::Block, "<svg>b</svg>".into());
    factory.context().icons().apply(&icons);

    let ctx = factory.context().clone();
    let cluster = ctx
        .mutate(|doc| factory.create_cluster(doc, &id("alice"), None))
        .unwrap()
        .unwrap();

    let doc = ctx.doc().read();
    assert!(doc.has_class(cluster, CLUSTER_CLASS));
    assert_eq!(doc.attr(cluster, "data-screen-name"), Some("alice"));
    let buttons = doc.element_children(cluster);
    assert_eq!(buttons.len(), 2);

    assert!(doc.has_class(buttons[0], "xblock-block"));
    assert_eq!(doc.attr(buttons[0], "aria-label"), Some("Block @alice"));
    assert_eq!(doc.attr(buttons[0], "title"), Some("Block @alice"));
    assert_eq!(doc.markup(buttons[0]), Some("<svg>b</svg>"));

    assert!(doc.has_class(buttons[1], "xblock-mute"));
    assert_eq!(doc.attr(buttons[1], "title"), Some("Mute @alice"));
    assert_eq!(doc.markup(buttons[1]).unwrap_or(""), "");
    assert_eq!(factory.control_count(), 2);
}

#[test]
fn test_cluster_respects_settings() {
    let only_mute = Settings {
        show_block: false,
        ..Settings::default()
    };
    let fixture = Fixture::build(vec![tweet("alice")], ScriptedBridge::default(), only_mute, None);
    let buttons = fixture.factory.buttons_for(&id("alice"));
    assert_eq!(buttons.len(), 1);
    assert_eq!(fixture.factory.control(buttons[0]).unwrap().kind, ControlKind::Mute);
}

#[test]
fn test_click_outside_runtime_releases_control() {
    let fixture = Fixture::new(vec![tweet("alice")], ScriptedBridge::default());
    let button = fixture.button("alice", ControlKind::Block);
    fixture.click(button);

    let control = fixture.factory.control(button).unwrap();
    assert!(!control.pending);
    fixture.read(|doc| {
        assert!(!doc.is_disabled(button));
        assert!(!doc.has_class(button, LOADING_CLASS));
    });
    assert!(fixture.bridge.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_block_success_collapses_item() {
    let fixture = Fixture::new(vec![tweet("alice")], ScriptedBridge::default());
    let mut completions = fixture.factory.context().completions();
    let button = fixture.button("alice", ControlKind::Block);

    fixture.click(button);
    fixture.read(|doc| {
        assert!(doc.is_disabled(button));
        assert!(doc.has_class(button, LOADING_CLASS));
    });
    assert!(fixture.factory.control(button).unwrap().pending);

    tick().await;
    assert_eq!(fixture.bridge.calls(), vec![(ActionKind::Block, "alice".to_string())]);
    fixture.read(|doc| {
        assert!(!doc.is_disabled(button));
        assert!(!doc.has_class(button, LOADING_CLASS));
        assert!(doc.has_class(button, SUCCESS_CLASS));
        assert_eq!(doc.markup(button), Some(CHECK_ICON));
        assert_eq!(doc.attr(button, "title"), Some("Blocked @alice"));
    });
    let control = fixture.factory.control(button).unwrap();
    assert!(control.active);
    assert!(!control.pending);
    assert_eq!(completions.try_recv().unwrap(), ActionKind::Block);
    assert_eq!(fixture.toast_text().as_deref(), Some("Blocked @alice"));

    let item = fixture.item();
    assert!(fixture.bar(item).is_none());

    sleep(Duration::from_millis(300)).await;
    let bar = fixture.bar(item).unwrap();
    fixture.read(|doc| {
        let children = doc.element_children(item);
        assert_eq!(children[0], bar);
        assert_eq!(doc.style(children[1], "display"), Some("none"));
        assert_eq!(doc.text_content(bar), "Blocked @aliceUnblock");
        let undo = undo_button(doc, bar).unwrap();
        assert_eq!(doc.text_content(undo), "Unblock");
    });
}

#[tokio::test(start_paused = true)]
async fn test_undo_from_hidden_bar_restores_item() {
    let fixture = Fixture::new(vec![tweet("alice")], ScriptedBridge::default());
    let button = fixture.button("alice", ControlKind::Block);
    fixture.click(button);
    sleep(Duration::from_millis(301)).await;

    let item = fixture.item();
    let bar = fixture.bar(item).unwrap();
    let undo = fixture.read(|doc| undo_button(doc, bar).unwrap());

    fixture.click(undo);
    fixture.read(|doc| {
        assert!(doc.is_disabled(undo));
        assert_eq!(doc.text_content(undo), "…");
    });

    tick().await;
    assert_eq!(
        fixture.bridge.calls(),
        vec![
            (ActionKind::Block, "alice".to_string()),
            (ActionKind::Unblock, "alice".to_string()),
        ]
    );
    fixture.read(|doc| {
        assert!(!doc.is_connected(bar));
        assert!(doc.query(item, &selectors::hidden_bar()).is_none());
        let content = doc.element_children(item)[0];
        assert_eq!(doc.style(content, "display"), None);
        assert!(!doc.has_class(button, SUCCESS_CLASS));
        assert_eq!(doc.attr(button, "title"), Some("Block @alice"));
    });
    assert!(!fixture.factory.control(button).unwrap().active);
    assert_eq!(fixture.toast_text().as_deref(), Some("Unblocked @alice"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_undo_keeps_bar() {
    let bridge = ScriptedBridge::with(vec![
        Ok(serde_json::json!({})),
        Err(ActionFailure::new(ActionErrorCode::Network, "offline")),
    ]);
    let fixture = Fixture::new(vec![tweet("alice")], bridge);
    fixture.click(fixture.button("alice", ControlKind::Block));
    sleep(Duration::from_millis(301)).await;

    let bar = fixture.bar(fixture.item()).unwrap();
    let undo = fixture.read(|doc| undo_button(doc, bar).unwrap());
    fixture.click(undo);
    tick().await;

    fixture.read(|doc| {
        assert!(doc.is_connected(bar));
        assert!(!doc.is_disabled(undo));
        assert_eq!(doc.text_content(undo), "Unblock");
    });
}

#[tokio::test(start_paused = true)]
async fn test_clicking_active_control_undoes() {
    let fixture = Fixture::new(vec![tweet("alice")], ScriptedBridge::default());
    let button = fixture.button("alice", ControlKind::Mute);
    let mut completions = fixture.factory.context().completions();

    fixture.click(button);
    tick().await;
    assert!(fixture.factory.control(button).unwrap().active);

    fixture.click(button);
    tick().await;
    assert_eq!(
        fixture.bridge.calls(),
        vec![
            (ActionKind::Mute, "alice".to_string()),
            (ActionKind::Unmute, "alice".to_string()),
        ]
    );
    assert!(!fixture.factory.control(button).unwrap().active);
    fixture.read(|doc| {
        assert!(!doc.has_class(button, SUCCESS_CLASS));
        assert_eq!(doc.attr(button, "title"), Some("Mute @alice"));
    });
    assert_eq!(completions.try_recv().unwrap(), ActionKind::Mute);
    assert!(completions.try_recv().is_err());

    // The collapse timer finds the control idle and leaves the item alone.
    sleep(Duration::from_millis(400)).await;
    assert!(fixture.bar(fixture.item()).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_error_shows_message_then_clears() {
    let bridge = ScriptedBridge::failing(ActionFailure::new(
        ActionErrorCode::RateLimited,
        "Rate limit reached. Please wait and try again.",
    ));
    let fixture = Fixture::new(vec![tweet("bob")], bridge);
    let mut completions = fixture.factory.context().completions();
    let button = fixture.button("bob", ControlKind::Mute);

    fixture.click(button);
    tick().await;
    fixture.read(|doc| {
        assert!(doc.has_class(button, ERROR_CLASS));
        assert!(!doc.is_disabled(button));
        assert_eq!(
            doc.attr(button, "title"),
            Some("Rate limit reached. Please wait and try again.")
        );
    });
    let control = fixture.factory.control(button).unwrap();
    assert_eq!(control.error, Some(ActionErrorCode::RateLimited));
    assert!(!control.active);
    assert!(completions.try_recv().is_err());

    sleep(Duration::from_millis(2900)).await;
    fixture.read(|doc| assert!(doc.has_class(button, ERROR_CLASS)));
    sleep(Duration::from_millis(200)).await;
    fixture.read(|doc| assert!(!doc.has_class(button, ERROR_CLASS)));
    assert_eq!(fixture.factory.control(button).unwrap().error, None);
    assert!(fixture.bar(fixture.item()).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_empty_failure_message_uses_generic_text() {
    let bridge = ScriptedBridge::failing(ActionFailure::new(ActionErrorCode::Http(500), ""));
    let fixture = Fixture::new(vec![tweet("bob")], bridge);
    let button = fixture.button("bob", ControlKind::Block);
    fixture.click(button);
    tick().await;
    fixture.read(|doc| assert_eq!(doc.attr(button, "title"), Some("An error occurred")));
}

#[tokio::test(start_paused = true)]
async fn test_stale_error_clear_is_ignored() {
    let bridge = ScriptedBridge::with(vec![
        Err(ActionFailure::new(ActionErrorCode::Network, "first")),
        Err(ActionFailure::new(ActionErrorCode::Network, "second")),
    ]);
    let fixture = Fixture::new(vec![tweet("bob")], bridge);
    let button = fixture.button("bob", ControlKind::Block);

    fixture.click(button);
    tick().await;
    sleep(Duration::from_millis(2000)).await;
    fixture.click(button);
    tick().await;

    // The first failure's timer fires here but belongs to an older error.
    sleep(Duration::from_millis(1000)).await;
    fixture.read(|doc| assert!(doc.has_class(button, ERROR_CLASS)));
    assert_eq!(doc_title(&fixture, button), "second");

    sleep(Duration::from_millis(2100)).await;
    fixture.read(|doc| assert!(!doc.has_class(button, ERROR_CLASS)));
}

fn doc_title(fixture: &Fixture, button: NodeId) -> String {
    fixture.read(|doc| doc.attr(button, "title").unwrap_or_default().to_string())
}

#[tokio::test(start_paused = true)]
async fn test_disabled_button_ignores_clicks() {
    let bridge = ScriptedBridge {
        delay: Duration::from_millis(100),
        ..ScriptedBridge::default()
    };
    let fixture = Fixture::new(vec![tweet("alice")], bridge);
    let button = fixture.button("alice", ControlKind::Block);

    fixture.click(button);
    tick().await;
    fixture.click(button);
    sleep(Duration::from_millis(200)).await;
    assert_eq!(fixture.bridge.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_block_of_followed_account_can_be_declined() {
    let prompt = RecordingPrompt::new(false);
    let settings = Settings {
        confirm_block_following: true,
        ..Settings::default()
    };
    let bridge = ScriptedBridge {
        following: true,
        ..ScriptedBridge::default()
    };
    let fixture = Fixture::build(vec![tweet("alice")], bridge, settings, Some(prompt.clone()));
    let button = fixture.button("alice", ControlKind::Block);

    fixture.click(button);
    tick().await;
    assert_eq!(*prompt.asked.lock(), vec!["You follow @alice. Block anyway?".to_string()]);
    assert!(fixture.bridge.calls().is_empty());
    fixture.read(|doc| {
        assert!(!doc.is_disabled(button));
        assert!(!doc.has_class(button, LOADING_CLASS));
    });
    assert!(!fixture.factory.control(button).unwrap().pending);
}

#[tokio::test(start_paused = true)]
async fn test_confirmation_only_for_followed_block() {
    let prompt = RecordingPrompt::new(true);
    let settings = Settings {
        confirm_block_following: true,
        ..Settings::default()
    };
    let bridge = ScriptedBridge {
        following: true,
        ..ScriptedBridge::default()
    };
    let fixture = Fixture::build(vec![tweet("alice")], bridge, settings, Some(prompt.clone()));

    fixture.click(fixture.button("alice", ControlKind::Mute));
    tick().await;
    assert!(prompt.asked.lock().is_empty());

    fixture.click(fixture.button("alice", ControlKind::Block));
    tick().await;
    assert_eq!(prompt.asked.lock().len(), 1);
    assert_eq!(
        fixture.bridge.calls(),
        vec![
            (ActionKind::Mute, "alice".to_string()),
            (ActionKind::Block, "alice".to_string()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_quote_success_collapses_only_quote() {
    let fixture = Fixture::new(vec![tweet_with_quote("alice", "bob")], ScriptedBridge::default());
    let button = fixture.button("bob", ControlKind::Block);
    let block = fixture.factory.control(button).unwrap().quoted_block.unwrap();

    fixture.click(button);
    sleep(Duration::from_millis(301)).await;

    let item = fixture.item();
    let bar = fixture.bar(block).unwrap();
    fixture.read(|doc| {
        let children = doc.element_children(block);
        assert_eq!(children[0], bar);
        assert!(children[1..].iter().all(|c| doc.style(*c, "display") == Some("none")));
        assert!(doc
            .element_children(item)
            .iter()
            .all(|c| !doc.has_class(*c, selectors::HIDDEN_BAR_CLASS)));
    });
}

#[tokio::test(start_paused = true)]
async fn test_refresh_icons_skips_succeeded_controls() {
    let fixture = Fixture::new(vec![tweet("alice")], ScriptedBridge::default());
    let block = fixture.button("alice", ControlKind::Block);
    let mute = fixture.button("alice", ControlKind::Mute);
    fixture.click(block);
    tick().await;

    let icons = IconPair {
        block: "<svg>B</svg>".into(),
        mute: "<svg>M</svg>".into(),
    };
    let ctx = fixture.factory.context().clone();
    ctx.icons().apply(&icons);
    ctx.mutate(|doc| fixture.factory.refresh_icons(doc));

    fixture.read(|doc| {
        assert_eq!(doc.markup(block), Some(CHECK_ICON));
        assert_eq!(doc.markup(mute), Some("<svg>M</svg>"));
    });
}

#[test]
fn test_apply_visibility_hides_empty_clusters() {
    let fixture = Fixture::new(vec![tweet("alice")], ScriptedBridge::default());
    let block = fixture.button("alice", ControlKind::Block);
    let mute = fixture.button("alice", ControlKind::Mute);
    let cluster = fixture.factory.control(block).unwrap().cluster;
    let ctx = fixture.factory.context().clone();

    ctx.set_settings(Settings {
        show_mute: false,
        ..Settings::default()
    });
    ctx.mutate(|doc| fixture.factory.apply_visibility(doc));
    fixture.read(|doc| {
        assert_eq!(doc.style(mute, "display"), Some("none"));
        assert_eq!(doc.style(block, "display"), None);
        assert_eq!(doc.style(cluster, "display"), None);
    });

    ctx.set_settings(Settings {
        show_block: false,
        show_mute: false,
        confirm_block_following: false,
    });
    ctx.mutate(|doc| fixture.factory.apply_visibility(doc));
    fixture.read(|doc| assert_eq!(doc.style(cluster, "display"), Some("none")));

    ctx.set_settings(Settings::default());
    ctx.mutate(|doc| fixture.factory.apply_visibility(doc));
    fixture.read(|doc| {
        assert_eq!(doc.style(mute, "display"), None);
        assert_eq!(doc.style(cluster, "display"), None);
    });
}
