//! Host-tree fixtures shaped like the live timeline.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use xblock_config::TimingConfig;
use xblock_dom::{Document, ElementSpec, Layout, NodeId, NodeSpec, PageSpec, SharedDocument, shared};
use xblock_protocols::{
    ActionBridge, ActionFailure, ActionKind, ActionOutcome, ConfirmPrompt, Identifier, Locale,
    Messages,
};

use crate::context::AnnotateContext;
use crate::controls::ControlFactory;

pub fn div() -> ElementSpec {
    ElementSpec::new("div")
}

pub fn row(width: f64) -> ElementSpec {
    div().layout(Layout::flex_row(width))
}

pub fn handle_link(id: &str) -> ElementSpec {
    ElementSpec::new("a")
        .attr("role", "link")
        .attr("href", &format!("/{id}"))
        .child(ElementSpec::new("span").text(&format!("@{id}")))
}

pub fn identity(id: &str) -> ElementSpec {
    row(300.0).child(div().test_id("User-Name").child(handle_link(id)))
}

pub fn action_bar(with_grok: bool) -> ElementSpec {
    let mut bar = row(600.0);
    if with_grok {
        bar = bar.child(row(40.0).child(ElementSpec::new("button").attr("aria-label", "Grok actions")));
    }
    bar.child(row(67.0).child(ElementSpec::new("button").test_id("caret")))
}

/// A fully rendered primary item by `author`.
pub fn tweet(author: &str) -> ElementSpec {
    ElementSpec::new("article").test_id("tweet").child(
        div()
            .child(identity(author))
            .child(div().text("post body"))
            .child(action_bar(true)),
    )
}

pub fn reposted_tweet(reposter: &str, author: &str) -> ElementSpec {
    let context = div().child(
        ElementSpec::new("a")
            .attr("href", &format!("/{reposter}"))
            .attr("role", "link")
            .child(ElementSpec::new("span").test_id("socialContext").text("reposted")),
    );
    ElementSpec::new("article").test_id("tweet").child(
        div()
            .child(context)
            .child(identity(author))
            .child(action_bar(true)),
    )
}

pub fn quote(author: &str) -> ElementSpec {
    div()
        .attr("role", "link")
        .child(div().child(identity(author)))
        .child(div().text("quoted body"))
}

pub fn tweet_with_quote(author: &str, quoted: &str) -> ElementSpec {
    ElementSpec::new("article").test_id("tweet").child(
        div()
            .child(identity(author))
            .child(quote(quoted))
            .child(action_bar(true)),
    )
}

pub fn nav(viewer: &str) -> ElementSpec {
    ElementSpec::new("nav").child(
        ElementSpec::new("a")
            .test_id("AppTabBar_Profile_Link")
            .attr("href", &format!("/{viewer}")),
    )
}

pub fn user_cell(id: &str) -> ElementSpec {
    div().test_id("UserCell").child(
        row(300.0)
            .child(div().child(handle_link(id)))
            .child(div().child(ElementSpec::new("button").test_id(&format!("{id}-follow")))),
    )
}

pub fn profile_header() -> ElementSpec {
    row(400.0)
        .child(div().child(ElementSpec::new("button").attr("aria-label", "More")))
        .child(
            div()
                .test_id("placementTracking")
                .child(ElementSpec::new("button").test_id("1-follow")),
        )
}

pub fn typeahead(id: &str, with_avatar: bool) -> ElementSpec {
    let avatar = if with_avatar {
        div().child(ElementSpec::new("img"))
    } else {
        div()
    };
    div().test_id("typeaheadResult").child(
        div().child(
            row(300.0).child(avatar).child(
                div().child(
                    row(250.0)
                        .child(div().child(ElementSpec::new("span").text(&format!("@{id}"))))
                        .child(ElementSpec::new("button").text("x")),
                ),
            ),
        ),
    )
}

pub fn layers() -> ElementSpec {
    div().attr("id", "layers")
}

pub fn page(url: &str, body: Vec<ElementSpec>) -> Document {
    let page = PageSpec {
        url: url.to_string(),
        cookie: "ct0=csrf".to_string(),
        body: body.into_iter().map(NodeSpec::from).collect(),
    };
    Document::from_page(&page).unwrap()
}

/// Appends `spec` to the body as host content.
pub fn append(doc: &mut Document, spec: ElementSpec) -> NodeId {
    let body = doc.body();
    doc.build(body, &NodeSpec::from(spec)).unwrap()
}

/// Bridge answering from a script, success once the script runs out.
#[derive(Default)]
pub struct ScriptedBridge {
    pub outcomes: Mutex<VecDeque<ActionOutcome>>,
    pub calls: Mutex<Vec<(ActionKind, String)>>,
    pub following: bool,
    pub delay: Duration,
}

impl ScriptedBridge {
    pub fn with(outcomes: Vec<ActionOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    pub fn failing(failure: ActionFailure) -> Self {
        Self::with(vec![Err(failure)])
    }

    pub fn calls(&self) -> Vec<(ActionKind, String)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ActionBridge for ScriptedBridge {
    async fn perform(&self, action: ActionKind, target: &Identifier) -> ActionOutcome {
        self.calls.lock().push((action, target.to_string()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.outcomes.lock().pop_front();
        next.unwrap_or_else(|| Ok(serde_json::json!({ "screen_name": target.as_str() })))
    }

    async fn is_following(&self, _target: &Identifier) -> bool {
        self.following
    }
}

/// Prompt recording what it was asked and answering `answer`.
pub struct RecordingPrompt {
    pub answer: bool,
    pub asked: Mutex<Vec<String>>,
}

impl RecordingPrompt {
    pub fn new(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: Mutex::new(Vec::new()),
        })
    }
}

impl ConfirmPrompt for RecordingPrompt {
    fn confirm(&self, message: &str) -> bool {
        self.asked.lock().push(message.to_string());
        self.answer
    }
}

pub fn context(doc: Document, bridge: Arc<dyn ActionBridge>) -> AnnotateContext {
    AnnotateContext::new(
        shared(doc),
        bridge,
        Messages::new(Locale::En),
        TimingConfig::default(),
    )
}

pub fn factory(doc: Document, bridge: Arc<dyn ActionBridge>) -> ControlFactory {
    ControlFactory::new(Arc::new(context(doc, bridge)))
}

pub fn id(raw: &str) -> Identifier {
    Identifier::parse(raw).unwrap()
}

/// Clicks `node` as the user would, under the document lock.
pub fn click(doc: &SharedDocument, node: NodeId) {
    doc.write().click(node).unwrap();
}
