//! A simulated page with both sides of the bridge running in it.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use xblock_annotate::{AnnotateContext, DocumentCookies, Runtime, RuntimeStores, selectors};
use xblock_bridge::{
    ActionExecutor, BridgeClient, BridgeServer, BridgeTimeouts, CredentialStore, ExecutorSettings,
    MessageBus,
};
use xblock_config::{PlatformConfig, TimingConfig};
use xblock_dom::{
    Document, ElementSpec, Layout, NodeId, NodeSpec, PageSpec, SharedDocument, shared,
};
use xblock_protocols::{
    ConfirmPrompt, ControlKind, Fetch, FetchError, HttpRequest, HttpResponse, IconPair, Identifier,
    Locale, Messages, Settings, Stats,
};
use xblock_store::{KeyValueStore, MemoryStore, StatsStore};

/// The platform: rate-limits muting `bob`, otherwise accepts everything.
#[derive(Default)]
pub struct FakePlatform {
    pub seen: Mutex<Vec<HttpRequest>>,
}

#[async_trait]
impl Fetch for FakePlatform {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        self.seen.lock().push(request.clone());
        let body = request.body.clone().unwrap_or_default();
        let target = body.trim_start_matches("screen_name=").to_string();

        if request.url.contains("friendships/show.json") {
            let following = request.url.ends_with("target_screen_name=friend");
            return Ok(HttpResponse::new(
                200,
                json!({"relationship": {"source": {"following": following}}}).to_string(),
            ));
        }
        if request.url.contains("mutes/users/create.json") && target == "bob" {
            return Ok(HttpResponse::new(429, "Too Many Requests"));
        }
        Ok(HttpResponse::new(200, json!({ "screen_name": target }).to_string()))
    }
}

impl FakePlatform {
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().clone()
    }

    pub fn action_urls(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| !r.url.contains("friendships"))
            .map(|r| r.url)
            .collect()
    }
}

pub struct Decline;

impl ConfirmPrompt for Decline {
    fn confirm(&self, _message: &str) -> bool {
        false
    }
}

// ---- host tree ----

pub fn div() -> ElementSpec {
    ElementSpec::new("div")
}

fn row(width: f64) -> ElementSpec {
    div().layout(Layout::flex_row(width))
}

pub fn tweet(author: &str) -> ElementSpec {
    let identity = row(300.0).child(
        div().test_id("User-Name").child(
            ElementSpec::new("a")
                .attr("role", "link")
                .attr("href", &format!("/{author}"))
                .child(ElementSpec::new("span").text(&format!("@{author}"))),
        ),
    );
    let actions = row(600.0)
        .child(row(40.0).child(ElementSpec::new("button").attr("aria-label", "Grok actions")))
        .child(row(67.0).child(ElementSpec::new("button").test_id("caret")));
    ElementSpec::new("article")
        .test_id("tweet")
        .child(div().child(identity).child(div().text("post")).child(actions))
}

pub fn nav(viewer: &str) -> ElementSpec {
    ElementSpec::new("nav").child(
        ElementSpec::new("a")
            .test_id("AppTabBar_Profile_Link")
            .attr("href", &format!("/{viewer}")),
    )
}

pub fn stored_icons() -> IconPair {
    IconPair {
        block: "<svg>block</svg>".to_string(),
        mute: "<svg>mute</svg>".to_string(),
    }
}

// ---- harness ----

pub struct Page {
    pub doc: SharedDocument,
    pub platform: Arc<FakePlatform>,
    pub store: Arc<MemoryStore>,
    pub runtime: Runtime,
    _server: tokio::task::JoinHandle<()>,
}

pub struct PageOptions {
    pub settings: Settings,
    pub icons: Option<IconPair>,
    pub confirm: Option<Arc<dyn ConfirmPrompt>>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            icons: Some(stored_icons()),
            confirm: None,
        }
    }
}

impl Page {
    pub async fn open(body: Vec<ElementSpec>) -> Self {
        Self::open_with(body, PageOptions::default()).await
    }

    pub async fn open_with(body: Vec<ElementSpec>, options: PageOptions) -> Self {
        let mut nodes: Vec<NodeSpec> = vec![div().attr("id", "layers").into()];
        nodes.extend(body.into_iter().map(NodeSpec::from));
        let spec = PageSpec {
            url: "https://x.com/home".to_string(),
            cookie: "guest_id=1; ct0=page-csrf".to_string(),
            body: nodes,
        };
        let doc = shared(Document::from_page(&spec).unwrap());

        let store = Arc::new(MemoryStore::new());
        let stores = RuntimeStores::new(store.clone());
        stores.settings.save(&options.settings).await.unwrap();
        if let Some(icons) = &options.icons {
            stores.icons.save(icons).await.unwrap();
        }

        let timing = TimingConfig::default();
        let messages = Messages::new(Locale::En);
        let bus = MessageBus::new();
        let platform = Arc::new(FakePlatform::default());
        let executor = ActionExecutor::new(
            platform.clone(),
            Arc::new(CredentialStore::new("/i/api/")),
            Arc::new(DocumentCookies::new(doc.clone())),
            ExecutorSettings::from_platform(&PlatformConfig::default()),
            messages,
        );
        let client = BridgeClient::new(bus.clone(), BridgeTimeouts::from_timing(&timing), messages);
        let server = BridgeServer::new(Arc::new(executor), bus).start();

        let mut ctx = AnnotateContext::new(doc.clone(), Arc::new(client), messages, timing);
        if let Some(confirm) = options.confirm {
            ctx = ctx.with_confirm(confirm);
        }
        let runtime = Runtime::start(ctx, stores).await;

        Self {
            doc,
            platform,
            store,
            runtime,
            _server: server,
        }
    }

    /// Appends host content the way the page renders it.
    pub fn render(&self, specs: Vec<ElementSpec>) {
        let mut doc = self.doc.write();
        let body = doc.body();
        for spec in specs {
            doc.build(body, &spec.into()).unwrap();
        }
    }

    pub fn items(&self) -> Vec<NodeId> {
        let doc = self.doc.read();
        doc.query_all(doc.root(), &selectors::primary_item())
    }

    pub fn clusters_in(&self, scope: NodeId) -> usize {
        self.doc.read().query_all(scope, &selectors::cluster()).len()
    }

    pub fn button(&self, target: &str, kind: ControlKind) -> NodeId {
        let factory = self.runtime.factory();
        factory
            .buttons_for(&Identifier::parse(target).unwrap())
            .into_iter()
            .find(|b| factory.control(*b).is_some_and(|c| c.kind == kind))
            .unwrap()
    }

    pub fn click(&self, node: NodeId) {
        self.doc.write().click(node).unwrap();
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.doc.read().has_class(node, class)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.doc.read().attr(node, name).map(str::to_string)
    }

    pub fn markup(&self, node: NodeId) -> Option<String> {
        self.doc.read().markup(node).map(str::to_string)
    }

    pub fn bar_in(&self, scope: NodeId) -> Option<NodeId> {
        self.doc.read().query(scope, &selectors::hidden_bar())
    }

    pub fn toast(&self) -> Option<String> {
        let doc = self.doc.read();
        doc.query(doc.root(), &selectors::toast())
            .map(|t| doc.text_content(t))
    }

    pub async fn stats(&self) -> Stats {
        let store: Arc<dyn KeyValueStore> = self.store.clone();
        StatsStore::new(store).load().await.unwrap()
    }
}
