//! Host-page hooks the annotator relies on.

use xblock_dom::Selector;

/// Marker set on every visited anchor.
pub const PROCESSED_ATTR: &str = "data-xblock";

pub const CLUSTER_CLASS: &str = "xblock-btn-container";
pub const BUTTON_CLASS: &str = "xblock-btn";
pub const HIDDEN_BAR_CLASS: &str = "xblock-hidden-bar";
pub const TOAST_CLASS: &str = "xblock-toast";

pub fn primary_item() -> Selector {
    Selector::tag("article").attr_eq("data-testid", "tweet")
}

pub fn article() -> Selector {
    Selector::tag("article")
}

pub fn user_name() -> Selector {
    Selector::test_id("User-Name")
}

pub fn caret() -> Selector {
    Selector::test_id("caret")
}

pub fn grok() -> Selector {
    Selector::any().attr_prefix("aria-label", "Grok")
}

pub fn social_context() -> Selector {
    Selector::test_id("socialContext")
}

pub fn link_with_href() -> Selector {
    Selector::tag("a").attr("href")
}

pub fn role_link() -> Selector {
    Selector::tag("a").attr_eq("role", "link")
}

pub fn span() -> Selector {
    Selector::tag("span")
}

/// Candidate wrappers of a quoted post.
pub fn quote_block() -> Selector {
    Selector::tag("div")
        .attr_eq("role", "link")
        .or(Selector::tag("div").attr_eq("tabindex", "0"))
}

pub fn follow_affordance() -> Selector {
    Selector::any()
        .attr_suffix("data-testid", "-follow")
        .without_attr(PROCESSED_ATTR)
        .or(Selector::any()
            .attr_suffix("data-testid", "-unfollow")
            .without_attr(PROCESSED_ATTR))
}

pub fn hover_card() -> Selector {
    Selector::test_id("HoverCard")
}

pub fn user_cell() -> Selector {
    Selector::test_id("UserCell")
}

pub fn placement() -> Selector {
    Selector::test_id("placementTracking")
}

pub fn typeahead_item() -> Selector {
    Selector::test_id("typeaheadRecentSearchesItem")
        .without_attr(PROCESSED_ATTR)
        .or(Selector::test_id("typeaheadResult").without_attr(PROCESSED_ATTR))
}

pub fn image() -> Selector {
    Selector::tag("img")
}

pub fn button() -> Selector {
    Selector::tag("button")
}

pub fn profile_link() -> Selector {
    Selector::tag("a").attr_eq("data-testid", "AppTabBar_Profile_Link")
}

pub fn menu_item() -> Selector {
    Selector::any().attr_eq("role", "menuitem")
}

pub fn svg_path() -> Selector {
    Selector::tag("path").attr("d")
}

pub fn cluster() -> Selector {
    Selector::any().class(CLUSTER_CLASS)
}

pub fn hidden_bar() -> Selector {
    Selector::any().class(HIDDEN_BAR_CLASS)
}

pub fn toast() -> Selector {
    Selector::any().class(TOAST_CLASS)
}

/// Overlay container id of the host's menus.
pub const LAYERS_ID: &str = "layers";
