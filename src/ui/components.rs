/// Reusable UI components

use yew::prelude::*;

use crate::clock::format_relative;
use crate::tracked_item::TrackedItem;

/// Something the user did on an item card
#[derive(Clone, Debug, PartialEq)]
pub enum CardAction {
    ToggleStar,
    Open,
    Rename,
    EditTags,
    Delete,
    CycleStatus,
    MarkDone,
    FilterByTag(String),
}

#[derive(Properties, PartialEq)]
pub struct ItemCardProps {
    pub item: TrackedItem,
    /// Reference time for the relative date
    pub now: f64,
    pub on_action: Callback<(TrackedItem, CardAction)>,
}

#[function_component(ItemCard)]
pub fn item_card(props: &ItemCardProps) -> Html {
    let item = &props.item;

    let action = |kind: CardAction| {
        let on_action = props.on_action.clone();
        let item = item.clone();
        Callback::from(move |_: MouseEvent| on_action.emit((item.clone(), kind.clone())))
    };

    let star_class = if item.starred { "icon star-btn starred" } else { "icon star-btn" };

    html! {
        <div class="card">
            <div class="card-header">
                <div class="name" title={item.name.clone()}>{&item.name}</div>
            </div>
            <div class="url" title={item.url.clone()}>{&item.url}</div>
            <div class="statusbar">
                <span class={classes!("status-chip", item.status.as_str())}>
                    {item.status.label()}
                </span>
                <button class="chip-btn progress-btn" title="Cycle Status" onclick={action(CardAction::CycleStatus)}>
                    {"⟳"}
                </button>
                <button class="chip-btn done-btn" title="Mark Done" onclick={action(CardAction::MarkDone)}>
                    {"✓"}
                </button>
                <span class="date-info">{format_relative(item.updated_at, props.now)}</span>
            </div>
            <div class="tags">
                {for item.tags.iter().map(|tag| html! {
                    <span
                        key={tag.clone()}
                        class="tag"
                        title={format!("Filter by tag: {}", tag)}
                        onclick={action(CardAction::FilterByTag(tag.clone()))}
                    >
                        {tag}
                    </span>
                })}
            </div>
            <div class="actions">
                <button class={star_class} title="Star / Unstar" onclick={action(CardAction::ToggleStar)}>{"★"}</button>
                <button class="icon open-btn" title="Open in new tab" onclick={action(CardAction::Open)}>{"↗"}</button>
                <button class="icon edit-btn" title="Rename" onclick={action(CardAction::Rename)}>{"✎"}</button>
                <button class="icon tags-btn" title="Edit tags" onclick={action(CardAction::EditTags)}>{"🏷"}</button>
                <button class="icon delete-btn" title="Delete" onclick={action(CardAction::Delete)}>{"🗑"}</button>
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct TagChipProps {
    pub tag: String,
    pub count: usize,
    pub onclick: Callback<String>,
}

/// Clickable tag suggestion
#[function_component(TagChip)]
pub fn tag_chip(props: &TagChipProps) -> Html {
    let onclick = {
        let tag = props.tag.clone();
        props.onclick.reform(move |_: MouseEvent| tag.clone())
    };

    html! {
        <span
            class="sugg"
            title={format!("{} (used {} times) - Click to add", props.tag, props.count)}
            {onclick}
        >
            {&props.tag}
        </span>
    }
}

#[derive(Properties, PartialEq)]
pub struct EmptyStateProps {
    pub has_items: bool,
}

#[function_component(EmptyState)]
pub fn empty_state(props: &EmptyStateProps) -> Html {
    html! {
        <div class="card empty-state">
            <div class="empty-message">
                <h3>{"No tracked pages found"}</h3>
                if props.has_items {
                    <p>{"Try adjusting your filters."}</p>
                } else {
                    <p>{"Right-click any page or use the form above to track your first page!"}</p>
                }
            </div>
        </div>
    }
}
