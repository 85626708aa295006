/// Popup UI for Prep Tracker

use log::{error, info, warn};
use patternfly_yew::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

use crate::bridge::{self, ChromeStorage};
use crate::config::TrackerConfig;
use crate::domain::is_trackable_url;
use crate::error::Result;
use crate::notifier::Subscribers;
use crate::operations::{
    SortKey, StatusFilter, ViewFilter, apply, collect_tags, open_queue, tag_suggestions,
};
use crate::repository::{Repository, TrackRequest, TrackSource};
use crate::storage::{load_view_filter, save_view_filter};
use crate::tracked_item::{ItemStats, TrackedItem, merge_tags, parse_tags, tags_to_string};
use crate::transfer::export_filename;
use crate::ui::components::{CardAction, EmptyState, ItemCard, TagChip};
use crate::ui::{Debounce, Notice, NoticeKind, confirm, prompt, show_notice};

type PopupRepository = Repository<ChromeStorage>;
type NoticeHandle = UseStateHandle<Option<Notice>>;

const PLACEHOLDER_TITLE_LEN: usize = 40;

/// Report the outcome of a mutation and refresh the list from storage
async fn finish<T>(
    repo: &PopupRepository,
    items: &UseStateHandle<Vec<TrackedItem>>,
    notice: &NoticeHandle,
    result: Result<T>,
    success: Option<String>,
    failure: &str,
) {
    let duration = TrackerConfig::default().notification_ms;

    match result {
        Ok(_) => {
            items.set(repo.items().await);
            if let Some(message) = success {
                show_notice(notice, NoticeKind::Success, message, duration);
            }
        }
        Err(e) => {
            error!("{}: {}", failure, e);
            show_notice(notice, NoticeKind::Error, failure, duration);
        }
    }
}

fn name_placeholder(title: Option<&str>) -> String {
    match title {
        Some(title) if !title.is_empty() => {
            let truncated: String = title.chars().take(PLACEHOLDER_TITLE_LEN).collect();
            let ellipsis = if title.chars().count() > PLACEHOLDER_TITLE_LEN { "..." } else { "" };
            format!("Custom name (default: \"{}{}\")", truncated, ellipsis)
        }
        _ => "Custom name".to_string(),
    }
}

#[function_component(App)]
pub fn app() -> Html {
    let config = use_memo((), |_| TrackerConfig::default());
    let repo = use_memo((), |_| bridge::sync_repository(&TrackerConfig::default()));
    let subscribers = use_memo((), |_| Subscribers::new());
    let save_debounce = use_memo((), |_| Debounce::new(TrackerConfig::default().debounce_ms));

    let items = use_state(Vec::<TrackedItem>::new);
    let filter = use_state(ViewFilter::default);
    let name_input = use_state(String::new);
    let tags_input = use_state(String::new);
    let placeholder = use_state(|| name_placeholder(None));
    let notice = use_state(|| None::<Notice>);
    let loading = use_state(|| true);

    // Restore UI state, load items, and listen for changes from other views
    {
        let repo = repo.clone();
        let subscribers = subscribers.clone();
        let items = items.clone();
        let filter = filter.clone();
        let placeholder = placeholder.clone();
        let loading = loading.clone();
        let config = config.clone();

        use_effect_with((), move |_| {
            let subscription = {
                let repo = repo.clone();
                let items = items.clone();
                subscribers.subscribe(move |_| {
                    let repo = repo.clone();
                    let items = items.clone();
                    spawn_local(async move {
                        items.set(repo.items().await);
                    });
                })
            };
            bridge::listen_for_updates((*subscribers).clone());

            spawn_local(async move {
                filter.set(load_view_filter(&ChromeStorage::local(), &config.ui_state_key).await);
                items.set(repo.items().await);
                loading.set(false);

                match bridge::active_tab().await {
                    Ok(tab) => placeholder.set(name_placeholder(tab.title.as_deref())),
                    Err(e) => warn!("Could not get current tab info: {}", e),
                }
                info!("Popup initialized");
            });

            move || drop(subscription)
        });
    }

    // Update filter controls; persisting waits until typing pauses
    let set_filter = {
        let filter = filter.clone();
        let config = config.clone();
        let save_debounce = save_debounce.clone();

        Callback::from(move |new_filter: ViewFilter| {
            filter.set(new_filter.clone());

            let key = config.ui_state_key.clone();
            save_debounce.call(move || {
                spawn_local(async move {
                    if let Err(e) = save_view_filter(&ChromeStorage::local(), &key, &new_filter).await {
                        warn!("Failed to save UI state: {}", e);
                    }
                });
            });
        })
    };

    let on_status_change = {
        let filter = filter.clone();
        let set_filter = set_filter.clone();
        Callback::from(move |e: Event| {
            if let Some(select) = e.target_dyn_into::<HtmlSelectElement>() {
                set_filter.emit(ViewFilter {
                    status: StatusFilter::parse(&select.value()).unwrap_or_default(),
                    ..(*filter).clone()
                });
            }
        })
    };

    let on_sort_change = {
        let filter = filter.clone();
        let set_filter = set_filter.clone();
        Callback::from(move |e: Event| {
            if let Some(select) = e.target_dyn_into::<HtmlSelectElement>() {
                set_filter.emit(ViewFilter {
                    sort: SortKey::parse(&select.value()).unwrap_or_default(),
                    ..(*filter).clone()
                });
            }
        })
    };

    let on_search_input = {
        let filter = filter.clone();
        let set_filter = set_filter.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                set_filter.emit(ViewFilter {
                    search: input.value(),
                    ..(*filter).clone()
                });
            }
        })
    };

    let on_tag_filter_input = {
        let filter = filter.clone();
        let set_filter = set_filter.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                set_filter.emit(ViewFilter {
                    tags: input.value(),
                    ..(*filter).clone()
                });
            }
        })
    };

    let on_clear_tag_filter = {
        let filter = filter.clone();
        let set_filter = set_filter.clone();
        Callback::from(move |_: MouseEvent| {
            set_filter.emit(ViewFilter {
                tags: String::new(),
                ..(*filter).clone()
            });
        })
    };

    let on_name_input = {
        let name_input = name_input.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                name_input.set(input.value());
            }
        })
    };

    let on_tags_input = {
        let tags_input = tags_input.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                tags_input.set(input.value());
            }
        })
    };

    let on_suggestion_click = {
        let tags_input = tags_input.clone();
        Callback::from(move |tag: String| {
            let tags = merge_tags(&parse_tags(&tags_input), &[tag]);
            tags_input.set(tags_to_string(&tags));
        })
    };

    // Track the active tab from the popup form
    let on_save_current = {
        let repo = repo.clone();
        let items = items.clone();
        let notice = notice.clone();
        let name_input = name_input.clone();
        let tags_input = tags_input.clone();
        let config = config.clone();

        Callback::from(move |_: MouseEvent| {
            let repo = repo.clone();
            let items = items.clone();
            let notice = notice.clone();
            let name_input = name_input.clone();
            let tags_input = tags_input.clone();
            let duration = config.notification_ms;

            spawn_local(async move {
                let tab = match bridge::active_tab().await {
                    Ok(tab) => tab,
                    Err(e) => {
                        error!("Failed to save current page: {}", e);
                        show_notice(&notice, NoticeKind::Error, "Failed to save page", duration);
                        return;
                    }
                };

                let Some(url) = tab.url.filter(|url| is_trackable_url(url)) else {
                    show_notice(&notice, NoticeKind::Error, "Invalid page URL", duration);
                    return;
                };

                let existed = items.iter().any(|item| item.url == url);
                let name = Some((*name_input).trim().to_string())
                    .filter(|name| !name.is_empty())
                    .or(tab.title);
                let request = TrackRequest::new(url, name, TrackSource::Popup)
                    .with_tags(parse_tags(&tags_input));

                let result = repo.add_or_update(request).await;
                if result.is_ok() {
                    name_input.set(String::new());
                    tags_input.set(String::new());
                }

                let success = if existed {
                    "Page updated successfully!"
                } else {
                    "Page tracked successfully!"
                };
                finish(&repo, &items, &notice, result, Some(success.to_string()), "Failed to save page").await;
            });
        })
    };

    // Open pending pages from the current view in background tabs
    let on_open_all = {
        let items = items.clone();
        let filter = filter.clone();
        let notice = notice.clone();
        let config = config.clone();

        Callback::from(move |_: MouseEvent| {
            let queue = open_queue(&items, &filter, config.max_open_tabs);
            let notice = notice.clone();
            let duration = config.notification_ms;

            if queue.is_empty() {
                show_notice(&notice, NoticeKind::Info, "No pages to open", duration);
                return;
            }

            if queue.len() > config.confirm_open_threshold
                && !confirm(&format!("This will open {} tabs. Continue?", queue.len()))
            {
                return;
            }

            spawn_local(async move {
                let mut opened = 0;
                for item in &queue {
                    match bridge::open_tab(&item.url, false).await {
                        Ok(()) => opened += 1,
                        Err(e) => error!("Failed to open {}: {}", item.url, e),
                    }
                }

                if opened == queue.len() {
                    show_notice(&notice, NoticeKind::Success, format!("Opened {} tabs", opened), duration);
                } else {
                    show_notice(&notice, NoticeKind::Error, "Failed to open tabs", duration);
                }
            });
        })
    };

    let on_open_in_tab = Callback::from(|_: MouseEvent| bridge::open_popup_in_tab());

    let on_export = {
        let repo = repo.clone();
        let notice = notice.clone();
        let config = config.clone();

        Callback::from(move |_: MouseEvent| {
            let repo = repo.clone();
            let notice = notice.clone();
            let duration = config.notification_ms;

            spawn_local(async move {
                match repo.export_json().await {
                    Ok(json) => {
                        bridge::download_file(&json, &export_filename(repo.now()));
                        show_notice(&notice, NoticeKind::Success, "Export completed successfully!", duration);
                    }
                    Err(e) => {
                        error!("Export failed: {}", e);
                        show_notice(&notice, NoticeKind::Error, "Export failed", duration);
                    }
                }
            });
        })
    };

    let on_import = {
        let repo = repo.clone();
        let items = items.clone();
        let notice = notice.clone();
        let config = config.clone();

        Callback::from(move |_: MouseEvent| {
            let repo = repo.clone();
            let items = items.clone();
            let notice = notice.clone();
            let duration = config.notification_ms;

            spawn_local(async move {
                let text = match bridge::pick_import_file().await {
                    Ok(Some(text)) => text,
                    Ok(None) => return,
                    Err(e) => {
                        error!("Import failed: {}", e);
                        show_notice(&notice, NoticeKind::Error, "Import failed", duration);
                        return;
                    }
                };

                let result = repo.import_json(&text).await;
                let success = result
                    .as_ref()
                    .ok()
                    .map(|imported| format!("Import completed! {} items imported.", imported.len()));
                finish(
                    &repo,
                    &items,
                    &notice,
                    result,
                    success,
                    "Import failed. Please check the file format.",
                )
                .await;
            });
        })
    };

    // Item card buttons
    let on_card_action = {
        let repo = repo.clone();
        let items = items.clone();
        let notice = notice.clone();
        let filter = filter.clone();
        let set_filter = set_filter.clone();

        Callback::from(move |(item, action): (TrackedItem, CardAction)| {
            let repo = repo.clone();
            let items = items.clone();
            let notice = notice.clone();

            match action {
                CardAction::Open => {
                    spawn_local(async move {
                        if let Err(e) = bridge::open_tab(&item.url, true).await {
                            error!("Failed to open tab: {}", e);
                        }
                    });
                }
                CardAction::FilterByTag(tag) => {
                    set_filter.emit(ViewFilter {
                        tags: tag,
                        ..(*filter).clone()
                    });
                }
                CardAction::ToggleStar => spawn_local(async move {
                    let result = repo.toggle_star(&item.id).await;
                    finish(&repo, &items, &notice, result, None, "Failed to save changes").await;
                }),
                CardAction::CycleStatus => spawn_local(async move {
                    let result = repo.cycle_status(&item.id).await;
                    finish(&repo, &items, &notice, result, None, "Failed to save changes").await;
                }),
                CardAction::MarkDone => spawn_local(async move {
                    let result = repo.mark_done(&item.id).await;
                    finish(&repo, &items, &notice, result, None, "Failed to save changes").await;
                }),
                CardAction::Rename => {
                    let Some(name) = prompt("Rename item:", &item.name) else {
                        return;
                    };
                    if name.trim().is_empty() {
                        return;
                    }
                    spawn_local(async move {
                        let result = repo.rename(&item.id, &name).await;
                        finish(&repo, &items, &notice, result, None, "Failed to save changes").await;
                    });
                }
                CardAction::EditTags => {
                    let Some(tags) = prompt(
                        "Edit tags (comma or space separated):",
                        &tags_to_string(&item.tags),
                    ) else {
                        return;
                    };
                    spawn_local(async move {
                        let result = repo.set_tags(&item.id, &tags).await;
                        finish(&repo, &items, &notice, result, None, "Failed to save changes").await;
                    });
                }
                CardAction::Delete => {
                    if !confirm(&format!("Are you sure you want to delete \"{}\"?", item.name)) {
                        return;
                    }
                    spawn_local(async move {
                        let result = repo.delete(&item.id).await;
                        finish(&repo, &items, &notice, result, None, "Failed to delete item").await;
                    });
                }
            }
        })
    };

    let visible = apply(&items, &filter);
    let all_tags = collect_tags(&items);
    let suggestions = tag_suggestions(&tags_input, &all_tags, config.max_tag_suggestions);
    let stats = ItemStats::from_items(&items);
    let now = repo.now();

    html! {
        <div class="padding-20">
            <div class="header">
                <h1 class="popup-title">{"Prep Tracker"}</h1>
                <Button onclick={on_open_in_tab} variant={ButtonVariant::Plain}>
                    {"⤢"}
                </Button>
            </div>

            // Notification
            if let Some(current) = (*notice).clone() {
                <Alert
                    r#type={match current.kind {
                        NoticeKind::Info => AlertType::Info,
                        NoticeKind::Success => AlertType::Success,
                        NoticeKind::Error => AlertType::Danger,
                    }}
                    title={current.message}
                    inline={true}
                >
                </Alert>
            }

            // Track current page
            <div class="track-form">
                <input
                    type="text"
                    class="name-input"
                    placeholder={(*placeholder).clone()}
                    value={(*name_input).clone()}
                    oninput={on_name_input}
                />
                <input
                    type="text"
                    class="tags-input"
                    placeholder="Tags (comma or space separated)"
                    value={(*tags_input).clone()}
                    oninput={on_tags_input}
                />
                if !suggestions.is_empty() {
                    <div class="tag-suggestions">
                        {for suggestions.iter().map(|(tag, count)| html! {
                            <TagChip
                                key={tag.clone()}
                                tag={tag.clone()}
                                count={*count}
                                onclick={on_suggestion_click.clone()}
                            />
                        })}
                    </div>
                }
                <Button onclick={on_save_current} variant={ButtonVariant::Primary} block={true}>
                    {"Track current page"}
                </Button>
            </div>

            // Filters
            <div class="filters">
                <select class="status-filter" onchange={on_status_change}>
                    {for StatusFilter::ALL.iter().map(|option| html! {
                        <option value={option.as_str()} selected={filter.status == *option}>
                            {option.label()}
                        </option>
                    })}
                </select>
                <select class="sort-by" onchange={on_sort_change}>
                    {for SortKey::ALL.iter().map(|option| html! {
                        <option value={option.as_str()} selected={filter.sort == *option}>
                            {option.label()}
                        </option>
                    })}
                </select>
                <input
                    type="text"
                    class="search-input"
                    placeholder="Search name, URL or tag..."
                    value={filter.search.clone()}
                    oninput={on_search_input}
                />
                <div class="tag-filter">
                    <input
                        type="text"
                        placeholder="Filter by tags"
                        value={filter.tags.clone()}
                        oninput={on_tag_filter_input}
                    />
                    <button class="chip-btn" title="Clear tag filter" onclick={on_clear_tag_filter}>{"✗"}</button>
                </div>
            </div>

            <div class="flex-column-gap">
                <Button onclick={on_open_all} variant={ButtonVariant::Secondary} block={true}>
                    {"Open all pending"}
                </Button>
            </div>

            // Item list
            <div class="list">
                if *loading {
                    <div class="loading-text-center">
                        <Spinner />
                    </div>
                } else if visible.is_empty() {
                    <EmptyState has_items={!items.is_empty()} />
                } else {
                    {for visible.iter().map(|item| html! {
                        <ItemCard
                            key={item.id.clone()}
                            item={item.clone()}
                            now={now}
                            on_action={on_card_action.clone()}
                        />
                    })}
                }
            </div>

            <div class="footer-popup">
                <span>
                    {format!("{} tracked • {} pending • {} done • {} starred",
                        stats.total, stats.pending(), stats.done, stats.starred)}
                </span>
                <Button onclick={on_export} variant={ButtonVariant::Secondary}>
                    {"Export"}
                </Button>
                <Button onclick={on_import} variant={ButtonVariant::Secondary}>
                    {"Import"}
                </Button>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_placeholder_truncates() {
        let title = "A".repeat(50);
        let placeholder = name_placeholder(Some(&title));

        assert_eq!(placeholder, format!("Custom name (default: \"{}...\")", "A".repeat(40)));
    }

    #[test]
    fn test_name_placeholder_short_or_missing() {
        assert_eq!(name_placeholder(Some("Tokio")), "Custom name (default: \"Tokio\")");
        assert_eq!(name_placeholder(Some("")), "Custom name");
        assert_eq!(name_placeholder(None), "Custom name");
    }
}
