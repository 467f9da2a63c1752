use chrono::{DateTime, Utc};
use leptos::ev::MouseEvent;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::rc::Rc;

use crate::config::ExtensionEnv;
use crate::library::{Library, SheetPatch, SheetQuery};
use crate::model::{Sheet, SheetId, SortBy, Tag, DEFAULT_SHEET_NAME, DEFAULT_TAG_COLOR};
use crate::storage::StorageAdapter;
use crate::sync::LibrarySync;
use crate::transfer;

const BUTTON_STYLE: &str = "background: transparent; border: none; font-size: 1.1rem; cursor: pointer; color: var(--text-muted); padding: 0.25rem 0.5rem; border-radius: var(--radius-md);";
const MENU_ITEM_STYLE: &str = "display: block; width: 100%; text-align: left; padding: 0.5rem 1rem; background: transparent; border: none; cursor: pointer; color: var(--text-primary); font-size: 0.9rem;";
const MODAL_BACKDROP_STYLE: &str = "position: fixed; inset: 0; background: rgba(0, 0, 0, 0.5); display: flex; align-items: center; justify-content: center; z-index: 50;";
const MODAL_STYLE: &str = "background: var(--bg-primary); padding: 1rem; border-radius: var(--radius-md); width: 90%; max-width: 420px; position: relative;";

fn short_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

#[component]
pub fn App(env: ExtensionEnv) -> impl IntoView {
    let sync = StoredValue::new_local(Rc::new(LibrarySync::new(StorageAdapter::for_vendor(
        env.vendor,
    ))));
    let library = RwSignal::new(Library::default());
    let (hydrated, set_hydrated) = signal(false);
    let (selected, set_selected) = signal(None::<SheetId>);
    let query = RwSignal::new(SheetQuery::default());

    Effect::new(move |_| {
        spawn_local(async move {
            let sync = sync.get_value();
            log::debug!("Using {:?} storage", sync.storage().flavor());
            let loaded = sync.hydrate().await;
            library.update(|lib| lib.absorb_loaded(loaded));
            set_hydrated.set(true);
        });
    });

    // Every change to the library writes both records; nothing is written
    // before the stored copy has been read.
    Effect::new(move |_| {
        let snapshot = library.get();
        if !hydrated.get() {
            return;
        }
        spawn_local(async move {
            sync.get_value().persist(&snapshot).await;
        });
    });

    view! {
        <main class="popup" style="display: flex; flex-direction: column; height: 100%; width: 100%; background: var(--bg-primary); color: var(--text-primary);">
            {move || match selected.get() {
                Some(id) => view! { <SheetEditor id=id library=library set_selected=set_selected /> }.into_any(),
                None => view! { <SheetList library=library query=query set_selected=set_selected /> }.into_any(),
            }}
        </main>
    }
}

#[component]
fn SheetList(
    library: RwSignal<Library>,
    query: RwSignal<SheetQuery>,
    set_selected: WriteSignal<Option<SheetId>>,
) -> impl IntoView {
    let (menu_open, set_menu_open) = signal(false);
    let (tag_manager_open, set_tag_manager_open) = signal(false);
    let (filter_open, set_filter_open) = signal(false);
    let file_input = NodeRef::<leptos::html::Input>::new();

    let visible = move || library.with(|lib| query.with(|q| lib.visible_sheets(q)));

    let create_sheet = move |_| {
        set_menu_open.set(false);
        library.update(|lib| {
            lib.create_sheet(DEFAULT_SHEET_NAME, "", Utc::now());
        });
    };

    let pick_import_file = move |_| {
        set_menu_open.set(false);
        if let Some(input) = file_input.get() {
            input.click();
        }
    };

    let import_file = move |ev| {
        let input: web_sys::HtmlInputElement = event_target(&ev);
        let Some(file) = input.files().and_then(|files| files.get(0)) else {
            return;
        };
        input.set_value("");
        let file_name = file.name();
        if !transfer::is_text_file(&file_name, &file.type_()) {
            log::warn!("Ignoring {file_name}: only plain-text files can be imported");
            return;
        }
        spawn_local(async move {
            match transfer::read_text_file(&file).await {
                Ok(text) => library.update(|lib| {
                    lib.import_text(&file_name, &text, Utc::now());
                }),
                Err(err) => log::error!("Could not import {file_name}: {err}"),
            }
        });
    };

    let export_all = move |_| {
        set_menu_open.set(false);
        let archive = library.with_untracked(|lib| transfer::build_archive(lib.sheets()));
        let result = archive.and_then(|bytes| {
            transfer::download_bytes(transfer::ARCHIVE_NAME, &bytes, "application/zip")
        });
        if let Err(err) = result {
            log::error!("Could not export sheets: {err}");
        }
    };

    view! {
        <header style="display: flex; align-items: center; justify-content: space-between; gap: 0.5rem; padding: 0.75rem 1rem; background: var(--bg-secondary); border-bottom: 1px solid var(--border-color);">
            <div style="display: flex; gap: 0.25rem; align-items: center; position: relative;">
                <button style=BUTTON_STYLE title="New" on:click=move |_| set_menu_open.update(|open| *open = !*open)>"+"</button>
                {move || menu_open.get().then(|| view! {
                    <div style="position: absolute; top: 2.25rem; left: 0; width: 12rem; background: var(--bg-primary); border: 1px solid var(--border-color); border-radius: var(--radius-md); box-shadow: 0 4px 12px rgba(0,0,0,0.15); z-index: 10;">
                        <button style=MENU_ITEM_STYLE on:click=create_sheet>"Create new sheet"</button>
                        <button style=MENU_ITEM_STYLE on:click=pick_import_file>"Import new sheet"</button>
                        <button style=MENU_ITEM_STYLE on:click=export_all>"Export all sheets"</button>
                    </div>
                })}
                <input node_ref=file_input type="file" accept=".txt" style="display: none;" on:change=import_file />
                <button style=BUTTON_STYLE title="Manage tags" on:click=move |_| set_tag_manager_open.set(true)>"#"</button>
                <button style=BUTTON_STYLE title="Filter by tags" on:click=move |_| set_filter_open.update(|open| *open = !*open)>"⚑"</button>
            </div>
            <div style="display: flex; gap: 0.25rem; align-items: center; flex: 1;">
                <input
                    type="text"
                    placeholder="Search sheets..."
                    style="flex: 1; padding: 0.4rem 0.75rem; border: 1px solid var(--border-color); border-radius: 999px; background: var(--bg-primary); color: var(--text-primary);"
                    prop:value=move || query.with(|q| q.search.clone())
                    on:input=move |ev| {
                        let term = event_target_value(&ev);
                        query.update(|q| q.search = term);
                    }
                />
                <button style=BUTTON_STYLE title="Clear search" on:click=move |_| query.update(|q| q.search.clear())>"×"</button>
            </div>
            <select
                style="padding: 0.3rem; border: 1px solid var(--border-color); border-radius: var(--radius-md); background: var(--bg-primary); color: var(--text-primary);"
                on:change=move |ev| {
                    let sort_by = if event_target_value(&ev) == "name" { SortBy::Name } else { SortBy::Date };
                    query.update(|q| q.sort_by = sort_by);
                }
            >
                <option value="date" prop:selected=move || query.with(|q| q.sort_by == SortBy::Date)>"Sort by Date"</option>
                <option value="name" prop:selected=move || query.with(|q| q.sort_by == SortBy::Name)>"Sort by Name"</option>
            </select>
        </header>
        {move || filter_open.get().then(|| view! { <TagFilter library=library query=query /> })}
        <div class="sheet-list" style="flex: 1; overflow-y: auto; padding: 0.5rem;">
            <For
                each=visible
                key=|sheet| (sheet.id, sheet.updated_at)
                children=move |sheet: Sheet| view! { <SheetRow sheet=sheet library=library set_selected=set_selected /> }
            />
        </div>
        {move || tag_manager_open.get().then(|| view! {
            <TagManager library=library on_close=move || set_tag_manager_open.set(false) />
        })}
    }
}

#[component]
fn SheetRow(
    sheet: Sheet,
    library: RwSignal<Library>,
    set_selected: WriteSignal<Option<SheetId>>,
) -> impl IntoView {
    let id = sheet.id;
    let chip_sheet = sheet.clone();
    let download_sheet = sheet.clone();

    let chips = move || {
        library
            .with(|lib| lib.resolved_tags(&chip_sheet).cloned().collect::<Vec<Tag>>())
            .into_iter()
            .map(|tag| view! {
                <span style=format!("margin-right: 0.4rem; padding: 0.1rem 0.6rem; border-radius: 999px; font-size: 0.8rem; border: 2px solid {}; color: var(--text-primary);", tag.color)>
                    {tag.name}
                </span>
            })
            .collect::<Vec<_>>()
    };

    let download = move |ev: MouseEvent| {
        ev.stop_propagation();
        let text = transfer::strip_markup(&download_sheet.content);
        if let Err(err) = transfer::download_text(&transfer::export_file_name(&download_sheet), &text) {
            log::error!("Could not download {}: {err}", download_sheet.name);
        }
    };

    let delete = move |ev: MouseEvent| {
        ev.stop_propagation();
        library.update(|lib| {
            lib.delete_sheet(id);
        });
    };

    view! {
        <div
            class="sheet-item"
            style="display: flex; justify-content: space-between; align-items: center; padding: 0.75rem 1rem; margin-bottom: 0.4rem; border: 1px solid var(--border-color); border-radius: var(--radius-md); cursor: pointer;"
            on:click=move |_| set_selected.set(Some(id))
        >
            <div style="flex: 1; overflow: hidden; margin-right: 1rem;">
                <h3 style="margin: 0 0 0.4rem 0; font-size: 1rem; white-space: nowrap; overflow: hidden; text-overflow: ellipsis;">{sheet.name.clone()}</h3>
                <div style="display: flex; flex-wrap: wrap;">{chips}</div>
            </div>
            <div style="text-align: right; font-size: 0.8rem; color: var(--text-muted);">
                <p style="margin: 0;">"Created: " {short_date(sheet.created_at)}</p>
                <p style="margin: 0;">"Updated: " {short_date(sheet.updated_at)}</p>
                <div style="margin-top: 0.25rem;">
                    <button style=BUTTON_STYLE title="Download" on:click=download>"⤓"</button>
                    <button style=BUTTON_STYLE title="Delete" on:click=delete>"🗑"</button>
                </div>
            </div>
        </div>
    }
}

#[component]
fn SheetEditor(
    id: SheetId,
    library: RwSignal<Library>,
    set_selected: WriteSignal<Option<SheetId>>,
) -> impl IntoView {
    let Some(sheet) = library.with_untracked(|lib| lib.sheet(id).cloned()) else {
        set_selected.set(None);
        return view! { <div></div> }.into_any();
    };

    let (name, set_name) = signal(sheet.name.clone());
    let (editing, set_editing) = signal(false);
    let (tag_selector_open, set_tag_selector_open) = signal(false);

    let commit_name = move || {
        set_editing.set(false);
        let new_name = name.get_untracked();
        let changed = library.with_untracked(|lib| {
            lib.sheet(id).is_some_and(|sheet| sheet.name != new_name)
        });
        if changed {
            library.update(|lib| {
                lib.update_sheet(id, SheetPatch::name(new_name), Utc::now());
            });
        }
    };

    let update_content = move |ev| {
        let editor: web_sys::HtmlElement = event_target(&ev);
        let html = editor.inner_html();
        library.update(|lib| {
            lib.update_sheet(id, SheetPatch::content(html), Utc::now());
        });
    };

    view! {
        <header style="display: flex; align-items: center; justify-content: space-between; padding: 0.75rem 1rem; border-bottom: 1px solid var(--border-color);">
            <button style=BUTTON_STYLE title="Back" on:click=move |_| set_selected.set(None)>"←"</button>
            <div style="flex: 1; text-align: center;">
                {move || if editing.get() {
                    view! {
                        <input
                            type="text"
                            style="width: 100%; font-size: 1.2rem; font-weight: 600; text-align: center; border: none; border-bottom: 2px solid var(--border-color); outline: none; background: transparent; color: var(--text-primary);"
                            prop:value=move || name.get()
                            on:input=move |ev| set_name.set(event_target_value(&ev))
                            on:keydown=move |ev| {
                                if ev.key() == "Enter" {
                                    commit_name();
                                }
                            }
                            on:blur=move |_| commit_name()
                        />
                    }.into_any()
                } else {
                    view! {
                        <h1 style="margin: 0; font-size: 1.2rem; cursor: pointer;" on:click=move |_| set_editing.set(true)>
                            {move || name.get()}
                        </h1>
                    }.into_any()
                }}
            </div>
            <button style=BUTTON_STYLE title="Tags" on:click=move |_| set_tag_selector_open.set(true)>"#"</button>
        </header>
        <div
            class="sheet-content"
            contenteditable="true"
            style="flex: 1; overflow-y: auto; padding: 1rem 1.5rem; outline: none; line-height: 1.5;"
            inner_html=sheet.content.clone()
            on:input=update_content
        ></div>
        {move || tag_selector_open.get().then(|| view! {
            <TagSelector id=id library=library on_close=move || set_tag_selector_open.set(false) />
        })}
    }
    .into_any()
}

#[component]
fn TagManager(
    library: RwSignal<Library>,
    on_close: impl Fn() + Copy + Send + Sync + 'static,
) -> impl IntoView {
    let (new_name, set_new_name) = signal(String::new());
    let (new_color, set_new_color) = signal(DEFAULT_TAG_COLOR.to_string());

    let add_tag = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let tag_name = new_name.get_untracked();
        let color = new_color.get_untracked();
        let mut added = false;
        library.update(|lib| added = lib.add_tag(tag_name.trim(), &color));
        if added {
            set_new_name.set(String::new());
            set_new_color.set(DEFAULT_TAG_COLOR.to_string());
        }
    };

    view! {
        <div style=MODAL_BACKDROP_STYLE>
            <div style=MODAL_STYLE>
                <button style=format!("{BUTTON_STYLE} position: absolute; top: 0.5rem; right: 0.5rem;") on:click=move |_| on_close()>"×"</button>
                <h2 style="margin-top: 0;">"Manage Tags"</h2>
                <form on:submit=add_tag style="display: flex; gap: 0.5rem; align-items: center; margin-bottom: 1rem;">
                    <input
                        type="text"
                        placeholder="Add a new tag"
                        style="flex: 1; padding: 0.4rem; border: 1px solid var(--border-color); border-radius: var(--radius-md);"
                        prop:value=move || new_name.get()
                        on:input=move |ev| set_new_name.set(event_target_value(&ev))
                    />
                    <input
                        type="color"
                        style="width: 2.5rem; height: 2.5rem; border: none; padding: 0; cursor: pointer;"
                        prop:value=move || new_color.get()
                        on:input=move |ev| set_new_color.set(event_target_value(&ev))
                    />
                    <button type="submit" style="padding: 0.4rem 0.75rem; border: none; border-radius: var(--radius-md); background: var(--accent-color); color: white; cursor: pointer;">"Add tag"</button>
                </form>
                <div style="display: flex; flex-wrap: wrap; max-height: 15rem; overflow-y: auto;">
                    {move || library.with(|lib| lib.tags().to_vec()).into_iter().map(|tag| {
                        let tag_name = tag.name.clone();
                        view! {
                            <div style="display: flex; align-items: center; margin: 0 0.5rem 0.5rem 0; padding: 0.2rem 0.75rem; border-radius: 999px; background: var(--bg-secondary);">
                                <span style=format!("width: 0.75rem; height: 0.75rem; border-radius: 50%; margin-right: 0.5rem; background: {};", tag.color)></span>
                                <span>{tag.name}</span>
                                <button
                                    style="margin-left: 0.5rem; border: none; background: transparent; color: #dc2626; cursor: pointer;"
                                    on:click=move |_| library.update(|lib| {
                                        lib.remove_tag(&tag_name);
                                    })
                                >"×"</button>
                            </div>
                        }
                    }).collect::<Vec<_>>()}
                </div>
            </div>
        </div>
    }
}

#[component]
fn TagSelector(
    id: SheetId,
    library: RwSignal<Library>,
    on_close: impl Fn() + Copy + Send + Sync + 'static,
) -> impl IntoView {
    let initial = library.with_untracked(|lib| {
        lib.sheet(id)
            .map(|sheet| sheet.tags.clone())
            .unwrap_or_default()
    });
    let chosen = RwSignal::new(initial);

    let save = move |_| {
        let tags = chosen.get_untracked();
        library.update(|lib| {
            lib.update_sheet(id, SheetPatch::tags(tags), Utc::now());
        });
        on_close();
    };

    view! {
        <div style=MODAL_BACKDROP_STYLE>
            <div style=MODAL_STYLE>
                <button style=format!("{BUTTON_STYLE} position: absolute; top: 0.5rem; right: 0.5rem;") on:click=move |_| on_close()>"×"</button>
                <h2 style="margin-top: 0;">"Select Tags"</h2>
                <div style="max-height: 15rem; overflow-y: auto; margin-bottom: 1rem;">
                    {move || library.with(|lib| lib.tags().to_vec()).into_iter().map(|tag| {
                        let Tag { name: label, color } = tag;
                        let tag_name = label.clone();
                        let toggle_name = label.clone();
                        let is_chosen = move || chosen.with(|tags| tags.contains(&tag_name));
                        view! {
                            <button
                                style=move || format!(
                                    "margin: 0 0.5rem 0.5rem 0; padding: 0.2rem 0.6rem; border-radius: 999px; cursor: pointer; background: var(--bg-secondary); color: var(--text-primary); border: 2px solid {};",
                                    if is_chosen() { "var(--accent-color)" } else { color.as_str() }
                                )
                                on:click=move |_| chosen.update(|tags| {
                                    if let Some(index) = tags.iter().position(|t| *t == toggle_name) {
                                        tags.remove(index);
                                    } else {
                                        tags.push(toggle_name.clone());
                                    }
                                })
                            >
                                {label}
                            </button>
                        }
                    }).collect::<Vec<_>>()}
                </div>
                <button style="width: 100%; padding: 0.5rem; border: none; border-radius: var(--radius-md); background: var(--accent-color); color: white; cursor: pointer;" on:click=save>"Save"</button>
            </div>
        </div>
    }
}

#[component]
fn TagFilter(library: RwSignal<Library>, query: RwSignal<SheetQuery>) -> impl IntoView {
    view! {
        <div style="display: flex; flex-wrap: wrap; gap: 0.75rem; padding: 0.5rem 1rem; border-bottom: 1px solid var(--border-color); font-size: 0.85rem;">
            {move || library.with(|lib| lib.tags().to_vec()).into_iter().map(|tag| {
                let checked_name = tag.name.clone();
                let toggle_name = tag.name.clone();
                view! {
                    <label style="display: flex; align-items: center; gap: 0.25rem; cursor: pointer;">
                        <input
                            type="checkbox"
                            prop:checked=move || query.with(|q| q.tags.contains(&checked_name))
                            on:change=move |_| query.update(|q| {
                                if let Some(index) = q.tags.iter().position(|t| *t == toggle_name) {
                                    q.tags.remove(index);
                                } else {
                                    q.tags.push(toggle_name.clone());
                                }
                            })
                        />
                        <span>{tag.name}</span>
                    </label>
                }
            }).collect::<Vec<_>>()}
        </div>
    }
}
