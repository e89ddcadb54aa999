//! OCRテキストのタグ付けコンポーネント
//!
//! テキストを選択してタグ種別ボタンを押すと、その範囲にタグを付ける。
//! 表示するボタンはドキュメント種別で決まる。

use docdesk_common::{fields_for_type, OffsetTagger, Tag, TagType, ANNOTATION_DOCUMENT_TYPES};
use leptos::either::Either;
use leptos::callback::{Callable, Callback};
use leptos::prelude::*;

use crate::notice::WebNotifier;
use crate::selection::DomSelectionSurface;

fn tag_class(tag_type: TagType) -> String {
    format!("tag tag-{}", tag_type.as_str().to_lowercase())
}

#[component]
pub fn OcrTextTagger(
    #[prop(into)] text: Signal<String>,
    #[prop(into)] initial_tags: Signal<Vec<Tag>>,
    #[prop(into)] initial_document_type: Signal<String>,
    #[prop(into)] saving: Signal<bool>,
    #[prop(into)] on_save: Callback<(Vec<Tag>, String)>,
) -> impl IntoView {
    let notifier = expect_context::<WebNotifier>();
    let tagger = RwSignal::new(OffsetTagger::new(
        text.get_untracked(),
        initial_tags.get_untracked(),
        notifier,
    ));
    let document_type = RwSignal::new(initial_document_type.get_untracked());
    let text_ref: NodeRef<leptos::html::Pre> = NodeRef::new();

    // ドキュメントが変わったらテキストとタグを置き換える
    Effect::new(move |_| {
        let text = text.get();
        let tags = initial_tags.get();
        tagger.update(|t| t.reset(text, tags));
    });
    Effect::new(move |_| document_type.set(initial_document_type.get()));

    // 種別を変えたら、その種別で使わないタグを外す
    let on_type_change = move |ev: leptos::ev::Event| {
        let kind = event_target_value(&ev);
        tagger.update(|t| {
            let removed = t.retain_types(fields_for_type(&kind));
            if removed > 0 {
                gloo::console::debug!(format!("{} tags dropped for {}", removed, kind));
            }
        });
        document_type.set(kind);
    };

    let on_tag = move |tag_type: TagType| {
        let Some(root) = text_ref.get_untracked() else {
            return;
        };
        let mut surface = DomSelectionSurface::new(root.into());
        tagger.update(|t| {
            t.tag_selection(tag_type, &mut surface);
        });
    };

    let on_save_click = move |_| {
        if let Some(tags) = tagger.with_untracked(|t| t.save(|tags| tags.to_vec())) {
            on_save.run((tags, document_type.get_untracked()));
        }
    };

    view! {
        <div class="ocr-tagger">
            <div class="document-type">
                <label>"Tip dokumenta:"</label>
                <select
                    prop:value=move || document_type.get()
                    disabled=move || saving.get()
                    on:change=on_type_change
                >
                    {ANNOTATION_DOCUMENT_TYPES
                        .iter()
                        .map(|&(key, label)| {
                            view! {
                                <option value=key selected=move || document_type.get() == key>
                                    {label}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>
            </div>

            <div class="tag-buttons">
                {move || {
                    fields_for_type(&document_type.get())
                        .iter()
                        .map(|&tag_type| {
                            view! {
                                <button
                                    class=format!("btn {}", tag_class(tag_type))
                                    on:mousedown=|ev: leptos::ev::MouseEvent| ev.prevent_default()
                                    on:click=move |_| on_tag(tag_type)
                                >
                                    {tag_type.label()}
                                </button>
                            }
                        })
                        .collect_view()
                }}
            </div>

            <pre class="ocr-text" node_ref=text_ref>
                {move || {
                    tagger.with(|t| {
                        t.highlights()
                            .map(|segment| {
                                let content = segment.text.to_string();
                                match segment.tag_type {
                                    Some(tag_type) => Either::Left(view! {
                                        <mark class=tag_class(tag_type) title=tag_type.label()>
                                            {content}
                                        </mark>
                                    }),
                                    None => Either::Right(content),
                                }
                            })
                            .collect_view()
                    })
                }}
            </pre>

            <h5>"Trenutne oznake:"</h5>
            <ul class="tag-list">
                <For
                    each=move || {
                        tagger.with(|t| t.tags().iter().cloned().enumerate().collect::<Vec<_>>())
                    }
                    key=|(index, tag)| (*index, tag.tag_type, tag.start, tag.end)
                    children=move |(index, tag)| {
                        view! {
                            <li>
                                <span class=tag_class(tag.tag_type)>{tag.tag_type.label()}</span>
                                ": "
                                {tag.value.clone()}
                                <button
                                    class="btn-remove"
                                    title="Ukloni oznaku"
                                    on:click=move |_| {
                                        tagger.update(|t| {
                                            t.remove_tag(index);
                                        });
                                    }
                                >
                                    "×"
                                </button>
                            </li>
                        }
                    }
                />
            </ul>

            <button
                class="btn btn-primary"
                disabled=move || saving.get() || tagger.with(|t| t.is_empty())
                on:click=on_save_click
            >
                {move || if saving.get() { "Spremam..." } else { "Spremi oznake" }}
            </button>
        </div>
    }
}
