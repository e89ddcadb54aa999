//! メインアプリケーションコンポーネント

use docdesk_common::{annotation_document_type, AnnotationPayload, Notifier, Tag};
use leptos::callback::Callback;
use leptos::prelude::*;
use leptos::task::spawn_local;
use web_sys::File;

use crate::api::{DocumentView, FetchClient};
use crate::components::{
    batch_upload::BatchUploadModal,
    notice_list::NoticeList,
    ocr_tagger::OcrTextTagger,
    upload_area::UploadArea,
};
use crate::notice::WebNotifier;

/// 読み込んだドキュメントとタグ付けの初期状態
struct LoadedDocument {
    document: DocumentView,
    tags: Vec<Tag>,
    document_type: String,
}

/// ドキュメント本体と、そのテキスト上に復元した保存済みタグ
///
/// 種別は保存済みアノテーション、ドキュメント、`OSTALO` の順に決める。
async fn load_document(client: &FetchClient, id: i64) -> docdesk_common::Result<LoadedDocument> {
    let document = client.fetch_document(id).await?;
    let (tags, stored_type) = match client.fetch_annotations(id).await {
        Ok(stored) => {
            let stored_type = stored.document_type().map(str::to_string);
            (stored.into_tags(&document.text()), stored_type)
        }
        Err(e) => {
            gloo::console::warn!(format!("annotations unavailable: {}", e));
            (Vec::new(), None)
        }
    };
    let document_type =
        annotation_document_type(stored_type.as_deref().or(document.document_type.as_deref())).to_string();
    Ok(LoadedDocument {
        document,
        tags,
        document_type,
    })
}

/// メインアプリケーションコンポーネント
#[component]
pub fn App() -> impl IntoView {
    let notifier = WebNotifier::new();
    provide_context(notifier);
    provide_context(FetchClient::default());
    let client = StoredValue::new(FetchClient::default());

    let (document_id, set_document_id) = signal(String::new());
    let (document, set_document) = signal(None::<DocumentView>);
    let (initial_tags, set_initial_tags) = signal(Vec::<Tag>::new());
    let (document_type, set_document_type) = signal(String::new());
    let (saving, set_saving) = signal(false);
    let (show_batch, set_show_batch) = signal(false);
    let picked = StoredValue::new_local(Vec::<File>::new());

    let load = move || {
        let Ok(id) = document_id.get_untracked().trim().parse::<i64>() else {
            notifier.warn("Unesite ispravan ID dokumenta");
            return;
        };
        let client = client.get_value();
        spawn_local(async move {
            match load_document(&client, id).await {
                Ok(loaded) => {
                    set_initial_tags.set(loaded.tags);
                    set_document_type.set(loaded.document_type);
                    set_document.set(Some(loaded.document));
                }
                Err(e) => notifier.error(&format!("Ne mogu dohvatiti dokument: {}", e)),
            }
        });
    };

    let on_save = Callback::new(move |(tags, kind): (Vec<Tag>, String)| {
        let Some(id) = document.with_untracked(|d| d.as_ref().map(|d| d.id)) else {
            return;
        };
        let client = client.get_value();
        set_saving.set(true);
        spawn_local(async move {
            match client.save_annotations(id, &tags).await {
                Ok(()) => {
                    notifier.success("Oznake su spremljene!");
                    let payload = AnnotationPayload::from_tags(&tags).with_document_type(kind.clone());
                    match client.update_document(id, &payload).await {
                        Ok(()) => notifier.success("Dokument je ažuriran"),
                        Err(e) => notifier.error(&format!("Greška pri ažuriranju dokumenta: {}", e)),
                    }
                    set_initial_tags.set(tags);
                    set_document_type.set(kind);
                }
                Err(e) => notifier.error(&format!("Greška pri spremanju oznaka: {}", e)),
            }
            set_saving.set(false);
        });
    });

    // ファイルを選んだらモーダルを開く
    let on_files = move |files: Vec<File>| {
        if files.is_empty() {
            return;
        }
        picked.set_value(files);
        set_show_batch.set(true);
    };

    let text = Signal::derive(move || document.with(|d| d.as_ref().map(|d| d.text()).unwrap_or_default()));

    view! {
        <div class="container">
            <header class="header">
                <h1>"docdesk - OCR dokumenti"</h1>
                <span class="header-document">
                    {move || document.with(|d| d.as_ref().map(|d| format!("#{} {}", d.id, d.filename)))}
                </span>
            </header>
            <NoticeList />

            <section class="document-loader">
                <input
                    type="number"
                    placeholder="ID dokumenta"
                    prop:value=move || document_id.get()
                    on:input=move |ev| set_document_id.set(event_target_value(&ev))
                    on:keydown=move |ev: leptos::ev::KeyboardEvent| {
                        if ev.key() == "Enter" {
                            load();
                        }
                    }
                />
                <button class="btn btn-primary" on:click=move |_| load()>"Učitaj"</button>
            </section>

            <Show
                when=move || document.with(|d| d.is_some())
                fallback=|| view! { <p class="text-muted">"Unesite ID dokumenta za označavanje OCR teksta"</p> }
            >
                <h2 class="fw-bold">
                    "Dokument: "
                    {move || document.with(|d| d.as_ref().map(|d| d.filename.clone()).unwrap_or_default())}
                </h2>
                <OcrTextTagger
                    text=text
                    initial_tags=initial_tags
                    initial_document_type=document_type
                    saving=saving
                    on_save=on_save
                />
            </Show>

            <section class="batch-upload">
                <UploadArea on_files=on_files />
            </section>

            <Show when=move || show_batch.get()>
                <BatchUploadModal
                    files=picked.get_value()
                    on_close=move || set_show_batch.set(false)
                />
            </Show>
        </div>
    }
}
