//! 一括アップロードモーダル
//!
//! 選択済みファイルを共通の種別で1件ずつ順番にアップロードし、
//! 完了後に件数と重複をまとめて表示する。

use std::rc::Rc;

use docdesk_common::{BatchEvent, BatchReport, BatchUploadSequencer, Progress, UploadItem, DOCUMENT_TYPES};
use leptos::either::Either;
use leptos::callback::{Callable, Callback};
use leptos::prelude::*;
use leptos::task::spawn_local;
use web_sys::File;

use crate::api::FetchClient;
use crate::components::progress_bar::ProgressBar;
use crate::notice::WebNotifier;

type Sequencer = BatchUploadSequencer<File, WebNotifier>;

fn to_items(files: Vec<File>) -> Vec<UploadItem<File>> {
    files
        .into_iter()
        .map(|file| {
            let name = file.name();
            let size = file.size() as u64;
            UploadItem::new(file, name, size)
        })
        .collect()
}

#[component]
pub fn BatchUploadModal(
    files: Vec<File>,
    #[prop(into)] on_close: Callback<()>,
) -> impl IntoView {
    let client = StoredValue::new(expect_context::<FetchClient>());
    let notifier = expect_context::<WebNotifier>();
    let sequencer: Rc<Sequencer> = Rc::new(BatchUploadSequencer::with_notifier(to_items(files), notifier));

    let labels = RwSignal::new(sequencer.file_labels());
    let document_type = RwSignal::new(String::new());
    let uploading = RwSignal::new(false);
    let progress = RwSignal::new(None::<Progress>);
    let report = RwSignal::new(None::<BatchReport>);

    sequencer.on_event(move |event| match event {
        BatchEvent::ItemStarted { index, total, .. } => {
            uploading.set(true);
            progress.set(Some(Progress {
                current: index + 1,
                total: *total,
            }));
        }
        BatchEvent::ItemFinished { .. } => {}
        BatchEvent::Completed { report: done } => {
            uploading.set(false);
            progress.set(None);
            report.set(Some((*done).clone()));
        }
    });

    let sequencer = StoredValue::new_local(sequencer);

    // 実行中はシーケンサ側で無視される
    let remove = move |index: usize| {
        if sequencer.with_value(|s| s.remove_file(index)) {
            labels.set(sequencer.with_value(|s| s.file_labels()));
        }
    };

    let can_start = move || !labels.with(|l| l.is_empty()) && !document_type.with(|t| t.is_empty());

    let on_start = move |_| {
        let sequencer = sequencer.get_value();
        let client = client.get_value();
        let shared_tag = document_type.get_untracked();
        spawn_local(async move {
            let _ = sequencer.start(&shared_tag, &client).await;
        });
    };

    let close = move |_| {
        if !uploading.get_untracked() {
            on_close.run(());
        }
    };

    view! {
        <div class="modal-backdrop" />
        <div class="modal-card">
            <div class="modal-header">
                <h4 class="modal-title">"BATCH UPLOAD DOKUMENATA"</h4>
                <button
                    class="modal-close"
                    aria-label="Zatvori"
                    disabled=move || uploading.get()
                    on:click=close
                >
                    "×"
                </button>
            </div>

            <div class="modal-body">
                <Show when=move || !uploading.get()>
                    <div class="mb-3">
                        <label class="fw-bold">"Vrsta dokumenta za sve dokumente:"</label>
                        <select
                            class="form-select"
                            prop:value=move || document_type.get()
                            on:change=move |ev| document_type.set(event_target_value(&ev))
                        >
                            <option value="">"-- odaberi tip --"</option>
                            {DOCUMENT_TYPES
                                .iter()
                                .map(|(value, label)| view! { <option value=*value>{*label}</option> })
                                .collect_view()}
                        </select>
                    </div>

                    <p class="fw-medium">"Pregled odabranih dokumenata:"</p>
                    <ul class="file-list">
                        {move || {
                            let list = labels.get();
                            if list.is_empty() {
                                Either::Left(view! { <li class="text-muted">"Lista prazna"</li> })
                            } else {
                                Either::Right(
                                    list.into_iter()
                                        .enumerate()
                                        .map(|(index, label)| {
                                            view! {
                                                <li class="file-item">
                                                    <span>{label}</span>
                                                    <button
                                                        class="btn-remove"
                                                        title="Izbaci ovaj dokument iz obrade"
                                                        disabled=move || uploading.get()
                                                        on:click=move |_| remove(index)
                                                    >
                                                        "×"
                                                    </button>
                                                </li>
                                            }
                                        })
                                        .collect_view(),
                                )
                            }
                        }}
                    </ul>
                </Show>

                <Show when=move || uploading.get()>
                    <ProgressBar progress=progress />
                </Show>

                {move || {
                    report
                        .get()
                        .filter(|_| !uploading.get())
                        .map(|done| view! { <UploadReport report=done /> })
                }}
            </div>

            <div class="modal-footer">
                {move || {
                    if uploading.get() {
                        Either::Left(view! {
                            <button class="btn btn-warning" disabled=true>"Upload u tijeku..."</button>
                        })
                    } else if report.with(|r| r.is_some()) {
                        Either::Right(Either::Left(view! {
                            <button class="btn btn-success" on:click=move |_| on_close.run(())>"OK"</button>
                        }))
                    } else {
                        Either::Right(Either::Right(view! {
                            <button class="btn btn-secondary" on:click=move |_| on_close.run(())>
                                "Odustani"
                            </button>
                            <button
                                class="btn btn-primary"
                                disabled=move || !can_start()
                                on:click=on_start
                            >
                                "Pokreni upload"
                            </button>
                        }))
                    }
                }}
            </div>
        </div>
    }
}

#[component]
fn UploadReport(report: BatchReport) -> impl IntoView {
    let duplicates = if report.duplicates.is_empty() {
        Either::Left(view! { <p class="text-muted">"Nema duplikata"</p> })
    } else {
        Either::Right(view! {
            <ul>
                {report.duplicates.iter().map(|d| view! { <li>{d.clone()}</li> }).collect_view()}
            </ul>
        })
    };

    let failures: Vec<String> = report
        .failed()
        .map(|r| format!("{}: {}", r.filename, r.error_message()))
        .collect();
    let count = failures.len();
    let failure_list = (count > 0).then(|| {
        view! {
            <p class="text-danger">{format!("Greške: {}", count)}</p>
            <ul>
                {failures.into_iter().map(|f| view! { <li>{f}</li> }).collect_view()}
            </ul>
        }
    });

    view! {
        <div class="upload-report">
            <h5>"Izvještaj uploada:"</h5>
            <p>{format!("Ukupno dokumenata: {}", report.total())}</p>
            <p>"Duplikati preskočeni:"</p>
            {duplicates}
            {failure_list}
        </div>
    }
}
