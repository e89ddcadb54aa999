//! プログレスバーコンポーネント

use docdesk_common::Progress;
use leptos::prelude::*;

#[component]
pub fn ProgressBar(#[prop(into)] progress: Signal<Option<Progress>>) -> impl IntoView {
    let ratio = move || progress.get().map(|p| p.ratio()).unwrap_or(0.0);

    view! {
        <div class="progress-container">
            <div class="progress-bar">
                <div
                    class="progress-fill"
                    style=move || format!("width: {}%", ratio() * 100.0)
                />
            </div>
            <p class="progress-text">
                {move || progress.get().map(|p| p.to_string()).unwrap_or_default()}
            </p>
        </div>
    }
}
