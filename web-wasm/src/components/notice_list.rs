//! 通知一覧

use leptos::prelude::*;

use crate::notice::WebNotifier;

#[component]
pub fn NoticeList() -> impl IntoView {
    let notifier = expect_context::<WebNotifier>();
    let notices = notifier.notices();

    view! {
        <div class="notice-list">
            <For
                each=move || notices.get()
                key=|notice| notice.id
                children=move |notice| {
                    let id = notice.id;
                    view! {
                        <div class=notice.class() on:click=move |_| notifier.dismiss(id)>
                            {notice.message.clone()}
                        </div>
                    }
                }
            />
        </div>
    }
}
