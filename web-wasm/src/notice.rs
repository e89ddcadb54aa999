//! 画面通知
//!
//! 共通ロジックからの通知をシグナルに積み、コンソールにも出す。

use docdesk_common::{NoticeLevel, Notifier};
use leptos::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn class(&self) -> &'static str {
        match self.level {
            NoticeLevel::Info => "notice notice-info",
            NoticeLevel::Success => "notice notice-success",
            NoticeLevel::Warning => "notice notice-warning",
            NoticeLevel::Error => "notice notice-error",
        }
    }
}

/// コンテキストで配る通知先
#[derive(Debug, Clone, Copy)]
pub struct WebNotifier {
    notices: RwSignal<Vec<Notice>>,
}

impl WebNotifier {
    pub fn new() -> Self {
        Self {
            notices: RwSignal::new(Vec::new()),
        }
    }

    pub fn notices(&self) -> ReadSignal<Vec<Notice>> {
        self.notices.read_only()
    }

    pub fn dismiss(&self, id: u64) {
        self.notices.update(|n| n.retain(|notice| notice.id != id));
    }
}

impl Default for WebNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for WebNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Error => gloo::console::error!(message),
            NoticeLevel::Warning => gloo::console::warn!(message),
            _ => gloo::console::log!(message),
        }

        self.notices.update(|n| {
            let id = n.last().map(|last| last.id + 1).unwrap_or(0);
            n.push(Notice {
                id,
                level,
                message: message.to_string(),
            });
        });
    }
}
