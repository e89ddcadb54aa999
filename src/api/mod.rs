//! バックエンドREST API

mod client;

pub use client::{ApiClient, DocumentRecord};
