mod client;

pub use client::{DocumentView, FetchClient};
