//! docdesk CLI library

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod tag;
pub mod upload;
