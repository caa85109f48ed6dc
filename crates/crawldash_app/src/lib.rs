//! Terminal front end for the crawl dashboard.
pub mod platform;
