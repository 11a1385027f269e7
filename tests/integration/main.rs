//! Integration tests for Jobtrawl
//!
//! Every test drives the real pipeline against pages replayed by
//! `HtmlSession`, with all delays set to zero.

mod crawl_tests;
mod fixtures;
mod store_tests;
