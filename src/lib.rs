//! The library code for the `craftercoder` static site generator. The
//! architecture can be generally broken down into two distinct steps:
//!
//! 1. Parsing posts and pages from source files on disk ([`crate::parser`])
//! 2. Converting them into output files on disk ([`crate::write`])
//!
//! Between the two sits the tag logic ([`crate::tag`]): tags are normalized
//! into slugs ([`crate::slug`]) so differently-written tags (`Test Tag`,
//! `test-tag`) share one tag page, then counted for the tag index and
//! collected per tag, newest first, for each tag's page.
//!
//! Every page is rendered by applying a theme template to a value built from
//! the page's contents ([`crate::value`]) and writing the result to disk.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod markdown;
pub mod page;
pub mod parser;
pub mod post;
pub mod slug;
pub mod tag;
pub mod value;
pub mod write;
