//! Tag aggregation. [`aggregate`] groups posts by tag slug for the tag index
//! page, and [`posts_for_tag`] selects the posts for a single tag's page.
//! Both are pure functions over the post corpus.

use crate::post::{sort_by_date, Post};
use crate::slug::slug;
use std::collections::HashMap;

/// The URL path of the tag pages' index.
pub const TAGS_PATH: &str = "/tags/";

/// Returns the URL path for the tag page of `slug`, e.g. `/tags/rust/`.
pub fn tag_path(slug: &str) -> String {
    format!("{}{}/", TAGS_PATH, slug)
}

/// One entry of the tag index: every tag spelling that normalizes to the same
/// slug, with the number of times it was used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagRecord {
    /// The first-seen spelling of the tag, e.g. `Test Tag`.
    pub label: String,

    /// The normalized tag, e.g. `test-tag`.
    pub slug: String,

    /// The number of (post, tag) occurrences mapping to `slug`. A post that
    /// lists the same tag twice counts twice.
    pub count: usize,
}

impl TagRecord {
    /// The URL path of the tag's page.
    pub fn path(&self) -> String {
        tag_path(&self.slug)
    }

    /// The text of the tag's link on the tag index, e.g. `Test Tag (2)`.
    pub fn link_text(&self) -> String {
        format!("{} ({})", self.label, self.count)
    }
}

/// Groups the tags of all listed posts (see [`Post::is_listed`]) by slug. The
/// records are returned in the order their slugs are first seen.
pub fn aggregate(posts: &[Post]) -> Vec<TagRecord> {
    let mut records: Vec<TagRecord> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for post in posts.iter().filter(|p| p.is_listed()) {
        for tag in post.tags.iter() {
            let slug = slug(tag);
            match positions.get(&slug) {
                Some(&i) => records[i].count += 1,
                None => {
                    positions.insert(slug.clone(), records.len());
                    records.push(TagRecord {
                        label: tag.clone(),
                        slug,
                        count: 1,
                    });
                }
            }
        }
    }

    records
}

/// The posts carrying a single tag, newest first.
#[derive(Debug, PartialEq)]
pub struct TaggedPosts<'a> {
    /// The tag as requested.
    pub tag: String,

    /// The normalized form of `tag`.
    pub slug: String,

    /// The matching posts, newest first.
    pub posts: Vec<&'a Post>,

    /// The number of matching posts.
    pub total_count: usize,
}

impl TaggedPosts<'_> {
    /// The tag page's heading, e.g. `2 posts tagged with "Rust"`.
    pub fn header(&self) -> String {
        format!(
            "{} post{} tagged with \"{}\"",
            self.total_count,
            if self.total_count == 1 { "" } else { "s" },
            self.tag,
        )
    }
}

/// Selects every listed post with at least one tag normalizing to the same
/// slug as `tag`, sorted by date (newest first, ties in input order). No
/// matches is an empty result, not an error.
pub fn posts_for_tag<'a>(posts: &'a [Post], tag: &str) -> TaggedPosts<'a> {
    let target = slug(tag);
    let mut matching: Vec<&Post> = posts
        .iter()
        .filter(|p| p.is_listed())
        .filter(|p| p.tags.iter().any(|t| slug(t) == target))
        .collect();
    sort_by_date(&mut matching);

    TaggedPosts {
        tag: tag.to_owned(),
        slug: target,
        total_count: matching.len(),
        posts: matching,
    }
}
