//! Conversions from the site's types into template [`Value`]s. Every plain-text
//! field is HTML-escaped here; rendered markdown bodies are passed through.

use crate::config::Site;
use crate::page::Page;
use crate::post::Post;
use crate::slug::slug;
use crate::tag::{tag_path, TagRecord, TaggedPosts};
use gtmpl_value::Value;
use pulldown_cmark::escape::escape_html;
use std::collections::HashMap;

/// HTML-escapes `s` into a template string.
pub fn text(s: &str) -> Value {
    let mut out = String::with_capacity(s.len());
    // writing into a `String` can't fail
    let _ = escape_html(&mut out, s);
    Value::String(out)
}

fn object(fields: Vec<(&str, Value)>) -> Value {
    let m: HashMap<String, Value> = fields
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();
    Value::Object(m)
}

fn option(opt: Option<Value>) -> Value {
    opt.unwrap_or(Value::Nil)
}

/// The `site` value shared by every page.
pub fn site(site: &Site, year: i32) -> Value {
    object(vec![
        ("title", text(&site.title)),
        ("description", text(&site.description)),
        ("author", text(&site.author)),
        ("twitter_handle", option(site.twitter_handle.as_deref().map(text))),
        ("url", text(site.url.as_str())),
        ("year", Value::String(year.to_string())),
    ])
}

/// A tag as shown on a post page. `url` is nil for tags that normalize to an
/// empty slug, since they have no tag page.
pub fn post_tag(label: &str, first: bool) -> Value {
    let slug = slug(label);
    object(vec![
        ("label", text(label)),
        ("url", match slug.is_empty() {
            true => Value::Nil,
            false => text(&tag_path(&slug)),
        }),
        ("slug", text(&slug)),
        ("separator", Value::String(if first { "" } else { "," }.to_owned())),
    ])
}

/// A link to a post: its title and path.
pub fn post_link(post: &Post) -> Value {
    object(vec![("title", text(&post.title)), ("path", text(&post.path))])
}

impl From<&Post> for Value {
    /// Converts a [`Post`] into its listing summary: title, path, date,
    /// excerpt, reading time, and tags.
    fn from(post: &Post) -> Value {
        object(vec![
            ("title", text(&post.title)),
            ("path", text(&post.path)),
            ("date", text(&post.date.map(|d| d.display()).unwrap_or_default())),
            ("excerpt", text(&post.excerpt)),
            ("reading_time", text(&post.reading_time)),
            (
                "tags",
                Value::Array(
                    post.tags
                        .iter()
                        .enumerate()
                        .map(|(i, t)| post_tag(t, i == 0))
                        .collect(),
                ),
            ),
            ("has_tags", Value::Bool(!post.tags.is_empty())),
        ])
    }
}

/// The `item` of a post page: the summary fields plus the rendered body and
/// links to the neighboring posts (nil at either end).
pub fn post_page(post: &Post, newer: Option<&Post>, older: Option<&Post>) -> Value {
    let mut value = Value::from(post);
    if let Value::Object(m) = &mut value {
        m.insert("body".to_owned(), Value::String(post.body.clone()));
        m.insert("newer".to_owned(), option(newer.map(post_link)));
        m.insert("older".to_owned(), option(older.map(post_link)));
    }
    value
}

impl From<&Page> for Value {
    fn from(page: &Page) -> Value {
        object(vec![
            ("title", text(&page.title)),
            ("path", text(&page.path)),
            ("body", Value::String(page.body.clone())),
        ])
    }
}

impl From<&TagRecord> for Value {
    /// Converts a [`TagRecord`] into a tag index entry; `text` is the link
    /// text, e.g. `Rust (3)`.
    fn from(record: &TagRecord) -> Value {
        object(vec![
            ("label", text(&record.label)),
            ("slug", text(&record.slug)),
            ("count", Value::String(record.count.to_string())),
            ("url", text(&record.path())),
            ("text", text(&record.link_text())),
        ])
    }
}

impl From<&TaggedPosts<'_>> for Value {
    fn from(tagged: &TaggedPosts<'_>) -> Value {
        object(vec![
            ("header", text(&tagged.header())),
            ("tag", text(&tagged.tag)),
            ("total_count", Value::String(tagged.total_count.to_string())),
            (
                "posts",
                Value::Array(tagged.posts.iter().map(|p| post_link(p)).collect()),
            ),
        ])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::fixture;

    fn field<'v>(value: &'v Value, key: &str) -> &'v Value {
        match value {
            Value::Object(m) => &m[key],
            _ => panic!("not an object"),
        }
    }

    fn string(value: &Value) -> &str {
        match value {
            Value::String(s) => s,
            _ => panic!("not a string"),
        }
    }

    fn is_nil(value: &Value) -> bool {
        matches!(value, Value::Nil)
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!("Tom &amp; Jerry &lt;3", string(&text("Tom & Jerry <3")));
    }

    #[test]
    fn test_post_tags() {
        let post = fixture("Hello", Some("2019-01-01"), &["Test Tag", "!!!"]);
        let value = Value::from(&post);
        assert_eq!("January 01, 2019", string(field(&value, "date")));

        let tags = match field(&value, "tags") {
            Value::Array(tags) => tags,
            _ => panic!("tags should be an array"),
        };
        assert_eq!("/tags/test-tag/", string(field(&tags[0], "url")));
        assert_eq!("", string(field(&tags[0], "separator")));
        assert!(is_nil(field(&tags[1], "url")));
        assert_eq!(",", string(field(&tags[1], "separator")));
    }

    #[test]
    fn test_post_page_neighbors() {
        let newer = fixture("Newer", None, &[]);
        let post = fixture("Post", None, &[]);
        let value = post_page(&post, Some(&newer), None);
        assert_eq!("/newer/", string(field(field(&value, "newer"), "path")));
        assert!(is_nil(field(&value, "older")));
    }

    #[test]
    fn test_tag_record() {
        let record = TagRecord {
            label: String::from("C++"),
            slug: String::from("c"),
            count: 3,
        };
        let value = Value::from(&record);
        assert_eq!("C++ (3)", string(field(&value, "text")));
        assert_eq!("/tags/c/", string(field(&value, "url")));
    }
}
