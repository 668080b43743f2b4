//! Defines the [`Post`] and [`PostDate`] types. Posts are built by
//! [`crate::parser::Parser`] and consumed by [`crate::tag`] and
//! [`crate::write`].

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;

/// Represents a blog post.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The title of the post. Posts with an empty or whitespace-only title are
    /// left out of every listing (see [`Post::is_listed`]).
    pub title: String,

    /// The canonical URL path of the post, e.g. `/my-first-post/`. This is the
    /// post's identity; no two posts share a path.
    pub path: String,

    /// The publish date, if any. Undated posts sort after dated ones.
    pub date: Option<PostDate>,

    /// The tags as authored, in their original order and casing.
    pub tags: Vec<String>,

    /// The post's source file relative to the posts directory.
    pub source: PathBuf,

    /// The rendered HTML body.
    pub body: String,

    /// A plain-text excerpt of the body.
    pub excerpt: String,

    /// Estimated reading time, e.g. `3 min read`.
    pub reading_time: String,
}

impl Post {
    /// Whether the post belongs in listings (home feed, post listing, tag
    /// pages). A post without a title is still rendered at its own path.
    pub fn is_listed(&self) -> bool {
        !self.title.trim().is_empty()
    }
}

/// Sorts `posts` newest first. The sort is stable: posts with the same date
/// keep their relative order, and undated posts go last.
pub fn sort_by_date<P: std::borrow::Borrow<Post>>(posts: &mut [P]) {
    posts.sort_by(|a, b| b.borrow().date.cmp(&a.borrow().date));
}

/// A post's publish date. Front matter dates may be plain dates or full
/// timestamps; both are held as a [`NaiveDateTime`] (timestamps with an
/// offset are converted to UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostDate(NaiveDateTime);

/// The date formats accepted in front matter, besides RFC 3339.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

impl PostDate {
    /// Formats the date the way post listings show it, e.g. `January 01, 2019`.
    pub fn display(&self) -> String {
        self.0.format("%B %d, %Y").to_string()
    }
}

impl std::str::FromStr for PostDate {
    type Err = DateParseError;

    fn from_str(s: &str) -> Result<PostDate, DateParseError> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(PostDate(dt.naive_utc()));
        }
        for format in DATE_TIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
                return Ok(PostDate(dt));
            }
        }
        for format in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, format) {
                if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                    return Ok(PostDate(dt));
                }
            }
        }
        Err(DateParseError(s.to_owned()))
    }
}

impl<'de> Deserialize<'de> for PostDate {
    fn deserialize<D>(deserializer: D) -> Result<PostDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse::<PostDate>()
            .map_err(|e| D::Error::custom(format!("{}", e)))
    }
}

impl fmt::Display for PostDate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Returned when a front matter date matches none of the accepted formats.
#[derive(Debug, Clone, PartialEq)]
pub struct DateParseError(String);

impl fmt::Display for DateParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "invalid date `{}` (expected YYYY-MM-DD, MM/DD/YYYY, or an RFC 3339 timestamp)",
            self.0
        )
    }
}

impl std::error::Error for DateParseError {}

#[cfg(test)]
pub(crate) fn fixture(title: &str, date: Option<&str>, tags: &[&str]) -> Post {
    Post {
        title: title.to_owned(),
        path: format!("/{}/", crate::slug::slug(title)),
        date: date.map(|d| d.parse().unwrap()),
        tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        source: PathBuf::from(format!("{}.md", crate::slug::slug(title))),
        body: String::new(),
        excerpt: String::new(),
        reading_time: String::from("1 min read"),
    }
}
