//! Defines the [`Parser`] and [`Error`] types: the logic for loading posts and
//! standalone pages from the file system into memory.

use std::{
    collections::HashMap,
    fmt,
    fs::File,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use serde::{Deserialize, Deserializer};
use url::Url;
use walkdir::WalkDir;

use crate::{
    markdown,
    page::Page,
    post::{sort_by_date, Post, PostDate},
    slug::slug,
};

const MARKDOWN_EXTENSION: &str = "md";

/// Parses [`Post`] and [`Page`] objects from source files.
pub struct Parser<'a> {
    /// `site_url` is the root URL of the site. Front matter paths are resolved
    /// against it, and must stay on its host.
    site_url: &'a Url,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. See fields on [`Parser`] for argument
    /// descriptions.
    pub fn new(site_url: &'a Url) -> Parser<'a> {
        Parser { site_url }
    }

    /// Searches `source_directory` recursively for post files (extension =
    /// `.md`) and returns a list of [`Post`] objects sorted by date (most
    /// recent first). Each post file must be structured as follows:
    ///
    /// 1. Initial frontmatter fence (`---`)
    /// 2. YAML frontmatter with the optional fields `title`, `date`, `path`,
    ///    and `tags`
    /// 3. Terminal frontmatter fence (`---`) on its own line
    /// 4. Post body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// date: 2021-04-16
    /// path: /hello-world
    /// tags: [Greetings, TDD]
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    ///
    /// Two posts resolving to the same path is an error.
    pub fn parse_posts(&self, source_directory: &Path) -> Result<Vec<Post>> {
        let mut posts = Vec::new();
        let mut seen = SeenPaths::default();
        for relative_path in markdown_files(source_directory)? {
            let post = self.parse_post(source_directory, &relative_path)?;
            seen.insert(&post.path, &post.source)?;
            debug!("parsed post `{}` at {}", relative_path.display(), post.path);
            posts.push(post);
        }

        sort_by_date(&mut posts);
        Ok(posts)
    }

    /// Loads the standalone pages in `source_directory`. A missing directory
    /// yields no pages.
    pub fn parse_pages(&self, source_directory: &Path) -> Result<Vec<Page>> {
        if !source_directory.is_dir() {
            debug!(
                "no pages directory at `{}`; skipping",
                source_directory.display()
            );
            return Ok(Vec::new());
        }

        let mut pages = Vec::new();
        let mut seen = SeenPaths::default();
        for relative_path in markdown_files(source_directory)? {
            let page = self.parse_page(source_directory, &relative_path)?;
            seen.insert(&page.path, &page.source)?;
            debug!("parsed page `{}` at {}", relative_path.display(), page.path);
            pages.push(page);
        }
        Ok(pages)
    }

    /// Parses a single [`Post`] from the file at `relative_path` under
    /// `source_directory`, annotating any error with the file name.
    fn parse_post(&self, source_directory: &Path, relative_path: &Path) -> Result<Post> {
        self._parse_post(source_directory, relative_path)
            .map_err(|e| annotate(relative_path, e))
    }

    fn _parse_post(&self, source_directory: &Path, relative_path: &Path) -> Result<Post> {
        let contents = read(&source_directory.join(relative_path))?;
        let (frontmatter, body) = Frontmatter::split(&contents)?;
        let rendered = markdown::render(body);
        Ok(Post {
            path: self.resolve_path(frontmatter.path.as_deref(), relative_path)?,
            title: frontmatter.title.unwrap_or_default(),
            date: frontmatter.date,
            tags: frontmatter.tags,
            source: relative_path.to_owned(),
            body: rendered.html,
            excerpt: rendered.excerpt,
            reading_time: rendered.reading_time,
        })
    }

    fn parse_page(&self, source_directory: &Path, relative_path: &Path) -> Result<Page> {
        self._parse_page(source_directory, relative_path)
            .map_err(|e| annotate(relative_path, e))
    }

    fn _parse_page(&self, source_directory: &Path, relative_path: &Path) -> Result<Page> {
        let contents = read(&source_directory.join(relative_path))?;
        let (frontmatter, body) = Frontmatter::split(&contents)?;
        Ok(Page {
            path: self.resolve_path(frontmatter.path.as_deref(), relative_path)?,
            title: frontmatter.title.unwrap_or_default(),
            source: relative_path.to_owned(),
            body: markdown::render(body).html,
        })
    }

    /// Normalizes a front matter `path` (or, if absent, `/{slug of the file
    /// stem}/`) into a canonical URL path with a trailing slash.
    fn resolve_path(&self, path: Option<&str>, relative_path: &Path) -> Result<String> {
        let raw = match path.map(str::trim) {
            Some(p) if !p.is_empty() => p.to_owned(),
            _ => {
                let stem = relative_path
                    .file_stem()
                    .map(|s| slug(&s.to_string_lossy()))
                    .unwrap_or_default();
                if stem.is_empty() {
                    return Err(Error::InvalidPath {
                        path: relative_path.display().to_string(),
                        reason: "no `path` given and the file name has no usable characters",
                    });
                }
                format!("/{}/", stem)
            }
        };

        let invalid = |reason| Error::InvalidPath {
            path: raw.clone(),
            reason,
        };
        let url = self.site_url.join(&raw)?;
        if url.scheme() != self.site_url.scheme()
            || url.host_str() != self.site_url.host_str()
            || url.port() != self.site_url.port()
        {
            return Err(invalid("must be a path on the site"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("must not have a query or fragment"));
        }

        let mut resolved = url.path().to_owned();
        if resolved.contains('%') {
            return Err(invalid("must only contain URL-safe characters"));
        }
        if !resolved.ends_with('/') {
            resolved.push('/');
        }
        if resolved == "/" {
            return Err(invalid("must not be the site root"));
        }
        Ok(resolved)
    }
}

/// Lists the markdown files under `dir` (recursively) relative to `dir`, in
/// sorted order.
fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for result in WalkDir::new(dir).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
        let entry = result?;
        let is_markdown = entry
            .path()
            .extension()
            .map_or(false, |ext| ext == MARKDOWN_EXTENSION);
        if entry.file_type().is_file() && is_markdown {
            // strip_prefix shouldn't fail since `dir` is always an ancestor of
            // the entry
            if let Ok(relative) = entry.path().strip_prefix(dir) {
                files.push(relative.to_owned());
            }
        }
    }
    Ok(files)
}

fn read(path: &Path) -> Result<String> {
    use std::io::Read;
    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;
    Ok(contents)
}

fn annotate(relative_path: &Path, err: Error) -> Error {
    Error::Annotated(
        format!("parsing `{}`", relative_path.display()),
        Box::new(err),
    )
}

/// Tracks the paths claimed so far so duplicates can name both sources.
#[derive(Default)]
struct SeenPaths(HashMap<String, PathBuf>);

impl SeenPaths {
    fn insert(&mut self, path: &str, source: &Path) -> Result<()> {
        match self.0.get(path) {
            Some(first) => Err(Error::DuplicatePath {
                path: path.to_owned(),
                first: first.clone(),
                second: source.to_owned(),
            }),
            None => {
                self.0.insert(path.to_owned(), source.to_owned());
                Ok(())
            }
        }
    }
}

#[derive(Deserialize, Default)]
struct Frontmatter {
    /// The title of the post.
    #[serde(default)]
    pub title: Option<String>,

    /// The date of the post.
    #[serde(default)]
    pub date: Option<PostDate>,

    /// The URL path of the post.
    #[serde(default)]
    pub path: Option<String>,

    /// The tags associated with the post.
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
}

impl Frontmatter {
    /// Splits `input` into its parsed front matter and the markdown body.
    fn split(input: &str) -> Result<(Frontmatter, &str)> {
        const FENCE: &str = "---";
        let input = input.trim_start_matches('\u{feff}');
        if !input.starts_with(FENCE) {
            return Err(Error::FrontmatterMissingStartFence);
        }

        // The fences are whole lines; trailing whitespace (including `\r`) is
        // allowed after them.
        let rest = &input[FENCE.len()..];
        let mut lines = rest.split_inclusive('\n');
        let mut offset = match lines.next() {
            Some(line) if line.trim().is_empty() => line.len(),
            Some(_) => return Err(Error::FrontmatterMissingStartFence),
            None => return Err(Error::FrontmatterMissingEndFence),
        };
        let mut closing = None;
        for line in lines {
            if line.trim_end() == FENCE {
                closing = Some(line.len());
                break;
            }
            offset += line.len();
        }
        let fence_len = closing.ok_or(Error::FrontmatterMissingEndFence)?;
        let yaml = &rest[..offset];
        let body = &rest[offset + fence_len..];

        let frontmatter = if yaml.trim().is_empty() {
            Frontmatter::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        Ok((frontmatter, body))
    }
}

/// Reads `tags` leniently: tags never fail a post. A missing or null field is
/// no tags, a single scalar is one tag, and anything unusable is dropped with
/// a warning. Numbers and booleans become their YAML value's canonical text,
/// so `1.10` is read as `1.1`; quote a tag to keep its spelling.
fn deserialize_tags<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_yaml::Value;

    fn scalar(value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Sequence(items) => items
            .into_iter()
            .filter_map(|item| {
                let tag = scalar(item);
                if tag.is_none() {
                    warn!("ignoring a tag that is not a plain value");
                }
                tag
            })
            .collect(),
        other => match scalar(other) {
            Some(tag) => vec![tag],
            None => {
                warn!("ignoring `tags` that are neither a list nor a plain value");
                Vec::new()
            }
        },
    })
}

/// Represents the result of a parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] or [`Page`].
#[derive(Debug)]
pub enum Error {
    /// Returned when a source file is missing its starting frontmatter fence
    /// (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a source file is missing its terminal frontmatter fence
    /// (`---` i.e., the starting fence was found but the ending one was
    /// missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML,
    /// including dates in an unknown format.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when a front matter path can't be used as a page location.
    InvalidPath { path: String, reason: &'static str },

    /// Returned when two source files resolve to the same path.
    DuplicatePath {
        path: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Returned when there is a problem parsing URLs.
    UrlParse(url::ParseError),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "file must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::InvalidPath { path, reason } => {
                write!(f, "invalid path `{}`: {}", path, reason)
            }
            Error::DuplicatePath {
                path,
                first,
                second,
            } => write!(
                f,
                "`{}` and `{}` both resolve to the path `{}`",
                first.display(),
                second.display(),
                path
            ),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::InvalidPath { .. } => None,
            Error::DuplicatePath { .. } => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL parsing and joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for directory walks.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn site_url() -> Url {
        Url::parse("https://craftercoder.xyz").unwrap()
    }

    fn write(dir: &Path, relative_path: &str, contents: &str) {
        let path = dir.join(relative_path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_parse_posts() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(
            dir.path(),
            "first.md",
            "---\ntitle: First\ndate: 2020-01-01\npath: /first\ntags: [Test Tag, tdd]\n---\nHello *world*\n",
        );
        write(
            dir.path(),
            "nested/second.md",
            "---\ntitle: Second\ndate: 2021-01-01\n---\nSecond post\n",
        );
        write(dir.path(), "notes.txt", "not a post");

        let url = site_url();
        let posts = Parser::new(&url).parse_posts(dir.path())?;
        assert_eq!(2, posts.len());

        let second = &posts[0];
        assert_eq!("Second", second.title);
        assert_eq!("/second/", second.path);
        assert_eq!(PathBuf::from("nested/second.md"), second.source);
        assert!(second.tags.is_empty());

        let first = &posts[1];
        assert_eq!("/first/", first.path);
        assert_eq!(vec!["Test Tag", "tdd"], first.tags);
        assert_eq!("<p>Hello <em>world</em></p>\n", first.body);
        assert_eq!("Hello world", first.excerpt);
        assert_eq!("January 01, 2020", first.date.unwrap().display());
        Ok(())
    }

    #[test]
    fn test_frontmatter_defaults() -> Result<()> {
        let (frontmatter, body) = Frontmatter::split("---\n---\nbody\n")?;
        assert_eq!(None, frontmatter.title);
        assert_eq!(None, frontmatter.date);
        assert!(frontmatter.tags.is_empty());
        assert_eq!("body\n", body);
        Ok(())
    }

    #[test]
    fn test_frontmatter_lenient_tags() -> Result<()> {
        let tags = |yaml: &str| -> Result<Vec<String>> {
            Ok(Frontmatter::split(&format!("---\n{}\n---\n", yaml))?.0.tags)
        };
        assert!(tags("tags:")?.is_empty());
        assert!(tags("tags: ~")?.is_empty());
        assert_eq!(vec!["Rust"], tags("tags: Rust")?);
        assert_eq!(vec!["2020", "rust"], tags("tags: [2020, rust, {a: b}]")?);
        assert!(tags("tags: {a: b}")?.is_empty());
        assert_eq!(vec!["1.1", "1.10"], tags("tags: [1.10, '1.10']")?);
        Ok(())
    }

    #[test]
    fn test_frontmatter_fences() {
        assert!(matches!(
            Frontmatter::split("title: x\n"),
            Err(Error::FrontmatterMissingStartFence)
        ));
        assert!(matches!(
            Frontmatter::split("---\ntitle: x\n"),
            Err(Error::FrontmatterMissingEndFence)
        ));
        assert!(matches!(
            Frontmatter::split("---\ntitle: x\n----\nbody\n"),
            Err(Error::FrontmatterMissingEndFence)
        ));
        assert!(matches!(
            Frontmatter::split("---\ntitle: x\n--- not a fence\nbody\n"),
            Err(Error::FrontmatterMissingEndFence)
        ));
        assert!(matches!(
            Frontmatter::split("--- title: x\n---\n"),
            Err(Error::FrontmatterMissingStartFence)
        ));
    }

    #[test]
    fn test_frontmatter_fence_lines() -> Result<()> {
        let (frontmatter, body) =
            Frontmatter::split("---\r\ntitle: Windows\r\n--- \r\nbody\r\n")?;
        assert_eq!(Some(String::from("Windows")), frontmatter.title);
        assert_eq!("body\r\n", body);

        let (frontmatter, body) = Frontmatter::split("---\ntitle: x\nnote: a --- b\n---")?;
        assert_eq!(Some(String::from("x")), frontmatter.title);
        assert_eq!("", body);
        Ok(())
    }

    #[test]
    fn test_frontmatter_invalid_date() {
        assert!(matches!(
            Frontmatter::split("---\ndate: someday\n---\n"),
            Err(Error::DeserializeYaml(_))
        ));
    }

    #[test]
    fn test_resolve_path() -> Result<()> {
        let url = site_url();
        let parser = Parser::new(&url);
        let source = Path::new("My Post.md");
        assert_eq!("/my-post/", parser.resolve_path(None, source)?);
        assert_eq!("/my-post/", parser.resolve_path(Some("  "), source)?);
        assert_eq!("/blog/post/", parser.resolve_path(Some("/blog/post"), source)?);
        assert_eq!("/post/", parser.resolve_path(Some("/blog/../post/"), source)?);
        assert!(parser.resolve_path(Some("/"), source).is_err());
        assert!(parser.resolve_path(Some("https://elsewhere.com/post"), source).is_err());
        assert!(parser.resolve_path(Some("/post?draft"), source).is_err());
        assert!(parser.resolve_path(None, Path::new("!!!.md")).is_err());
        Ok(())
    }

    #[test]
    fn test_duplicate_paths() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "a.md", "---\ntitle: A\npath: /same\n---\n");
        write(dir.path(), "b.md", "---\ntitle: B\npath: /same/\n---\n");

        let url = site_url();
        match Parser::new(&url).parse_posts(dir.path()) {
            Err(Error::DuplicatePath { path, first, second }) => {
                assert_eq!("/same/", path);
                assert_eq!(PathBuf::from("a.md"), first);
                assert_eq!(PathBuf::from("b.md"), second);
            }
            other => panic!("expected a duplicate path error, got {:?}", other.map(|p| p.len())),
        }
        Ok(())
    }

    #[test]
    fn test_parse_pages() -> Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path(), "about.md", "---\ntitle: About\n---\nHi there\n");

        let url = site_url();
        let parser = Parser::new(&url);
        let pages = parser.parse_pages(dir.path())?;
        assert_eq!(1, pages.len());
        assert_eq!("/about/", pages[0].path);
        assert_eq!("<p>Hi there</p>\n", pages[0].body);

        assert!(parser.parse_pages(&dir.path().join("missing"))?.is_empty());
        Ok(())
    }
}
