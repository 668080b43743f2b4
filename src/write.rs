use crate::config::Site;
use crate::page::Page;
use crate::post::Post;
use crate::tag::{aggregate, posts_for_tag, TAGS_PATH};
use crate::value;
use gtmpl::{Template, Value};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// The directory (relative to the output directory) static assets are copied
/// into. Posts and pages can't be placed under it.
pub const STATIC_DIRECTORY: &str = "static";

/// The parsed template for each kind of page.
pub struct PageTemplates {
    pub home: Template,
    pub posts: Template,
    pub post: Template,
    pub page: Template,
    pub tags: Template,
    pub tag: Template,
    pub not_found: Template,
}

/// Responsible for indexing, templating, and writing HTML pages to disk from
/// [`Post`] and [`Page`] sources.
pub struct Writer<'a> {
    pub templates: &'a PageTemplates,

    /// Site metadata, made available to every template as `site`.
    pub site: &'a Site,

    /// The year shown in page footers.
    pub year: i32,

    /// The directory in which all HTML files will be written. Each page with
    /// path `/{path}/` is written to `{output_directory}/{path}/index.html`.
    pub output_directory: &'a Path,
}

impl Writer<'_> {
    /// Builds every page for `posts` and `pages` and writes them to disk.
    /// Returns the number of files written.
    pub fn write_site(&self, posts: &[Post], pages: &[Page]) -> Result<usize> {
        let outputs = outputs(posts, pages, self.templates)?;
        let site = value::site(self.site, self.year);
        for output in outputs.iter() {
            self.write_output(output, &site)?;
        }
        Ok(outputs.len())
    }

    /// Takes a single [`Output`], templates it, and writes it to disk.
    fn write_output(&self, output: &Output, site: &Value) -> Result<()> {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("item".to_owned(), output.item.clone());
        m.insert("title".to_owned(), value::text(&output.title));
        m.insert("site".to_owned(), site.clone());
        m.insert(
            "static_url".to_owned(),
            Value::String(format!("/{}/", STATIC_DIRECTORY)),
        );

        let file_path = self.output_directory.join(&output.file_path);
        if let Some(dir) = file_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        debug!("writing {}", file_path.display());
        let context = gtmpl::Context::from(Value::Object(m))?;
        output
            .template
            .execute(&mut std::fs::File::create(&file_path)?, &context)?;
        Ok(())
    }
}

/// An output HTML file, ready to be templated.
struct Output<'t> {
    /// The main item for the page.
    item: Value,

    /// The page's title, for the document head.
    title: String,

    /// The location of the output file relative to the output directory.
    file_path: PathBuf,

    /// The template with which the page will be rendered.
    template: &'t Template,
}

/// Returns the output file for the URL path `path` (e.g. `/about/` becomes
/// `about/index.html`).
fn index_file(path: &str) -> PathBuf {
    let trimmed = path.trim_matches('/');
    match trimmed.is_empty() {
        true => PathBuf::from("index.html"),
        false => Path::new(trimmed).join("index.html"),
    }
}

/// Creates every [`Output`] for the site: the home feed, the post listing, the
/// tag index and tag pages, one page per post and standalone page, and the
/// 404 page. Two outputs claiming the same file is an error.
fn outputs<'t>(
    posts: &[Post],
    pages: &[Page],
    templates: &'t PageTemplates,
) -> Result<Vec<Output<'t>>> {
    let listed: Vec<&Post> = posts.iter().filter(|p| p.is_listed()).collect();
    let mut outputs = vec![
        Output {
            item: Value::Array(listed.iter().map(|p| Value::from(*p)).collect()),
            title: String::from("Home"),
            file_path: index_file("/"),
            template: &templates.home,
        },
        Output {
            item: Value::Array(listed.iter().map(|p| Value::from(*p)).collect()),
            title: String::from("Posts"),
            file_path: index_file("/posts/"),
            template: &templates.posts,
        },
        Output {
            item: Value::Nil,
            title: String::from("404: Not found"),
            file_path: PathBuf::from("404.html"),
            template: &templates.not_found,
        },
    ];

    outputs.extend(tag_outputs(posts, templates));
    outputs.extend(post_outputs(posts, &listed, &templates.post));
    outputs.extend(pages.iter().map(|page| Output {
        item: Value::from(page),
        title: page.title.clone(),
        file_path: index_file(&page.path),
        template: &templates.page,
    }));

    check_collisions(&outputs)?;
    Ok(outputs)
}

/// Creates the tag index page and one page per tag. Tags that normalize to an
/// empty slug have no page and are left off the index.
fn tag_outputs<'t>(posts: &[Post], templates: &'t PageTemplates) -> Vec<Output<'t>> {
    let (records, empty): (Vec<_>, Vec<_>) =
        aggregate(posts).into_iter().partition(|r| !r.slug.is_empty());
    for record in empty.iter() {
        warn!(
            "tag `{}` ({} uses) has no letters or digits; it gets no tag page",
            record.label, record.count
        );
    }

    let mut outputs = vec![Output {
        item: Value::Array(records.iter().map(Value::from).collect()),
        title: String::from("Tags"),
        file_path: index_file(TAGS_PATH),
        template: &templates.tags,
    }];
    outputs.extend(records.iter().map(|record| {
        let tagged = posts_for_tag(posts, &record.label);
        Output {
            item: Value::from(&tagged),
            title: tagged.header(),
            file_path: index_file(&record.path()),
            template: &templates.tag,
        }
    }));
    outputs
}

/// Creates one page per post. Listed posts link to their newer and older
/// neighbors in `listed`; unlisted posts get no neighbor links.
fn post_outputs<'t>(posts: &[Post], listed: &[&Post], template: &'t Template) -> Vec<Output<'t>> {
    posts
        .iter()
        .map(|post| {
            let position = listed.iter().position(|p| std::ptr::eq(*p, post));
            let (newer, older) = match position {
                None => (None, None),
                Some(i) => (
                    match i < 1 {
                        true => None,
                        false => Some(listed[i - 1]),
                    },
                    listed.get(i + 1).copied(),
                ),
            };
            Output {
                item: value::post_page(post, newer, older),
                title: post.title.clone(),
                file_path: index_file(&post.path),
                template,
            }
        })
        .collect()
}

/// Fails if two outputs would be written to the same file, or if a post or
/// page would land in the static assets directory.
fn check_collisions(outputs: &[Output]) -> Result<()> {
    let mut seen: HashMap<&Path, &str> = HashMap::new();
    for output in outputs {
        if output.file_path.starts_with(STATIC_DIRECTORY) {
            return Err(Error::Reserved(output.file_path.clone()));
        }
        if let Some(title) = seen.insert(&output.file_path, &output.title) {
            return Err(Error::Collision {
                file_path: output.file_path.clone(),
                first: title.to_owned(),
                second: output.title.clone(),
            });
        }
    }
    Ok(())
}

/// The result of a fallible page-writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(String),

    /// Two pages would be written to the same file.
    Collision {
        file_path: PathBuf,
        first: String,
        second: String,
    },

    /// A page would be written into the static assets directory.
    Reserved(PathBuf),

    /// An error writing the output files.
    Io(io::Error),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<String> for Error {
    /// Converts a template error message ([`String`]) into an [`Error`]. This
    /// allows us to use the `?` operator for fallible template operations.
    fn from(err: String) -> Error {
        Error::Template(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Collision {
                file_path,
                first,
                second,
            } => write!(
                f,
                "\"{}\" and \"{}\" would both be written to `{}`",
                first,
                second,
                file_path.display()
            ),
            Error::Reserved(file_path) => write!(
                f,
                "`{}` is inside the `{}` directory, which is reserved for static assets",
                file_path.display(),
                STATIC_DIRECTORY
            ),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::Collision { .. } => None,
            Error::Reserved(_) => None,
            Error::Io(err) => Some(err),
        }
    }
}
