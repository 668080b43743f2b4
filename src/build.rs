//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: parsing the posts and pages
//! ([`crate::parser`]), cleaning the output directory, rendering every page
//! ([`crate::write`]), and copying the theme's static assets.

use crate::config::Config;
use crate::parser::{Error as ParseError, Parser};
use crate::write::{Error as WriteError, PageTemplates, Writer, STATIC_DIRECTORY};
use chrono::Datelike;
use gtmpl::Template;
use log::{debug, info};
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The file marking an output directory as created by `craftercoder`. Only
/// directories carrying it are deleted before a build.
pub const WATERMARK_FILE: &str = ".craftercoder";

/// Builds the site from a [`Config`] object. This calls into
/// [`Parser::parse_posts`], [`Parser::parse_pages`], and
/// [`Writer::write_site`] which do the heavy-lifting. This function also
/// copies the static assets from the theme to the output directory.
pub fn build_site(config: &Config) -> Result<()> {
    let parser = Parser::new(&config.site.url);

    // collect all posts and pages
    let posts = parser.parse_posts(&config.posts_source_directory)?;
    let pages = parser.parse_pages(&config.pages_source_directory)?;
    info!(
        "loaded {} posts ({} listed) and {} pages",
        posts.len(),
        posts.iter().filter(|p| p.is_listed()).count(),
        pages.len()
    );

    // Parse the template files before touching the output directory so a
    // broken theme leaves the previous build in place.
    let templates = PageTemplates {
        home: parse_template(config.templates.home.iter())?,
        posts: parse_template(config.templates.posts.iter())?,
        post: parse_template(config.templates.post.iter())?,
        page: parse_template(config.templates.page.iter())?,
        tags: parse_template(config.templates.tags.iter())?,
        tag: parse_template(config.templates.tag.iter())?,
        not_found: parse_template(config.templates.not_found.iter())?,
    };

    clean(&config.output_directory)?;

    let writer = Writer {
        templates: &templates,
        site: &config.site,
        year: chrono::Utc::now().year(),
        output_directory: &config.output_directory,
    };
    let written = writer.write_site(&posts, &pages)?;
    info!(
        "wrote {} pages to `{}`",
        written,
        config.output_directory.display()
    );

    // copy static directory
    if config.static_source_directory.is_dir() {
        let copied = copy_dir(
            &config.static_source_directory,
            &config.output_directory.join(STATIC_DIRECTORY),
        )?;
        info!("copied {} static files", copied);
    } else {
        debug!(
            "no static directory at `{}`",
            config.static_source_directory.display()
        );
    }

    Ok(())
}

/// Empties `dir` for a new build and marks it with the watermark file. We
/// don't want to naively delete a directory the user pointed us at by
/// mistake, so a non-empty directory must already carry the watermark.
fn clean(dir: &Path) -> Result<()> {
    if dir.exists() {
        let is_empty = std::fs::read_dir(dir)
            .map_err(|err| clean_error(dir, err))?
            .next()
            .is_none();
        if !is_empty && !dir.join(WATERMARK_FILE).is_file() {
            return Err(Error::UnmanagedOutput(dir.to_owned()));
        }
        std::fs::remove_dir_all(dir).map_err(|err| clean_error(dir, err))?;
    }
    std::fs::create_dir_all(dir).map_err(|err| clean_error(dir, err))?;
    File::create(dir.join(WATERMARK_FILE)).map_err(|err| clean_error(dir, err))?;
    Ok(())
}

fn clean_error(dir: &Path, err: std::io::Error) -> Error {
    Error::Clean {
        path: dir.to_owned(),
        err,
    }
}

/// Recursively copies `src` into `dst`, returning the number of files copied.
fn copy_dir(src: &Path, dst: &Path) -> Result<usize> {
    std::fs::create_dir_all(dst)?;
    let mut copied = 0;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            copied += copy_dir(&entry.path(), &dst.join(entry.file_name()))?;
        } else {
            std::fs::copy(entry.path(), dst.join(entry.file_name()))?;
            copied += 1;
        }
    }

    Ok(copied)
}

// Loads the template file contents, concatenates them, and parses the result
// into a template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    let mut last = PathBuf::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(&template_file)
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?
            .read_to_string(&mut contents)?;
        last = template_file.to_owned();
    }

    let mut template = Template::default();
    template
        .parse(&contents)
        .map_err(|err| Error::ParseTemplate { path: last, err })?;
    Ok(template)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing, writing,
/// cleaning output directories, parsing template files, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing.
    Parse(ParseError),

    /// Returned for errors writing pages to disk as HTML files.
    Write(WriteError),

    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned when the output directory has content but wasn't created by
    /// a previous build.
    UnmanagedOutput(PathBuf),

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files. `path` is the last file of
    /// the template.
    ParseTemplate { path: PathBuf, err: String },

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::UnmanagedOutput(path) => write!(
                f,
                "Refusing to delete '{}': it is not empty and has no `{}` file",
                path.display(),
                WATERMARK_FILE
            ),
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate { path, err } => {
                write!(f, "Parsing template '{}': {}", path.display(), err)
            }
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::UnmanagedOutput(_) => None,
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate { .. } => None,
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn test_clean_refuses_unmanaged_directory() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("precious.txt"), "keep me")?;
        assert!(matches!(clean(dir.path()), Err(Error::UnmanagedOutput(_))));
        assert!(dir.path().join("precious.txt").is_file());
        Ok(())
    }

    #[test]
    fn test_clean_replaces_managed_directory() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("_site");
        clean(&out)?;
        assert!(out.join(WATERMARK_FILE).is_file());

        fs::write(out.join("stale.html"), "old")?;
        clean(&out)?;
        assert!(!out.join("stale.html").exists());
        assert!(out.join(WATERMARK_FILE).is_file());
        Ok(())
    }

    #[test]
    fn test_copy_dir_recurses() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("css"))?;
        fs::write(src.join("favicon.png"), "png")?;
        fs::write(src.join("css").join("style.css"), "body {}")?;

        let dst = dir.path().join("dst");
        assert_eq!(2, copy_dir(&src, &dst)?);
        assert_eq!("body {}", fs::read_to_string(dst.join("css").join("style.css"))?);
        Ok(())
    }

    #[test]
    fn test_build_testdata_site() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let out = tempfile::tempdir()?;
        let output_directory = out.path().join("_site");
        let config = Config::from_directory(Path::new("./testdata"), Some(&output_directory))?;
        build_site(&config)?;

        let read = |relative_path: &str| fs::read_to_string(output_directory.join(relative_path));
        let tags = read("tags/index.html")?;
        assert!(tags.contains("<a class=\"tag-listing\" href=\"/tags/test-tag/\">test-tag (2)</a>"));
        assert!(tags.contains("href=\"/tags/c/\">C++ (1)</a>"));

        let tag = read("tags/test-tag/index.html")?;
        assert!(tag.contains("<h2>2 posts tagged with &quot;test-tag&quot;</h2>"));
        let newer = tag.find("/second-post/").ok_or("missing second post")?;
        let older = tag.find("/first-post/").ok_or("missing first post")?;
        assert!(newer < older);

        let home = read("index.html")?;
        assert!(home.contains("First Post"));
        assert!(!home.contains("Untitled draft"));

        assert!(read("about/index.html")?.contains("<h2>About</h2>"));
        assert!(read("first-post/index.html")?.contains("<h2>First Post</h2>"));
        assert!(read("404.html")?.contains("NOT FOUND"));
        assert!(read("static/style.css").is_ok());
        assert!(output_directory.join(WATERMARK_FILE).is_file());
        Ok(())
    }
}
