//! Loads the project configuration (`craftercoder.yaml`) and the theme
//! configuration (`theme/theme.yaml`) into a [`Config`].

use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "craftercoder.yaml";

/// The name of the theme file, relative to the theme directory.
pub const THEME_FILE: &str = "theme.yaml";

/// Site metadata, available to every template as `site`.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Site {
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub twitter_handle: Option<String>,

    /// The site root, e.g. `https://craftercoder.xyz`.
    pub url: Url,
}

/// The template files for each kind of page. Each entry is a list of files
/// which are concatenated and parsed as a single template, so a theme can
/// share a layout file between page kinds.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct Templates {
    pub home: Vec<PathBuf>,
    pub posts: Vec<PathBuf>,
    pub post: Vec<PathBuf>,
    pub page: Vec<PathBuf>,
    pub tags: Vec<PathBuf>,
    pub tag: Vec<PathBuf>,
    pub not_found: Vec<PathBuf>,
}

impl Templates {
    fn relative_to(self, dir: &Path) -> Templates {
        let resolve = |files: Vec<PathBuf>| -> Vec<PathBuf> {
            files.iter().map(|relpath| dir.join(relpath)).collect()
        };
        Templates {
            home: resolve(self.home),
            posts: resolve(self.posts),
            post: resolve(self.post),
            page: resolve(self.page),
            tags: resolve(self.tags),
            tag: resolve(self.tag),
            not_found: resolve(self.not_found),
        }
    }
}

#[derive(Deserialize)]
struct Theme {
    templates: Templates,
}

/// Everything needed to build a site.
#[derive(Clone, Debug)]
pub struct Config {
    pub site: Site,
    pub posts_source_directory: PathBuf,
    pub pages_source_directory: PathBuf,
    pub static_source_directory: PathBuf,
    pub output_directory: PathBuf,
    pub templates: Templates,
}

impl Config {
    /// Finds `craftercoder.yaml` in `dir` or the nearest parent directory
    /// containing one, and loads it. `output_directory` defaults to `_site`
    /// next to the project file.
    pub fn from_directory(dir: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let start = dir.canonicalize().map_err(|err| Error::Open {
            path: dir.to_owned(),
            err,
        })?;

        let mut current: &Path = &start;
        loop {
            let path = current.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path, output_directory);
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => return Err(Error::ProjectFileNotFound(start.clone())),
            }
        }
    }

    /// Loads the project file at `path`. The posts, pages, and theme
    /// directories are resolved relative to the project file's directory.
    pub fn from_project_file(path: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let site: Site = load_yaml(path)?;
        let project_root = path
            .parent()
            .ok_or_else(|| Error::NoParentDirectory(path.to_owned()))?;

        let theme_dir = project_root.join("theme");
        let theme: Theme = load_yaml(&theme_dir.join(THEME_FILE))?;

        Ok(Config {
            site,
            posts_source_directory: project_root.join("posts"),
            pages_source_directory: project_root.join("pages"),
            static_source_directory: theme_dir.join("static"),
            output_directory: match output_directory {
                Some(dir) => dir.to_owned(),
                None => project_root.join("_site"),
            },
            templates: theme.templates.relative_to(&theme_dir),
        })
    }
}

fn load_yaml<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|err| Error::Open {
        path: path.to_owned(),
        err,
    })?;
    serde_yaml::from_reader(file).map_err(|err| Error::DeserializeYaml {
        path: path.to_owned(),
        err,
    })
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading the configuration.
#[derive(Debug)]
pub enum Error {
    /// Returned when no directory from the starting directory up to the root
    /// contains a project file.
    ProjectFileNotFound(PathBuf),

    /// Returned when the project file path has no parent directory.
    NoParentDirectory(PathBuf),

    /// Returned when a configuration file or directory can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when a configuration file isn't valid.
    DeserializeYaml {
        path: PathBuf,
        err: serde_yaml::Error,
    },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ProjectFileNotFound(start) => write!(
                f,
                "could not find `{}` in `{}` or any parent directory",
                PROJECT_FILE,
                start.display()
            ),
            Error::NoParentDirectory(path) => write!(
                f,
                "can't get parent directory for project file `{}`",
                path.display()
            ),
            Error::Open { path, err } => {
                write!(f, "opening `{}`: {}", path.display(), err)
            }
            Error::DeserializeYaml { path, err } => {
                write!(f, "loading `{}`: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ProjectFileNotFound(_) => None,
            Error::NoParentDirectory(_) => None,
            Error::Open { path: _, err } => Some(err),
            Error::DeserializeYaml { path: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    const PROJECT: &str = "
title: Crafter Coder
description: A blog site for all things software craftsmanship
author: '@haletothewood'
twitter_handle: '@craftercoder'
url: https://craftercoder.xyz
";

    const THEME: &str = "
templates:
  home: [layout.html, home.html]
  posts: [layout.html, posts.html]
  post: [layout.html, post.html]
  page: [layout.html, page.html]
  tags: [layout.html, tags.html]
  tag: [layout.html, tag.html]
  not_found: [layout.html, 404.html]
";

    fn project() -> std::io::Result<tempfile::TempDir> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(PROJECT_FILE), PROJECT)?;
        fs::create_dir_all(dir.path().join("theme"))?;
        fs::write(dir.path().join("theme").join(THEME_FILE), THEME)?;
        Ok(dir)
    }

    #[test]
    fn test_from_directory_searches_parents() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = project()?;
        let nested = dir.path().join("posts").join("drafts");
        fs::create_dir_all(&nested)?;

        let config = Config::from_directory(&nested, None)?;
        let root = dir.path().canonicalize()?;
        assert_eq!("Crafter Coder", config.site.title);
        assert_eq!(Some(String::from("@craftercoder")), config.site.twitter_handle);
        assert_eq!(root.join("posts"), config.posts_source_directory);
        assert_eq!(root.join("_site"), config.output_directory);
        assert_eq!(
            vec![root.join("theme/layout.html"), root.join("theme/post.html")],
            config.templates.post
        );
        Ok(())
    }

    #[test]
    fn test_output_directory_override() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = project()?;
        let config = Config::from_directory(dir.path(), Some(Path::new("/tmp/out")))?;
        assert_eq!(PathBuf::from("/tmp/out"), config.output_directory);
        Ok(())
    }

    #[test]
    fn test_missing_theme() -> std::io::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join(PROJECT_FILE), PROJECT)?;
        match Config::from_directory(dir.path(), None) {
            Err(Error::Open { path, .. }) => assert!(path.ends_with("theme/theme.yaml")),
            other => panic!("expected an open error, got {:?}", other.map(|c| c.site)),
        }
        Ok(())
    }
}
