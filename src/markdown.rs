//! Converts markdown post bodies into HTML, and derives the plain-text excerpt
//! and reading time shown in the home feed.

use pulldown_cmark::{html, Event, Options, Parser, Tag};

/// The maximum length of an excerpt, in characters.
pub const EXCERPT_LENGTH: usize = 250;

/// The assumed reading speed for [`Rendered::reading_time`].
const WORDS_PER_MINUTE: usize = 200;

/// The output of [`render`].
#[derive(Clone, Debug, PartialEq)]
pub struct Rendered {
    pub html: String,
    pub excerpt: String,
    pub reading_time: String,
}

/// Renders `markdown` to HTML. The excerpt and reading time are computed from
/// the same event stream, so they see exactly the text that ends up on the
/// page.
pub fn render(markdown: &str) -> Rendered {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut text = String::new();
    let events = Parser::new_ext(markdown, options).inspect(|ev| match ev {
        Event::Text(s) | Event::Code(s) => text.push_str(s),
        Event::SoftBreak | Event::HardBreak => text.push(' '),
        Event::End(Tag::Paragraph)
        | Event::End(Tag::Heading(_))
        | Event::End(Tag::Item)
        | Event::End(Tag::CodeBlock(_))
        | Event::End(Tag::TableCell) => text.push(' '),
        _ => {}
    });

    let mut out = String::new();
    html::push_html(&mut out, events);

    let words: Vec<&str> = text.split_whitespace().collect();
    Rendered {
        html: out,
        excerpt: prune(&words.join(" "), EXCERPT_LENGTH),
        reading_time: reading_time(words.len()),
    }
}

/// Formats the reading time for `words` words, e.g. `3 min read`.
fn reading_time(words: usize) -> String {
    let minutes = (words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE;
    format!("{} min read", minutes)
}

/// Shortens `text` to at most `length` characters, cutting at the last word
/// boundary and appending an ellipsis. Text that already fits is returned
/// unchanged.
fn prune(text: &str, length: usize) -> String {
    if text.chars().count() <= length {
        return text.to_owned();
    }

    // byte offset of the first character past the limit
    let limit = match text.char_indices().nth(length) {
        Some((i, _)) => i,
        None => text.len(),
    };
    let cut = if text[limit..].starts_with(' ') {
        limit
    } else {
        text[..limit].rfind(' ').unwrap_or(limit)
    };
    format!("{}…", text[..cut].trim_end())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_render_html() {
        let rendered = render("# Hello\n\nSome *emphasis* and `code`.");
        assert_eq!(
            "<h1>Hello</h1>\n<p>Some <em>emphasis</em> and <code>code</code>.</p>\n",
            rendered.html
        );
        assert_eq!("Hello Some emphasis and code.", rendered.excerpt);
        assert_eq!("1 min read", rendered.reading_time);
    }

    #[test]
    fn test_render_extensions() {
        let rendered = render("~~gone~~\n\n| a |\n|---|\n| b |\n");
        assert!(rendered.html.contains("<del>gone</del>"));
        assert!(rendered.html.contains("<table>"));
        assert_eq!("gone a b", rendered.excerpt);
    }

    #[test]
    fn test_excerpt_pruned_at_word_boundary() {
        let markdown = "word ".repeat(100);
        let excerpt = render(&markdown).excerpt;
        assert!(excerpt.ends_with("word…"));
        assert!(excerpt.chars().count() <= EXCERPT_LENGTH + 1);
    }

    #[test]
    fn test_prune() {
        assert_eq!("short", prune("short", 10));
        assert_eq!("hello…", prune("hello world", 8));
        assert_eq!("hello…", prune("hello world", 5));
        assert_eq!("unbroken…", prune("unbrokenword", 8));
    }

    #[test]
    fn test_reading_time() {
        assert_eq!("0 min read", reading_time(0));
        assert_eq!("1 min read", reading_time(200));
        assert_eq!("2 min read", reading_time(201));
        assert_eq!("2 min read", render(&"lorem ".repeat(350)).reading_time);
    }
}
