//! Defines [`slug`], which turns free-text tag labels into the canonical
//! kebab-case form used in tag page URLs (`/tags/{slug}/`).

/// Converts `text` into a lowercase, hyphen-separated ASCII slug. Runs of
/// non-alphanumeric characters become a single hyphen, case transitions
/// inside a word are word boundaries (`macOS` becomes `mac-os`), digit runs
/// are words of their own (`ES6` becomes `es-6`), apostrophes are dropped, and non-ASCII letters are transliterated. Text without any
/// alphanumeric content yields an empty string.
pub fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in words(text) {
        // `slugify` only transliterates and lowercases here since `word` has
        // no separators, but transliteration can itself produce several
        // words (e.g. CJK characters).
        let word = ::slug::slugify(&word);
        if word.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('-');
        }
        out.push_str(&word);
    }
    out
}

fn is_apostrophe(c: char) -> bool {
    c == '\'' || c == '\u{2019}'
}

/// Splits `text` into words on non-alphanumeric characters, on case
/// transitions (`fooBar`, `FOOBar`), and between letters and digits
/// (`mp3Player`).
fn words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().filter(|c| !is_apostrophe(*c)).collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if let Some(prev) = current.chars().last() {
            let next = chars.get(i + 1).copied();
            let boundary = c.is_numeric() != prev.is_numeric()
                || (c.is_uppercase()
                    && (prev.is_lowercase()
                        || (prev.is_uppercase() && next.map_or(false, char::is_lowercase))));
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}
