//! Search-results listing parser
//!
//! Search bots answer with a text file where every result line looks like
//!
//! ```text
//! !Oatmeal F. Scott Fitzgerald - The Great Gatsby.epub  ::INFO:: 303.4KB
//! ```
//!
//! Lines that do not start with `!` are headers and footers and are skipped.

use crate::protocol::{BookDetail, ParseError};

const INFO_MARKER: &str = "::INFO::";
const HASH_MARKER: &str = "::HASH::";
const AUTHOR_SEPARATOR: &str = " - ";

/// Parse a complete results listing into books and per-line errors
pub fn parse_search_results(text: &str) -> (Vec<BookDetail>, Vec<ParseError>) {
    let mut books = Vec::new();
    let mut errors = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if !line.starts_with('!') {
            continue;
        }

        match parse_line(line) {
            Ok(book) => books.push(book),
            Err(error) => errors.push(ParseError::new(line, error)),
        }
    }

    (books, errors)
}

/// Parse one `!server author - title.format ::INFO:: size` line
pub fn parse_line(line: &str) -> Result<BookDetail, &'static str> {
    let rest = line.strip_prefix('!').ok_or("line does not start with '!'")?;

    let (server, rest) = rest
        .split_once(char::is_whitespace)
        .ok_or("could not find server name")?;
    if server.is_empty() {
        return Err("could not find server name");
    }

    let (file_part, size) = match rest.split_once(INFO_MARKER) {
        Some((file_part, size)) => (file_part, size.trim()),
        None => (rest, ""),
    };
    let file_part = match file_part.split_once(HASH_MARKER) {
        Some((before, _)) => before,
        None => file_part,
    }
    .trim();

    let (author, title_and_format) = file_part
        .split_once(AUTHOR_SEPARATOR)
        .ok_or("could not find author")?;
    let author = author.trim();
    if author.is_empty() {
        return Err("could not find author");
    }

    let (title, format) = title_and_format
        .trim()
        .rsplit_once('.')
        .ok_or("could not find file format")?;
    if format.is_empty() || format.contains(char::is_whitespace) {
        return Err("could not find file format");
    }
    if title.trim().is_empty() {
        return Err("could not find title");
    }

    Ok(BookDetail {
        server: server.to_string(),
        author: author.to_string(),
        title: title.trim().to_string(),
        format: format.to_lowercase(),
        size: size.to_string(),
        full: line.to_string(),
    })
}
