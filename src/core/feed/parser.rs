use std::borrow::Cow;

use feed_rs::model::Entry;
use roxmltree::Node;

use super::types::{BookDetails, ParsedShelfFeed, RawBookItem};

#[derive(Debug, thiserror::Error)]
pub enum FeedParseError {
    #[error("feed payload is empty")]
    EmptyPayload,
    #[error("xml feed parse error: {0}")]
    Xml(#[from] feed_rs::parser::ParseFeedError),
    #[error("feed document error: {0}")]
    Document(#[from] roxmltree::Error),
}

/// Parses a shelf feed. Goodreads fields, title included, are read verbatim from each
/// `<item>` element; entries without one (Atom) fall back to the feed parser's title.
pub fn parse_shelf_feed(raw: &[u8]) -> Result<ParsedShelfFeed, FeedParseError> {
    let trimmed = trim_leading_ascii_whitespace(raw);
    if trimmed.is_empty() {
        return Err(FeedParseError::EmptyPayload);
    }

    let feed = feed_rs::parser::parse(trimmed)?;
    let text = decode_document(trimmed);
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc =
        roxmltree::Document::parse_with_options(text.trim_start_matches('\u{feff}'), options)?;
    let mut custom_items = doc
        .descendants()
        .filter(|node| node.has_tag_name("item"))
        .map(custom_fields_from_item);

    let items = feed
        .entries
        .iter()
        .map(|entry| custom_items.next().unwrap_or_else(|| item_from_entry(entry)))
        .collect();

    Ok(ParsedShelfFeed {
        title: feed.title.map(|text| text.content),
        items,
    })
}

fn item_from_entry(entry: &Entry) -> RawBookItem {
    RawBookItem {
        title: entry.title.as_ref().map(|text| text.content.clone()),
        ..RawBookItem::default()
    }
}

// Single-byte Latin encodings map byte-for-char; anything else is read as UTF-8.
fn decode_document(raw: &[u8]) -> Cow<'_, str> {
    let single_byte = declared_encoding(raw).is_some_and(|encoding| {
        matches!(
            encoding.to_ascii_lowercase().as_str(),
            "iso-8859-1" | "latin1" | "latin-1" | "iso_8859-1" | "us-ascii" | "ascii"
        )
    });
    if single_byte {
        return Cow::Owned(raw.iter().map(|&byte| char::from(byte)).collect());
    }
    String::from_utf8_lossy(raw)
}

fn declared_encoding(raw: &[u8]) -> Option<String> {
    let head = raw.strip_prefix(b"<?xml")?;
    let end = head.windows(2).position(|pair| pair == b"?>")?;
    let declaration = std::str::from_utf8(&head[..end]).ok()?;
    let value = declaration.split("encoding").nth(1)?;
    let value = value.trim_start().strip_prefix('=')?.trim_start();
    let quote = value.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &value[1..];
    rest.find(quote).map(|close| rest[..close].to_string())
}

fn custom_fields_from_item(item: Node<'_, '_>) -> RawBookItem {
    RawBookItem {
        book_id: child_text(item, "book_id"),
        isbn: child_text(item, "isbn"),
        title: child_text(item, "title"),
        book_description: child_text(item, "book_description"),
        book_small_image_url: child_text(item, "book_small_image_url"),
        book_medium_image_url: child_text(item, "book_medium_image_url"),
        book_large_image_url: child_text(item, "book_large_image_url"),
        author_name: child_text(item, "author_name"),
        average_rating: child_text(item, "average_rating"),
        book_published: child_text(item, "book_published"),
        book: book_details(item),
    }
}

fn child_text(item: Node<'_, '_>, name: &str) -> Option<String> {
    item.children()
        .find(|node| node.has_tag_name(name))
        .map(element_text)
}

// A `<book>` with nothing but whitespace reads as absent.
fn book_details(item: Node<'_, '_>) -> Option<BookDetails> {
    let node = item.children().find(|node| node.has_tag_name("book"))?;
    let has_elements = node.children().any(|child| child.is_element());
    let has_attributes = node.attributes().next().is_some();
    if !has_elements && !has_attributes && element_text(node).trim().is_empty() {
        return None;
    }

    Some(BookDetails {
        num_pages: node
            .children()
            .filter(|child| child.has_tag_name("num_pages"))
            .map(element_text)
            .collect(),
    })
}

fn element_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|child| child.is_text())
        .filter_map(|child| child.text())
        .collect()
}

fn trim_leading_ascii_whitespace(raw: &[u8]) -> &[u8] {
    let mut index = 0;
    while index < raw.len() && raw[index].is_ascii_whitespace() {
        index += 1;
    }
    &raw[index..]
}
