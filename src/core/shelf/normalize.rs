use serde::Serialize;

use crate::core::feed::types::RawBookItem;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("item {index} has a book element without num_pages")]
    MissingPageCount { index: usize },
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BookImage {
    pub small: String,
    pub medium: String,
    pub large: String,
}

/// Simplified shape emitted for one shelf entry.
///
/// Non-finite `rating` values and an unparseable `pages` serialize as `null`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BookRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    pub title: String,
    pub description: String,
    pub image: BookImage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    pub author: String,
    pub rating: f64,
    pub pages: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ShelfEnvelope {
    pub count: usize,
    pub items: Vec<BookRecord>,
}

impl ShelfEnvelope {
    pub fn from_items(items: Vec<RawBookItem>) -> Result<Self, NormalizeError> {
        let items = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| normalize_item(index, item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            count: items.len(),
            items,
        })
    }
}

pub fn normalize_item(index: usize, item: RawBookItem) -> Result<BookRecord, NormalizeError> {
    let pages = match &item.book {
        Some(book) => {
            let first = book
                .num_pages
                .first()
                .ok_or(NormalizeError::MissingPageCount { index })?;
            parse_int_prefix(first)
        }
        None => Some(0),
    };

    Ok(BookRecord {
        id: item.book_id,
        isbn: item.isbn,
        title: item.title.unwrap_or_default(),
        description: item.book_description.unwrap_or_default(),
        image: BookImage {
            small: item.book_small_image_url.unwrap_or_default(),
            medium: item.book_medium_image_url.unwrap_or_default(),
            large: item.book_large_image_url.unwrap_or_default(),
        },
        published: item.book_published,
        author: item.author_name.unwrap_or_default(),
        rating: item
            .average_rating
            .as_deref()
            .map_or(f64::NAN, parse_float_prefix),
        pages,
    })
}

/// Reads the longest decimal literal at the start of `raw`, after leading whitespace.
/// Returns NaN when there is none.
pub fn parse_float_prefix(raw: &str) -> f64 {
    let text = trim_leading_whitespace(raw);
    let bytes = text.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));

    if text[end..].starts_with("Infinity") {
        return if text.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }

    let int_digits = count_digits(&bytes[end..]);
    end += int_digits;
    if bytes.get(end) == Some(&b'.') {
        let frac_digits = count_digits(&bytes[end + 1..]);
        if int_digits > 0 || frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if end == 0 || !bytes[..end].iter().any(u8::is_ascii_digit) {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent_end = end + 1;
        if matches!(bytes.get(exponent_end), Some(b'+' | b'-')) {
            exponent_end += 1;
        }
        let exponent_digits = count_digits(&bytes[exponent_end..]);
        if exponent_digits > 0 {
            end = exponent_end + exponent_digits;
        }
    }

    text[..end].parse().unwrap_or(f64::NAN)
}

/// Base-10 counterpart of [`parse_float_prefix`]. `None` stands for NaN.
pub fn parse_int_prefix(raw: &str) -> Option<i64> {
    let text = trim_leading_whitespace(raw);
    let bytes = text.as_bytes();
    let sign = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits = count_digits(&bytes[sign..]);
    if digits == 0 {
        return None;
    }
    text[..sign + digits].parse().ok()
}

fn trim_leading_whitespace(raw: &str) -> &str {
    raw.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
}

fn count_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|byte| byte.is_ascii_digit()).count()
}
