use serde::{Deserialize, Serialize};

/// Nested `<book>` element of a Goodreads item. Only the page count is read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookDetails {
    pub num_pages: Vec<String>,
}

/// One `<item>` of a shelf feed as the upstream delivered it. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawBookItem {
    pub book_id: Option<String>,
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub book_description: Option<String>,
    pub book_small_image_url: Option<String>,
    pub book_medium_image_url: Option<String>,
    pub book_large_image_url: Option<String>,
    pub author_name: Option<String>,
    pub average_rating: Option<String>,
    pub book_published: Option<String>,
    pub book: Option<BookDetails>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedShelfFeed {
    pub title: Option<String>,
    pub items: Vec<RawBookItem>,
}
