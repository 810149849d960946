pub const USER_ID_PARAM: &str = "userId";
pub const SHELF_PARAM: &str = "shelf";

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("request has no query string")]
    MissingQuery,
    #[error("query parameter `{0}` is missing")]
    MissingParam(&'static str),
}

/// A query parameter as received: given once, or repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Single(String),
    Multiple(Vec<String>),
}

impl ParamValue {
    /// Collects every value of `name` in the order given. `None` when the name never appears.
    pub fn from_pairs(pairs: &[(String, String)], name: &str) -> Option<Self> {
        let mut values: Vec<String> = pairs
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
            .collect();
        match values.len() {
            0 => None,
            1 => values.pop().map(Self::Single),
            _ => Some(Self::Multiple(values)),
        }
    }

    // A repeated parameter counts as present even if every occurrence is empty.
    fn is_present(&self) -> bool {
        match self {
            Self::Single(value) => !value.is_empty(),
            Self::Multiple(_) => true,
        }
    }

    /// Repeated values are joined without a separator.
    pub fn into_joined(self) -> String {
        match self {
            Self::Single(value) => value,
            Self::Multiple(values) => values.concat(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShelfParams {
    pub user_id: String,
    pub shelf: String,
}

impl ShelfParams {
    pub fn from_query(raw_query: Option<&str>) -> Result<Self, ParamsError> {
        let raw_query = raw_query.ok_or(ParamsError::MissingQuery)?;
        // Form decoding into owned pairs is lossy and never rejects input.
        let pairs: Vec<(String, String)> =
            serde_urlencoded::from_str(raw_query).unwrap_or_default();

        let user_id = required_param(&pairs, USER_ID_PARAM)?;
        let shelf = required_param(&pairs, SHELF_PARAM)?;

        Ok(Self {
            user_id: user_id.into_joined(),
            shelf: shelf.into_joined(),
        })
    }

    /// Interpolates both identifiers verbatim into the shelf feed template.
    pub fn feed_url(&self, upstream_base: &str) -> String {
        format!(
            "{}/review/list_rss/{}?shelf={}",
            upstream_base.trim_end_matches('/'),
            self.user_id,
            self.shelf
        )
    }
}

fn required_param(
    pairs: &[(String, String)],
    name: &'static str,
) -> Result<ParamValue, ParamsError> {
    ParamValue::from_pairs(pairs, name)
        .filter(ParamValue::is_present)
        .ok_or(ParamsError::MissingParam(name))
}
