//! Query validation and request path construction
//!
//! A [`Query`] is validated in full before anything touches the network:
//! malformed dates, unknown filter names and conflicting filters fail fast.
//! A valid query becomes a [`QueryPlan`], which knows the initial path, the
//! stop condition and how to turn a cursor link into the next path.

use crate::url::query_part;
use crate::{QueryError, QueryResult};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Content filters accepted by mirror search
pub const FILTERS: [&str; 12] = [
    "nativeretweets",
    "media",
    "videos",
    "news",
    "verified",
    "native_video",
    "replies",
    "links",
    "images",
    "safe",
    "quote",
    "pro_video",
];

/// Default number of posts collected when no date window is given
pub const DEFAULT_NUMBER: usize = 5;

/// Dates on or before this day predate the origin network
const EARLIEST_DATE: (i32, u32, u32) = (2006, 3, 21);

/// What a query's term means
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Term,
    Hashtag,
    User,
}

impl FromStr for SearchMode {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "term" => Ok(Self::Term),
            "hashtag" => Ok(Self::Hashtag),
            "user" => Ok(Self::User),
            other => Err(QueryError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Term => "term",
            Self::Hashtag => "hashtag",
            Self::User => "user",
        };
        f.write_str(name)
    }
}

/// One collection request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub term: String,
    pub mode: SearchMode,
    /// Target count; ignored when `since` is set
    pub number: usize,
    pub since: Option<String>,
    pub until: Option<String>,
    pub near: Option<String>,
    pub language: Option<String>,
    pub to_user: Option<String>,
    pub include_filters: Vec<String>,
    pub exclude_filters: Vec<String>,
    pub skip_pinned: bool,
    pub skip_reposts: bool,
    /// Explicit endpoint override
    pub instance: Option<String>,
    pub max_retries: Option<u32>,
}

impl Query {
    pub fn new(term: impl Into<String>, mode: SearchMode) -> Self {
        Self {
            term: term.into(),
            mode,
            number: DEFAULT_NUMBER,
            since: None,
            until: None,
            near: None,
            language: None,
            to_user: None,
            include_filters: Vec::new(),
            exclude_filters: Vec::new(),
            skip_pinned: false,
            skip_reposts: false,
            instance: None,
            max_retries: None,
        }
    }

    pub fn with_number(mut self, number: usize) -> Self {
        self.number = number;
        self
    }

    pub fn with_since(mut self, since: impl Into<String>) -> Self {
        self.since = Some(since.into());
        self
    }

    pub fn with_until(mut self, until: impl Into<String>) -> Self {
        self.until = Some(until.into());
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Validates the query against today's date and builds its plan
    pub fn plan(&self) -> QueryResult<QueryPlan> {
        self.plan_at(Local::now().date_naive())
    }

    /// Validates the query against `today` and builds its plan
    pub fn plan_at(&self, today: NaiveDate) -> QueryResult<QueryPlan> {
        let term = match self.mode {
            SearchMode::User => normalize_username(&self.term)?,
            SearchMode::Hashtag => self.term.trim().trim_start_matches('#').to_string(),
            SearchMode::Term => self.term.trim().to_string(),
        };
        if term.is_empty() {
            return Err(QueryError::EmptyTerm);
        }

        if let Some(since) = &self.since {
            check_date("since", since, today)?;
        }
        if let Some(until) = &self.until {
            check_date("until", until, today)?;
        }
        let include = check_filters(&self.include_filters)?;
        let exclude = check_filters(&self.exclude_filters)?;
        if let Some(name) = include.iter().find(|name| exclude.contains(name)) {
            return Err(QueryError::ConflictingFilter(name.to_string()));
        }

        let searching = self.since.is_some()
            || self.until.is_some()
            || self.near.is_some()
            || self.language.is_some()
            || self.to_user.is_some()
            || !include.is_empty()
            || !exclude.is_empty();

        let (mut path, shape) = match self.mode {
            SearchMode::Term => (
                format!("/search?f=tweets&q={}", urlencoding::encode(&term)),
                PathShape::Search,
            ),
            SearchMode::Hashtag => (
                format!("/search?f=tweets&q=%23{}", urlencoding::encode(&term)),
                PathShape::Search,
            ),
            SearchMode::User if searching => (
                format!("/{}/search?f=tweets&q=", term),
                PathShape::UserSearch(term.clone()),
            ),
            SearchMode::User => (format!("/{}", term), PathShape::UserTimeline(term.clone())),
        };

        if let Some(language) = &self.language {
            path.push_str(&format!("+lang%3A{}", urlencoding::encode(language.trim())));
        }
        if let Some(to_user) = &self.to_user {
            let to_user = to_user.trim().trim_start_matches('@');
            path.push_str(&format!("+to%3A{}", urlencoding::encode(to_user)));
        }
        for name in &include {
            path.push_str(&format!("&f-{}=on", name));
        }
        for name in &exclude {
            path.push_str(&format!("&e-{}=on", name));
        }
        if let Some(near) = &self.near {
            path.push_str(&format!("&near={}", urlencoding::encode(near.trim())));
        }
        if let Some(since) = &self.since {
            path.push_str(&format!("&since={}", since));
        }
        if let Some(until) = &self.until {
            path.push_str(&format!("&until={}", until));
        }

        Ok(QueryPlan {
            initial_path: path,
            shape,
            target: self.number,
            date_window: self.since.is_some(),
            skip_pinned: self.skip_pinned,
            skip_reposts: self.skip_reposts,
        })
    }
}

/// URL shape of a feed, which decides how cursor links are followed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathShape {
    /// `/<user>`
    UserTimeline(String),
    /// `/<user>/search?...`
    UserSearch(String),
    /// `/search?...`
    Search,
}

/// A validated query, ready to be walked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub initial_path: String,
    pub shape: PathShape,
    pub target: usize,
    /// When set the count target is ignored and the feed is walked to its end
    pub date_window: bool,
    pub skip_pinned: bool,
    pub skip_reposts: bool,
}

impl QueryPlan {
    /// Builds the next request path from a "show more" href
    pub fn next_path(&self, href: &str) -> Option<String> {
        let query = query_part(href)?;
        Some(match &self.shape {
            PathShape::UserTimeline(user) => format!("/{}?{}", user, query),
            PathShape::UserSearch(user) => format!("/{}/search?{}", user, query),
            PathShape::Search => format!("/search?{}", query),
        })
    }

    /// Returns true once `collected` items satisfy the count target
    pub fn is_satisfied(&self, collected: usize) -> bool {
        !self.date_window && collected >= self.target
    }
}

/// Strips a leading `@` and surrounding whitespace from a username
pub fn normalize_username(raw: &str) -> QueryResult<String> {
    let username = raw.trim().trim_start_matches('@').trim();
    if username.is_empty() {
        Err(QueryError::EmptyTerm)
    } else {
        Ok(username.to_string())
    }
}

fn check_date(field: &'static str, value: &str, today: NaiveDate) -> QueryResult<()> {
    let invalid = || QueryError::InvalidDate {
        field,
        value: value.to_string(),
    };

    let well_formed = value.len() == 10
        && value
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(invalid());
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| invalid())?;
    let (year, month, day) = EARLIEST_DATE;
    let earliest = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;

    if date > earliest && date <= today {
        Ok(())
    } else {
        Err(invalid())
    }
}

fn check_filters(names: &[String]) -> QueryResult<Vec<String>> {
    let mut checked: Vec<String> = Vec::new();
    for name in names {
        let name = name.trim().to_lowercase();
        if !FILTERS.contains(&name.as_str()) {
            return Err(QueryError::UnknownFilter(name));
        }
        if !checked.contains(&name) {
            checked.push(name);
        }
    }
    Ok(checked)
}
