use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::HistoryError;

/// Namespace used for records that carry none (legacy imports).
pub const ROOT_NAMESPACE: i32 = 0;

/// Page identity as handed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    pub project_id: String,
    pub namespace_id: i32,
    pub title: String,
}

/// Visits to one page within a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageViewCount {
    pub page: Page,
    pub count: u64,
}

impl PageViewCount {
    pub fn id(&self) -> String {
        format!(
            "{}~{}~{}",
            self.page.project_id, self.page.namespace_id, self.page.title
        )
    }
}

/// Weekday bucket: `day` is 1 (Sunday) through 7 (Saturday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewDay {
    pub day: u32,
    pub view_count: u64,
}

/// A visit record from the pre-ledger history format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyPageView {
    pub title: String,
    pub project: String,
    pub viewed_date: DateTime<Utc>,
}

/// Opaque reference to one stored visit.
///
/// Keys are never reused, so a handle taken before a bulk delete resolves
/// to "not found" afterwards rather than to some newer visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitHandle(i64);

impl VisitHandle {
    pub(crate) fn new(id: i64) -> Self {
        Self(id)
    }

    pub(crate) fn id(self) -> i64 {
        self.0
    }
}

impl fmt::Display for VisitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pv-{}", self.0)
    }
}

impl FromStr for VisitHandle {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .strip_prefix("pv-")
            .and_then(|raw| raw.parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(VisitHandle)
            .ok_or_else(|| HistoryError::validation(format!("Invalid visit handle: '{}'", s)))
    }
}

/// Read-only copy of a stored visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageViewRecord {
    pub handle: VisitHandle,
    pub page: Page,
    pub timestamp: DateTime<Utc>,
    pub number_of_seconds: i64,
    pub previous: Option<VisitHandle>,
}

/// Canonical storage form of a page title.
///
/// Underscores read as spaces, whitespace runs collapse to one space, the
/// ends are trimmed and the first letter is upper-cased, so `"foo_bar"`,
/// `" Foo  bar "` and `"Foo bar"` all land on the same page.
pub fn normalize_title(title: &str) -> String {
    let spaced = title.replace('_', " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => collapsed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title_underscores_and_spaces_collide() {
        assert_eq!(normalize_title("Main_Page"), "Main Page");
        assert_eq!(normalize_title("  Main   Page "), "Main Page");
        assert_eq!(normalize_title("main_page"), "Main page");
    }

    #[test]
    fn test_normalize_title_keeps_inner_case() {
        assert_eq!(normalize_title("iPhone"), "IPhone");
        assert_eq!(normalize_title("Rust (programming language)"), "Rust (programming language)");
    }

    #[test]
    fn test_normalize_title_non_ascii_first_letter() {
        assert_eq!(normalize_title("éclair"), "Éclair");
        assert_eq!(normalize_title("東京"), "東京");
    }

    #[test]
    fn test_normalize_title_empty() {
        assert_eq!(normalize_title(""), "");
        assert_eq!(normalize_title(" _ "), "");
    }

    #[test]
    fn test_visit_handle_display_and_parse() {
        let handle = VisitHandle::new(42);
        assert_eq!(handle.to_string(), "pv-42");
        assert_eq!("pv-42".parse::<VisitHandle>().unwrap(), handle);
        assert!("42".parse::<VisitHandle>().is_err());
        assert!("pv-0".parse::<VisitHandle>().is_err());
        assert!("pv-abc".parse::<VisitHandle>().is_err());
    }

    #[test]
    fn test_page_view_count_id() {
        let count = PageViewCount {
            page: Page {
                project_id: "wikipedia~en".to_string(),
                namespace_id: 0,
                title: "Cat".to_string(),
            },
            count: 3,
        };
        assert_eq!(count.id(), "wikipedia~en~0~Cat");
    }

    #[test]
    fn test_page_view_day_serializes_camel_case() {
        let day = PageViewDay {
            day: 2,
            view_count: 5,
        };
        let json = serde_json::to_string(&day).unwrap();
        assert_eq!(json, r#"{"day":2,"viewCount":5}"#);
    }
}
