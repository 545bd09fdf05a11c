//! Results of search, match and enrollment

use std::fmt;

use chrono::{DateTime, Utc};

/// Result of searching the finger library
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchResult {
    /// A stored template matched
    Match {
        /// Page the template is stored at
        page_id: u16,
        /// Matching score
        score: u16,
    },

    /// Nothing in the searched range matched
    NoMatch,
}

impl SearchResult {
    /// Matching page, if any
    pub fn page_id(&self) -> Option<u16> {
        match self {
            Self::Match { page_id, .. } => Some(*page_id),
            Self::NoMatch => None,
        }
    }

    /// Check if a template matched
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match { page_id, score } => write!(f, "Match[page: {}, score: {}]", page_id, score),
            Self::NoMatch => write!(f, "NoMatch"),
        }
    }
}

/// Result of comparing the two character buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// Buffers belong to the same finger
    Match {
        /// Matching score
        score: u16,
    },

    /// Buffers do not match
    NoMatch,
}

impl MatchResult {
    /// Check if the buffers matched
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }
}

/// Summary of a completed enrollment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollReport {
    /// Page the new template was stored at
    pub page_id: u16,

    /// Number of image captures issued across both loops
    pub captures: u32,

    /// When the enrollment started
    pub started_at: DateTime<Utc>,

    /// When the template was stored
    pub finished_at: DateTime<Utc>,
}

impl EnrollReport {
    /// Wall-clock duration of the enrollment
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

impl fmt::Display for EnrollReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Enrolled[page: {}, captures: {}, took: {}ms]",
            self.page_id,
            self.captures,
            self.elapsed().num_milliseconds()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_search_result_accessors() {
        let found = SearchResult::Match { page_id: 10, score: 120 };
        assert_eq!(found.page_id(), Some(10));
        assert!(found.is_match());

        assert_eq!(SearchResult::NoMatch.page_id(), None);
        assert!(!SearchResult::NoMatch.is_match());
    }

    #[test]
    fn test_enroll_report_display() {
        let started_at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let report = EnrollReport {
            page_id: 3,
            captures: 4,
            started_at,
            finished_at: started_at + chrono::Duration::milliseconds(2500),
        };

        assert_eq!(report.to_string(), "Enrolled[page: 3, captures: 4, took: 2500ms]");
    }
}
