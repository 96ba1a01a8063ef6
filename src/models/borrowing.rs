//! Borrowing (ledger entry) model and status derivation
//!
//! A borrowing links one book copy to one borrower. It is open while
//! `return_date` is NULL and closed forever once the copy comes back.
//! Status (`active` / `overdue` / `returned`) is never stored: every read
//! surface derives it here from the record and the current time, so the
//! definition cannot drift between call sites.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use super::book::BookSummary;
use super::borrower::BorrowerSummary;

/// Default loan period applied when checkout is not given an explicit due date
pub const LOAN_PERIOD_DAYS: i64 = 14;

const SECONDS_PER_DAY: i64 = 86_400;

/// Borrowing model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Borrowing {
    pub id: i32,
    pub book_id: i32,
    pub borrower_id: i32,
    pub checkout_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

/// Resolved borrowing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BorrowingStatus {
    Active,
    Overdue,
    Returned,
}

impl BorrowingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowingStatus::Active => "active",
            BorrowingStatus::Overdue => "overdue",
            BorrowingStatus::Returned => "returned",
        }
    }
}

impl std::fmt::Display for BorrowingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BorrowingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(BorrowingStatus::Active),
            "overdue" => Ok(BorrowingStatus::Overdue),
            "returned" => Ok(BorrowingStatus::Returned),
            _ => Err(format!("Invalid borrowing status: {}", s)),
        }
    }
}

/// Floor division of a time span into whole days (negative spans round down)
fn whole_days(span: Duration) -> i64 {
    span.num_seconds().div_euclid(SECONDS_PER_DAY)
}

impl Borrowing {
    /// The book copy is still out
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }

    /// Resolve the status as of `now`
    pub fn status_at(&self, now: DateTime<Utc>) -> BorrowingStatus {
        if self.return_date.is_some() {
            BorrowingStatus::Returned
        } else if self.due_date < now {
            BorrowingStatus::Overdue
        } else {
            BorrowingStatus::Active
        }
    }

    /// Whole days past the due date as of `now`. Only defined while the
    /// borrowing is open; zero when the due date has not passed yet.
    pub fn days_overdue_at(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.return_date.is_some() {
            return None;
        }
        Some(whole_days(now - self.due_date).max(0))
    }

    /// Whole days until the due date as of `now` (negative when overdue)
    pub fn days_until_due_at(&self, now: DateTime<Utc>) -> i64 {
        whole_days(self.due_date - now)
    }

    /// For a closed borrowing, whether it came back after its due date
    pub fn was_overdue(&self) -> bool {
        match self.return_date {
            Some(returned) => returned > self.due_date,
            None => false,
        }
    }
}

/// Borrowing with book and borrower snapshots, plus derived status fields
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BorrowingDetails {
    pub id: i32,
    pub book: BookSummary,
    pub borrower: BorrowerSummary,
    pub checkout_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: BorrowingStatus,
    /// Whole days past due; present only while the borrowing is open
    pub days_overdue: Option<i64>,
    pub days_until_due: i64,
}

impl BorrowingDetails {
    /// Build the detail view from a ledger record and its snapshots,
    /// resolving status fields as of `now`.
    pub fn resolve(
        borrowing: &Borrowing,
        book: BookSummary,
        borrower: BorrowerSummary,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: borrowing.id,
            book,
            borrower,
            checkout_date: borrowing.checkout_date,
            due_date: borrowing.due_date,
            return_date: borrowing.return_date,
            status: borrowing.status_at(now),
            days_overdue: borrowing.days_overdue_at(now),
            days_until_due: borrowing.days_until_due_at(now),
        }
    }
}

/// Borrowing list query parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BorrowingQuery {
    /// Filter by resolved status (active, overdue, returned)
    pub status: Option<String>,
    pub book_id: Option<i32>,
    pub borrower_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn borrowing(due: DateTime<Utc>, returned: Option<DateTime<Utc>>) -> Borrowing {
        Borrowing {
            id: 1,
            book_id: 10,
            borrower_id: 20,
            checkout_date: due - Duration::days(LOAN_PERIOD_DAYS),
            due_date: due,
            return_date: returned,
        }
    }

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse::<DateTime<Utc>>().unwrap()
    }

    #[test]
    fn open_borrowing_before_due_date_is_active() {
        let b = borrowing(ts("2024-06-15T12:00:00Z"), None);
        let now = ts("2024-06-10T12:00:00Z");

        assert_eq!(b.status_at(now), BorrowingStatus::Active);
        assert_eq!(b.days_overdue_at(now), Some(0));
        assert_eq!(b.days_until_due_at(now), 5);
    }

    #[test]
    fn open_borrowing_past_due_date_is_overdue() {
        let b = borrowing(ts("2024-06-15T12:00:00Z"), None);
        let now = ts("2024-06-16T13:00:00Z");

        assert_eq!(b.status_at(now), BorrowingStatus::Overdue);
        assert_eq!(b.days_overdue_at(now), Some(1));
        assert_eq!(b.days_until_due_at(now), -2);
    }

    #[test]
    fn returned_borrowing_is_returned_regardless_of_due_date() {
        let b = borrowing(
            ts("2024-06-15T12:00:00Z"),
            Some(ts("2024-06-20T12:00:00Z")),
        );
        let now = ts("2024-07-01T12:00:00Z");

        assert_eq!(b.status_at(now), BorrowingStatus::Returned);
        assert_eq!(b.days_overdue_at(now), None);
        assert!(b.was_overdue());
    }

    #[test]
    fn timely_return_was_not_overdue() {
        let b = borrowing(
            ts("2024-06-15T12:00:00Z"),
            Some(ts("2024-06-14T12:00:00Z")),
        );

        assert!(!b.was_overdue());
    }

    #[test]
    fn days_until_due_rounds_down_for_partial_days() {
        let b = borrowing(ts("2024-06-15T12:00:00Z"), None);

        // 36 hours before due: floor(1.5 days) = 1
        assert_eq!(b.days_until_due_at(ts("2024-06-14T00:00:00Z")), 1);
        // 12 hours past due: floor(-0.5 days) = -1, but not a whole day overdue yet
        let now = ts("2024-06-16T00:00:00Z");
        assert_eq!(b.days_until_due_at(now), -1);
        assert_eq!(b.days_overdue_at(now), Some(0));
    }

    #[test]
    fn status_parses_from_string() {
        assert_eq!("overdue".parse::<BorrowingStatus>(), Ok(BorrowingStatus::Overdue));
        assert!("lost".parse::<BorrowingStatus>().is_err());
    }
}
