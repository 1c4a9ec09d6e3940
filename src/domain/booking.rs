use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of a booking. Only `Active` is ever written today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Active,
    Cancelled,
    Completed,
}

impl BookingStatus {
    // ---
    pub fn as_str(&self) -> &'static str {
        // ---
        match self {
            BookingStatus::Active => "active",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(BookingStatus::Active),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(anyhow::anyhow!("unknown booking status: {other}")),
        }
    }
}

/// A reservation of the facility over `[start, end)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    // ---
    pub id: Uuid,
    pub user_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    // ---
    /// New active booking. Callers validate the range first.
    pub fn new(user_id: Uuid, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        // ---
        Self {
            id: Uuid::new_v4(),
            user_id,
            start,
            end,
            status: BookingStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }

    /// True when `[start, end)` shares at least one instant with this booking.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        intervals_overlap(start, end, self.start, self.end)
    }

    /// Closed containment, matching how the door treats the last second of a slot.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Half-open interval overlap: `[s, e)` and `[s0, e0)` collide iff `s < e0 && e > s0`.
pub fn intervals_overlap<T: PartialOrd>(s: T, e: T, s0: T, e0: T) -> bool {
    s < e0 && e > s0
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn overlap_follows_half_open_rule() {
        // ---
        let existing = Booking::new(Uuid::new_v4(), at(100), at(200));

        assert!(existing.overlaps(at(150), at(250)));
        assert!(existing.overlaps(at(50), at(150)));
        assert!(existing.overlaps(at(120), at(180)));
        assert!(existing.overlaps(at(0), at(1000)));

        // touching boundaries do not collide
        assert!(!existing.overlaps(at(200), at(300)));
        assert!(!existing.overlaps(at(50), at(100)));
    }

    #[test]
    fn canonical_test_matches_compound_condition() {
        // ---
        // The three-clause form the old query used, kept here only to prove equivalence.
        fn compound(s: i64, e: i64, s0: i64, e0: i64) -> bool {
            (s0 < e && e0 > s) || (s0 < s && e0 > s) || (s0 >= s && e0 <= e)
        }

        for s0 in 0..6 {
            for e0 in (s0 + 1)..7 {
                for s in 0..6 {
                    for e in (s + 1)..7 {
                        assert_eq!(
                            intervals_overlap(s, e, s0, e0),
                            compound(s, e, s0, e0),
                            "s={s} e={e} s0={s0} e0={e0}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn contains_is_inclusive_on_both_ends() {
        // ---
        let booking = Booking::new(Uuid::new_v4(), at(100), at(200));
        assert!(booking.contains(at(100)));
        assert!(booking.contains(at(200)));
        assert!(!booking.contains(at(99)));
        assert!(!booking.contains(at(201)));
    }

    #[test]
    fn status_round_trips_through_text() {
        // ---
        for status in [
            BookingStatus::Active,
            BookingStatus::Cancelled,
            BookingStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<BookingStatus>().unwrap(), status);
        }
        assert!("pending".parse::<BookingStatus>().is_err());
    }
}
