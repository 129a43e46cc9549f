// SPDX-License-Identifier: MIT

use super::ApiError;

/// Identifies one request issued through a [`RequestSequence`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket(u64);

/// Orders overlapping requests so that only the latest one is applied.
///
/// Responses can complete in any order; a response whose ticket is no longer
/// current belongs to a superseded request and is dropped.
#[derive(Clone, Debug, Default)]
pub struct RequestSequence {
    latest: u64,
}

impl RequestSequence {
    pub fn begin(&mut self) -> Ticket {
        self.latest += 1;
        Ticket(self.latest)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.latest
    }

    /// Makes every outstanding ticket stale.
    pub fn invalidate(&mut self) {
        self.latest += 1;
    }
}

/// What happened to a completed data fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    /// A newer request was issued meanwhile; nothing changed.
    Stale,
    /// The series was replaced and has at least one point.
    Plotted,
    /// The request succeeded but nothing survived the filters.
    NoData,
    /// The request failed; the chart was emptied.
    Failed(ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_request_wins() {
        let mut sequence = RequestSequence::default();
        let first = sequence.begin();
        let second = sequence.begin();

        assert!(!sequence.is_current(first));
        assert!(sequence.is_current(second));

        sequence.invalidate();
        assert!(!sequence.is_current(second));
    }
}
