//! Fare matrix lookup
//!
//! The fare matrix is a flat list of directed `{from, to, fare}` entries.
//! Lookups are exact matches on the ordered pair: there is no reverse
//! fallback and no summing of intermediate segments. Source tables contain
//! overlapping and duplicate entries; when a pair appears more than once the
//! entry inserted first wins.

use serde::{Deserialize, Serialize};

use crate::route::Route;
use crate::{Error, Result};

/// A directed, priced edge between two checkpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareSegment {
    pub from: String,
    pub to: String,
    pub fare: f64,
}

impl FareSegment {
    pub fn new(from: impl Into<String>, to: impl Into<String>, fare: f64) -> Result<Self> {
        let segment = Self {
            from: from.into(),
            to: to.into(),
            fare,
        };
        segment.check()?;
        Ok(segment)
    }

    fn check(&self) -> Result<()> {
        let reason = if self.from.trim().is_empty() || self.to.trim().is_empty() {
            "checkpoint name is blank"
        } else if !self.fare.is_finite() {
            "fare is not a number"
        } else if self.fare < 0.0 {
            "fare is negative"
        } else {
            return Ok(());
        };

        Err(self.invalid(reason))
    }

    fn invalid(&self, reason: &str) -> Error {
        Error::InvalidSegment {
            from: self.from.clone(),
            to: self.to.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Flat fare matrix with exact-match lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FareTable {
    segments: Vec<FareSegment>,
}

impl FareTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from segments, keeping their order
    pub fn from_segments<I>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = FareSegment>,
    {
        let mut table = Self::new();
        for segment in segments {
            table.insert(segment)?;
        }
        Ok(table)
    }

    /// Build a table whose entries must only reference checkpoints of `route`
    pub fn for_route<I>(route: &Route, segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = FareSegment>,
    {
        let mut table = Self::new();
        for segment in segments {
            for checkpoint in [&segment.from, &segment.to] {
                if !route.contains(checkpoint) {
                    return Err(Error::UnknownCheckpoint {
                        route: route.name().to_string(),
                        checkpoint: checkpoint.clone(),
                    });
                }
            }
            if segment.from == segment.to {
                return Err(segment.invalid("segment starts and ends at the same checkpoint"));
            }
            table.insert(segment)?;
        }
        Ok(table)
    }

    /// Append a segment; duplicates of an existing pair are kept but never win a lookup
    pub fn insert(&mut self, segment: FareSegment) -> Result<()> {
        segment.check()?;
        self.segments.push(segment);
        Ok(())
    }

    /// Fare for the exact directed pair, if the table has one
    pub fn lookup(&self, from: &str, to: &str) -> Option<f64> {
        self.segments
            .iter()
            .find(|s| s.from == from && s.to == to)
            .map(|s| s.fare)
    }

    /// Entries starting at `from`, in table order
    pub fn segments_from<'a>(
        &'a self,
        from: &'a str,
    ) -> impl Iterator<Item = &'a FareSegment> + 'a {
        self.segments.iter().filter(move |s| s.from == from)
    }

    pub fn segments(&self) -> &[FareSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
