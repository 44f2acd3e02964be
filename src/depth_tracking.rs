use crate::error::{Error, Result};

/// Guards nesting depth while walking a value graph or a body.
///
/// Every compound item (array, map, reference, object) calls [`enter`][Self::enter] before its
/// children are visited and [`leave`][Self::leave] once they're done.
#[derive(Clone, Debug)]
pub struct DepthTracker {
    depth: usize,
    max: usize,
}

impl DepthTracker {
    /// Create a new depth tracker that allows at most `max` levels of nesting.
    pub fn new(max: usize) -> Self {
        Self { depth: 0, max }
    }

    /// Go one level deeper. Fails if that would exceed the limit.
    pub fn enter(&mut self) -> Result<()> {
        if self.depth >= self.max {
            return Err(Error::RecursionLimit { max: self.max });
        }
        self.depth += 1;
        Ok(())
    }

    /// Come back up a level.
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}
