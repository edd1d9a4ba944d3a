/// Reports the bounds of a content sequence
///
/// The scheduler only ever needs day numbers; resolving a day to actual
/// content is an external concern.
pub trait ContentCatalog {
    /// Inclusive (min, max) day numbers available in the sequence
    fn day_bounds(&self) -> (u32, u32);
}

/// Catalog spanning a fixed number of days, starting at day 1
#[derive(Debug, Clone, Copy)]
pub struct FixedCatalog {
    days: u32,
}

impl FixedCatalog {
    pub fn new(days: u32) -> Self {
        Self { days: days.max(1) }
    }
}

impl ContentCatalog for FixedCatalog {
    fn day_bounds(&self) -> (u32, u32) {
        (1, self.days)
    }
}
