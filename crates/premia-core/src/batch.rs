//! Batch result aggregation.
//!
//! Every input item lands in exactly one bucket. Results keep input order.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Maximum number of items in a fill, cancel or order lookup batch.
pub const MAX_BATCH_SIZE: usize = 25;

/// Reject an empty batch or one larger than `max`.
pub fn check_batch_size(size: usize, max: usize) -> Result<()> {
    if size == 0 {
        return Err(CoreError::Validation("batch must not be empty".to_string()));
    }
    if size > max {
        return Err(CoreError::BatchTooLarge { size, max });
    }
    Ok(())
}

/// An item that failed, with the reason reported to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem<I> {
    pub item: I,
    pub reason: String,
}

impl<I> FailedItem<I> {
    pub fn new(item: I, reason: impl Into<String>) -> Self {
        Self {
            item,
            reason: reason.into(),
        }
    }
}

/// Success/failure partition of a batch.
///
/// `T` is the success record, `I` the input item echoed back on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult<T, I = T> {
    pub success: Vec<T>,
    pub failed: Vec<FailedItem<I>>,
}

impl<T, I> Default for BatchResult<T, I> {
    fn default() -> Self {
        Self {
            success: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T, I> BatchResult<T, I> {
    /// Partition tagged per-item outcomes.
    pub fn partition<E: ToString>(
        outcomes: impl IntoIterator<Item = (I, std::result::Result<T, E>)>,
    ) -> Self {
        let mut result = Self::default();
        for (item, outcome) in outcomes {
            match outcome {
                Ok(record) => result.success.push(record),
                Err(e) => result.failed.push(FailedItem::new(item, e.to_string())),
            }
        }
        result
    }

    pub fn push_failed(&mut self, item: I, reason: impl Into<String>) {
        self.failed.push(FailedItem::new(item, reason));
    }

    pub fn len(&self) -> usize {
        self.success.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cancellation partition with the extra `omitted` bucket for ids that
/// matched no active quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelResult<I> {
    pub success: Vec<I>,
    pub failed: Vec<FailedItem<I>>,
    pub omitted: Vec<I>,
}

impl<I> Default for CancelResult<I> {
    fn default() -> Self {
        Self {
            success: Vec::new(),
            failed: Vec::new(),
            omitted: Vec::new(),
        }
    }
}

impl<I> CancelResult<I> {
    pub fn len(&self) -> usize {
        self.success.len() + self.failed.len() + self.omitted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
