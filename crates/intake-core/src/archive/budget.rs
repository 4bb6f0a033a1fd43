//! File-count and byte budgets for one extraction.

use crate::error::{IntakeError, Result, SizeBound};

/// Tracks extraction resource consumption across an archive and all of its
/// recursive expansions.
///
/// Once charged, consumption is never refunded. A nested archive that fails
/// partway keeps its charges, so repeated expansion attempts cannot be used
/// to multiply the effective budget.
#[derive(Debug)]
pub(crate) struct ExtractionBudget {
    max_files: usize,
    max_total_bytes: u64,
    max_file_bytes: u64,
    files: usize,
    total_bytes: u64,
}

impl ExtractionBudget {
    pub(crate) const fn new(max_files: usize, max_total_bytes: u64, max_file_bytes: u64) -> Self {
        Self {
            max_files,
            max_total_bytes,
            max_file_bytes,
            files: 0,
            total_bytes: 0,
        }
    }

    /// Reserves one extracted-file slot.
    pub(crate) fn charge_file(&mut self) -> Result<()> {
        if self.files >= self.max_files {
            return Err(IntakeError::SizeExceeded {
                bound: SizeBound::FileCount {
                    current: self.files + 1,
                    max: self.max_files,
                },
            });
        }
        self.files += 1;
        Ok(())
    }

    /// Adds written bytes to the running total.
    pub(crate) fn charge_bytes(&mut self, bytes: u64) -> Result<()> {
        let next = self
            .total_bytes
            .checked_add(bytes)
            .ok_or(IntakeError::SizeExceeded {
                bound: SizeBound::IntegerOverflow,
            })?;
        if next > self.max_total_bytes {
            return Err(IntakeError::SizeExceeded {
                bound: SizeBound::TotalSize {
                    current: next,
                    max: self.max_total_bytes,
                },
            });
        }
        self.total_bytes = next;
        Ok(())
    }

    /// Largest size the next member may occupy: the per-file cap clamped to
    /// what remains of the total budget.
    pub(crate) const fn file_allowance(&self) -> u64 {
        let remaining = self.max_total_bytes - self.total_bytes;
        if self.max_file_bytes < remaining {
            self.max_file_bytes
        } else {
            remaining
        }
    }

    /// Error for a member that filled its allowance with input left over,
    /// classified by whichever cap was the binding one.
    pub(crate) const fn allowance_error(&self, copied: u64) -> IntakeError {
        let remaining = self.max_total_bytes - self.total_bytes;
        if self.max_file_bytes <= remaining {
            IntakeError::SizeExceeded {
                bound: SizeBound::FileSize {
                    size: copied + 1,
                    max: self.max_file_bytes,
                },
            }
        } else {
            IntakeError::SizeExceeded {
                bound: SizeBound::TotalSize {
                    current: self.total_bytes + copied + 1,
                    max: self.max_total_bytes,
                },
            }
        }
    }

    pub(crate) const fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}
