//! Conversion of raw extraction results into validated domain records.
//!
//! Transformers never fail: values that do not pass validation are left out
//! of the record and described in [`Transformed::issues`], and absent
//! mandatory fields are listed in [`Transformed::missing`].

pub mod abilities;
pub mod patches;
pub mod stats;

/// A record plus what validation found.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformed<R> {
    /// The validated record.
    pub record: R,
    /// Human readable validation problems.
    pub issues: Vec<String>,
    /// Mandatory fields the record lacks.
    pub missing: Vec<String>,
}

impl<R> Transformed<R> {
    /// Every mandatory field is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}
