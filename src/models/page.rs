use crate::{ClienteleError, Result};

/// A one-based page over customers ordered by member number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: u64,
    size: u64,
}

impl Page {
    /// Zero, negative and non-numeric page numbers are rejected, never defaulted
    pub fn parse(raw: &str, size: u64) -> Result<Self> {
        let number = raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|number| *number >= 1)
            .ok_or_else(|| ClienteleError::BadRequest(format!("Invalid page number: {}", raw)))?;
        Ok(Self {
            number: number as u64,
            size: size.max(1),
        })
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Records preceding this page, capped at what a store can express
    pub fn skip(&self) -> u64 {
        (self.number - 1)
            .saturating_mul(self.size)
            .min(i64::MAX as u64)
    }
}
