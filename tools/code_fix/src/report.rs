//! Human-readable rendering of a suggested fix.

use crate::FixResult;
use std::fmt;

/// Displays a [FixResult] for review before it is applied.
pub struct Report<'a>(pub &'a FixResult);

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fix = self.0;
        writeln!(f, "Language:   {}", fix.language)?;
        writeln!(f, "Error type: {}", fix.error_type)?;
        writeln!(f)?;
        writeln!(f, "--- Original code ---")?;
        writeln!(f, "{}", fix.original_code.trim_end())?;
        writeln!(f)?;
        writeln!(f, "--- Fixed code ---")?;
        writeln!(f, "{}", fix.fixed_code.trim_end())?;
        writeln!(f)?;
        writeln!(f, "--- Explanation ---")?;
        writeln!(f, "{}", fix.explanation.trim_end())
    }
}
