//! Interval dimensions with symbolic labels and their pure merge algebra.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier marking "this dimension is the same quantity as any
/// other dimension carrying the same label", independent of concrete value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimLabel(pub u32);

/// A single axis extent: a closed interval `[lo, hi]` where `hi = None`
/// means unbounded, plus an optional provenance label.
///
/// Dimensions are immutable value types; all merging goes through the pure
/// functions below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    lo: usize,
    hi: Option<usize>,
    label: Option<DimLabel>,
}

impl Dimension {
    /// A concrete extent.
    pub fn fixed(value: usize) -> Self {
        Dimension {
            lo: value,
            hi: Some(value),
            label: None,
        }
    }

    /// A bounded interval `[lo, hi]`.
    pub fn interval(lo: usize, hi: usize) -> Self {
        debug_assert!(lo <= hi, "interval bounds out of order");
        Dimension {
            lo,
            hi: Some(hi),
            label: None,
        }
    }

    /// A lower-bounded extent with no upper bound.
    pub fn at_least(lo: usize) -> Self {
        Dimension {
            lo,
            hi: None,
            label: None,
        }
    }

    /// A fully unknown extent.
    pub fn dynamic() -> Self {
        Dimension {
            lo: 0,
            hi: None,
            label: None,
        }
    }

    /// Attaches a label, consuming self.
    pub fn with_label(mut self, label: DimLabel) -> Self {
        self.label = Some(label);
        self
    }

    pub fn label(&self) -> Option<DimLabel> {
        self.label
    }

    pub fn lo(&self) -> usize {
        self.lo
    }

    pub fn hi(&self) -> Option<usize> {
        self.hi
    }

    /// Returns the concrete value when the interval has collapsed.
    pub fn as_static(&self) -> Option<usize> {
        match self.hi {
            Some(hi) if hi == self.lo => Some(self.lo),
            _ => None,
        }
    }

    pub fn is_static(&self) -> bool {
        self.as_static().is_some()
    }

    pub fn is_dynamic(&self) -> bool {
        !self.is_static()
    }

    fn is_unit(&self) -> bool {
        self.as_static() == Some(1)
    }

    /// True when the extent could still turn out to be 1 at runtime, which
    /// makes this side broadcastable under the numpy rule.
    fn can_be_unit(&self) -> bool {
        self.lo <= 1 && self.hi.map_or(true, |hi| hi >= 1)
    }

    /// Exact merge used by the `none` broadcast rule: interval intersection.
    /// Returns `None` when the intervals cannot describe the same extent.
    pub fn merge(acc: &Dimension, next: &Dimension) -> Option<Dimension> {
        let lo = acc.lo.max(next.lo);
        let hi = match (acc.hi, next.hi) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, b) => b,
        };
        if let Some(hi) = hi {
            if lo > hi {
                return None;
            }
        }
        Some(Dimension {
            lo,
            hi,
            label: ambiguous_label(acc, next),
        })
    }

    /// Numpy-style broadcast merge. `acc` is the running result, `next` the
    /// later operand; on ambiguous ties the earlier operand's label wins,
    /// while a side that is broadcast away never contributes its label.
    pub fn broadcast_merge(acc: &Dimension, next: &Dimension) -> Option<Dimension> {
        // A literal 1 is always broadcast away in favour of the other side.
        if acc.is_unit() && !next.is_unit() {
            return Some(*next);
        }
        if next.is_unit() && !acc.is_unit() {
            return Some(*acc);
        }
        if acc.is_unit() && next.is_unit() {
            return Some(Dimension {
                lo: 1,
                hi: Some(1),
                label: ambiguous_label(acc, next),
            });
        }

        // A side whose lower bound exceeds 1 cannot be broadcast away: if
        // only one side is rigid it alone determines the result.
        let acc_rigid = !acc.can_be_unit();
        let next_rigid = !next.can_be_unit();
        match (acc_rigid, next_rigid) {
            (true, false) => Some(*acc),
            (false, true) => Some(*next),
            (true, true) => {
                // Both must hold the same value: plain intersection.
                Dimension::merge(acc, next)
            }
            (false, false) => {
                // Either side may be 1, so the result can take any value of
                // the other; tightest enclosure of the possible outcomes.
                Some(Dimension {
                    lo: acc.lo.min(next.lo),
                    hi: match (acc.hi, next.hi) {
                        (Some(a), Some(b)) => Some(a.max(b)),
                        _ => None,
                    },
                    label: ambiguous_label(acc, next),
                })
            }
        }
    }
}

/// Label choice when neither side uniquely determines the merged value:
/// the accumulated (earlier-operand) label is preferred, so the first
/// labeled operand in the fold wins ties.
fn ambiguous_label(acc: &Dimension, next: &Dimension) -> Option<DimLabel> {
    acc.label.or(next.label)
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.as_static(), self.hi) {
            (Some(v), _) => write!(f, "{v}"),
            (None, Some(hi)) => write!(f, "{}..{}", self.lo, hi),
            (None, None) if self.lo > 0 => write!(f, "{}..?", self.lo),
            (None, None) => write!(f, "?"),
        }
    }
}
