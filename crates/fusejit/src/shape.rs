//! Partially known tensor shapes: static, rank-only-known, or fully dynamic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dimension::{DimLabel, Dimension};

/// A tensor shape whose rank and individual extents may be unknown.
///
/// `dims: None` means even the rank is undetermined; `Some(v)` fixes the
/// rank while each entry may still be an interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialShape {
    dims: Option<Vec<Dimension>>,
}

impl PartialShape {
    /// A shape with every extent known.
    pub fn from_static(dims: impl IntoIterator<Item = usize>) -> Self {
        PartialShape {
            dims: Some(dims.into_iter().map(Dimension::fixed).collect()),
        }
    }

    /// A shape of known rank built from explicit dimensions.
    pub fn from_dims(dims: Vec<Dimension>) -> Self {
        PartialShape { dims: Some(dims) }
    }

    /// Rank and all extents unknown.
    pub fn dynamic_rank() -> Self {
        PartialShape { dims: None }
    }

    /// Known rank, every extent unknown.
    pub fn dynamic(rank: usize) -> Self {
        PartialShape {
            dims: Some(vec![Dimension::dynamic(); rank]),
        }
    }

    pub fn rank(&self) -> Option<usize> {
        self.dims.as_ref().map(Vec::len)
    }

    pub fn is_rank_static(&self) -> bool {
        self.dims.is_some()
    }

    /// True when the rank and every extent are concrete.
    pub fn is_static(&self) -> bool {
        match &self.dims {
            Some(dims) => dims.iter().all(Dimension::is_static),
            None => false,
        }
    }

    pub fn dims(&self) -> Option<&[Dimension]> {
        self.dims.as_deref()
    }

    /// Concrete extents, or `None` if anything is still unknown.
    pub fn to_static(&self) -> Option<Vec<usize>> {
        self.dims
            .as_ref()?
            .iter()
            .map(Dimension::as_static)
            .collect()
    }

    /// Total element count for a fully static shape.
    pub fn element_count(&self) -> Option<usize> {
        self.to_static()
            .map(|dims| dims.iter().product::<usize>())
    }

    /// Replaces labels positionally; `None` entries clear the label.
    /// Panics in debug builds if the shape's rank is unknown or differs.
    pub fn with_labels(mut self, labels: &[Option<DimLabel>]) -> Self {
        if let Some(dims) = self.dims.as_mut() {
            debug_assert_eq!(dims.len(), labels.len(), "label count must match rank");
            for (dim, label) in dims.iter_mut().zip(labels) {
                *dim = match label {
                    Some(l) => dim.with_label(*l),
                    None => *dim,
                };
            }
        }
        self
    }

    /// Labels per position for a rank-static shape.
    pub fn labels(&self) -> Option<Vec<Option<DimLabel>>> {
        self.dims
            .as_ref()
            .map(|dims| dims.iter().map(Dimension::label).collect())
    }
}

impl fmt::Display for PartialShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dims {
            None => write!(f, "{{...}}"),
            Some(dims) => {
                write!(f, "{{")?;
                for (i, dim) in dims.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{dim}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_shape_reports_itself() {
        let shape = PartialShape::from_static([2, 3, 4]);
        assert!(shape.is_static());
        assert_eq!(shape.rank(), Some(3));
        assert_eq!(shape.to_static(), Some(vec![2, 3, 4]));
        assert_eq!(shape.element_count(), Some(24));
    }

    #[test]
    fn dynamic_rank_has_no_rank() {
        let shape = PartialShape::dynamic_rank();
        assert_eq!(shape.rank(), None);
        assert!(!shape.is_static());
        assert_eq!(shape.to_static(), None);
    }

    #[test]
    fn interval_shape_is_not_static() {
        let shape = PartialShape::from_dims(vec![Dimension::fixed(2), Dimension::interval(1, 5)]);
        assert!(shape.is_rank_static());
        assert!(!shape.is_static());
        assert_eq!(shape.to_static(), None);
    }

    #[test]
    fn labels_are_applied_positionally() {
        let shape = PartialShape::from_static([4, 5])
            .with_labels(&[Some(DimLabel(1)), None]);
        assert_eq!(
            shape.labels(),
            Some(vec![Some(DimLabel(1)), None])
        );
    }

    #[test]
    fn display_is_compact() {
        let shape = PartialShape::from_dims(vec![
            Dimension::fixed(2),
            Dimension::interval(1, 5),
            Dimension::dynamic(),
        ]);
        assert_eq!(shape.to_string(), "{2,1..5,?}");
        assert_eq!(PartialShape::dynamic_rank().to_string(), "{...}");
    }
}
