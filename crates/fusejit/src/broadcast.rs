//! Multi-input shape merging under the supported broadcast rules.

use serde::{Deserialize, Serialize};

use crate::dimension::Dimension;
use crate::error::{ValidationError, ValidationResult};
use crate::shape::PartialShape;

/// How operand shapes are allowed to disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastRule {
    /// Shapes must match exactly (per position, with interval refinement).
    None,
    /// Right-aligned numpy broadcasting; missing leading axes count as 1.
    Numpy,
    /// Paddle-style broadcasting: operands align at `axis` inside the
    /// largest-rank operand. `axis < 0` aligns at the trailing axes.
    Pdpd { axis: i64 },
}

/// Merges all operand shapes into the single output shape.
///
/// The merge folds left to right and on ambiguous ties the earliest labeled
/// operand's dimension label survives. Errors name the operand that failed.
pub fn merge_shapes(inputs: &[PartialShape], rule: BroadcastRule) -> ValidationResult<PartialShape> {
    match rule {
        BroadcastRule::None => merge_exact(inputs),
        BroadcastRule::Numpy => merge_numpy(inputs),
        BroadcastRule::Pdpd { axis } => merge_pdpd(inputs, axis),
    }
}

fn merge_exact(inputs: &[PartialShape]) -> ValidationResult<PartialShape> {
    let mut acc = PartialShape::dynamic_rank();
    // Rank-dynamic operands are skipped, so the accumulated shape may stem
    // from a later operand than 0; errors name the seeding operand.
    let mut acc_src = 0;
    for (idx, shape) in inputs.iter().enumerate() {
        let dims = match shape.dims() {
            Some(dims) => dims,
            None => continue,
        };
        let acc_dims = match acc.dims() {
            None => {
                acc = shape.clone();
                acc_src = idx;
                continue;
            }
            Some(acc_dims) => acc_dims,
        };
        if acc_dims.len() != dims.len() {
            return Err(ValidationError::shape_mismatch(
                acc_src,
                idx,
                format!("rank {} vs rank {}", acc_dims.len(), dims.len()),
            ));
        }
        let mut merged = Vec::with_capacity(dims.len());
        for (pos, (a, b)) in acc_dims.iter().zip(dims).enumerate() {
            match Dimension::merge(a, b) {
                Some(dim) => merged.push(dim),
                None => {
                    return Err(ValidationError::shape_mismatch(
                        acc_src,
                        idx,
                        format!("dimension {pos}: {a} vs {b}"),
                    ))
                }
            }
        }
        acc = PartialShape::from_dims(merged);
    }
    Ok(acc)
}

fn merge_numpy(inputs: &[PartialShape]) -> ValidationResult<PartialShape> {
    // A rank-dynamic operand can broadcast to anything, so nothing about
    // the output rank is known.
    if inputs.iter().any(|s| !s.is_rank_static()) {
        return Ok(PartialShape::dynamic_rank());
    }
    let mut iter = inputs.iter().enumerate();
    let mut acc: Vec<Dimension> = match iter.next() {
        Some((_, first)) => first.dims().unwrap_or_default().to_vec(),
        None => return Ok(PartialShape::dynamic_rank()),
    };
    for (idx, shape) in iter {
        let dims = shape.dims().unwrap_or_default();
        let rank = acc.len().max(dims.len());
        let mut merged = Vec::with_capacity(rank);
        for pos in 0..rank {
            let one = Dimension::fixed(1);
            let a = pos
                .checked_sub(rank - acc.len())
                .map_or(&one, |i| &acc[i]);
            let b = pos
                .checked_sub(rank - dims.len())
                .map_or(&one, |i| &dims[i]);
            match Dimension::broadcast_merge(a, b) {
                Some(dim) => merged.push(dim),
                None => {
                    return Err(ValidationError::shape_mismatch(
                        0,
                        idx,
                        format!("dimension {pos}: {a} vs {b}"),
                    ))
                }
            }
        }
        acc = merged;
    }
    Ok(PartialShape::from_dims(acc))
}

fn merge_pdpd(inputs: &[PartialShape], axis: i64) -> ValidationResult<PartialShape> {
    // The operand with the largest static rank frames the output; on ties
    // the earlier operand is preferred.
    let target = inputs
        .iter()
        .enumerate()
        .filter_map(|(idx, s)| s.rank().map(|r| (idx, r)))
        .max_by(|(ai, ar), (bi, br)| ar.cmp(br).then(bi.cmp(ai)));
    let (target_idx, target_rank) = match target {
        Some(t) => t,
        None => return Ok(PartialShape::dynamic_rank()),
    };
    let mut acc: Vec<Dimension> = inputs[target_idx]
        .dims()
        .unwrap_or_default()
        .to_vec();
    for (idx, shape) in inputs.iter().enumerate() {
        if idx == target_idx {
            continue;
        }
        let dims = match shape.dims() {
            Some(dims) => dims,
            None => continue,
        };
        // The axis positions a smaller operand inside the target; a
        // full-rank operand always aligns at the front.
        let start = if dims.len() == target_rank {
            Some(0)
        } else if axis < 0 {
            target_rank.checked_sub(dims.len())
        } else {
            Some(axis as usize)
        };
        let start = match start {
            Some(s) if s + dims.len() <= target_rank => s,
            _ => {
                return Err(ValidationError::shape_mismatch(
                    target_idx,
                    idx,
                    format!(
                        "rank {} does not fit into rank {} at axis {axis}",
                        dims.len(),
                        target_rank
                    ),
                ))
            }
        };
        for (pos, dim) in dims.iter().enumerate() {
            // A literal 1 broadcasts away against the target; anything else
            // must refine the target dimension, never loosen it.
            if dim.as_static() == Some(1) {
                continue;
            }
            let slot = &acc[start + pos];
            match Dimension::merge(slot, dim) {
                Some(merged) => acc[start + pos] = merged,
                None => {
                    return Err(ValidationError::shape_mismatch(
                        target_idx,
                        idx,
                        format!("dimension {}: {slot} vs {dim}", start + pos),
                    ))
                }
            }
        }
    }
    Ok(PartialShape::from_dims(acc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimension::DimLabel;

    #[test]
    fn exact_requires_equal_ranks() {
        let a = PartialShape::from_static([2, 4]);
        let b = PartialShape::from_static([2, 3]);
        let err = merge_shapes(&[a, b], BroadcastRule::None).expect_err("must not merge");
        assert!(err.to_string().contains("shapes are inconsistent"));
    }

    #[test]
    fn exact_skips_dynamic_rank() {
        let a = PartialShape::dynamic_rank();
        let b = PartialShape::from_static([2, 3]);
        let merged = merge_shapes(&[a, b], BroadcastRule::None).unwrap();
        assert_eq!(merged, PartialShape::from_static([2, 3]));
    }

    #[test]
    fn numpy_pads_missing_leading_axes() {
        let a = PartialShape::from_static([2, 3, 4]);
        let b = PartialShape::from_static([3, 1]);
        let merged = merge_shapes(&[a, b], BroadcastRule::Numpy).unwrap();
        assert_eq!(merged, PartialShape::from_static([2, 3, 4]));
    }

    #[test]
    fn numpy_dynamic_rank_poisons_rank() {
        let a = PartialShape::from_static([2, 3]);
        let b = PartialShape::dynamic_rank();
        let merged = merge_shapes(&[a, b], BroadcastRule::Numpy).unwrap();
        assert_eq!(merged, PartialShape::dynamic_rank());
    }

    #[test]
    fn numpy_incompatible_dims_fail() {
        let a = PartialShape::from_static([2, 4]);
        let b = PartialShape::from_static([3, 4]);
        assert!(merge_shapes(&[a, b], BroadcastRule::Numpy).is_err());
    }

    #[test]
    fn numpy_earlier_label_survives_tie() {
        let a = PartialShape::from_static([4]).with_labels(&[Some(DimLabel(1))]);
        let b = PartialShape::from_static([4]).with_labels(&[Some(DimLabel(2))]);
        let merged = merge_shapes(&[a, b], BroadcastRule::Numpy).unwrap();
        assert_eq!(merged.labels(), Some(vec![Some(DimLabel(1))]));
    }

    #[test]
    fn exact_error_names_the_seeding_operand() {
        let a = PartialShape::dynamic_rank();
        let b = PartialShape::from_static([2, 3]);
        let c = PartialShape::from_static([2, 4]);
        let err = merge_shapes(&[a, b, c], BroadcastRule::None)
            .expect_err("2,3 vs 2,4 must not merge");
        match err {
            ValidationError::ShapeMismatch { first, second, .. } => {
                // Operand 0 never participated; the accumulator came from 1.
                assert_eq!((first, second), (1, 2));
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn pdpd_aligns_at_axis() {
        let a = PartialShape::from_static([2, 3, 4, 5]);
        let b = PartialShape::from_static([3, 4]);
        let merged =
            merge_shapes(&[a, b], BroadcastRule::Pdpd { axis: 1 }).unwrap();
        assert_eq!(merged, PartialShape::from_static([2, 3, 4, 5]));
    }

    #[test]
    fn pdpd_negative_axis_aligns_trailing() {
        let a = PartialShape::from_static([2, 3, 4]);
        let b = PartialShape::from_static([3, 4]);
        let merged =
            merge_shapes(&[a, b], BroadcastRule::Pdpd { axis: -1 }).unwrap();
        assert_eq!(merged, PartialShape::from_static([2, 3, 4]));
    }

    #[test]
    fn pdpd_overflowing_operand_fails() {
        let a = PartialShape::from_static([2, 3]);
        let b = PartialShape::from_static([3, 4]);
        assert!(merge_shapes(&[a, b], BroadcastRule::Pdpd { axis: 1 }).is_err());
    }

    #[test]
    fn pdpd_dynamic_source_does_not_loosen_target() {
        let target = PartialShape::from_dims(vec![
            Dimension::fixed(2),
            Dimension::interval(1, 5),
        ]);
        let source = PartialShape::dynamic(2);
        let merged = merge_shapes(
            &[target.clone(), source],
            BroadcastRule::Pdpd { axis: -1 },
        )
        .unwrap();
        assert_eq!(merged, target);
    }

    #[test]
    fn pdpd_unit_source_is_broadcast_away() {
        let target = PartialShape::from_static([2, 5]);
        let source = PartialShape::from_static([1]);
        let merged = merge_shapes(
            &[target.clone(), source],
            BroadcastRule::Pdpd { axis: -1 },
        )
        .unwrap();
        assert_eq!(merged, target);
    }
}
