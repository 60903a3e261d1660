// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Prediction tree construction.
//!
//! The tree is stored arena-style: parent links are integer indices into the
//! flat point sequence, and per-node values live in flat arrays aligned with
//! it. The shape (parents, group membership) is derived purely from the
//! duplicate-group boundaries and the parent-selection strategy, so the
//! encoder and decoder rebuild identical shapes from the transmitted group
//! list.
//!
//! Canonical coded-domain values are computed once per duplicate group, from
//! the group's first member, and assigned to every member of the group,
//! first member included. The begin-value array is poison-prefilled and
//! checked after construction so an unassigned slot is caught before
//! residual coding begins.

use crate::codec::{DupGroup, Error, Point3};
use crate::transform::DomainGateway;

/// Parent sentinel for root nodes.
pub const ROOT: u32 = u32::MAX;

/// Parent-selection strategy seam.
///
/// Selection operates on group structure only (a group's duplicates always
/// attach to the group's first member), so any selector that both sides
/// agree on reproduces the same tree from the transmitted group boundaries.
/// A returned parent must be [`ROOT`] or strictly precede the group's first
/// member in sequence order.
pub trait ParentSelector {
    /// Parent node index for the first member of group `group_index`.
    fn select_parent(&self, group_index: usize, group_starts: &[u32]) -> u32;
}

/// Default selector: each group's first member attaches to the previous
/// group's first member, forming a chain in sequence order.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChainSelector;

impl ParentSelector for ChainSelector {
    fn select_parent(&self, group_index: usize, group_starts: &[u32]) -> u32 {
        if group_index == 0 {
            ROOT
        } else {
            group_starts[group_index - 1]
        }
    }
}

/// Tree shape: parent links and duplicate-group membership, one entry per
/// sequence index.
#[derive(Clone, Debug)]
pub struct TreeShape {
    parent: Vec<u32>,
    group_first: Vec<u32>,
}

impl TreeShape {
    /// Build the shape for `n_points` points under the given groups and
    /// selector. Both sides of the codec call this with identical inputs.
    /// Groups must be non-empty, contiguous, and cover `[0, n_points)`.
    pub fn build(
        n_points: usize,
        groups: &[DupGroup],
        selector: &dyn ParentSelector,
    ) -> Result<Self, Error> {
        let group_starts: Vec<u32> = groups.iter().map(|g| g.start as u32).collect();
        let mut parent = vec![ROOT; n_points];
        let mut group_first = vec![0u32; n_points];

        let mut cursor = 0usize;
        for (g, group) in groups.iter().enumerate() {
            if group.start != cursor || group.is_empty() || group.end > n_points {
                return Err(Error::InvalidGroups(format!(
                    "group [{}, {}) breaks coverage at index {}",
                    group.start, group.end, cursor
                )));
            }
            cursor = group.end;

            let first = group.start as u32;
            let chosen = selector.select_parent(g, &group_starts);
            if chosen != ROOT && chosen >= first {
                // Descendants may only read slots their ancestors have
                // already written; a forward reference breaks that.
                return Err(Error::Config(format!(
                    "selector returned parent {} for node {}",
                    chosen, first
                )));
            }
            parent[group.start] = chosen;
            group_first[group.start] = first;
            for i in group.start + 1..group.end {
                parent[i] = first;
                group_first[i] = first;
            }
        }
        if cursor != n_points {
            return Err(Error::InvalidGroups(format!(
                "groups cover {} of {} points",
                cursor, n_points
            )));
        }
        Ok(Self { parent, group_first })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Parent index of node `i`, or [`ROOT`].
    #[inline]
    pub fn parent(&self, i: usize) -> u32 {
        self.parent[i]
    }

    /// First member of node `i`'s duplicate group (`i` itself when unique).
    #[inline]
    pub fn group_first(&self, i: usize) -> u32 {
        self.group_first[i]
    }
}

/// Compute the canonical coded-domain value for every node.
///
/// For each group the value is transformed once, from the group's first
/// member, and written to every index in `[start, end)` including `start`.
/// The array is poison-prefilled; any slot left at the poison value after
/// assignment is reported before residual coding can consume it.
pub fn assign_begin_values(
    points: &[Point3],
    groups: &[DupGroup],
    laser_hints: Option<&[u32]>,
    gateway: &DomainGateway,
) -> Result<Vec<Point3>, Error> {
    let mut begin = vec![Point3::POISON; points.len()];

    for group in groups {
        let hint = laser_hints.map(|hints| hints[group.start]);
        let canonical = gateway.to_coding(points[group.start], hint)?;
        for slot in &mut begin[group.start..group.end] {
            *slot = canonical;
        }
    }

    for (i, value) in begin.iter().enumerate() {
        if *value == Point3::POISON {
            return Err(Error::UnassignedCanonical(i));
        }
    }
    debug_assert_eq!(begin.len(), points.len());
    Ok(begin)
}
