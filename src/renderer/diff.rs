//! Keyed children reconciliation.
//!
//! Two passes over the sibling lists. The forward pass claims, for each new
//! child, the old child it continues (by key, or for keyless nodes the first
//! unclaimed type-compatible slot) and patches the pair in place; unclaimed
//! old children are unmounted. The backward pass then mounts the new children
//! with no counterpart and moves the survivors, skipping the longest subset
//! that is already in relative order so move count stays minimal.
//!
//! Walking backward lets every insertion anchor on the next new sibling,
//! whose host position is already final.

use std::collections::HashMap;

use crate::platform::HostId;
use crate::vnode::{same_vnode_type, Key, VNode};

use super::RendererInner;

impl RendererInner {
    pub(crate) fn patch_keyed_children(
        &mut self,
        c1: &[VNode],
        c2: &mut [VNode],
        container: HostId,
        parent_anchor: Option<HostId>,
    ) {
        let l2 = c2.len();
        let to_be_patched = l2;
        let mut patched = 0usize;

        let mut key_to_new_index: HashMap<Key, usize> = HashMap::new();
        for (j, child) in c2.iter().enumerate() {
            if let Some(key) = &child.key {
                if key_to_new_index.insert(key.clone(), j).is_some() {
                    eprintln!("spark-vdom: duplicate key {key:?} in keyed children");
                }
            }
        }

        // new index -> old index + 1; 0 marks "no old counterpart".
        let mut new_index_to_old_index = vec![0usize; l2];
        let mut moved = false;
        let mut max_new_index_so_far = 0usize;

        // Forward pass: claim and patch, unmount the unclaimed.
        for (i, prev_child) in c1.iter().enumerate() {
            if patched >= to_be_patched {
                // Every new child already has a counterpart; the rest of the
                // old list can only be removals.
                self.unmount(prev_child);
                continue;
            }

            let new_index = match &prev_child.key {
                Some(key) => key_to_new_index.get(key).copied(),
                None => c2.iter().enumerate().position(|(j, next_child)| {
                    new_index_to_old_index[j] == 0 && same_vnode_type(prev_child, next_child)
                }),
            };

            match new_index {
                None => self.unmount(prev_child),
                Some(j) => {
                    new_index_to_old_index[j] = i + 1;
                    if j >= max_new_index_so_far {
                        max_new_index_so_far = j;
                    } else {
                        moved = true;
                    }
                    self.patch(Some(prev_child), &mut c2[j], container, None);
                    patched += 1;
                }
            }
        }

        // Backward pass: mount the new, move the out-of-order.
        let increasing = if moved {
            longest_increasing_subsequence(&new_index_to_old_index)
        } else {
            Vec::new()
        };
        let mut j = increasing.len() as isize - 1;

        for i in (0..l2).rev() {
            let anchor = if i + 1 < l2 {
                c2[i + 1].host.or(parent_anchor)
            } else {
                parent_anchor
            };

            if new_index_to_old_index[i] == 0 {
                self.patch(None, &mut c2[i], container, anchor);
            } else if moved {
                if j < 0 || i != increasing[j as usize] {
                    self.move_node(&c2[i], container, anchor);
                } else {
                    j -= 1;
                }
            }
        }
    }
}

/// Indices of one longest increasing subsequence of `arr`, ignoring zeros
/// (slots with no old counterpart never hold a position).
///
/// Patience sort over the tail values with predecessor links for the
/// reconstruction walk. O(n log n).
pub(crate) fn longest_increasing_subsequence(arr: &[usize]) -> Vec<usize> {
    if arr.is_empty() {
        return Vec::new();
    }

    // p[i] = index of the element preceding arr[i] in the subsequence that
    // ends at i; written when i is appended or spliced in.
    let mut p = vec![0usize; arr.len()];
    // Indices of the smallest known tail for each subsequence length.
    let mut result = vec![0usize];

    for (i, &value) in arr.iter().enumerate() {
        if value == 0 {
            continue;
        }
        let last = result[result.len() - 1];
        if arr[last] < value {
            p[i] = last;
            result.push(i);
            continue;
        }
        // Binary search for the leftmost tail >= value.
        let (mut lo, mut hi) = (0usize, result.len() - 1);
        while lo < hi {
            let mid = (lo + hi) / 2;
            if arr[result[mid]] < value {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if value < arr[result[lo]] {
            if lo > 0 {
                p[i] = result[lo - 1];
            }
            result[lo] = i;
        }
    }

    // Rebuild through the predecessor links, back to front.
    let mut k = result.len();
    let mut last = result[k - 1];
    while k > 0 {
        k -= 1;
        result[k] = last;
        last = p[last];
    }
    // The seed index survives reconstruction when slot 0 holds a zero;
    // it was never a real chain member.
    if arr[result[0]] == 0 {
        result.remove(0);
    }
    result
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lis_basic() {
        assert_eq!(longest_increasing_subsequence(&[2, 1, 5, 3, 6, 4, 8, 9, 7]).len(), 5);
        assert_eq!(longest_increasing_subsequence(&[1, 2, 3, 4]), vec![0, 1, 2, 3]);
        assert_eq!(longest_increasing_subsequence(&[4, 3, 2, 1]).len(), 1);
    }

    #[test]
    fn test_lis_indices_are_increasing_positions() {
        let arr = [3, 1, 2, 5, 4];
        let seq = longest_increasing_subsequence(&arr);
        assert_eq!(seq.len(), 3);
        for pair in seq.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(arr[pair[0]] < arr[pair[1]]);
        }
    }

    #[test]
    fn test_lis_skips_zero_slots() {
        // Zeros are mount slots, never part of the stable subsequence.
        let seq = longest_increasing_subsequence(&[0, 2, 0, 3, 0]);
        assert_eq!(seq, vec![1, 3]);
    }

    #[test]
    fn test_lis_single_element() {
        assert_eq!(longest_increasing_subsequence(&[7]), vec![0]);
    }
}
