// This module implements loop-depth labeling over the provisional
// instruction stream. A single in-order walk discovers back-edges (a branch
// whose target has a smaller instruction number), marks each back-edge
// target as a loop start, and bumps the loop depth of every instruction the
// loop covers. A second back-edge to an already-known loop start extends the
// loop: the walk finds the current loop tail by scanning forward while the
// depth matches the start's, then bumps from there. No dominator tree is
// needed; the depth feeds diagnostics and the code dump.

//! Back-edge discovery and loop-depth labeling.

use super::inst::{Inst, InstId};

/// Label every instruction with the nesting depth of the innermost loop
/// that encloses it and mark loop-start instructions.
///
/// Must run after instruction numbers have been concretized to stream
/// positions. Branches to the pending pseudo-instruction are ignored.
pub fn label_loop_depths(insts: &mut [Inst], order: &[InstId], pending: Option<InstId>) {
    for i in 0..order.len() {
        let inst = &insts[order[i].index()];
        let target = inst.target;
        let target2 = inst.target2;

        let t = match target {
            Some(t) if Some(t) != pending => t,
            _ => continue,
        };

        let t_num = insts[t.index()].num;
        if t_num < i {
            let mut j = t_num;

            if !insts[t.index()].loop_start {
                // Newly discovered loop.
                insts[t.index()].loop_start = true;
            } else {
                // Extending a known loop; find its current tail.
                let depth = insts[t.index()].loop_depth;
                while j < i && insts[order[j].index()].loop_depth == depth {
                    j += 1;
                }
                debug_assert_eq!(insts[order[j].index()].loop_depth, depth - 1);
            }

            log::trace!("back-edge {} -> {}, bumping depth over [{}, {}]", i, t_num, j, i);
            while j <= i {
                insts[order[j].index()].loop_depth += 1;
                j += 1;
            }
        }

        if let Some(t2) = target2 {
            if Some(t2) != pending {
                debug_assert!(insts[t2.index()].num > i, "secondary target must refer forward");
            }
        }
    }
}
