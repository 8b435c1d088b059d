// This module implements the peephole optimizer. It never deletes or moves
// instructions; it only clears their live flag (the flag is monotone: once
// cleared it stays cleared) and, in the frame-sharing pass, rewrites slot
// operands. The local rules run to a fixpoint:
//
//   1. nops are dead;
//   2. copies of a slot onto itself are dead;
//   3. an unconditional branch whose target is the next live instruction
//      is dead;
//   4. instructions unreachable from the entry are dead.
//
// Rules 1 and 2 skip instructions that are branch or case-table targets, so
// a live branch never ends up pointing at a retired non-forwarder; rule 3 is
// exempt because a retired forwarder still carries its target and the
// finalizer chases such chains. After the local rules, frame-slot sharing
// coalesces locals and temporaries whose live ranges are disjoint onto
// shared slots and emits the sharing descriptors; the self-copies this
// creates are then retired by another round of rule 2.

//! Dead-instruction marking and frame-slot sharing.

use std::collections::HashSet;

use super::frame::{FrameSharingInfo, GlobalInfo};
use super::ident::{Ident, IdentKind};
use super::inst::{Inst, InstId, Op};

/// Run the local rewrite rules to a fixpoint, clearing live flags.
///
/// `roots` are instructions that must stay reachable regardless of the
/// control flow scan: case-table targets, chiefly.
pub(crate) fn run_local_rules(
    insts: &mut [Inst],
    order: &[InstId],
    pending: Option<InstId>,
    roots: &HashSet<InstId>,
) -> usize {
    let mut killed = 0;
    loop {
        let mut changed = false;

        // Instructions some branch or case table points at. Killing one of
        // these (other than a pure forwarder) would strand the branch on a
        // retired instruction. Retired forwarders still count: target
        // chains pass through them.
        let mut targeted: HashSet<InstId> = roots.clone();
        for &id in order {
            let inst = &insts[id.index()];
            if !inst.live && !inst.op.is_forwarding() {
                continue;
            }
            if let Some(t) = inst.target {
                targeted.insert(t);
            }
            if let Some(t2) = inst.target2 {
                targeted.insert(t2);
            }
        }

        // Rules 1 and 2.
        for &id in order {
            let inst = &insts[id.index()];
            if !inst.live || targeted.contains(&id) {
                continue;
            }
            if inst.op == Op::Nop || inst.is_self_assign() {
                insts[id.index()].live = false;
                killed += 1;
                changed = true;
            }
        }

        // Rule 3: a goto to the next live instruction. Case-table entries
        // are exempt even though they are forwarders: the tables record
        // the instruction itself, not the end of a chain.
        for (pos, &id) in order.iter().enumerate() {
            let inst = &insts[id.index()];
            if !inst.live || inst.op != Op::Goto || roots.contains(&id) {
                continue;
            }
            let Some(t) = inst.target else { continue };
            let mut next = pos + 1;
            while next < order.len() && !insts[order[next].index()].live {
                next += 1;
            }
            if next < order.len() && order[next] == t {
                insts[id.index()].live = false;
                killed += 1;
                changed = true;
            }
        }

        if sweep_unreachable(insts, order, pending, roots) {
            changed = true;
        }

        if !changed {
            break;
        }
    }

    if killed > 0 {
        log::debug!("peephole retired {killed} instructions");
    }
    killed
}

/// Clear the live flag of instructions no control path reaches.
///
/// Retired instructions are treated as falling through, which keeps the
/// code behind them reachable; an unreachable instruction by definition has
/// no live branch pointing at it, so clearing its flag strands nothing.
fn sweep_unreachable(
    insts: &mut [Inst],
    order: &[InstId],
    pending: Option<InstId>,
    roots: &HashSet<InstId>,
) -> bool {
    if order.is_empty() {
        return false;
    }

    let mut reached = vec![false; order.len()];
    let mut stack: Vec<usize> = vec![0];
    for &root in roots {
        stack.push(insts[root.index()].num);
    }

    while let Some(pos) = stack.pop() {
        if pos >= order.len() || reached[pos] {
            continue;
        }
        reached[pos] = true;

        let inst = &insts[order[pos].index()];
        if !inst.live {
            stack.push(pos + 1);
            continue;
        }
        if inst.op.falls_through() {
            stack.push(pos + 1);
        }
        if let Some(t) = inst.target {
            if Some(t) != pending {
                stack.push(insts[t.index()].num);
            }
        }
        if let Some(t2) = inst.target2 {
            if Some(t2) != pending {
                stack.push(insts[t2.index()].num);
            }
        }
    }

    let mut changed = false;
    for (pos, &id) in order.iter().enumerate() {
        if !reached[pos] && insts[id.index()].live {
            insts[id.index()].live = false;
            changed = true;
        }
    }
    changed
}

struct LiveRange {
    first: Option<usize>,
    last: usize,
}

/// Coalesce locals and temporaries with disjoint live ranges onto shared
/// frame slots.
///
/// Rewrites every slot operand, the globals list and the managed-slot list
/// to the new numbering and returns one sharing descriptor per final slot,
/// in slot order. Starts and scope ends are in provisional numbering; the
/// finalizer projects them onto the compacted stream. Globals and
/// parameters keep private slots: their values cross the frame boundary
/// outside the instruction stream.
pub(crate) fn remap_frame<'a>(
    insts: &mut [Inst],
    order: &[InstId],
    layout: &[(Ident<'a>, u32)],
    globals: &mut [GlobalInfo<'a>],
    managed_slots: &mut Vec<u32>,
) -> Vec<FrameSharingInfo<'a>> {
    let nslots = layout.len();
    let mut ranges: Vec<LiveRange> = (0..nslots)
        .map(|_| LiveRange { first: None, last: 0 })
        .collect();

    for (pos, &id) in order.iter().enumerate() {
        let inst = &insts[id.index()];
        if !inst.live {
            continue;
        }
        let mut touch = |slot: u32| {
            let r = &mut ranges[slot as usize];
            if r.first.is_none() {
                r.first = Some(pos);
            }
            r.last = pos;
        };
        if let Some(d) = inst.def_slot() {
            touch(d);
        }
        for u in inst.used_slots() {
            touch(u);
        }
    }

    struct Group<'a> {
        ids: Vec<Ident<'a>>,
        id_start: Vec<usize>,
        last: usize,
        is_managed: bool,
        shareable: bool,
        used: bool,
    }

    let mut groups: Vec<Group<'a>> = Vec::new();
    let mut new_of_old = vec![0u32; nslots];

    for &(id, old_slot) in layout {
        debug_assert_eq!(layout[old_slot as usize].1, old_slot);
        let range = &ranges[old_slot as usize];
        let shareable = matches!(id.kind(), IdentKind::Local | IdentKind::Temp)
            && range.first.is_some();

        let start = range.first.unwrap_or(0);
        let joined = shareable
            .then(|| {
                groups.iter().position(|g| {
                    g.shareable && g.is_managed == id.is_managed() && g.last < start
                })
            })
            .flatten();

        match joined {
            Some(gi) => {
                let g = &mut groups[gi];
                g.ids.push(id);
                g.id_start.push(start);
                g.last = g.last.max(range.last);
                new_of_old[old_slot as usize] = gi as u32;
            }
            None => {
                new_of_old[old_slot as usize] = groups.len() as u32;
                groups.push(Group {
                    ids: vec![id],
                    id_start: vec![start],
                    last: range.last,
                    is_managed: id.is_managed(),
                    shareable,
                    used: range.first.is_some(),
                });
            }
        }
    }

    for inst in insts.iter_mut() {
        inst.for_each_slot_mut(|s| *s = new_of_old[*s as usize]);
    }
    for global in globals.iter_mut() {
        global.slot = new_of_old[global.slot as usize];
    }
    *managed_slots = groups
        .iter()
        .enumerate()
        .filter(|(_, g)| g.is_managed)
        .map(|(i, _)| i as u32)
        .collect();

    log::debug!("frame sharing: {} slots into {} groups", nslots, groups.len());

    groups
        .into_iter()
        .map(|g| FrameSharingInfo {
            scope_end: if g.used { g.last + 1 } else { 0 },
            ids: g.ids,
            id_start: g.id_start,
            is_managed: g.is_managed,
        })
        .collect()
}
