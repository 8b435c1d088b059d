// This module implements the compiler driver and the body finalizer. A
// ZamCompiler is constructed per function body: construction runs frame
// initialization (globals, then parameters, then locals), compile_body
// lowers the statement tree through the builder and then finalizes. The
// finalizer runs a fixed pass sequence over the provisional stream:
//
//   1. seal the stream (allocate the pending pseudo-instruction, resolve
//      parked branches to it);
//   2. concretize instruction numbers to stream positions;
//   3. label loop depths;
//   4. run the peephole optimizer and frame-slot sharing (unless disabled);
//   5. forward every live branch through retired code to a live target;
//   6. retire the pending pseudo-instruction;
//   7. compact the live instructions into the final vector, building the
//      provisional-to-final index map;
//   8. re-concretize instruction numbers (the pending sentinel gets one
//      past the end, so branches to it encode "end of function");
//   9. rewrite branch operands to final instruction numbers;
//  10. finalize frame sharing, translating live-range starts and scope
//      ends across the index map (or synthesizing singleton groups when
//      sharing was not computed);
//  11. concretize the four case tables;
//  12. move the surviving instructions into the executable body.
//
// compile_body consumes the compiler, so a body can only be finalized once
// and the emitted body is independent of the compiler's lifetime.

//! The per-function compiler driver and body finalizer.

use std::collections::{HashMap, HashSet};

use super::adaptor::{Flavor, Function, Options, ProfileSource, Reducer, Reporter, UseDefs};
use super::analyzer;
use super::body::Body;
use super::builder::InstBuilder;
use super::cases::{self, CaseMaps, DoubleKey};
use super::error::{CompileError, CompileResult};
use super::frame::{FrameAllocator, FrameSharingInfo, GlobalInfo};
use super::ident::Ident;
use super::inst::{Inst, InstId, Op, Operand};
use super::peephole;
use crate::lower::Stmt;

/// Compiles one function body into an executable [`Body`].
///
/// Not re-entrant: nested function literals each get their own compiler
/// instance.
pub struct ZamCompiler<'a, F, P, U, R, Rep> {
    pub(crate) func: F,
    pub(crate) profile: P,
    pub(crate) use_defs: U,
    pub(crate) reducer: R,
    pub(crate) reporter: Rep,
    pub(crate) options: Options,
    pub(crate) body: Stmt<'a>,

    pub(crate) builder: InstBuilder,
    pub(crate) frame: FrameAllocator<'a>,
    pub(crate) globals: Vec<GlobalInfo<'a>>,
    pub(crate) global_index: HashMap<&'a str, usize>,
    pub(crate) managed_slots: Vec<u32>,
    /// Sharing descriptors produced by the optimizer, provisional numbering.
    pub(crate) shared_frame: Vec<FrameSharingInfo<'a>>,
    /// The compacted stream, as arena handles.
    pub(crate) insts2: Vec<InstId>,

    pub(crate) int_cases: CaseMaps<i64>,
    pub(crate) uint_cases: CaseMaps<u64>,
    pub(crate) double_cases: CaseMaps<DoubleKey>,
    pub(crate) str_cases: CaseMaps<String>,

    pub(crate) num_iters: u32,
    pub(crate) non_recursive: bool,
}

impl<'a, F, P, U, R, Rep> ZamCompiler<'a, F, P, U, R, Rep>
where
    F: Function<'a>,
    P: ProfileSource<'a>,
    U: UseDefs<'a>,
    R: Reducer<'a>,
    Rep: Reporter,
{
    /// Construct a compiler and run frame initialization.
    ///
    /// Returns `None` when initialization fails; the failure is routed
    /// through the reporter, never raised across the boundary.
    pub fn new(
        func: F,
        profile: P,
        body: Stmt<'a>,
        use_defs: U,
        reducer: R,
        reporter: Rep,
        options: Options,
    ) -> Option<Self> {
        let mut compiler = Self {
            func,
            profile,
            use_defs,
            reducer,
            reporter,
            options,
            body,
            builder: InstBuilder::new(),
            frame: FrameAllocator::new(),
            globals: Vec::new(),
            global_index: HashMap::new(),
            managed_slots: Vec::new(),
            shared_frame: Vec::new(),
            insts2: Vec::new(),
            int_cases: Vec::new(),
            uint_cases: Vec::new(),
            double_cases: Vec::new(),
            str_cases: Vec::new(),
            num_iters: 0,
            non_recursive: false,
        };
        if let Err(e) = compiler.init() {
            if e.is_internal() {
                compiler.reporter.internal_error(&e.to_string());
            } else {
                compiler.reporter.error(&e.to_string());
            }
            return None;
        }
        Some(compiler)
    }

    /// Frame initialization: globals, parameters, locals, in that order.
    fn init(&mut self) -> CompileResult<()> {
        for &g in self.profile.globals() {
            let slot = self.frame.add_to_frame(g)?;
            self.global_index.insert(g.name(), self.globals.len());
            self.globals.push(GlobalInfo { id: g, slot });
        }

        let has_usage = self.use_defs.has_usage();
        let params: Vec<_> = self.func.params().to_vec();
        for (idx, p) in params.iter().enumerate() {
            let slot = self.frame.add_to_frame(*p)?;
            if has_usage && self.use_defs.has_id(p) {
                self.builder.emit(Inst::with_operands(
                    Op::LoadParam,
                    [Operand::Slot(slot), Operand::Int(idx as i64)],
                ));
            }
        }

        for &l in self.profile.locals() {
            // Parameters show up among the locals too; skip those.
            if !self.frame.has_frame_slot(&l) {
                self.frame.add_to_frame(l)?;
            }
        }

        self.managed_slots = self.frame.classify_managed();
        self.non_recursive = self.profile.non_recursive();
        Ok(())
    }

    /// Access the instruction builder, for external lowering rules.
    pub fn builder(&self) -> &InstBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut InstBuilder {
        &mut self.builder
    }

    /// Slot of an identifier, allocating one for fresh temporaries.
    pub(crate) fn frame_slot(&mut self, id: Ident<'a>) -> u32 {
        if let Some(slot) = self.frame.slot_of(&id) {
            return slot;
        }
        match self.frame.add_to_frame(id) {
            Ok(slot) => slot,
            Err(e) => {
                self.reporter.internal_error(&e.to_string());
                0
            }
        }
    }

    /// Append a global write-back when the function touches globals.
    pub(crate) fn sync_globals(&mut self) {
        if !self.globals.is_empty() {
            self.builder.emit(Inst::new(Op::SyncGlobals));
        }
    }

    /// Compile the statement tree and finalize the body.
    ///
    /// Returns `None` when errors were reported; the compiler is consumed
    /// either way, so finalization cannot run twice.
    pub fn compile_body(mut self) -> Option<Body<'a>> {
        log::debug!("compiling body of {}", self.func.name());

        if self.func.flavor() == Flavor::Hook {
            self.builder.push_breaks();
        }

        let body = std::mem::replace(&mut self.body, Stmt::Block(Vec::new()));
        self.compile_stmt(&body);

        if self.reporter.errors() > 0 {
            return None;
        }

        if !body.ends_with_return() {
            self.sync_globals();
        }

        let baseline = self.reporter.errors();

        if !self.builder.breaks.is_empty() {
            debug_assert_eq!(self.builder.breaks.len(), 1);
            if self.func.flavor() == Flavor::Hook {
                // Top-level breaks in a hook are structured early returns.
                for site in self.builder.pop_breaks() {
                    self.builder.replace(site, Inst::new(Op::HookBreakX));
                }
            } else {
                self.reporter.error(
                    &CompileError::StrayControl {
                        keyword: "break",
                        construct: "\"for\" or \"switch\"",
                    }
                    .to_string(),
                );
            }
        }

        if !self.builder.nexts.is_empty() {
            self.reporter.error(
                &CompileError::StrayControl {
                    keyword: "next",
                    construct: "\"for\"",
                }
                .to_string(),
            );
        }

        if !self.builder.fallthroughs.is_empty() {
            self.reporter.error(
                &CompileError::StrayControl {
                    keyword: "fallthrough",
                    construct: "\"switch\"",
                }
                .to_string(),
            );
        }

        if !self.builder.catches.is_empty() {
            self.reporter
                .internal_error(&CompileError::UntargetedInlineReturn.to_string());
            return None;
        }

        if self.reporter.errors() > baseline {
            return None;
        }

        self.finalize()
    }

    fn finalize(mut self) -> Option<Body<'a>> {
        // Pending-instruction emission and first concretization.
        let pending = self.builder.seal();
        for i in 0..self.builder.order.len() {
            let id = self.builder.order[i];
            self.builder.insts[id.index()].num = i;
        }

        analyzer::label_loop_depths(&mut self.builder.insts, &self.builder.order, Some(pending));

        if !self.options.no_zam_opt {
            self.optimize_insts(pending);
        }

        // Move branches into retired code forward to live successors.
        for pos in 0..self.builder.order.len() {
            let id = self.builder.order[pos];
            if !self.builder.insts[id.index()].live {
                continue;
            }
            let target = self.builder.insts[id.index()].target;
            if let Some(t) = target {
                match self.find_live_target(t, pending) {
                    Ok(live) => self.builder.insts[id.index()].target = Some(live),
                    Err(e) => {
                        self.reporter.internal_error(&e.to_string());
                        return None;
                    }
                }
                let target2 = self.builder.insts[id.index()].target2;
                if let Some(t2) = target2 {
                    match self.find_live_target(t2, pending) {
                        Ok(live) => self.builder.insts[id.index()].target2 = Some(live),
                        Err(e) => {
                            self.reporter.internal_error(&e.to_string());
                            return None;
                        }
                    }
                }
            }
        }

        // The pending pseudo-instruction must never reach the final vector.
        self.builder.insts[pending.index()].live = false;

        // Compaction. The index map is the only bridge between the two
        // numberings.
        let mut inst1_to_inst2: Vec<i32> = Vec::with_capacity(self.builder.order.len());
        for &id in &self.builder.order {
            if self.builder.insts[id.index()].live {
                inst1_to_inst2.push(self.insts2.len() as i32);
                self.insts2.push(id);
            } else {
                inst1_to_inst2.push(-1);
            }
        }

        // Second concretization. Branches to the pending sentinel encode
        // one past the end.
        for i in 0..self.insts2.len() {
            let id = self.insts2[i];
            self.builder.insts[id.index()].num = i;
        }
        self.builder.insts[pending.index()].num = self.insts2.len();

        // Branch operand rewriting.
        for pos in 0..self.insts2.len() {
            let id = self.insts2[pos];
            let inst = &self.builder.insts[id.index()];
            let (target, slot) = (inst.target, inst.target_slot);
            let (target2, slot2) = (inst.target2, inst.target2_slot);
            if let Some(t) = target {
                let num = self.builder.insts[t.index()].num;
                self.builder.insts[id.index()].retarget(slot, num);
                if let Some(t2) = target2 {
                    let num2 = self.builder.insts[t2.index()].num;
                    self.builder.insts[id.index()].retarget(slot2, num2);
                }
            }
        }

        let shared_final = match self.finalize_frame_sharing(&inst1_to_inst2) {
            Ok(shared) => shared,
            Err(e) => {
                self.reporter.internal_error(&e.to_string());
                return None;
            }
        };

        // Concretized case tables.
        let num_of = |id: InstId| self.builder.insts[id.index()].num;
        let int_cases = cases::concretize_case_tables(&self.int_cases, num_of);
        let uint_cases = cases::concretize_case_tables(&self.uint_cases, num_of);
        let double_cases = cases::concretize_case_tables(&self.double_cases, num_of);
        let str_cases = cases::concretize_case_tables(&self.str_cases, num_of);

        if self.options.dump_code {
            let mut listing = String::new();
            if self.dump(&mut listing).is_ok() {
                log::debug!("{}\n{}", self.func.name(), listing);
            }
        }

        log::debug!(
            "finalized {}: {} provisional, {} final instructions",
            self.func.name(),
            self.builder.order.len(),
            self.insts2.len()
        );

        // Body assembly: the surviving instructions move out of the arena.
        let mut code = Vec::with_capacity(self.insts2.len());
        for &id in &self.insts2 {
            let mut retired = Inst::new(Op::Nop);
            retired.live = false;
            code.push(std::mem::replace(&mut self.builder.insts[id.index()], retired));
        }

        let mut body = Body::new(
            self.func.name().to_string(),
            self.func.func_id(),
            shared_final,
            self.managed_slots,
            self.globals,
            self.num_iters,
            self.non_recursive,
            int_cases,
            uint_cases,
            double_cases,
            str_cases,
        );
        body.set_insts(code);
        Some(body)
    }

    /// Peephole optimization and frame-slot sharing.
    fn optimize_insts(&mut self, pending: InstId) {
        let roots = self.case_roots();
        peephole::run_local_rules(
            &mut self.builder.insts,
            &self.builder.order,
            Some(pending),
            &roots,
        );

        let any_live = self
            .builder
            .order
            .iter()
            .any(|&id| self.builder.insts[id.index()].live);
        if any_live {
            self.shared_frame = peephole::remap_frame(
                &mut self.builder.insts,
                &self.builder.order,
                self.frame.layout(),
                &mut self.globals,
                &mut self.managed_slots,
            );
            // Sharing turns some copies into slotX <- slotX; retire them.
            peephole::run_local_rules(
                &mut self.builder.insts,
                &self.builder.order,
                Some(pending),
                &roots,
            );
        }
    }

    /// Case-table targets must survive optimization.
    fn case_roots(&self) -> HashSet<InstId> {
        let mut roots = HashSet::new();
        for table in &self.int_cases {
            roots.extend(table.values().copied());
        }
        for table in &self.uint_cases {
            roots.extend(table.values().copied());
        }
        for table in &self.double_cases {
            roots.extend(table.values().copied());
        }
        for table in &self.str_cases {
            roots.extend(table.values().copied());
        }
        roots
    }

    /// Chase a branch target through retired pure forwarders to the first
    /// live instruction, or to the pending pseudo-instruction.
    fn find_live_target(&self, from: InstId, pending: InstId) -> CompileResult<InstId> {
        let mut cur = from;
        let mut steps = 0usize;
        let bound = self.builder.order.len() + 1;
        while cur != pending
            && !self.builder.insts[cur.index()].live
            && self.builder.insts[cur.index()].op.is_forwarding()
        {
            steps += 1;
            if steps > bound {
                return Err(CompileError::DeadForwarderCycle {
                    inst: self.builder.insts[from.index()].num,
                });
            }
            cur = self.builder.insts[cur.index()].target.unwrap_or(pending);
        }
        debug_assert!(
            cur == pending || self.builder.insts[cur.index()].live,
            "optimizer stranded a branch on a retired instruction"
        );
        Ok(cur)
    }

    /// Project the frame-sharing descriptors onto the final numbering, or
    /// synthesize singleton groups when no sharing was computed.
    fn finalize_frame_sharing(
        &self,
        inst1_to_inst2: &[i32],
    ) -> CompileResult<Vec<FrameSharingInfo<'a>>> {
        let mut shared_final = Vec::new();

        if !self.shared_frame.is_empty() {
            for info in &self.shared_frame {
                let mut info = info.clone();
                for (k, start) in info.id_start.iter_mut().enumerate() {
                    // The identifier's origination instruction may have
                    // been retired (a slotX <- slotX copy left over from
                    // sharing); look forward for the next surviving one.
                    while *start < inst1_to_inst2.len() && inst1_to_inst2[*start] == -1 {
                        *start += 1;
                    }
                    if *start >= inst1_to_inst2.len() {
                        return Err(CompileError::SharedSlotStart {
                            name: info.ids[k].name().to_string(),
                        });
                    }
                    *start = inst1_to_inst2[*start] as usize;
                }

                let mut end = info.scope_end;
                while end > 0 && inst1_to_inst2[end - 1] == -1 {
                    end -= 1;
                }
                info.scope_end = if end == 0 {
                    0
                } else {
                    inst1_to_inst2[end - 1] as usize + 1
                };

                shared_final.push(info);
            }
        } else {
            for &(id, _) in self.frame.layout() {
                shared_final.push(FrameSharingInfo {
                    ids: vec![id],
                    id_start: vec![0],
                    scope_end: self.insts2.len(),
                    // Unused at run time in this mode.
                    is_managed: false,
                });
            }
        }

        Ok(shared_final)
    }
}
