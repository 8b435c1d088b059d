// The executable body: the immutable product of compilation. The finalizer
// builds it from the compacted instruction vector and the concretized frame
// and case-table metadata; the interpreter executes it. A body holds no
// reference back to the compiler that produced it.

//! The executable function body.

use super::adaptor::FuncId;
use super::cases::{DoubleKey, FinalCaseMaps};
use super::frame::{FrameSharingInfo, GlobalInfo};
use super::inst::Inst;

/// An executable representation of one function.
pub struct Body<'a> {
    name: String,
    func_id: FuncId,
    insts: Vec<Inst>,
    frame: Vec<FrameSharingInfo<'a>>,
    managed_slots: Vec<u32>,
    globals: Vec<GlobalInfo<'a>>,
    num_iters: u32,
    non_recursive: bool,
    int_cases: FinalCaseMaps<i64>,
    uint_cases: FinalCaseMaps<u64>,
    double_cases: FinalCaseMaps<DoubleKey>,
    str_cases: FinalCaseMaps<String>,
}

impl<'a> Body<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        name: String,
        func_id: FuncId,
        frame: Vec<FrameSharingInfo<'a>>,
        managed_slots: Vec<u32>,
        globals: Vec<GlobalInfo<'a>>,
        num_iters: u32,
        non_recursive: bool,
        int_cases: FinalCaseMaps<i64>,
        uint_cases: FinalCaseMaps<u64>,
        double_cases: FinalCaseMaps<DoubleKey>,
        str_cases: FinalCaseMaps<String>,
    ) -> Self {
        Self {
            name,
            func_id,
            insts: Vec::new(),
            frame,
            managed_slots,
            globals,
            num_iters,
            non_recursive,
            int_cases,
            uint_cases,
            double_cases,
            str_cases,
        }
    }

    /// Install the final instruction vector. Called once, at assembly.
    pub(crate) fn set_insts(&mut self, insts: Vec<Inst>) {
        debug_assert!(self.insts.is_empty());
        self.insts = insts;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn func_id(&self) -> FuncId {
        self.func_id
    }

    pub fn insts(&self) -> &[Inst] {
        &self.insts
    }

    /// Frame-sharing descriptors, one per final slot.
    pub fn frame(&self) -> &[FrameSharingInfo<'a>] {
        &self.frame
    }

    /// Number of frame slots.
    pub fn frame_size(&self) -> usize {
        self.frame.len()
    }

    pub fn managed_slots(&self) -> &[u32] {
        &self.managed_slots
    }

    pub fn globals(&self) -> &[GlobalInfo<'a>] {
        &self.globals
    }

    /// Number of loop-iteration slots.
    pub fn num_iters(&self) -> u32 {
        self.num_iters
    }

    pub fn non_recursive(&self) -> bool {
        self.non_recursive
    }

    pub fn int_cases(&self) -> &FinalCaseMaps<i64> {
        &self.int_cases
    }

    pub fn uint_cases(&self) -> &FinalCaseMaps<u64> {
        &self.uint_cases
    }

    pub fn double_cases(&self) -> &FinalCaseMaps<DoubleKey> {
        &self.double_cases
    }

    pub fn str_cases(&self) -> &FinalCaseMaps<String> {
        &self.str_cases
    }
}
