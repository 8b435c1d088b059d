// Statement lowering. Each rule appends provisional instructions through
// the builder and leaves branch resolution to its fix-up machinery:
// branches to code that does not exist yet are parked with branch_to_next,
// break/next/fallthrough sites go onto the builder's stacks and are
// resolved when the enclosing construct closes. Switch arms feed the
// abstract case tables; the finalizer concretizes them.

//! Statement lowering rules.

use crate::core::adaptor::{Function, ProfileSource, Reducer, Reporter, UseDefs};
use crate::core::compiler::ZamCompiler;
use crate::core::error::CompileError;
use crate::core::ident::Ident;
use crate::core::inst::{Inst, InstId, Op, Operand};

use super::{CaseLabel, Expr, Stmt, SwitchCase};

/// The key type a switch dispatches on.
#[derive(Clone, Copy, PartialEq, Eq)]
enum CaseKind {
    Int,
    Uint,
    Double,
    Str,
}

impl CaseLabel {
    fn kind(&self) -> CaseKind {
        match self {
            CaseLabel::Int(_) => CaseKind::Int,
            CaseLabel::Uint(_) => CaseKind::Uint,
            CaseLabel::Double(_) => CaseKind::Double,
            CaseLabel::Str(_) => CaseKind::Str,
        }
    }
}

impl<'a, F, P, U, R, Rep> ZamCompiler<'a, F, P, U, R, Rep>
where
    F: Function<'a>,
    P: ProfileSource<'a>,
    U: UseDefs<'a>,
    R: Reducer<'a>,
    Rep: Reporter,
{
    pub(crate) fn compile_stmt(&mut self, stmt: &Stmt<'a>) {
        match stmt {
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.compile_stmt(s);
                }
            }
            Stmt::Assign { target, value } => {
                let src = self.compile_expr(value);
                let dst = self.compile_id_write(target);
                self.builder.emit(Inst::with_operands(
                    Op::Assign,
                    [Operand::Slot(dst), Operand::Slot(src)],
                ));
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => self.compile_if(cond, then_body, else_body.as_deref()),
            Stmt::While { cond, body } => self.compile_while(cond, body),
            Stmt::ForEach { var, vector, body } => self.compile_foreach(var, vector, body),
            Stmt::Switch {
                value,
                cases,
                default,
            } => self.compile_switch(value, cases, *default),
            Stmt::Break => {
                let site = self.emit_branch_site();
                self.builder.add_break(site);
            }
            Stmt::Next => {
                let site = self.emit_branch_site();
                self.builder.add_next(site);
            }
            Stmt::Fallthrough => {
                let site = self.emit_branch_site();
                self.builder.add_fallthrough(site);
            }
            Stmt::Return(value) => match value {
                Some(e) => {
                    let slot = self.compile_expr(e);
                    self.builder
                        .emit(Inst::with_operands(Op::ReturnVal, [Operand::Slot(slot)]));
                }
                None => {
                    self.builder.emit(Inst::new(Op::Return));
                }
            },
        }
    }

    /// An unconditional branch awaiting a target.
    fn emit_branch_site(&mut self) -> InstId {
        self.builder
            .emit(Inst::with_operands(Op::Goto, [Operand::Branch(0)]))
    }

    fn compile_if(&mut self, cond: &Expr<'a>, then_body: &Stmt<'a>, else_body: Option<&Stmt<'a>>) {
        let cond_slot = self.compile_expr(cond);
        let mut branch = Inst::with_operands(
            Op::IfFalse,
            [Operand::Slot(cond_slot), Operand::Branch(0)],
        );
        branch.target_slot = 1;
        let branch = self.builder.emit(branch);

        self.compile_stmt(then_body);

        match else_body {
            Some(els) => {
                let skip = self.emit_branch_site();
                let else_mark = self.builder.mark();
                self.compile_stmt(els);
                if self.builder.mark() > else_mark {
                    let first = self.builder.at(else_mark);
                    self.builder.set_target(branch, first);
                } else {
                    self.builder.branch_to_next(branch);
                }
                self.builder.branch_to_next(skip);
            }
            None => self.builder.branch_to_next(branch),
        }
    }

    fn compile_while(&mut self, cond: &Expr<'a>, body: &Stmt<'a>) {
        self.builder.push_breaks();
        self.builder.push_nexts();

        let head_mark = self.builder.mark();
        let cond_slot = self.compile_expr(cond);
        let mut exit = Inst::with_operands(
            Op::IfFalse,
            [Operand::Slot(cond_slot), Operand::Branch(0)],
        );
        exit.target_slot = 1;
        let exit = self.builder.emit(exit);
        let head = self.builder.at(head_mark);

        self.compile_stmt(body);

        let back = self.emit_branch_site();
        self.builder.set_target(back, head);
        self.builder.branch_to_next(exit);

        for site in self.builder.pop_nexts() {
            self.builder.set_target(site, head);
        }
        for site in self.builder.pop_breaks() {
            self.builder.branch_to_next(site);
        }
    }

    fn compile_foreach(&mut self, var: &Ident<'a>, vector: &Ident<'a>, body: &Stmt<'a>) {
        let Some(vec_slot) = self.frame.slot_of(vector) else {
            self.reporter.error(
                &CompileError::UnknownIdent {
                    name: vector.name().to_string(),
                }
                .to_string(),
            );
            return;
        };
        let var_slot = self.frame_slot(*var);
        let iter = self.num_iters;
        self.num_iters += 1;

        self.builder.emit(Inst::with_operands(
            Op::IterInit,
            [Operand::Slot(vec_slot), Operand::Int(iter as i64)],
        ));

        self.builder.push_breaks();
        self.builder.push_nexts();

        let mut head = Inst::with_operands(
            Op::IterNext,
            [
                Operand::Slot(var_slot),
                Operand::Int(iter as i64),
                Operand::Branch(0),
            ],
        );
        head.target_slot = 2;
        let head = self.builder.emit(head);

        self.compile_stmt(body);

        let back = self.emit_branch_site();
        self.builder.set_target(back, head);
        // Exhausted iteration continues past the loop.
        self.builder.branch_to_next(head);

        for site in self.builder.pop_nexts() {
            self.builder.set_target(site, head);
        }
        for site in self.builder.pop_breaks() {
            self.builder.branch_to_next(site);
        }
    }

    fn compile_switch(&mut self, value: &Expr<'a>, cases: &[SwitchCase<'a>], default: Option<usize>) {
        let mut kind = None;
        for case in cases {
            for label in &case.labels {
                match kind {
                    None => kind = Some(label.kind()),
                    Some(k) if k == label.kind() => {}
                    Some(_) => {
                        self.reporter
                            .error(&CompileError::MixedCaseTypes.to_string());
                        return;
                    }
                }
            }
        }

        let value_slot = self.compile_expr(value);
        let (op, table_idx) = match kind.unwrap_or(CaseKind::Int) {
            CaseKind::Int => {
                self.int_cases.push(Default::default());
                (Op::SwitchInt, self.int_cases.len() - 1)
            }
            CaseKind::Uint => {
                self.uint_cases.push(Default::default());
                (Op::SwitchUint, self.uint_cases.len() - 1)
            }
            CaseKind::Double => {
                self.double_cases.push(Default::default());
                (Op::SwitchDouble, self.double_cases.len() - 1)
            }
            CaseKind::Str => {
                self.str_cases.push(Default::default());
                (Op::SwitchStr, self.str_cases.len() - 1)
            }
        };

        let mut dispatch = Inst::with_operands(
            op,
            [
                Operand::Slot(value_slot),
                Operand::Int(table_idx as i64),
                Operand::Branch(0),
            ],
        );
        dispatch.target_slot = 2;
        let dispatch = self.builder.emit(dispatch);

        self.builder.push_breaks();

        // Lower the arms; every arm emits at least one instruction because
        // an arm that does not exit gets an implicit break.
        let mut arm_marks = Vec::with_capacity(cases.len());
        let mut fallthrough_sites = Vec::with_capacity(cases.len());
        for case in cases {
            arm_marks.push(self.builder.mark());
            self.builder.push_fallthroughs();
            for s in &case.body {
                self.compile_stmt(s);
            }
            if !case.body.last().is_some_and(Stmt::exits_case) {
                let site = self.emit_branch_site();
                self.builder.add_break(site);
            }
            fallthrough_sites.push(self.builder.pop_fallthroughs());
        }

        let arm_starts: Vec<InstId> = arm_marks.iter().map(|&m| self.builder.at(m)).collect();

        for (case, &start) in cases.iter().zip(&arm_starts) {
            for label in &case.labels {
                match label {
                    CaseLabel::Int(v) => {
                        self.int_cases[table_idx].insert(*v, start);
                    }
                    CaseLabel::Uint(v) => {
                        self.uint_cases[table_idx].insert(*v, start);
                    }
                    CaseLabel::Double(v) => {
                        self.double_cases[table_idx].insert((*v).into(), start);
                    }
                    CaseLabel::Str(v) => {
                        self.str_cases[table_idx].insert(v.clone(), start);
                    }
                }
            }
        }

        match default {
            Some(d) => self.builder.set_target(dispatch, arm_starts[d]),
            None => self.builder.branch_to_next(dispatch),
        }

        // A fallthrough continues into the next arm; from the last arm it
        // leaves the switch.
        for (i, sites) in fallthrough_sites.into_iter().enumerate() {
            for site in sites {
                if i + 1 < arm_starts.len() {
                    self.builder.set_target(site, arm_starts[i + 1]);
                } else {
                    self.builder.branch_to_next(site);
                }
            }
        }

        for site in self.builder.pop_breaks() {
            self.builder.branch_to_next(site);
        }
    }
}
