//! Expression lowering.
//!
//! Every expression lowers to a frame slot holding its value. Literals and
//! operator results land in temporaries obtained from the reducer;
//! identifier reads resolve to the identifier's own slot, with globals
//! refreshed from the global store first.

use crate::core::adaptor::{Function, ProfileSource, Reducer, Reporter, UseDefs};
use crate::core::compiler::ZamCompiler;
use crate::core::error::CompileError;
use crate::core::ident::{Ident, IdentKind, ZType};
use crate::core::inst::{Inst, Op, Operand};

use super::{BinOp, Expr};

impl<'a, F, P, U, R, Rep> ZamCompiler<'a, F, P, U, R, Rep>
where
    F: Function<'a>,
    P: ProfileSource<'a>,
    U: UseDefs<'a>,
    R: Reducer<'a>,
    Rep: Reporter,
{
    /// Lower an expression; returns the slot holding its value.
    pub(crate) fn compile_expr(&mut self, expr: &Expr<'a>) -> u32 {
        match expr {
            Expr::IntLit(v) => self.emit_const(ZType::Int, Operand::Int(*v)),
            Expr::UintLit(v) => self.emit_const(ZType::Count, Operand::UInt(*v)),
            Expr::DoubleLit(v) => self.emit_const(ZType::Double, Operand::Double(*v)),
            Expr::Id(id) => self.compile_id_read(id),
            Expr::Not(inner) => {
                let src = self.compile_expr(inner);
                let dst = self.temp_slot(ZType::Bool);
                self.builder.emit(Inst::with_operands(
                    Op::Not,
                    [Operand::Slot(dst), Operand::Slot(src)],
                ));
                dst
            }
            Expr::Bin(op, lhs, rhs) => {
                let ls = self.compile_expr(lhs);
                let rs = self.compile_expr(rhs);
                let ty = if op.is_comparison() {
                    ZType::Bool
                } else {
                    self.expr_type(lhs)
                };
                let dst = self.temp_slot(ty);
                let opcode = match op {
                    BinOp::Add => Op::Add,
                    BinOp::Sub => Op::Sub,
                    BinOp::Mul => Op::Mul,
                    BinOp::Lt => Op::Lt,
                    BinOp::Le => Op::Le,
                    BinOp::Eq => Op::Eq,
                };
                self.builder.emit(Inst::with_operands(
                    opcode,
                    [Operand::Slot(dst), Operand::Slot(ls), Operand::Slot(rs)],
                ));
                dst
            }
        }
    }

    fn emit_const(&mut self, ty: ZType, imm: Operand) -> u32 {
        let dst = self.temp_slot(ty);
        self.builder
            .emit(Inst::with_operands(Op::Const, [Operand::Slot(dst), imm]));
        dst
    }

    fn temp_slot(&mut self, ty: ZType) -> u32 {
        let temp = self.reducer.new_temp(ty);
        self.frame_slot(temp)
    }

    fn compile_id_read(&mut self, id: &Ident<'a>) -> u32 {
        if id.kind() == IdentKind::Global {
            let Some(&gidx) = self.global_index.get(id.name()) else {
                self.report_unknown(id);
                return 0;
            };
            let slot = self.globals[gidx].slot;
            self.builder.emit(Inst::with_operands(
                Op::LoadGlobal,
                [Operand::Slot(slot), Operand::Int(gidx as i64)],
            ));
            return slot;
        }

        match self.frame.slot_of(id) {
            Some(slot) => slot,
            None => {
                self.report_unknown(id);
                0
            }
        }
    }

    /// Slot an assignment writes to. Globals write their frame slot; the
    /// write-back to the global store happens at synchronization points.
    pub(crate) fn compile_id_write(&mut self, id: &Ident<'a>) -> u32 {
        if id.kind() == IdentKind::Global {
            match self.global_index.get(id.name()) {
                Some(&gidx) => self.globals[gidx].slot,
                None => {
                    self.report_unknown(id);
                    0
                }
            }
        } else {
            self.frame_slot(*id)
        }
    }

    pub(crate) fn expr_type(&self, expr: &Expr<'a>) -> ZType {
        match expr {
            Expr::IntLit(_) => ZType::Int,
            Expr::UintLit(_) => ZType::Count,
            Expr::DoubleLit(_) => ZType::Double,
            Expr::Id(id) => id.ty(),
            Expr::Not(_) => ZType::Bool,
            Expr::Bin(op, lhs, _) => {
                if op.is_comparison() {
                    ZType::Bool
                } else {
                    self.expr_type(lhs)
                }
            }
        }
    }

    fn report_unknown(&mut self, id: &Ident<'a>) {
        self.reporter.error(
            &CompileError::UnknownIdent {
                name: id.name().to_string(),
            }
            .to_string(),
        );
    }
}
