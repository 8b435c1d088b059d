// Diagnostic code dump. Prints the original frame, the sharing groups the
// optimizer computed, and the instruction listing in three variants: the
// provisional stream with dead markers, the compacted stream before it is
// handed off, and the final listing. Case tables print one line per table.
// The dump reads compiler state only; it never mutates.

//! The diagnostic dump of a compilation in progress.

use std::fmt::{self, Write};

use super::adaptor::{Function, ProfileSource, Reducer, Reporter, UseDefs};
use super::cases::CaseMaps;
use super::compiler::ZamCompiler;
use super::inst::{Inst, Operand};

impl<'a, F, P, U, R, Rep> ZamCompiler<'a, F, P, U, R, Rep>
where
    F: Function<'a>,
    P: ProfileSource<'a>,
    U: UseDefs<'a>,
    R: Reducer<'a>,
    Rep: Reporter,
{
    /// Write the diagnostic listing. Sections whose data does not exist at
    /// the current stage are skipped.
    pub fn dump<W: Write>(&self, w: &mut W) -> fmt::Result {
        let remapped = !self.options.no_zam_opt;

        if remapped {
            writeln!(w, "Original frame:")?;
        }
        for &(id, slot) in self.frame.layout() {
            writeln!(w, "frame[{slot}] = {id}")?;
        }

        if remapped && !self.shared_frame.is_empty() {
            writeln!(w, "Final frame:")?;
            for (i, info) in self.shared_frame.iter().enumerate() {
                write!(w, "frame2[{i}] =")?;
                for id in &info.ids {
                    write!(w, " {id}")?;
                }
                writeln!(w)?;
            }
        }

        if !self.insts2.is_empty() {
            writeln!(w, "Pre-removal of dead code:")?;
        }
        for (i, &id) in self.builder.order.iter().enumerate() {
            self.dump_inst(w, i, self.builder.get(id), true)?;
        }

        if !self.insts2.is_empty() {
            writeln!(w, "Final intermediary code:")?;
            for (i, &id) in self.insts2.iter().enumerate() {
                self.dump_inst(w, i, self.builder.get(id), true)?;
            }

            writeln!(w, "Final code:")?;
            for (i, &id) in self.insts2.iter().enumerate() {
                self.dump_inst(w, i, self.builder.get(id), false)?;
            }
        }

        self.dump_cases(w, &self.int_cases, "int")?;
        self.dump_cases(w, &self.uint_cases, "uint")?;
        self.dump_cases(w, &self.double_cases, "double")?;
        self.dump_cases(w, &self.str_cases, "str")?;

        Ok(())
    }

    fn dump_inst<W: Write>(&self, w: &mut W, i: usize, inst: &Inst, annotate: bool) -> fmt::Result {
        write!(w, "{i}")?;
        if annotate {
            if !inst.live {
                write!(w, " (dead)")?;
            }
            if inst.loop_depth > 0 {
                write!(w, " (loop {})", inst.loop_depth)?;
            }
        }
        write!(w, ": {}", inst.op.name())?;
        for operand in &inst.operands {
            match operand {
                Operand::Slot(s) => write!(w, " f{s}")?,
                Operand::Int(v) => write!(w, " {v}")?,
                Operand::UInt(v) => write!(w, " {v}")?,
                Operand::Double(v) => write!(w, " {v}")?,
                Operand::Branch(n) => write!(w, " @{n}")?,
            }
        }
        if let Some(t) = inst.target {
            write!(w, " -> {}", self.builder.get(t).num)?;
        }
        if let Some(t2) = inst.target2 {
            write!(w, " => {}", self.builder.get(t2).num)?;
        }
        writeln!(w)
    }

    fn dump_cases<W: Write, K: fmt::Display>(
        &self,
        w: &mut W,
        tables: &CaseMaps<K>,
        type_name: &str,
    ) -> fmt::Result {
        for (i, table) in tables.iter().enumerate() {
            write!(w, "{type_name} switch table #{i}:")?;
            for (key, &target) in table {
                write!(w, " {key}->{}", self.builder.get(target).num)?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}
