//! Applying a changeset to per-line attribution strings.

use std::collections::VecDeque;

use crate::assembler::MergingOpAssembler;
use crate::attribute_pool::AttributePool;
use crate::check::check_structure;
use crate::error::{PreconditionError, Result};
use crate::mutator::TextLinesMutator;
use crate::op::{deserialize_ops, Op, OpCode, OpIter};
use crate::string_iter::StringIter;
use crate::transform::zip::slice_attribution;

struct AttributionLines<'a, 'p> {
    mutator: TextLinesMutator<'a>,
    pool: &'p mut AttributePool,
    /// Ops of the attribution line currently being rewritten.
    line_ops: VecDeque<Op>,
    /// Output for the line being rebuilt, if one is in progress.
    line_assem: Option<MergingOpAssembler>,
}

impl AttributionLines<'_, '_> {
    fn has_next_mut_op(&self) -> bool {
        !self.line_ops.is_empty() || self.mutator.has_more()
    }

    fn next_mut_op(&mut self) -> Result<Option<Op>> {
        if self.line_ops.is_empty() && self.mutator.has_more() {
            let line = self.mutator.remove_lines(1)?;
            self.line_ops = deserialize_ops(&line).collect::<Result<_, _>>()?;
        }
        Ok(self.line_ops.pop_front())
    }

    fn output(&mut self, op: Op) -> Result<()> {
        let assem = self.line_assem.get_or_insert_with(MergingOpAssembler::new);
        assem.append(&op);
        if op.lines == 0 {
            return Ok(());
        }
        if op.lines != 1 {
            return Err(PreconditionError::MultipleLines(op.lines).into());
        }
        let line = assem.serialize();
        self.line_assem = None;
        self.mutator.insert(&line, 1)?;
        Ok(())
    }
}

/// Total length of the document described by `alines`.
fn attributed_len(alines: &[String]) -> Result<usize> {
    let mut len = 0;
    for aline in alines {
        for op in deserialize_ops(aline) {
            len += op?.chars;
        }
    }
    Ok(len)
}

/// Applies `cs` to `alines`, the attribution strings of a document's lines,
/// in place. Lines before, between and after the edited ones are carried
/// over untouched, and on any error no line changes.
pub fn mutate_attribution_lines(cs: &str, alines: &mut Vec<String>, pool: &mut AttributePool) -> Result<()> {
    let unpacked = check_structure(cs)?;
    let actual = attributed_len(alines)?;
    if actual != unpacked.old_len {
        return Err(PreconditionError::TextLengthMismatch {
            expected: unpacked.old_len,
            actual,
        }
        .into());
    }
    let mut cs_ops: OpIter<'_> = deserialize_ops(unpacked.ops);
    let mut cs_bank = StringIter::new(unpacked.char_bank);

    let mut state = AttributionLines {
        mutator: TextLinesMutator::new(alines),
        pool,
        line_ops: VecDeque::new(),
        line_assem: None,
    };

    let mut cs_op: Option<Op> = None;
    let mut att_op: Option<Op> = None;
    let mut cs_next = cs_ops.next().transpose()?;

    while cs_op.is_some() || cs_next.is_some() || att_op.is_some() || state.has_next_mut_op() {
        if cs_op.is_none() && cs_next.is_some() {
            cs_op = cs_next.take();
            cs_next = cs_ops.next().transpose()?;
        }
        let idle = att_op.is_none() && state.line_assem.is_none() && state.line_ops.is_empty();
        match cs_op.as_mut() {
            None if idle => break,
            Some(op) if op.opcode == OpCode::Keep && op.lines > 0 && op.attribs.is_empty() && idle => {
                state.mutator.skip_lines(op.lines, false)?;
                cs_op = None;
            }
            Some(op) if op.opcode == OpCode::Insert => {
                let mut out = op.clone();
                if op.lines > 1 {
                    let first_line_len = cs_bank
                        .chars_through_newline()
                        .ok_or(PreconditionError::MissingNewline)?;
                    op.chars -= first_line_len;
                    op.lines -= 1;
                    out.lines = 1;
                    out.chars = first_line_len;
                } else {
                    cs_op = None;
                }
                cs_bank.skip(out.chars)?;
                state.output(out)?;
            }
            _ => {
                if att_op.is_none() && state.has_next_mut_op() {
                    att_op = state.next_mut_op()?;
                }
                if let Some(out) = slice_attribution(&mut att_op, &mut cs_op, state.pool)? {
                    state.output(out)?;
                }
            }
        }
    }

    if state.line_assem.is_some() {
        return Err(PreconditionError::UnfinishedLine.into());
    }
    state.mutator.close();
    Ok(())
}
