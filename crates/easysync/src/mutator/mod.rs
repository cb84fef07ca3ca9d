//! Applying changesets to text, to lines and to attribution strings.

mod attribution_lines;
mod text_lines;

pub use attribution_lines::mutate_attribution_lines;
pub use text_lines::TextLinesMutator;

use crate::attribute_pool::AttributePool;
use crate::changeset::unpack;
use crate::check::check_structure;
use crate::error::{PreconditionError, Result};
use crate::op::{deserialize_ops, OpCode};
use crate::string_iter::{utf16_len, StringIter};
use crate::transform::zip::{apply_zip, slice_attribution};

/// Applies `cs` to `text` and returns the new text.
pub fn apply_to_text(cs: &str, text: &str) -> Result<String> {
    let unpacked = unpack(cs)?;
    let actual = utf16_len(text);
    if actual != unpacked.old_len {
        return Err(PreconditionError::TextLengthMismatch {
            expected: unpacked.old_len,
            actual,
        }
        .into());
    }

    let mut bank = StringIter::new(unpacked.char_bank);
    let mut source = StringIter::new(text);
    let mut out = String::with_capacity(text.len() + unpacked.char_bank.len());

    for op in deserialize_ops(unpacked.ops) {
        let op = op?;
        let taken = match op.opcode {
            OpCode::Insert => bank.take(op.chars)?,
            OpCode::Remove | OpCode::Keep => source.take(op.chars)?,
        };
        let newlines = taken.matches('\n').count();
        if newlines != op.lines {
            return Err(PreconditionError::NewlineCountMismatch {
                opcode: op.opcode,
                expected: op.lines,
                actual: newlines,
            }
            .into());
        }
        if op.opcode != OpCode::Remove {
            out.push_str(taken);
        }
    }
    out.push_str(source.rest());
    Ok(out)
}

/// Applies `cs` in place to a document held as lines. The changeset and
/// the document length are checked first, and on any error the lines are
/// left as they were.
pub fn mutate_text_lines(cs: &str, lines: &mut Vec<String>) -> Result<()> {
    let unpacked = check_structure(cs)?;
    let actual: usize = lines.iter().map(|l| utf16_len(l)).sum();
    if actual != unpacked.old_len {
        return Err(PreconditionError::TextLengthMismatch {
            expected: unpacked.old_len,
            actual,
        }
        .into());
    }

    let mut bank = StringIter::new(unpacked.char_bank);
    let mut mutator = TextLinesMutator::new(lines);
    for op in deserialize_ops(unpacked.ops) {
        let op = op?;
        match op.opcode {
            OpCode::Insert => mutator.insert(bank.take(op.chars)?, op.lines)?,
            OpCode::Remove => {
                mutator.remove(op.chars, op.lines)?;
            }
            OpCode::Keep => mutator.skip(op.chars, op.lines, !op.attribs.is_empty())?,
        }
    }
    mutator.close();
    Ok(())
}

/// Applies `cs` to a single attribution string covering the whole document.
pub fn apply_to_attribution(cs: &str, astr: &str, pool: &mut AttributePool) -> Result<String> {
    let unpacked = unpack(cs)?;
    apply_zip(astr, unpacked.ops, |att, cs_op| {
        slice_attribution(att, cs_op, pool)
    })
}
