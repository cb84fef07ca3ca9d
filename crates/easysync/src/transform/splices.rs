//! Changesets as plain-text splices and moving char ranges through them.

use crate::changeset::unpack;
use crate::error::Result;
use crate::op::{deserialize_ops, OpCode};
use crate::string_iter::{utf16_len, StringIter};

/// Replacement of the old-document chars `start..end` by `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// The splices `cs` performs, in document order, with positions in the old
/// document. Adjacent removes and inserts form a single splice.
pub fn to_splices(cs: &str) -> Result<Vec<Splice>> {
    let unpacked = unpack(cs)?;
    let mut bank = StringIter::new(unpacked.char_bank);
    let mut splices: Vec<Splice> = Vec::new();
    let mut old_pos = 0;
    let mut in_splice = false;

    for op in deserialize_ops(unpacked.ops) {
        let op = op?;
        if op.opcode == OpCode::Keep {
            old_pos += op.chars;
            in_splice = false;
            continue;
        }
        if !in_splice {
            splices.push(Splice {
                start: old_pos,
                end: old_pos,
                text: String::new(),
            });
            in_splice = true;
        }
        if let Some(splice) = splices.last_mut() {
            match op.opcode {
                OpCode::Remove => {
                    old_pos += op.chars;
                    splice.end += op.chars;
                }
                OpCode::Insert => splice.text.push_str(bank.take(op.chars)?),
                OpCode::Keep => {}
            }
        }
    }
    Ok(splices)
}

/// Where the char range `start..end` of the old document ends up after
/// `cs`. A range swallowed by a splice collapses to the splice's start, or
/// to the end of its inserted text unless `insertions_after` is set.
pub fn character_range_follow(
    cs: &str,
    start: usize,
    end: usize,
    insertions_after: bool,
) -> Result<(usize, usize)> {
    let mut new_start = start as isize;
    let mut new_end = end as isize;
    let mut length_change_so_far = 0isize;

    for splice in to_splices(cs)? {
        let splice_start = splice.start as isize + length_change_so_far;
        let splice_end = splice.end as isize + length_change_so_far;
        let new_text_len = utf16_len(&splice.text) as isize;
        let this_change = new_text_len - (splice_end - splice_start);

        if splice_start <= new_start && splice_end >= new_end {
            // the splice covers the whole range
            let at = if insertions_after {
                splice_start
            } else {
                splice_start + new_text_len
            };
            new_start = at;
            new_end = at;
        } else if splice_end <= new_start {
            // before the range
            new_start += this_change;
            new_end += this_change;
        } else if splice_start >= new_end {
            // after the range
        } else if splice_start >= new_start && splice_end <= new_end {
            // inside the range
            new_end += this_change;
        } else if splice_end < new_end {
            // overlaps the start of the range
            new_start = splice_start + new_text_len;
            new_end += this_change;
        } else {
            // overlaps the end of the range
            new_end = splice_start;
        }
        length_change_so_far += this_change;
    }

    Ok((new_start.max(0) as usize, new_end.max(0) as usize))
}
