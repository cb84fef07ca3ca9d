//! Attributed text and the attribution strings that describe it.
//!
//! A document's attribution is a sequence of insert ops covering every char
//! of its text. Stored per line, each line's ops end with the op that
//! carries its newline.

use serde::{Deserialize, Serialize};

use crate::assembler::{MergingOpAssembler, SmartOpAssembler};
use crate::attribs::Attribs;
use crate::attribute_pool::AttributePool;
use crate::error::{PreconditionError, Result};
use crate::mutator::{apply_to_attribution, apply_to_text};
use crate::op::{deserialize_ops, ops_from_text, Op, OpCode, OpIter};
use crate::string_iter::utf16_len;
use crate::transform::zip::slice_attribution;

/// Text together with its attribution string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AText {
    pub text: String,
    pub attribs: String,
}

/// `text` with the given attribution, or a plain one if `attribs` is `None`.
pub fn make_atext(text: &str, attribs: Option<&str>) -> AText {
    AText {
        text: text.to_string(),
        attribs: attribs.map_or_else(|| make_attribution(text), str::to_string),
    }
}

/// Applies `cs` to both the text and the attribution of `atext`.
pub fn apply_to_atext(cs: &str, atext: &AText, pool: &mut AttributePool) -> Result<AText> {
    Ok(AText {
        text: apply_to_text(cs, &atext.text)?,
        attribs: apply_to_attribution(cs, &atext.attribs, pool)?,
    })
}

/// Attribution inserting `text` without attributes.
pub fn make_attribution(text: &str) -> String {
    let mut assem = SmartOpAssembler::new();
    for op in ops_from_text(OpCode::Insert, text, &Attribs::new()) {
        assem.append(&op);
    }
    assem.serialize()
}

/// The ops of `atext`'s attribution minus the document's final newline.
pub fn ops_from_atext(atext: &AText) -> Result<Vec<Op>> {
    let mut ops = deserialize_ops(&atext.attribs).collect::<Result<Vec<_>, _>>()?;
    let Some(mut last) = ops.pop() else {
        return Ok(ops);
    };
    if last.lines <= 1 {
        last.lines = 0;
        last.chars = last
            .chars
            .checked_sub(1)
            .ok_or(PreconditionError::MissingNewline)?;
    } else {
        let body = atext
            .text
            .strip_suffix('\n')
            .ok_or(PreconditionError::MissingNewline)?;
        let last_line_len = body.rsplit('\n').next().map_or(0, utf16_len);
        let mut head = last.clone();
        head.lines -= 1;
        head.chars = head
            .chars
            .checked_sub(last_line_len + 1)
            .ok_or(PreconditionError::MissingNewline)?;
        ops.push(head);
        last.lines = 0;
        last.chars = last_line_len;
    }
    if last.chars > 0 {
        ops.push(last);
    }
    Ok(ops)
}

/// Splits a document attribution into one attribution string per line of
/// `text`. Text after the last newline gets a line of its own.
pub fn split_attribution_lines(astr: &str, text: &str) -> Result<Vec<String>> {
    let mut offset = 0usize;
    let newline_ends: Vec<usize> = text
        .chars()
        .filter_map(|c| {
            offset += c.len_utf16();
            (c == '\n').then_some(offset)
        })
        .collect();

    let mut assem = MergingOpAssembler::new();
    let mut lines = Vec::new();
    let mut pos = 0usize;

    let mut append = |op: &Op, pos: &mut usize| {
        assem.append(op);
        if op.lines > 0 {
            lines.push(assem.serialize());
            assem.clear();
        }
        *pos += op.chars;
    };

    for op in deserialize_ops(astr) {
        let mut op = op?;
        let mut chars = op.chars;
        let mut num_lines = op.lines;
        while num_lines > 1 {
            let idx = newline_ends.partition_point(|&end| end <= pos);
            let end = newline_ends
                .get(idx)
                .copied()
                .ok_or(PreconditionError::MissingNewline)?;
            op.chars = end - pos;
            op.lines = 1;
            append(&op, &mut pos);
            chars = chars
                .checked_sub(op.chars)
                .ok_or(PreconditionError::MissingNewline)?;
            num_lines -= 1;
        }
        if num_lines == 1 {
            op.chars = chars;
            op.lines = 1;
        }
        append(&op, &mut pos);
    }

    let rest = assem.serialize();
    if !rest.is_empty() {
        lines.push(rest);
    }
    Ok(lines)
}

/// Joins per-line attribution strings back into one, merging ops across
/// line boundaries.
pub fn join_attribution_lines<S: AsRef<str>>(alines: &[S]) -> Result<String> {
    let mut assem = MergingOpAssembler::new();
    for aline in alines {
        for op in deserialize_ops(aline.as_ref()) {
            assem.append(&op?);
        }
    }
    Ok(assem.serialize())
}

/// Lines of `text`, each with its newline. A trailing partial line is
/// included; the empty text has no lines.
pub fn split_text_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Runs `cs` (a remove or keep window) over the attribution ops, emitting
/// what the window keeps.
fn slice_window(
    cs: Op,
    att: &mut Option<Op>,
    att_ops: &mut OpIter<'_>,
    assem: &mut SmartOpAssembler,
    pool: &mut AttributePool,
) -> Result<()> {
    let mut cs_slot = (cs.chars > 0).then_some(cs);
    while cs_slot.is_some() {
        if att.is_none() {
            *att = att_ops.next().transpose()?;
            if att.is_none() {
                break;
            }
        }
        if let (Some(cs), Some(a)) = (cs_slot.as_mut(), att.as_ref()) {
            // a run wholly inside the window takes its newline along
            if cs.chars >= a.chars && cs.lines < a.lines {
                cs.lines = a.lines;
            }
        }
        if let Some(out) = slice_attribution(att, &mut cs_slot, pool)? {
            assem.append(&out);
        }
    }
    Ok(())
}

/// The part of a single-line attribution covering chars `start..end`, or
/// `start..` without an end.
pub fn subattribution(astr: &str, start: usize, end: Option<usize>) -> Result<String> {
    // removes and attribute-less keeps never intern anything
    let mut pool = AttributePool::new();
    let mut att_ops = deserialize_ops(astr);
    let mut att: Option<Op> = None;
    let mut assem = SmartOpAssembler::new();

    slice_window(Op::remove(start, 0), &mut att, &mut att_ops, &mut assem, &mut pool)?;
    match end {
        Some(end) => {
            let window = Op::keep(end.saturating_sub(start), 0);
            slice_window(window, &mut att, &mut att_ops, &mut assem, &mut pool)?;
        }
        None => {
            if let Some(op) = att.take() {
                assem.append(&op);
            }
            for op in att_ops {
                assem.append(&op?);
            }
        }
    }
    Ok(assem.serialize())
}
