//! Walking two op streams in lockstep.
//!
//! Each side holds at most one pending op (`None` once it is used up). The
//! combining function consumes all or part of one or both pending ops and
//! may emit one output op; the driver refills empty sides and assembles the
//! output in canonical form.

use crate::assembler::SmartOpAssembler;
use crate::attribute_pool::AttributePool;
use crate::error::{InvalidChangeset, Result};
use crate::op::{deserialize_ops, Op, OpCode};
use crate::transform::compose::compose_attributes;

pub(crate) fn apply_zip<F>(in1: &str, in2: &str, mut func: F) -> Result<String>
where
    F: FnMut(&mut Option<Op>, &mut Option<Op>) -> Result<Option<Op>>,
{
    let mut ops1 = deserialize_ops(in1);
    let mut ops2 = deserialize_ops(in2);
    let mut op1: Option<Op> = None;
    let mut op2: Option<Op> = None;
    let mut assem = SmartOpAssembler::new();
    loop {
        if op1.is_none() {
            op1 = ops1.next().transpose()?;
        }
        if op2.is_none() {
            op2 = ops2.next().transpose()?;
        }
        if op1.is_none() && op2.is_none() {
            break;
        }
        if let Some(out) = func(&mut op1, &mut op2)? {
            assem.append(&out);
        }
    }
    assem.end_document();
    Ok(assem.serialize())
}

/// Removes `chars`/`lines` from the front of `op`, clearing the slot once
/// nothing is left.
pub(crate) fn consume(slot: &mut Option<Op>, chars: usize, lines: usize) -> Result<()> {
    if let Some(op) = slot.as_mut() {
        op.chars = op
            .chars
            .checked_sub(chars)
            .ok_or(InvalidChangeset::LineCountMismatch)?;
        op.lines = op
            .lines
            .checked_sub(lines)
            .ok_or(InvalidChangeset::LineCountMismatch)?;
        if op.chars == 0 {
            *slot = None;
        }
    }
    Ok(())
}

/// One step of running the ops of a changeset (`cs`) over the ops of a
/// document attribution, or of a first changeset, (`att`), which share the
/// same char axis: `att`'s output is `cs`'s input.
pub(crate) fn slice_attribution(
    att_slot: &mut Option<Op>,
    cs_slot: &mut Option<Op>,
    pool: &mut AttributePool,
) -> Result<Option<Op>> {
    let att_code = att_slot.as_ref().map(|op| op.opcode);
    let cs_code = cs_slot.as_ref().map(|op| op.opcode);
    match (att_code, cs_code) {
        (None, _) => return Ok(cs_slot.take()),
        (_, None) => return Ok(att_slot.take()),
        (Some(OpCode::Remove), _) => return Ok(att_slot.take()),
        (_, Some(OpCode::Insert)) => return Ok(cs_slot.take()),
        _ => {}
    }
    let (Some(att), Some(cs)) = (att_slot.as_ref(), cs_slot.as_ref()) else {
        return Ok(None);
    };

    for op in [att, cs] {
        if op.chars < op.lines {
            return Err(InvalidChangeset::MoreLinesThanChars {
                chars: op.chars,
                lines: op.lines,
            }
            .into());
        }
    }
    let lines_agree = match att.chars.cmp(&cs.chars) {
        std::cmp::Ordering::Less => att.lines <= cs.lines,
        std::cmp::Ordering::Greater => att.lines >= cs.lines,
        std::cmp::Ordering::Equal => att.lines == cs.lines,
    };
    if !lines_agree {
        return Err(InvalidChangeset::LineCountMismatch.into());
    }

    let opcode = match (att.opcode, cs.opcode) {
        // the remove cancels (part of) the insert
        (OpCode::Insert, OpCode::Remove) => None,
        (OpCode::Insert, _) => Some(OpCode::Insert),
        (_, OpCode::Remove) => Some(OpCode::Remove),
        _ => Some(OpCode::Keep),
    };
    let (chars, lines) = if att.chars <= cs.chars {
        (att.chars, att.lines)
    } else {
        (cs.chars, cs.lines)
    };
    let attribs = if cs.opcode == OpCode::Remove {
        // attributes on removes pass through untouched
        cs.attribs.clone()
    } else {
        compose_attributes(&att.attribs, &cs.attribs, att.opcode == OpCode::Keep, pool)?
    };

    consume(att_slot, chars, lines)?;
    consume(cs_slot, chars, lines)?;

    Ok(opcode.map(|opcode| Op {
        opcode,
        chars,
        lines,
        attribs,
    }))
}
