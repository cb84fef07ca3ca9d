//! Operational transformation of concurrent changesets.
//!
//! Given `a` and `b` made against the same document, `follow(a, b)` is `b`
//! rewritten to apply after `a`, such that
//! `compose(a, follow(a, b)) == compose(b, follow(b, a))` at the text
//! level.

use indexmap::IndexMap;
use tracing::trace;

use crate::attribs::Attribs;
use crate::attribute_pool::AttributePool;
use crate::changeset::{pack, unpack};
use crate::error::{InvalidChangeset, Result};
use crate::op::{Op, OpCode};
use crate::string_iter::StringIter;
use crate::transform::zip::{apply_zip, consume};

/// Attributes `att2` keeps when it is transformed against a concurrent
/// `att1` on the same chars. When both set the same key, the lexically
/// earlier value wins, so `att2` drops its setting if `att1`'s value sorts
/// before or equal to it.
pub fn follow_attributes(att1: &Attribs, att2: &Attribs, pool: &mut AttributePool) -> Result<Attribs> {
    if att2.is_empty() {
        return Ok(Attribs::new());
    }
    if att1.is_empty() {
        return Ok(att2.clone());
    }
    let mut atts: IndexMap<String, String> = IndexMap::new();
    for n in att2.iter() {
        let (k, v) = pool.get_attrib(n).ok_or(InvalidChangeset::UnknownAttrib(n))?;
        atts.insert(k.to_string(), v.to_string());
    }
    for n in att1.iter() {
        let (k, v) = pool.get_attrib(n).ok_or(InvalidChangeset::UnknownAttrib(n))?;
        if atts.get(k).is_some_and(|v2| v <= v2.as_str()) {
            atts.shift_remove(k);
        }
    }
    Ok(atts.iter().map(|(k, v)| pool.put_attrib(k, v)).collect())
}

/// Which of two concurrent inserts at the same position goes first.
fn first_insert(
    op1: &Op,
    op2: &Op,
    first_char1: &str,
    first_char2: &str,
    insert_first: Option<u32>,
    reverse_insert_order: bool,
) -> u8 {
    let has_insert_first = |op: &Op| insert_first.is_some_and(|n| op.attribs.contains(n));
    let (ins1, ins2) = (has_insert_first(op1), has_insert_first(op2));
    if ins1 && !ins2 {
        1
    } else if ins2 && !ins1 {
        2
    } else if first_char1 == "\n" && first_char2 != "\n" {
        // an insert that starts with a newline goes last
        2
    } else if first_char1 != "\n" && first_char2 == "\n" {
        1
    } else if reverse_insert_order {
        2
    } else {
        1
    }
}

/// Transforms `cs2` so that it applies after `cs1`. `reverse_insert_order`
/// breaks ties between inserts at the same position in favour of `cs2`
/// going first.
pub fn follow(cs1: &str, cs2: &str, reverse_insert_order: bool, pool: &mut AttributePool) -> Result<String> {
    let unpacked1 = unpack(cs1)?;
    let unpacked2 = unpack(cs2)?;
    if unpacked1.old_len != unpacked2.old_len {
        return Err(InvalidChangeset::FollowMismatch {
            first: unpacked1.old_len,
            second: unpacked2.old_len,
        }
        .into());
    }

    let mut chars1 = StringIter::new(unpacked1.char_bank);
    let mut chars2 = StringIter::new(unpacked2.char_bank);
    let old_len = unpacked1.new_len;
    let mut old_pos = 0usize;
    let mut new_len = 0usize;
    let insert_first = pool.attrib_num("insertorder", "first");

    let ops = apply_zip(unpacked1.ops, unpacked2.ops, |slot1, slot2| {
        let code1 = slot1.as_ref().map(|op| op.opcode);
        let code2 = slot2.as_ref().map(|op| op.opcode);
        let mut out: Option<Op> = None;

        if code1 == Some(OpCode::Insert) || code2 == Some(OpCode::Insert) {
            let which = match (slot1.as_ref(), slot2.as_ref()) {
                (Some(op1), Some(op2)) if code1 == code2 => first_insert(
                    op1,
                    op2,
                    chars1.peek(1)?,
                    chars2.peek(1)?,
                    insert_first,
                    reverse_insert_order,
                ),
                _ if code2 != Some(OpCode::Insert) => 1,
                _ => 2,
            };
            if which == 1 {
                if let Some(op1) = slot1.take() {
                    chars1.skip(op1.chars)?;
                    out = Some(Op::keep(op1.chars, op1.lines));
                }
            } else if let Some(op2) = slot2.take() {
                chars2.skip(op2.chars)?;
                out = Some(op2);
            }
        } else if code1 == Some(OpCode::Remove) {
            match slot2.as_ref() {
                None => *slot1 = None,
                Some(op2) => {
                    let (c2, l2) = (op2.chars, op2.lines);
                    let (c1, l1) = slot1.as_ref().map_or((0, 0), |op| (op.chars, op.lines));
                    if c1 <= c2 {
                        consume(slot2, c1, l1)?;
                        *slot1 = None;
                    } else {
                        consume(slot1, c2, l2)?;
                        *slot2 = None;
                    }
                }
            }
        } else if code2 == Some(OpCode::Remove) {
            out = slot2.clone();
            match slot1.as_ref() {
                None => *slot2 = None,
                Some(op1) => {
                    let (c1, l1) = (op1.chars, op1.lines);
                    let (c2, l2) = slot2.as_ref().map_or((0, 0), |op| (op.chars, op.lines));
                    if c2 <= c1 {
                        consume(slot1, c2, l2)?;
                        *slot2 = None;
                    } else {
                        if let Some(out) = out.as_mut() {
                            out.chars = c1;
                            out.lines = l1;
                        }
                        consume(slot2, c1, l1)?;
                        *slot1 = None;
                    }
                }
            }
        } else if slot1.is_none() {
            out = slot2.take();
        } else if slot2.is_none() {
            // keeps of cs1 past the end of cs2's ops stay implicit
            *slot1 = None;
        } else if let (Some(op1), Some(op2)) = (slot1.as_ref(), slot2.as_ref()) {
            let attribs = follow_attributes(&op1.attribs, &op2.attribs, pool)?;
            let (chars, lines) = if op1.chars <= op2.chars {
                (op1.chars, op1.lines)
            } else {
                (op2.chars, op2.lines)
            };
            out = Some(Op::keep(chars, lines).with_attribs(attribs));
            consume(slot1, chars, lines)?;
            consume(slot2, chars, lines)?;
        }

        if let Some(op) = out.as_ref() {
            match op.opcode {
                OpCode::Keep => {
                    old_pos += op.chars;
                    new_len += op.chars;
                }
                OpCode::Remove => old_pos += op.chars,
                OpCode::Insert => new_len += op.chars,
            }
        }
        Ok(out)
    })?;

    let remaining = old_len.checked_sub(old_pos).ok_or(InvalidChangeset::OldLenExceeded {
        pos: old_pos,
        old_len,
    })?;
    new_len += remaining;

    trace!(old_len, new_len, reverse_insert_order, "followed changeset");
    Ok(pack(old_len, new_len, &ops, unpacked2.char_bank))
}
