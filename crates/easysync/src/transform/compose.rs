//! Sequential composition.

use tracing::trace;

use crate::attribs::{AttributeMap, Attribs};
use crate::attribute_pool::AttributePool;
use crate::changeset::{pack, unpack};
use crate::error::{InvalidChangeset, Result};
use crate::op::OpCode;
use crate::string_iter::StringIter;
use crate::transform::zip::{apply_zip, slice_attribution};

/// Attributes of a run after `att2` is applied on top of `att1`.
///
/// With `result_is_mutation` the result describes a change to existing text
/// (a keep), so an empty value is kept as "clear this key". Otherwise the
/// result describes text that exists (an insert or a document), and an
/// empty value removes the key.
pub fn compose_attributes(
    att1: &Attribs,
    att2: &Attribs,
    result_is_mutation: bool,
    pool: &mut AttributePool,
) -> Result<Attribs> {
    if att1.is_empty() && result_is_mutation {
        return Ok(att2.clone());
    }
    if att2.is_empty() {
        return Ok(att1.clone());
    }
    let mut map = AttributeMap::from_attribs(att1, pool)?;
    map.update_from_attribs(att2, pool, !result_is_mutation)?;
    Ok(map.to_attribs(pool))
}

/// Composes `cs1` and `cs2` into one changeset with the effect of applying
/// `cs1` and then `cs2`.
pub fn compose(cs1: &str, cs2: &str, pool: &mut AttributePool) -> Result<String> {
    let unpacked1 = unpack(cs1)?;
    let unpacked2 = unpack(cs2)?;
    if unpacked1.new_len != unpacked2.old_len {
        return Err(InvalidChangeset::ComposeMismatch {
            new_len: unpacked1.new_len,
            old_len: unpacked2.old_len,
        }
        .into());
    }

    let mut bank1 = StringIter::new(unpacked1.char_bank);
    let mut bank2 = StringIter::new(unpacked2.char_bank);
    let mut bank = String::new();

    let ops = apply_zip(unpacked1.ops, unpacked2.ops, |op1, op2| {
        let code2 = op2.as_ref().map(|op| op.opcode);
        if let (Some(a), Some(b)) = (op1.as_ref(), op2.as_ref()) {
            if a.opcode == OpCode::Insert && b.opcode == OpCode::Remove {
                bank1.skip(a.chars.min(b.chars))?;
            }
        }
        let out = slice_attribution(op1, op2, pool)?;
        if let Some(out) = out.as_ref().filter(|op| op.opcode == OpCode::Insert) {
            let text = if code2 == Some(OpCode::Insert) {
                bank2.take(out.chars)?
            } else {
                bank1.take(out.chars)?
            };
            bank.push_str(text);
        }
        Ok(out)
    })?;

    trace!(
        old_len = unpacked1.old_len,
        new_len = unpacked2.new_len,
        "composed changesets"
    );
    Ok(pack(unpacked1.old_len, unpacked2.new_len, &ops, &bank))
}
