//! Rewriting the attribute numbers of changesets and attribution strings.
//!
//! Every function here accepts either a packed changeset (`Z:...$bank`) or
//! a bare op string such as an attribution line. The header and the char
//! bank pass through untouched.

use std::collections::BTreeSet;

use crate::assembler::OpAssembler;
use crate::attribs::Attribs;
use crate::attribute_pool::AttributePool;
use crate::changeset::{pack, unpack};
use crate::error::Result;
use crate::op::deserialize_ops;

fn rewrite_ops<F>(ops: &str, remap: &mut F) -> Result<String>
where
    F: FnMut(&Attribs) -> Attribs,
{
    let mut assem = OpAssembler::new();
    for op in deserialize_ops(ops) {
        let mut op = op?;
        op.attribs = remap(&op.attribs);
        assem.append(&op);
    }
    Ok(assem.serialize())
}

fn rewrite_attribs<F>(cs_or_ops: &str, mut remap: F) -> Result<String>
where
    F: FnMut(&Attribs) -> Attribs,
{
    if cs_or_ops.starts_with("Z:") {
        let unpacked = unpack(cs_or_ops)?;
        let ops = rewrite_ops(unpacked.ops, &mut remap)?;
        Ok(pack(
            unpacked.old_len,
            unpacked.new_len,
            &ops,
            unpacked.char_bank,
        ))
    } else {
        rewrite_ops(cs_or_ops, &mut remap)
    }
}

/// Renumbers the attributes of `cs_or_ops` from `from` into `to`, interning
/// every pair it meets. Numbers `from` does not know are dropped, and each
/// op's numbers come out ascending.
pub fn move_ops_to_new_pool(
    cs_or_ops: &str,
    from: &AttributePool,
    to: &mut AttributePool,
) -> Result<String> {
    rewrite_attribs(cs_or_ops, |attribs| {
        Attribs::sorted(
            attribs
                .iter()
                .filter_map(|n| from.get_attrib(n))
                .map(|(k, v)| to.put_attrib(k, v)),
        )
    })
}

/// `cs` renumbered into a fresh pool holding only the attributes it uses,
/// ready to send alongside it.
pub fn prepare_for_wire(cs: &str, pool: &AttributePool) -> Result<(String, AttributePool)> {
    let mut wire_pool = AttributePool::new();
    let translated = move_ops_to_new_pool(cs, pool, &mut wire_pool)?;
    Ok((translated, wire_pool))
}

/// Replaces every attribute number `n` by `f(n)`, dropping it on `None`.
/// The order within each op is preserved.
pub fn map_attrib_numbers<F>(cs_or_ops: &str, mut f: F) -> Result<String>
where
    F: FnMut(u32) -> Option<u32>,
{
    rewrite_attribs(cs_or_ops, |attribs| attribs.iter().filter_map(&mut f).collect())
}

/// Keeps only the attribute numbers for which `pred` holds.
pub fn filter_attrib_numbers<P>(cs_or_ops: &str, mut pred: P) -> Result<String>
where
    P: FnMut(u32) -> bool,
{
    map_attrib_numbers(cs_or_ops, |n| pred(n).then_some(n))
}

/// Distinct attribute numbers used anywhere in `cs_or_ops`, ascending.
pub fn attrib_numbers(cs_or_ops: &str) -> Result<Vec<u32>> {
    let ops = if cs_or_ops.starts_with("Z:") {
        unpack(cs_or_ops)?.ops
    } else {
        cs_or_ops
    };
    let mut seen = BTreeSet::new();
    for op in deserialize_ops(ops) {
        seen.extend(op?.attribs.iter());
    }
    Ok(seen.into_iter().collect())
}

/// Predicate telling whether an attribute list carries `key=value`. An
/// attribute the pool has never seen matches nothing.
pub fn attribute_tester(key: &str, value: &str, pool: &AttributePool) -> impl Fn(&Attribs) -> bool {
    let num = pool.attrib_num(key, value);
    move |attribs: &Attribs| num.is_some_and(|n| attribs.contains(n))
}
