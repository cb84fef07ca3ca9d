//! Changeset validation.
//!
//! [`check_rep`] is the structural check every changeset from outside must
//! pass before it is applied, composed or transformed. [`validate`] adds the
//! checks that need the attribute pool.

use tracing::debug;

use crate::assembler::SmartOpAssembler;
use crate::attribute_pool::AttributePool;
use crate::changeset::{pack, unpack, Changeset};
use crate::config::ValidationConfig;
use crate::error::{Error, InvalidChangeset, PreconditionError, Result};
use crate::op::{deserialize_ops, Op, OpCode};
use crate::string_iter::{utf16_len, StringIter};

fn walk<'a>(
    cs: &'a str,
    canonical: bool,
    visit: &mut dyn FnMut(&Op) -> Result<()>,
) -> Result<Changeset<'a>> {
    let unpacked = unpack(cs)?;
    let Changeset {
        old_len,
        new_len,
        ops,
        char_bank,
    } = unpacked;

    let mut assem = SmartOpAssembler::new();
    let mut bank = StringIter::new(char_bank);
    let mut old_pos = 0usize;
    let mut calc_new_len = 0usize;

    for op in deserialize_ops(ops) {
        let op = op?;
        visit(&op)?;
        if op.lines > op.chars {
            return Err(InvalidChangeset::MoreLinesThanChars {
                chars: op.chars,
                lines: op.lines,
            }
            .into());
        }
        match op.opcode {
            OpCode::Keep | OpCode::Remove => {
                old_pos = old_pos.saturating_add(op.chars);
                if old_pos > old_len {
                    return Err(InvalidChangeset::OldLenExceeded {
                        pos: old_pos,
                        old_len,
                    }
                    .into());
                }
                if op.opcode == OpCode::Keep {
                    calc_new_len += op.chars;
                }
            }
            OpCode::Insert => {
                let remaining = bank.remaining();
                let text = bank.take(op.chars).map_err(|e| match e {
                    PreconditionError::NotEnoughChars { .. } => {
                        Error::from(InvalidChangeset::BankTooShort {
                            needed: op.chars,
                            remaining,
                        })
                    }
                    other => Error::from(other),
                })?;
                let newlines = text.matches('\n').count();
                if newlines != op.lines {
                    return Err(InvalidChangeset::NewlineCountMismatch {
                        expected: op.lines,
                        actual: newlines,
                    }
                    .into());
                }
                if op.lines > 0 && !text.ends_with('\n') {
                    return Err(InvalidChangeset::MissingTrailingNewline.into());
                }
                calc_new_len += op.chars;
                if calc_new_len > new_len {
                    return Err(InvalidChangeset::NewLenExceeded {
                        len: calc_new_len,
                        new_len,
                    }
                    .into());
                }
            }
        }
        assem.append(&op);
    }

    calc_new_len += old_len - old_pos;
    if calc_new_len != new_len {
        return Err(InvalidChangeset::LengthMismatch {
            claimed: new_len,
            actual: calc_new_len,
        }
        .into());
    }
    if bank.remaining() > 0 {
        return Err(InvalidChangeset::ExcessBank {
            excess: bank.remaining(),
        }
        .into());
    }

    if canonical {
        assem.end_document();
        let normalized = pack(old_len, calc_new_len, &assem.serialize(), char_bank);
        if normalized != cs {
            return Err(InvalidChangeset::NotCanonical {
                expected: normalized,
            }
            .into());
        }
    }
    Ok(unpacked)
}

/// Structural checks without the canonical form requirement.
pub(crate) fn check_structure(cs: &str) -> Result<Changeset<'_>> {
    walk(cs, false, &mut |_| Ok(()))
}

fn rejected(cs: &str, err: Error) -> Error {
    debug!(changeset = cs, error = %err, "rejected changeset");
    err
}

/// Checks that `cs` is well formed and canonical, returning it unchanged.
pub fn check_rep(cs: &str) -> Result<&str> {
    walk(cs, true, &mut |_| Ok(()))
        .map(|_| cs)
        .map_err(|e| rejected(cs, e))
}

/// [`check_rep`] plus: every attribute number exists in `pool` and each op
/// lists its attribute numbers in strictly ascending order.
pub fn validate<'a>(cs: &'a str, pool: &AttributePool) -> Result<&'a str> {
    validate_with(cs, pool, &ValidationConfig::default())
}

pub fn validate_with<'a>(
    cs: &'a str,
    pool: &AttributePool,
    config: &ValidationConfig,
) -> Result<&'a str> {
    if let Some(max) = config.max_changeset_len {
        if cs.len() > max {
            let err = InvalidChangeset::LimitExceeded(format!(
                "changeset is {} bytes, limit {max}",
                cs.len()
            ));
            return Err(rejected(cs, err.into()));
        }
    }

    let mut op_count = 0usize;
    let mut visit = |op: &Op| -> Result<()> {
        op_count += 1;
        if let Some(max) = config.max_ops {
            if op_count > max {
                return Err(InvalidChangeset::LimitExceeded(format!("more than {max} ops")).into());
            }
        }
        if let Some(max) = config.max_attribs_per_op {
            if op.attribs.len() > max {
                return Err(InvalidChangeset::LimitExceeded(format!(
                    "op {op} has more than {max} attributes"
                ))
                .into());
            }
        }
        if let Some(n) = op.attribs.iter().find(|&n| pool.get_attrib(n).is_none()) {
            return Err(InvalidChangeset::UnknownAttrib(n).into());
        }
        if !op.attribs.is_ascending() {
            return Err(InvalidChangeset::AttribsNotAscending(op.to_string()).into());
        }
        Ok(())
    };

    let unpacked =
        walk(cs, config.require_canonical, &mut visit).map_err(|e| rejected(cs, e))?;

    if let Some(max) = config.max_bank_len {
        let len = utf16_len(unpacked.char_bank);
        if len > max {
            let err = InvalidChangeset::LimitExceeded(format!(
                "char bank holds {len} chars, limit {max}"
            ));
            return Err(rejected(cs, err.into()));
        }
    }
    Ok(cs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FormatError, ParseError};

    fn invalid(cs: &str) -> InvalidChangeset {
        match check_rep(cs) {
            Err(Error::Invalid(e)) => e,
            other => panic!("expected InvalidChangeset for {cs}, got {other:?}"),
        }
    }

    #[test]
    fn accepts_canonical_changesets() {
        for cs in [
            "Z:0>0$",
            "Z:5>0$",
            "Z:4<1|1-2-1|1+1+1$\nc",
            "Z:z>9*0=1=4-3+9=1|1-4-4+1*0+a$123456789abcdefghijk",
            "Z:5>1|2=2+1$x",
        ] {
            assert_eq!(check_rep(cs).unwrap(), cs);
        }
    }

    #[test]
    fn rejects_structural_errors() {
        assert!(matches!(invalid("Z:3>0-4+4$abcd"), InvalidChangeset::OldLenExceeded { .. }));
        assert!(matches!(invalid("Z:3>1=3+4$abcd"), InvalidChangeset::NewLenExceeded { .. }));
        assert!(matches!(invalid("Z:3>2+1$a"), InvalidChangeset::LengthMismatch { .. }));
        assert!(matches!(invalid("Z:3>2+2$a"), InvalidChangeset::BankTooShort { .. }));
        assert!(matches!(invalid("Z:3>1+1$ab"), InvalidChangeset::ExcessBank { excess: 1 }));
        assert!(matches!(invalid("Z:0>2|1+2$ab"), InvalidChangeset::NewlineCountMismatch { .. }));
        assert!(matches!(invalid("Z:0>2|1+2$\na"), InvalidChangeset::MissingTrailingNewline));
        assert!(matches!(invalid("Z:3>0|4=3$"), InvalidChangeset::MoreLinesThanChars { .. }));
    }

    #[test]
    fn rejects_non_canonical_forms() {
        // inserts before removes
        assert!(matches!(invalid("Z:1>0+1-1$a"), InvalidChangeset::NotCanonical { .. }));
        // trailing pure keep
        assert!(matches!(invalid("Z:2>0=2$"), InvalidChangeset::NotCanonical { .. }));
        // zero-length run
        assert!(matches!(invalid("Z:2>1=0+1$a"), InvalidChangeset::NotCanonical { .. }));
        // unmerged run
        assert!(matches!(invalid("Z:0>2+1+1$ab"), InvalidChangeset::NotCanonical { .. }));
    }

    #[test]
    fn decode_errors_pass_through() {
        assert_eq!(check_rep("Z:1>0"), Err(Error::Format(FormatError::MissingBank)));
        assert!(matches!(
            check_rep("Z:1>1+A$a"),
            Err(Error::Parse(ParseError::InvalidOperation { .. }))
        ));
    }

    #[test]
    fn validate_checks_pool_and_order() {
        let pool = AttributePool::from_pairs([("bold", "true"), ("italic", "true")]);
        assert!(validate("Z:1>0*0*1=1$", &pool).is_ok());
        assert_eq!(
            validate("Z:1>0*2=1$", &pool),
            Err(Error::Invalid(InvalidChangeset::UnknownAttrib(2)))
        );
        assert!(matches!(
            validate("Z:1>0*1*0=1$", &pool),
            Err(Error::Invalid(InvalidChangeset::AttribsNotAscending(_)))
        ));
    }

    #[test]
    fn validate_applies_limits() {
        let pool = AttributePool::new();
        let cfg = ValidationConfig {
            max_bank_len: Some(2),
            ..ValidationConfig::default()
        };
        assert!(validate_with("Z:0>2+2$ab", &pool, &cfg).is_ok());
        assert!(matches!(
            validate_with("Z:0>3+3$abc", &pool, &cfg),
            Err(Error::Invalid(InvalidChangeset::LimitExceeded(_)))
        ));

        let cfg = ValidationConfig {
            max_ops: Some(1),
            ..ValidationConfig::default()
        };
        assert!(validate_with("Z:2>0-1+1$a", &pool, &cfg).is_err());

        let lenient = ValidationConfig {
            require_canonical: false,
            ..ValidationConfig::default()
        };
        assert!(validate_with("Z:2>0=2$", &pool, &lenient).is_ok());
    }
}
