//! Easysync changesets for collaborative plain text.
//!
//! A changeset describes one edit of a document as a packed string such as
//! `Z:5>3=2*0+3$abc`: the old length, the length change, a run of ops and a
//! char bank holding the inserted text. This crate parses, validates and
//! applies them, and provides the operational-transformation algebra
//! (compose, follow, inverse) that keeps concurrent editors in sync.
//!
//! ```
//! use easysync::{apply_to_text, compose, AttributePool};
//!
//! let mut pool = AttributePool::new();
//! let a = "Z:5>1=2+1$x";
//! let b = "Z:6<1-1$";
//! let ab = compose(a, b, &mut pool).unwrap();
//! assert_eq!(apply_to_text(&ab, "hello").unwrap(), "exllo");
//! ```

pub mod assembler;
pub mod attribs;
pub mod attribute_pool;
pub mod attribution;
pub mod base36;
pub mod changeset;
pub mod check;
pub mod config;
pub mod error;
pub mod mutator;
pub mod op;
pub mod string_iter;
pub mod transform;

pub use assembler::{MergingOpAssembler, OpAssembler, SmartOpAssembler};
pub use attribs::{AttributeMap, Attribs};
pub use attribute_pool::{Attribute, AttributePool, PoolError};
pub use attribution::{
    apply_to_atext, join_attribution_lines, make_atext, make_attribution, ops_from_atext,
    split_attribution_lines, split_text_lines, subattribution, AText,
};
pub use changeset::{
    identity, is_identity, make_splice, new_len, old_len, pack, unpack, Builder, Changeset,
};
pub use check::{check_rep, validate, validate_with};
pub use config::ValidationConfig;
pub use error::{Error, FormatError, InvalidChangeset, ParseError, PreconditionError, Result};
pub use mutator::{
    apply_to_attribution, apply_to_text, mutate_attribution_lines, mutate_text_lines,
    TextLinesMutator,
};
pub use op::{deserialize_ops, ops_from_text, Op, OpCode, OpIter};
pub use string_iter::StringIter;
pub use transform::{
    attrib_numbers, attribute_tester, character_range_follow, compose, compose_attributes,
    filter_attrib_numbers, follow, follow_attributes, inverse, map_attrib_numbers,
    move_ops_to_new_pool, prepare_for_wire, to_splices, Splice,
};
