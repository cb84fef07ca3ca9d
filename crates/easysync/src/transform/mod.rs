//! Algebra over changesets: composition, transformation, inversion and the
//! helpers that rewrite attribute numbers.

mod compose;
mod follow;
mod inverse;
mod pool_ops;
mod splices;
pub(crate) mod zip;

pub use compose::{compose, compose_attributes};
pub use follow::{follow, follow_attributes};
pub use inverse::inverse;
pub use pool_ops::{
    attrib_numbers, attribute_tester, filter_attrib_numbers, map_attrib_numbers,
    move_ops_to_new_pool, prepare_for_wire,
};
pub use splices::{character_range_follow, to_splices, Splice};
