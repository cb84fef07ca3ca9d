//! Op assemblers.
//!
//! Three layers, each built on the previous one:
//!
//! - [`OpAssembler`] concatenates ops verbatim.
//! - [`MergingOpAssembler`] merges adjacent ops with the same opcode and
//!   attributes.
//! - [`SmartOpAssembler`] additionally puts every remove of a run before
//!   its inserts and drops a trailing attribute-less keep, which yields the
//!   canonical form of a changeset.

use std::fmt::Write as _;

use crate::attribs::Attribs;
use crate::op::{ops_from_text, Op, OpCode};

#[derive(Debug, Clone, Default)]
pub struct OpAssembler {
    serialized: String,
}

impl OpAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, op: &Op) {
        // Writing into a String cannot fail.
        let _ = write!(self.serialized, "{op}");
    }

    pub fn clear(&mut self) {
        self.serialized.clear();
    }

    pub fn serialize(&mut self) -> String {
        self.serialized.clone()
    }

    pub fn as_str(&self) -> &str {
        &self.serialized
    }
}

/// Merges runs of ops that share opcode and attributes.
///
/// Once the buffered op spans a newline, single-line ops of the same kind
/// are held back in `chars_after_newline`: they either fold into the next
/// multi-line op or are emitted as a separate inline op, so that a merged op
/// always ends on a line boundary.
#[derive(Debug, Clone, Default)]
pub struct MergingOpAssembler {
    assem: OpAssembler,
    buf: Option<Op>,
    chars_after_newline: usize,
}

impl MergingOpAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, op: &Op) {
        if op.chars == 0 {
            return;
        }
        if let Some(buf) = self.buf.as_mut() {
            if buf.opcode == op.opcode && buf.attribs == op.attribs {
                if op.lines > 0 {
                    buf.chars += self.chars_after_newline + op.chars;
                    buf.lines += op.lines;
                    self.chars_after_newline = 0;
                } else if buf.lines == 0 {
                    buf.chars += op.chars;
                } else {
                    self.chars_after_newline += op.chars;
                }
                return;
            }
        }
        self.flush(false);
        self.buf = Some(op.clone());
    }

    fn flush(&mut self, is_end_document: bool) {
        let Some(mut buf) = self.buf.take() else {
            return;
        };
        let pending = std::mem::take(&mut self.chars_after_newline);
        if is_end_document && buf.opcode == OpCode::Keep && buf.attribs.is_empty() {
            // A final pure keep is implied.
            return;
        }
        self.assem.append(&buf);
        if pending > 0 {
            buf.chars = pending;
            buf.lines = 0;
            self.assem.append(&buf);
        }
    }

    pub fn end_document(&mut self) {
        self.flush(true);
    }

    pub fn serialize(&mut self) -> String {
        self.flush(false);
        self.assem.serialize()
    }

    pub fn clear(&mut self) {
        self.assem.clear();
        self.buf = None;
        self.chars_after_newline = 0;
    }
}

/// Produces canonical op strings.
#[derive(Debug, Clone, Default)]
pub struct SmartOpAssembler {
    minus: MergingOpAssembler,
    plus: MergingOpAssembler,
    keep: MergingOpAssembler,
    assem: String,
    last_opcode: Option<OpCode>,
    length_change: isize,
}

impl SmartOpAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    fn flush_keeps(&mut self) {
        self.assem.push_str(&self.keep.serialize());
        self.keep.clear();
    }

    fn flush_plus_minus(&mut self) {
        self.assem.push_str(&self.minus.serialize());
        self.minus.clear();
        self.assem.push_str(&self.plus.serialize());
        self.plus.clear();
    }

    pub fn append(&mut self, op: &Op) {
        if op.chars == 0 {
            return;
        }
        match op.opcode {
            OpCode::Remove => {
                if self.last_opcode == Some(OpCode::Keep) {
                    self.flush_keeps();
                }
                self.minus.append(op);
                self.length_change -= op.chars as isize;
            }
            OpCode::Insert => {
                if self.last_opcode == Some(OpCode::Keep) {
                    self.flush_keeps();
                }
                self.plus.append(op);
                self.length_change += op.chars as isize;
            }
            OpCode::Keep => {
                if self.last_opcode != Some(OpCode::Keep) {
                    self.flush_plus_minus();
                }
                self.keep.append(op);
            }
        }
        self.last_opcode = Some(op.opcode);
    }

    /// Appends the ops covering `text` (see [`ops_from_text`]).
    pub fn append_op_with_text(&mut self, opcode: OpCode, text: &str, attribs: &Attribs) {
        for op in ops_from_text(opcode, text, attribs) {
            self.append(&op);
        }
    }

    pub fn serialize(&mut self) -> String {
        self.flush_plus_minus();
        self.flush_keeps();
        self.assem.clone()
    }

    pub fn clear(&mut self) {
        self.minus.clear();
        self.plus.clear();
        self.keep.clear();
        self.assem.clear();
        self.last_opcode = None;
        self.length_change = 0;
    }

    pub fn end_document(&mut self) {
        self.keep.end_document();
    }

    /// Net change in document length of everything appended so far.
    pub fn length_change(&self) -> isize {
        self.length_change
    }
}
