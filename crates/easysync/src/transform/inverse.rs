//! Undo changesets.

use std::collections::{HashMap, VecDeque};

use tracing::trace;

use crate::attribs::{AttributeMap, Attribs};
use crate::attribute_pool::AttributePool;
use crate::changeset::{unpack, Builder};
use crate::check::check_rep;
use crate::error::{PreconditionError, Result};
use crate::op::{deserialize_ops, OpCode};
use crate::string_iter::{split_at_unit, unit_offset, utf16_len};

/// A run of one attribution line: `chars` left, whether it ends the line.
#[derive(Debug, Clone, Default)]
struct Run {
    chars: usize,
    lines: usize,
    attribs: Attribs,
}

#[derive(Debug, Clone)]
struct AttribRun {
    len: usize,
    attribs: Attribs,
}

/// Cursor over the pre-edit document as `(line, char)` that reads its text
/// and attribution lines.
struct DocCursor<'d, S> {
    lines: &'d [S],
    alines: &'d [S],
    cur_line: usize,
    cur_char: usize,
    /// Line whose ops are loaded into `line_ops`, if any.
    ops_line: Option<usize>,
    line_ops: VecDeque<Run>,
    next_run: Run,
}

impl<'d, S: AsRef<str>> DocCursor<'d, S> {
    fn aline(&self, idx: usize) -> Result<&'d str> {
        self.alines.get(idx).map(AsRef::as_ref).ok_or_else(|| {
            PreconditionError::LineOutOfRange {
                line: idx,
                len: self.alines.len(),
            }
            .into()
        })
    }

    fn line(&self, idx: usize) -> Result<&'d str> {
        self.lines.get(idx).map(AsRef::as_ref).ok_or_else(|| {
            PreconditionError::LineOutOfRange {
                line: idx,
                len: self.lines.len(),
            }
            .into()
        })
    }

    fn load_line(&mut self, idx: usize) -> Result<()> {
        let aline = self.aline(idx)?;
        self.line_ops = deserialize_ops(aline)
            .map(|op| {
                op.map(|op| Run {
                    chars: op.chars,
                    lines: op.lines,
                    attribs: op.attribs,
                })
            })
            .collect::<Result<_, _>>()?;
        self.ops_line = Some(idx);
        Ok(())
    }

    /// Consumes `num_chars` chars at the cursor and returns them split into
    /// runs of uniform attributes, each flagged if it ends a line.
    fn consume_attrib_runs(&mut self, mut num_chars: usize) -> Result<Vec<(AttribRun, bool)>> {
        if self.ops_line != Some(self.cur_line) {
            self.load_line(self.cur_line)?;
            let mut index_into_line = 0;
            while let Some(run) = self.line_ops.pop_front() {
                self.next_run = run;
                if index_into_line + self.next_run.chars >= self.cur_char {
                    self.next_run.chars -= self.cur_char - index_into_line;
                    break;
                }
                index_into_line += self.next_run.chars;
            }
        }

        let mut runs = Vec::new();
        while num_chars > 0 {
            if self.next_run.chars == 0 && self.line_ops.is_empty() {
                self.cur_line += 1;
                self.cur_char = 0;
                self.load_line(self.cur_line)?;
            }
            if self.next_run.chars == 0 {
                self.next_run = self.line_ops.pop_front().unwrap_or_default();
            }
            let chars_to_use = num_chars.min(self.next_run.chars);
            let ends_line = chars_to_use == self.next_run.chars && self.next_run.lines > 0;
            runs.push((
                AttribRun {
                    len: chars_to_use,
                    attribs: self.next_run.attribs.clone(),
                },
                ends_line,
            ));
            num_chars -= chars_to_use;
            self.next_run.chars -= chars_to_use;
            self.cur_char += chars_to_use;
        }

        if self.next_run.chars == 0 && self.line_ops.is_empty() {
            self.cur_line += 1;
            self.cur_char = 0;
        }
        Ok(runs)
    }

    fn skip(&mut self, n: usize, l: usize) -> Result<()> {
        if l > 0 {
            self.cur_line += l;
            self.cur_char = 0;
        } else if self.ops_line == Some(self.cur_line) {
            self.consume_attrib_runs(n)?;
        } else {
            self.cur_char += n;
        }
        Ok(())
    }

    /// The next `num_chars` chars of text at the cursor, without moving it.
    fn next_text(&self, num_chars: usize) -> Result<String> {
        let first = self.line(self.cur_line)?;
        let start = unit_offset(first, self.cur_char)?;
        let mut text = first[start..].to_string();
        let mut len = utf16_len(&text);
        let mut line_num = self.cur_line + 1;
        while len < num_chars {
            let next = self.line(line_num)?;
            len += utf16_len(next);
            text.push_str(next);
            line_num += 1;
        }
        let end = unit_offset(&text, num_chars)?;
        text.truncate(end);
        Ok(text)
    }
}

/// Builds the changeset that undoes `cs`.
///
/// `lines` and `alines` are the text lines (with their newlines) and the
/// attribution lines of the document `cs` applies to. Applying `cs` and
/// then the inverse restores both the text and the attributes.
pub fn inverse<S: AsRef<str>>(
    cs: &str,
    lines: &[S],
    alines: &[S],
    pool: &mut AttributePool,
) -> Result<String> {
    let unpacked = unpack(cs)?;
    if lines.len() != alines.len() {
        return Err(PreconditionError::LineCountMismatch {
            lines: lines.len(),
            alines: alines.len(),
        }
        .into());
    }
    let actual: usize = lines.iter().map(|l| utf16_len(l.as_ref())).sum();
    if actual != unpacked.old_len {
        return Err(PreconditionError::TextLengthMismatch {
            expected: unpacked.old_len,
            actual,
        }
        .into());
    }

    let mut builder = Builder::new(unpacked.new_len);
    let mut cursor = DocCursor {
        lines,
        alines,
        cur_line: 0,
        cur_char: 0,
        ops_line: None,
        line_ops: VecDeque::new(),
        next_run: Run::default(),
    };

    for op in deserialize_ops(unpacked.ops) {
        let op = op?;
        match op.opcode {
            OpCode::Keep if !op.attribs.is_empty() => {
                let applied = AttributeMap::from_attribs(&op.attribs, pool)?;
                let mut undo_cache: HashMap<Attribs, Attribs> = HashMap::new();
                for (run, ends_line) in cursor.consume_attrib_runs(op.chars)? {
                    let undo = match undo_cache.get(&run.attribs) {
                        Some(undo) => undo.clone(),
                        None => {
                            let old = AttributeMap::from_attribs(&run.attribs, pool)?;
                            let mut back = AttributeMap::new();
                            for (key, value) in applied.iter() {
                                let old_value = old.get(key).unwrap_or("");
                                if old_value != value {
                                    back.set(key, old_value);
                                }
                            }
                            let undo = back.to_attribs(pool);
                            undo_cache.insert(run.attribs, undo.clone());
                            undo
                        }
                    };
                    builder.keep(run.len, usize::from(ends_line), &undo);
                }
            }
            OpCode::Keep => {
                cursor.skip(op.chars, op.lines)?;
                builder.keep(op.chars, op.lines, &Attribs::new());
            }
            OpCode::Insert => {
                builder.remove(op.chars, op.lines);
            }
            OpCode::Remove => {
                let text = cursor.next_text(op.chars)?;
                let mut rest = text.as_str();
                for (run, _) in cursor.consume_attrib_runs(op.chars)? {
                    let (run_text, tail) = split_at_unit(rest, run.len)?;
                    builder.insert(run_text, &run.attribs);
                    rest = tail;
                }
            }
        }
    }

    let inverted = builder.build()?;
    check_rep(&inverted)?;
    trace!(changeset = cs, inverse = %inverted, "inverted changeset");
    Ok(inverted)
}
