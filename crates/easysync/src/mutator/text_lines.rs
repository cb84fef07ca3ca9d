//! In-place editing of a document stored as lines.
//!
//! Edits are accumulated into one pending splice (a start line, a count of
//! original lines to delete and the replacement lines). When the cursor
//! leaves the edited region the splice is queued, and the queue is written
//! to the underlying vector only by [`TextLinesMutator::close`]. A mutator
//! dropped without `close` leaves the lines untouched, so only the lines an
//! edit touches are ever copied and a failed edit changes nothing.

use crate::error::PreconditionError;
use crate::string_iter::{split_at_unit, utf16_len};

#[derive(Debug, Default)]
struct Splice {
    start: usize,
    delete: usize,
    lines: Vec<String>,
}

/// Cursor over `lines` (each line keeps its trailing newline).
///
/// `cur_line` and `cur_col` refer to the document as it would look with the
/// queued splices and the pending one applied. While a splice is open the
/// current line is either the last replacement line or the first original
/// line after the deleted range.
#[derive(Debug)]
pub struct TextLinesMutator<'a> {
    lines: &'a mut Vec<String>,
    splice: Splice,
    in_splice: bool,
    /// Finished splices, in cursor order, waiting for `close`.
    queued: Vec<Splice>,
    /// Replacement lines added and original lines deleted by `queued`.
    queued_added: usize,
    queued_deleted: usize,
    cur_line: usize,
    cur_col: usize,
}

impl<'a> TextLinesMutator<'a> {
    pub fn new(lines: &'a mut Vec<String>) -> Self {
        Self {
            lines,
            splice: Splice::default(),
            in_splice: false,
            queued: Vec::new(),
            queued_added: 0,
            queued_deleted: 0,
            cur_line: 0,
            cur_col: 0,
        }
    }

    /// Current cursor position as `(line, column)`.
    pub fn position(&self) -> (usize, usize) {
        (self.cur_line, self.cur_col)
    }

    /// Index in the untouched lines of line `idx` of the edited document.
    /// Only valid past the queued splices.
    fn original_index(&self, idx: usize) -> usize {
        idx + self.queued_deleted - self.queued_added
    }

    fn original_line(&self, idx: usize) -> Result<&str, PreconditionError> {
        let orig = self.original_index(idx);
        self.lines
            .get(orig)
            .map(String::as_str)
            .ok_or(PreconditionError::LineOutOfRange {
                line: orig,
                len: self.lines.len(),
            })
    }

    /// Text of the next `k` original lines after the deleted range.
    fn next_k_lines_text(&self, k: usize) -> Result<String, PreconditionError> {
        let m = self.original_index(self.splice.start + self.splice.delete);
        let end = m + k;
        if end > self.lines.len() {
            return Err(PreconditionError::LineOutOfRange {
                line: end - 1,
                len: self.lines.len(),
            });
        }
        Ok(self.lines[m..end].concat())
    }

    fn enter_splice(&mut self) -> Result<(), PreconditionError> {
        self.splice.start = self.cur_line;
        self.splice.delete = 0;
        self.splice.lines.clear();
        if self.cur_col > 0 {
            self.put_cur_line_in_splice()?;
        }
        self.in_splice = true;
        Ok(())
    }

    fn leave_splice(&mut self) {
        let splice = std::mem::take(&mut self.splice);
        self.queued_added += splice.lines.len();
        self.queued_deleted += splice.delete;
        self.queued.push(splice);
        self.in_splice = false;
    }

    fn is_cur_line_in_splice(&self) -> bool {
        self.cur_line
            .checked_sub(self.splice.start)
            .is_some_and(|i| i < self.splice.lines.len())
    }

    /// Makes sure the current line is among the replacement lines, pulling
    /// it out of the original document if needed. Returns its index in the
    /// replacement lines. Right after the last line an empty line is
    /// opened, for text that follows the final newline.
    fn put_cur_line_in_splice(&mut self) -> Result<usize, PreconditionError> {
        if !self.is_cur_line_in_splice() {
            let idx = self.splice.start + self.splice.delete;
            if self.original_index(idx) == self.lines.len() {
                self.splice.lines.push(String::new());
            } else {
                let line = self.original_line(idx)?.to_string();
                self.splice.lines.push(line);
                self.splice.delete += 1;
            }
        }
        Ok(self.cur_line - self.splice.start)
    }

    /// Moves past `l` whole lines. With `include_in_splice` the lines are
    /// copied into the pending splice (they are about to get new
    /// attributes); otherwise the splice is closed first when that is
    /// cheaper than carrying it along.
    pub fn skip_lines(&mut self, l: usize, include_in_splice: bool) -> Result<(), PreconditionError> {
        if l == 0 {
            return Ok(());
        }
        if include_in_splice {
            if !self.in_splice {
                self.enter_splice()?;
            }
            for _ in 0..l {
                self.cur_col = 0;
                self.put_cur_line_in_splice()?;
                self.cur_line += 1;
            }
        } else {
            if self.in_splice {
                if l > 1 {
                    self.leave_splice();
                } else {
                    self.put_cur_line_in_splice()?;
                }
            }
            self.cur_line += l;
            self.cur_col = 0;
        }
        Ok(())
    }

    /// Moves past `n` chars spanning `l` newlines.
    pub fn skip(&mut self, n: usize, l: usize, include_in_splice: bool) -> Result<(), PreconditionError> {
        if n == 0 {
            return Ok(());
        }
        if l > 0 {
            return self.skip_lines(l, include_in_splice);
        }
        if include_in_splice && !self.in_splice {
            self.enter_splice()?;
        }
        if self.in_splice {
            self.put_cur_line_in_splice()?;
        }
        self.cur_col += n;
        Ok(())
    }

    /// Removes `l` whole lines starting at the cursor and returns their text.
    pub fn remove_lines(&mut self, l: usize) -> Result<String, PreconditionError> {
        if l == 0 {
            return Ok(String::new());
        }
        if !self.in_splice {
            self.enter_splice()?;
        }
        let removed = if self.is_cur_line_in_splice() {
            if self.cur_col == 0 {
                let mut removed = self.splice.lines.pop().unwrap_or_default();
                removed.push_str(&self.next_k_lines_text(l - 1)?);
                self.splice.delete += l - 1;
                removed
            } else {
                let tail = self.next_k_lines_text(l - 1)?;
                self.splice.delete += l - 1;
                let joined_idx = self.splice.start + self.splice.delete;
                let joined = self.original_line(joined_idx)?.to_string();
                let sline = self.splice.lines.len() - 1;
                let (keep, cut) = split_at_unit(&self.splice.lines[sline], self.cur_col)?;
                let removed = format!("{cut}{tail}");
                let updated = format!("{keep}{joined}");
                self.splice.lines[sline] = updated;
                self.splice.delete += 1;
                removed
            }
        } else {
            let removed = self.next_k_lines_text(l)?;
            self.splice.delete += l;
            removed
        };
        Ok(removed)
    }

    /// Removes `n` chars spanning `l` newlines and returns them.
    pub fn remove(&mut self, n: usize, l: usize) -> Result<String, PreconditionError> {
        if n == 0 {
            return Ok(String::new());
        }
        if l > 0 {
            return self.remove_lines(l);
        }
        if !self.in_splice {
            self.enter_splice()?;
        }
        let sline = self.put_cur_line_in_splice()?;
        let line = &self.splice.lines[sline];
        let (head, rest) = split_at_unit(line, self.cur_col)?;
        let (cut, tail) = split_at_unit(rest, n).map_err(|e| match e {
            PreconditionError::NotEnoughChars { .. } => PreconditionError::RemovePastLineEnd {
                col: self.cur_col,
                chars: n,
            },
            other => other,
        })?;
        let removed = cut.to_string();
        let updated = format!("{head}{tail}");
        self.splice.lines[sline] = updated;
        Ok(removed)
    }

    /// Inserts `text` containing `l` newlines at the cursor.
    pub fn insert(&mut self, text: &str, l: usize) -> Result<(), PreconditionError> {
        if text.is_empty() {
            return Ok(());
        }
        if !self.in_splice {
            self.enter_splice()?;
        }
        if l > 0 {
            let mut new_lines = crate::attribution::split_text_lines(text).into_iter();
            if self.is_cur_line_in_splice() {
                let sline = self.splice.lines.len() - 1;
                let the_line = std::mem::take(&mut self.splice.lines[sline]);
                let (head, tail) = split_at_unit(&the_line, self.cur_col)?;
                let first = new_lines.next().unwrap_or_default();
                self.splice.lines[sline] = format!("{head}{first}");
                self.cur_line += 1;
                for line in new_lines {
                    self.splice.lines.push(line.to_string());
                    self.cur_line += 1;
                }
                self.splice.lines.push(tail.to_string());
                self.cur_col = 0;
            } else {
                for line in new_lines {
                    self.splice.lines.push(line.to_string());
                    self.cur_line += 1;
                }
            }
        } else {
            let sline = self.put_cur_line_in_splice()?;
            let line = &self.splice.lines[sline];
            let (head, tail) = split_at_unit(line, self.cur_col)?;
            let updated = format!("{head}{text}{tail}");
            self.splice.lines[sline] = updated;
            self.cur_col += utf16_len(text);
        }
        Ok(())
    }

    /// Whether any line remains at or after the cursor.
    pub fn has_more(&self) -> bool {
        let mut doc_lines =
            self.lines.len() as isize + self.queued_added as isize - self.queued_deleted as isize;
        if self.in_splice {
            doc_lines += self.splice.lines.len() as isize - self.splice.delete as isize;
        }
        (self.cur_line as isize) < doc_lines
    }

    /// Writes every queued splice, and the pending one, to the lines.
    pub fn close(mut self) {
        if self.in_splice {
            self.leave_splice();
        }
        for Splice {
            start,
            delete,
            lines,
        } in std::mem::take(&mut self.queued)
        {
            self.lines.splice(start..start + delete, lines);
        }
    }
}
