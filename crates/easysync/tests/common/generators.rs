use easysync::{check_rep, pack, Attribs, AttributePool, Op, OpCode, SmartOpAssembler};

use super::Fuzzer;

/// Pool the two-property attribute generator assumes:
/// `apple=''`, `apple=true`, `banana=''`, `banana=true`.
pub fn two_prop_pool() -> AttributePool {
    AttributePool::from_pairs([
        ("apple", ""),
        ("apple", "true"),
        ("banana", ""),
        ("banana", "true"),
    ])
}

pub fn random_inline_string(f: &Fuzzer, len: usize) -> String {
    (0..len).map(|_| (b'a' + f.below(26) as u8) as char).collect()
}

pub fn random_multiline(f: &Fuzzer, approx_max_lines: usize, approx_max_cols: usize) -> String {
    let num_parts = f.below(approx_max_lines * 2) + 1;
    let mut txt = String::new();
    if f.below(2) == 1 {
        txt.push('\n');
    }
    for i in 0..num_parts {
        if i % 2 == 0 && f.below(10) != 0 {
            txt.push_str(&random_inline_string(f, f.below(approx_max_cols) + 1));
        } else {
            txt.push('\n');
        }
    }
    txt
}

fn random_two_prop_attribs(f: &Fuzzer, opcode: OpCode) -> Attribs {
    if opcode == OpCode::Remove || f.below(3) != 0 {
        Attribs::new()
    } else if f.below(3) != 0 {
        if opcode == OpCode::Insert || f.below(2) == 1 {
            Attribs::sorted([f.below(2) as u32 * 2 + 1])
        } else {
            Attribs::sorted([f.below(2) as u32 * 2])
        }
    } else if opcode == OpCode::Insert || f.below(4) == 0 {
        Attribs::sorted([1, 3])
    } else {
        f.pick(&[[0, 2], [0, 3], [1, 2]]).iter().copied().collect()
    }
}

enum StringOp {
    Insert(String),
    Remove(usize),
    Skip(usize),
}

fn random_string_operation(f: &Fuzzer, num_chars_left: usize) -> StringOp {
    let some_of = |n: usize| (n as f64 * f.random() * f.random()).round() as usize;
    let op = match f.below(11) {
        0 => StringOp::Insert(random_inline_string(f, 1)),
        1 => StringOp::Remove(1),
        2 => StringOp::Skip(1),
        3 => StringOp::Insert(random_inline_string(f, f.below(4) + 1)),
        4 => StringOp::Remove(f.below(4) + 1),
        5 => StringOp::Skip(f.below(4) + 1),
        6 => StringOp::Insert(random_multiline(f, 5, 20)),
        7 => StringOp::Remove(some_of(num_chars_left)),
        8 => StringOp::Skip(some_of(num_chars_left)),
        9 => StringOp::Remove(num_chars_left),
        _ => StringOp::Skip(num_chars_left),
    };
    // the final newline always survives
    let max_orig = num_chars_left.saturating_sub(1);
    match op {
        StringOp::Remove(n) => StringOp::Remove(n.min(max_orig)),
        StringOp::Skip(n) => StringOp::Skip(n.min(max_orig)),
        insert => insert,
    }
}

fn append_multiline_op(assem: &mut SmartOpAssembler, opcode: OpCode, txt: &str, attribs: &Attribs) {
    let mut rest = txt;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('\n') {
            assem.append(&Op::new(opcode, 1, 1, attribs.clone()));
            rest = after;
        } else {
            let end = rest.find('\n').unwrap_or(rest.len());
            assem.append(&Op::new(opcode, rest[..end].chars().count(), 0, attribs.clone()));
            rest = &rest[end..];
        }
    }
}

/// Random canonical changeset over `orig` (which must end in a newline),
/// returned with the text it produces. With `with_attribs`, ops carry
/// attributes from [`two_prop_pool`].
pub fn random_test_changeset(f: &Fuzzer, orig: &str, with_attribs: bool) -> (String, String) {
    let mut bank = String::new();
    let mut text_left = orig;
    let mut out_text = String::new();
    let mut assem = SmartOpAssembler::new();

    let attribs_for = |opcode: OpCode| {
        if with_attribs {
            random_two_prop_attribs(f, opcode)
        } else {
            Attribs::new()
        }
    };

    let mut do_op = |text_left: &mut &str| match random_string_operation(f, text_left.len()) {
        StringOp::Insert(txt) => {
            bank.push_str(&txt);
            out_text.push_str(&txt);
            append_multiline_op(&mut assem, OpCode::Insert, &txt, &attribs_for(OpCode::Insert));
        }
        StringOp::Skip(n) if n > 0 => {
            let (txt, rest) = (*text_left).split_at(n);
            out_text.push_str(txt);
            append_multiline_op(&mut assem, OpCode::Keep, txt, &attribs_for(OpCode::Keep));
            *text_left = rest;
        }
        StringOp::Remove(n) if n > 0 => {
            let (txt, rest) = (*text_left).split_at(n);
            append_multiline_op(&mut assem, OpCode::Remove, txt, &attribs_for(OpCode::Remove));
            *text_left = rest;
        }
        _ => {}
    };

    while text_left.len() > 1 {
        do_op(&mut text_left);
    }
    // only inserts can happen now
    for _ in 0..5 {
        do_op(&mut text_left);
    }

    out_text.push('\n');
    assem.end_document();
    let cs = pack(
        orig.chars().count(),
        out_text.chars().count(),
        &assem.serialize(),
        &bank,
    );
    check_rep(&cs).expect("generated changeset must be valid");
    (cs, out_text)
}
