mod common;

use common::lines;
use easysync::{
    apply_to_attribution, apply_to_text, check_rep, join_attribution_lines, mutate_attribution_lines,
    mutate_text_lines, pack, base36, AttributePool, Error, Op, PreconditionError, SmartOpAssembler,
    TextLinesMutator,
};

// ── Text line mutator ──────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Mutation {
    Skip(usize, usize, bool),
    Remove(usize, usize, &'static str),
    Insert(&'static str, usize),
}

use Mutation::{Insert, Remove, Skip};

fn apply_mutations(mu: &mut TextLinesMutator<'_>, muts: &[Mutation]) {
    for m in muts {
        match *m {
            Skip(n, l, include) => mu.skip(n, l, include).unwrap(),
            Remove(n, l, expected) => assert_eq!(mu.remove(n, l).unwrap(), expected),
            Insert(text, l) => mu.insert(text, l).unwrap(),
        }
    }
}

fn mutations_to_changeset(old_len: usize, muts: &[Mutation]) -> String {
    let mut assem = SmartOpAssembler::new();
    let mut bank = String::new();
    let mut old_pos = 0;
    let mut new_len = 0;
    for m in muts {
        match *m {
            Skip(n, l, _) => {
                assem.append(&Op::keep(n, l));
                old_pos += n;
                new_len += n;
            }
            Remove(n, l, _) => {
                assem.append(&Op::remove(n, l));
                old_pos += n;
            }
            Insert(text, l) => {
                let n = text.chars().count();
                bank.push_str(text);
                assem.append(&Op::insert(n, l));
                new_len += n;
            }
        }
    }
    new_len += old_len - old_pos;
    assem.end_document();
    pack(old_len, new_len, &assem.serialize(), &bank)
}

fn run_mutation_test(orig: &[&str], muts: &[Mutation], correct: &[&str]) {
    let mut doc = lines(orig);
    let mut mu = TextLinesMutator::new(&mut doc);
    apply_mutations(&mut mu, muts);
    mu.close();
    assert_eq!(doc, lines(correct), "raw mutations");

    let in_text = orig.concat();
    let cs = mutations_to_changeset(in_text.chars().count(), muts);
    let mut doc = lines(orig);
    mutate_text_lines(&cs, &mut doc).unwrap();
    assert_eq!(doc, lines(correct), "mutate_text_lines {cs}");

    assert_eq!(apply_to_text(&cs, &in_text).unwrap(), correct.concat(), "apply_to_text {cs}");
}

const FRUIT: [&str; 5] = ["apple\n", "banana\n", "cabbage\n", "duffle\n", "eggplant\n"];

#[test]
fn mutation_splits_and_joins_lines() {
    run_mutation_test(
        &FRUIT,
        &[
            Remove(1, 0, "a"),
            Insert("tu", 0),
            Remove(1, 0, "p"),
            Skip(4, 1, false),
            Skip(7, 1, false),
            Insert("cream\npie\n", 2),
            Skip(2, 0, false),
            Insert("bot", 0),
            Insert("\n", 1),
            Insert("bu", 0),
            Skip(3, 0, false),
            Remove(3, 1, "ge\n"),
            Remove(6, 0, "duffle"),
        ],
        &["tuple\n", "banana\n", "cream\n", "pie\n", "cabot\n", "bubba\n", "eggplant\n"],
    );
}

#[test]
fn mutation_with_multi_line_skip() {
    run_mutation_test(
        &FRUIT,
        &[
            Remove(1, 0, "a"),
            Remove(1, 0, "p"),
            Insert("tu", 0),
            Skip(11, 2, false),
            Insert("cream\npie\n", 2),
            Skip(2, 0, false),
            Insert("bot", 0),
            Insert("\n", 1),
            Insert("bu", 0),
            Skip(3, 0, false),
            Remove(3, 1, "ge\n"),
            Remove(6, 0, "duffle"),
        ],
        &["tuple\n", "banana\n", "cream\n", "pie\n", "cabot\n", "bubba\n", "eggplant\n"],
    );
}

#[test]
fn mutation_removes_whole_lines() {
    run_mutation_test(
        &FRUIT,
        &[
            Remove(6, 1, "apple\n"),
            Skip(15, 2, false),
            Skip(6, 0, false),
            Remove(1, 1, "\n"),
            Remove(8, 0, "eggplant"),
            Skip(1, 1, false),
        ],
        &["banana\n", "cabbage\n", "duffle\n"],
    );
}

#[test]
fn mutation_inserts_lines_mid_line() {
    run_mutation_test(
        &["15\n"],
        &[Skip(1, 0, false), Insert("\n2\n3\n4\n", 4), Skip(2, 1, false)],
        &["1\n", "2\n", "3\n", "4\n", "5\n"],
    );
}

#[test]
fn mutation_removes_lines_mid_line() {
    run_mutation_test(
        &["1\n", "2\n", "3\n", "4\n", "5\n"],
        &[Skip(1, 0, false), Remove(7, 4, "\n2\n3\n4\n"), Skip(2, 1, false)],
        &["15\n"],
    );
}

#[test]
fn mutation_removes_lines_after_inline_insert() {
    run_mutation_test(
        &["123\n", "abc\n", "def\n", "ghi\n", "xyz\n"],
        &[
            Insert("0", 0),
            Skip(4, 1, false),
            Skip(4, 1, false),
            Remove(8, 2, "def\nghi\n"),
            Skip(4, 1, false),
        ],
        &["0123\n", "abc\n", "xyz\n"],
    );
}

#[test]
fn mutation_with_skips_included_in_splice() {
    run_mutation_test(
        &FRUIT,
        &[
            Remove(6, 1, "apple\n"),
            Skip(15, 2, true),
            Skip(6, 0, true),
            Remove(1, 1, "\n"),
            Remove(8, 0, "eggplant"),
            Skip(1, 1, true),
        ],
        &["banana\n", "cabbage\n", "duffle\n"],
    );
}

#[test]
fn mutator_has_more() {
    let mut doc = lines(&["1\n", "2\n", "3\n", "4\n"]);

    let mut mu = TextLinesMutator::new(&mut doc);
    assert!(mu.has_more());
    mu.skip(8, 4, false).unwrap();
    assert!(!mu.has_more());
    mu.close();

    // still 1,2,3,4
    let mut mu = TextLinesMutator::new(&mut doc);
    assert!(mu.has_more());
    mu.remove(2, 1).unwrap();
    assert!(mu.has_more());
    mu.skip(2, 1, false).unwrap();
    assert!(mu.has_more());
    mu.skip(2, 1, false).unwrap();
    assert!(mu.has_more());
    mu.skip(2, 1, false).unwrap();
    assert!(!mu.has_more());
    mu.insert("5\n", 1).unwrap();
    assert!(!mu.has_more());
    mu.close();
    assert_eq!(doc, lines(&["2\n", "3\n", "4\n", "5\n"]));

    let mut mu = TextLinesMutator::new(&mut doc);
    assert!(mu.has_more());
    mu.remove(6, 3).unwrap();
    assert!(mu.has_more());
    mu.remove(2, 1).unwrap();
    assert!(!mu.has_more());
    mu.insert("hello\n", 1).unwrap();
    assert!(!mu.has_more());
    mu.close();
    assert_eq!(doc, lines(&["hello\n"]));
}

#[test]
fn mutate_text_lines_vectors() {
    let mut doc = lines(&["a\n", "b\n"]);
    mutate_text_lines("Z:4<1|1-2-1|1+1+1$\nc", &mut doc).unwrap();
    assert_eq!(doc, lines(&["\n", "c\n"]));

    let mut doc = lines(&["a\n", "b\n"]);
    mutate_text_lines("Z:4>0|1-2-1|2+3$\nc\n", &mut doc).unwrap();
    assert_eq!(doc, lines(&["\n", "c\n", "\n"]));
}

#[test]
fn mutate_keep_only_lines_leaves_text_alone() {
    let mut doc = lines(&["1\n", "2\n", "3\n", "4\n"]);
    mutate_text_lines("Z:8>0*0|1=2|2=2$", &mut doc).unwrap();
    assert_eq!(doc, lines(&["1\n", "2\n", "3\n", "4\n"]));
}

#[test]
fn mutate_text_lines_rejects_length_mismatch_untouched() {
    let mut doc = lines(&["ab\n"]);
    assert!(mutate_text_lines("Z:5>1+1$x", &mut doc).is_err());
    assert_eq!(doc, lines(&["ab\n"]));
}

#[test]
fn failed_mutation_leaves_every_line_untouched() {
    // the first line is edited before the removal runs off the end
    let mut doc = lines(&["ab\n", "cd\n"]);
    assert!(mutate_text_lines("Z:6<4-1|2=2-3$", &mut doc).is_err());
    assert_eq!(doc, lines(&["ab\n", "cd\n"]));
}

#[test]
fn insert_after_final_newline_opens_a_line() {
    let cs = "Z:3>1|1=3+1$x";
    assert_eq!(apply_to_text(cs, "ab\n").unwrap(), "ab\nx");
    let mut doc = lines(&["ab\n"]);
    mutate_text_lines(cs, &mut doc).unwrap();
    assert_eq!(doc, lines(&["ab\n", "x"]));
    assert_eq!(doc.concat(), "ab\nx");
}

#[test]
fn astral_chars_are_two_units_wide() {
    check_rep("Z:1>2+2$😀").unwrap();
    assert_eq!(apply_to_text("Z:1>2+2$😀", "a").unwrap(), "😀a");

    let mut doc = lines(&["😀x\n"]);
    mutate_text_lines("Z:4>1=2+1$y", &mut doc).unwrap();
    assert_eq!(doc, lines(&["😀yx\n"]));

    assert_eq!(
        apply_to_text("Z:3<1=1-1$", "😀b"),
        Err(Error::Precondition(PreconditionError::SplitsSurrogatePair { at: 1 }))
    );
    let mut doc = lines(&["😀b\n"]);
    assert!(mutate_text_lines("Z:4<1=1-1$", &mut doc).is_err());
    assert_eq!(doc, lines(&["😀b\n"]));
}

// ── Attribution line mutator ───────────────────────────────────────────────

fn pool_of(pairs: &[&str]) -> AttributePool {
    AttributePool::from_pairs(pairs.iter().map(|kv| kv.split_once(',').unwrap_or((*kv, ""))))
}

/// `char=newline`, then `char=<b36 i>` for 1..36, then `char=''`.
fn pool_with_chars() -> AttributePool {
    let mut pool = AttributePool::new();
    pool.put_attrib("char", "newline");
    for i in 1..36 {
        pool.put_attrib("char", &base36::encode(i));
    }
    pool.put_attrib("char", "");
    pool
}

/// Lines starting with `?` must never be parsed.
fn run_mutate_attribution_test(mut pool: AttributePool, cs: &str, alines: &[&str], correct: &[&str]) {
    check_rep(cs).unwrap();
    let mut out = lines(alines);
    mutate_attribution_lines(cs, &mut out, &mut pool).unwrap();
    assert_eq!(out, lines(correct), "mutate_attribution_lines {cs}");

    let strip = |v: &[&str]| -> Vec<String> { v.iter().map(|s| s.replace('?', "")).collect() };
    let in_merged = join_attribution_lines(&strip(alines)).unwrap();
    let correct_merged = join_attribution_lines(&strip(correct)).unwrap();
    assert_eq!(
        apply_to_attribution(cs, &in_merged, &mut pool).unwrap(),
        correct_merged,
        "apply_to_attribution {cs}"
    );
}

#[test]
fn attribution_bold_one_char() {
    run_mutate_attribution_test(
        pool_of(&["bold,true"]),
        "Z:c>0|1=4=1*0=1$",
        &["|1+4", "|1+4", "|1+4"],
        &["|1+4", "+1*0+1|1+2", "|1+4"],
    );
}

#[test]
fn attribution_bold_document() {
    run_mutate_attribution_test(
        pool_of(&["bold,true"]),
        "Z:c>0*0|3=c$",
        &["|1+4", "|1+4", "|1+4"],
        &["*0|1+4", "*0|1+4", "*0|1+4"],
    );
}

#[test]
fn attribution_clear_bold() {
    run_mutate_attribution_test(
        pool_of(&["bold,", "bold,true"]),
        "Z:c>0*0|3=c$",
        &["*1+1+1*1+1|1+1", "+1*1+1|1+2", "*1+1+1*1+1|1+1"],
        &["|1+4", "|1+4", "|1+4"],
    );
}

#[test]
fn attribution_untouched_lines_are_not_parsed() {
    run_mutate_attribution_test(
        pool_of(&["foo,bar", "line,1", "line,2", "line,3", "line,4", "line,5"]),
        "Z:5>1|2=2+1$x",
        &["?*1|1+1", "?*2|1+1", "*3|1+1", "?*4|1+1", "?*5|1+1"],
        &["?*1|1+1", "?*2|1+1", "+1*3|1+1", "?*4|1+1", "?*5|1+1"],
    );
}

#[test]
fn attribution_follows_line_splits_and_joins() {
    run_mutate_attribution_test(
        pool_with_chars(),
        "Z:11>7-2*t+1*u+1|2=b|2+a=2*b+1*o+1*t+1*0|1+1*b+1*u+1=3|1-3-6$tucream\npie\nbot\nbu",
        &[
            "*a+1*p+2*l+1*e+1*0|1+1",
            "*b+1*a+1*n+1*a+1*n+1*a+1*0|1+1",
            "*c+1*a+1*b+2*a+1*g+1*e+1*0|1+1",
            "*d+1*u+1*f+2*l+1*e+1*0|1+1",
            "*e+1*g+2*p+1*l+1*a+1*n+1*t+1*0|1+1",
        ],
        &[
            "*t+1*u+1*p+1*l+1*e+1*0|1+1",
            "*b+1*a+1*n+1*a+1*n+1*a+1*0|1+1",
            "|1+6",
            "|1+4",
            "*c+1*a+1*b+1*o+1*t+1*0|1+1",
            "*b+1*u+1*b+2*a+1*0|1+1",
            "*e+1*g+2*p+1*l+1*a+1*n+1*t+1*0|1+1",
        ],
    );
}

#[test]
fn attribution_removes_whole_lines() {
    run_mutate_attribution_test(
        pool_with_chars(),
        "Z:11<f|1-6|2=f=6|1-1-8$",
        &["*a|1+6", "*b|1+7", "*c|1+8", "*d|1+7", "*e|1+9"],
        &["*b|1+7", "*c|1+8", "*d+6*e|1+1"],
    );
}

#[test]
fn attribution_inserts_lines_mid_line() {
    run_mutate_attribution_test(
        pool_with_chars(),
        "Z:3>7=1|4+7$\n2\n3\n4\n",
        &["*1+1*5|1+2"],
        &["*1+1|1+1", "|1+2", "|1+2", "|1+2", "*5|1+2"],
    );
}

#[test]
fn attribution_removes_lines_mid_line() {
    run_mutate_attribution_test(
        pool_with_chars(),
        "Z:a<7=1|4-7$",
        &["*1|1+2", "*2|1+2", "*3|1+2", "*4|1+2", "*5|1+2"],
        &["*1+1*5|1+2"],
    );
}

#[test]
fn attribution_insert_and_clear_across_lines() {
    run_mutate_attribution_test(
        pool_with_chars(),
        "Z:k<7*0+1*10|2=8|2-8$0",
        &[
            "*1+1*2+1*3+1|1+1",
            "*a+1*b+1*c+1|1+1",
            "*d+1*e+1*f+1|1+1",
            "*g+1*h+1*i+1|1+1",
            "?*x+1*y+1*z+1|1+1",
        ],
        &["*0+1|1+4", "|1+4", "?*x+1*y+1*z+1|1+1"],
    );
}

#[test]
fn attribution_inline_inserts() {
    run_mutate_attribution_test(
        pool_with_chars(),
        "Z:6>4=1+1=1+1|1=1+1=1*0+1$abcd",
        &["|1+3", "|1+3"],
        &["|1+5", "+2*0+1|1+2"],
    );
}

#[test]
fn attribution_newline_insert_after_long_keep() {
    run_mutate_attribution_test(
        pool_with_chars(),
        "Z:s>1|1=4=6|1+1$\n",
        &["*0|1+4", "*0|1+8", "*0+5|1+1", "*0|1+1", "*0|1+5", "*0|1+1", "*0|1+1", "*0|1+1", "|1+1"],
        &[
            "*0|1+4",
            "*0+6|1+1",
            "*0|1+2",
            "*0+5|1+1",
            "*0|1+1",
            "*0|1+5",
            "*0|1+1",
            "*0|1+1",
            "*0|1+1",
            "|1+1",
        ],
    );
}

#[test]
fn attribution_lines_of_the_wrong_length_are_rejected() {
    let mut pool = pool_with_chars();
    let mut alines = lines(&["|1+2", "|1+2", "|1+2", "|1+2"]);
    assert_eq!(
        mutate_attribution_lines("Z:9<1+1=1|3=6-2$x", &mut alines, &mut pool),
        Err(Error::Precondition(PreconditionError::TextLengthMismatch {
            expected: 9,
            actual: 8
        }))
    );
    assert_eq!(alines, lines(&["|1+2", "|1+2", "|1+2", "|1+2"]));
}

#[test]
fn failed_attribution_mutation_leaves_every_line_untouched() {
    // the first line is rewritten before the two-line keep fails
    let mut pool = pool_of(&["bold,true"]);
    let orig = ["|1+2", "|1+2", "|1+2", "|2+4"];
    let mut alines = lines(&orig);
    assert_eq!(
        mutate_attribution_lines("Z:a>1+1|3=6*0|2=4$x", &mut alines, &mut pool),
        Err(Error::Precondition(PreconditionError::MultipleLines(2)))
    );
    assert_eq!(alines, lines(&orig));
}
