use proptest::prelude::*;
use tclish::pattern::Pattern;
use tclish::script::scan::scan;
use tclish::script::stmt;
use tclish::script::value::{escape, pack, unescape, unpack, Number};
use tclish::script::{Interpreter, Signal, Task};

/// Strings that lean on the characters the codecs care about.
fn tricky() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("'".to_owned()),
            Just("\"".to_owned()),
            Just("\\".to_owned()),
            Just("{".to_owned()),
            Just("}".to_owned()),
            Just("[".to_owned()),
            Just("]".to_owned()),
            Just(" ".to_owned()),
            Just("\n".to_owned()),
            Just("\\u".to_owned()),
            Just("x41".to_owned()),
            "\\PC{0,4}",
        ],
        0..12,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn list_round_trip(items in prop::collection::vec(tricky(), 0..8)) {
        prop_assert_eq!(unpack(&pack(&items)), items);
    }

    #[test]
    fn list_round_trip_any_text(items in prop::collection::vec("\\PC*", 0..6)) {
        prop_assert_eq!(unpack(&pack(&items)), items);
    }

    #[test]
    fn escape_round_trip(s in tricky()) {
        prop_assert_eq!(unescape(&escape(&s)), s);
    }

    #[test]
    fn escape_round_trip_any_text(s in "\\PC*") {
        prop_assert_eq!(unescape(&escape(&s)), s);
    }

    /// The scanner either rejects a stray closer or consumes at least one
    /// byte without running past the end.
    #[test]
    fn scan_is_total(s in "\\PC{1,40}") {
        match scan(&s, 0) {
            Ok(end) => prop_assert!(end > 0 && end <= s.len()),
            Err(_) => prop_assert!(s.starts_with('}') || s.starts_with(']'), "scan rejected input not starting with a stray closer: {:?}", s),
        }
    }

    #[test]
    fn splitter_never_panics(s in "\\PC*") {
        let _ = stmt::split(&s);
    }

    /// Whatever the input, evaluation ends in a signal rather than a panic.
    #[test]
    fn evaluation_is_total(s in "[a-z$\\[\\]{}'\" ;\\\\\n]{0,30}") {
        let mut interp = Interpreter::new();
        let mut task = Task::default();
        let _ = interp.evaluate(&mut task, &s, Vec::new(), None);
        prop_assert_eq!(task.depth(), 0);
    }

    #[test]
    fn escaped_text_survives_a_single_quoted_word(s in tricky()) {
        let mut interp = Interpreter::new();
        let mut task = Task::default();
        let src = format!("return '{}'", escape(&s));
        prop_assert_eq!(interp.evaluate(&mut task, &src, Vec::new(), None), Signal::Normal(s));
    }

    #[test]
    fn integer_sums_match_rust(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let mut interp = Interpreter::new();
        let mut task = Task::default();
        let sig = interp.evaluate(&mut task, &format!("+ {a} {b}"), Vec::new(), None);
        prop_assert_eq!(sig, Signal::Normal((a + b).to_string()));
    }

    #[test]
    fn numbers_reparse_from_display(x in any::<i64>()) {
        prop_assert_eq!(Number::parse(&Number::Int(x).to_string()), Some(Number::Int(x)));
    }

    /// A glob without wildcards matches exactly itself.
    #[test]
    fn literal_glob_matches_itself(s in "[a-zA-Z0-9 ._+()^$|-]{0,20}") {
        let p = Pattern::glob(&s).unwrap();
        prop_assert!(p.is_match(&s));
        let longer = format!("{s}x");
        prop_assert!(!p.is_match(&longer));
    }
}
