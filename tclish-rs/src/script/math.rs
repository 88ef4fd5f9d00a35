//! Arithmetic, comparison and logic commands.
//!
//! Values are parsed with [`Number::parse`]; integers stay integers until an
//! operation overflows or divides.  Booleans follow the language rule:
//! `"true"` for true, the empty string for false.

use std::collections::HashSet;

use super::builtins::{Builtin, CommandRegistry, RegistryError};
use super::interp::Interpreter;
use super::signal::Signal;
use super::task::Task;
use super::value::{bool_str, is_true, Number};

fn numbers(args: &[String]) -> impl Iterator<Item = Number> + '_ {
    args.iter().filter_map(|a| Number::parse(a))
}

fn add(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    Signal::ok(numbers(args).fold(Number::Int(0), Number::add).to_string())
}

fn mul(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    Signal::ok(numbers(args).fold(Number::Int(1), Number::mul).to_string())
}

fn sub(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let Some(first) = args.first() else {
        return task.error("- must be given at least 1 number", "-");
    };
    let Some(n) = Number::parse(first) else {
        return task.error("cannot negate non-numbers", "-");
    };
    if args.len() == 1 {
        return Signal::ok(n.neg().to_string());
    }
    Signal::ok(numbers(&args[1..]).fold(n, Number::sub).to_string())
}

fn div(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    let Some(mut acc) = args.first().and_then(|a| Number::parse(a)) else {
        return task.error("/ needs at least one number to divide", "/");
    };
    for n in numbers(&args[1..]) {
        acc = match acc.div(n) {
            Ok(q) => q,
            Err(e) => return task.error(e, "/"),
        };
    }
    Signal::ok(acc.to_string())
}

fn rem(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.len() < 2 {
        return task.error("must be provided with two numbers", "%");
    }
    let Some(a) = Number::parse(&args[0]) else {
        return task.error("a must be a number", "%");
    };
    let Some(b) = Number::parse(&args[1]) else {
        return task.error("b must be a number", "%");
    };
    match a.rem(b) {
        Ok(r) => Signal::ok(r.to_string()),
        Err(e) => task.error(e, "%"),
    }
}

/// True when `holds` is true of every adjacent pair.  Every argument must
/// be a number.
fn chain(task: &Task, args: &[String], label: &str, holds: fn(Number, Number) -> bool) -> Signal {
    let mut parsed = Vec::with_capacity(args.len());
    for (i, a) in args.iter().enumerate() {
        match Number::parse(a) {
            Some(n) => parsed.push(n),
            None if i == 0 => {
                return task.error("all arguments must be numbers, first is not", label)
            }
            None => {
                return task.error(format!("all arguments must be numbers, arg {} is not", i + 1), label)
            }
        }
    }
    Signal::ok(bool_str(parsed.windows(2).all(|w| holds(w[0], w[1]))))
}

fn gt(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    chain(task, args, ">", |a, b| a > b)
}

fn ge(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    chain(task, args, ">=", |a, b| a >= b)
}

fn num_eq(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    chain(task, args, "==", |a, b| a == b)
}

fn le(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    chain(task, args, "<=", |a, b| a <= b)
}

fn lt(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    chain(task, args, "<", |a, b| a < b)
}

fn str_eq(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.len() < 2 {
        return task.error("= requires at least two arguments", "=");
    }
    Signal::ok(bool_str(args[1..].iter().all(|a| *a == args[0])))
}

fn distinct(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    if args.len() < 2 {
        return task.error("!= requires at least two arguments", "!=");
    }
    let unique: HashSet<&String> = args.iter().collect();
    Signal::ok(bool_str(unique.len() == args.len()))
}

fn not(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    match args.first() {
        Some(a) => Signal::ok(bool_str(!is_true(a))),
        None => task.error("! requires at least one argument", "!"),
    }
}

fn and(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    Signal::ok(bool_str(args.iter().all(|a| is_true(a))))
}

fn or(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    Signal::ok(bool_str(args.iter().any(|a| is_true(a))))
}

fn is_number(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    Signal::ok(bool_str(args.first().and_then(|a| Number::parse(a)).is_some()))
}

fn is_integer(_: &mut Interpreter, _: &mut Task, args: &[String]) -> Signal {
    let integral = args
        .first()
        .and_then(|a| Number::parse(a))
        .is_some_and(Number::is_integral);
    Signal::ok(bool_str(integral))
}

fn rounding(task: &Task, args: &[String], label: &str, op: fn(f64) -> f64) -> Signal {
    let Some(first) = args.first() else {
        return task.error(format!("{label} requires at least one argument"), label);
    };
    match Number::parse(first) {
        Some(Number::Float(x)) => Signal::ok(Number::Float(op(x)).to_string()),
        Some(n) => Signal::ok(n.to_string()),
        None => task.error("Invalid input, must be a number", label),
    }
}

fn round(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    rounding(task, args, "round", f64::round_ties_even)
}

fn floor(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    rounding(task, args, "floor", f64::floor)
}

fn ceil(_: &mut Interpreter, task: &mut Task, args: &[String]) -> Signal {
    rounding(task, args, "ceil", f64::ceil)
}

const COMMANDS: &[(&str, Builtin, &str)] = &[
    ("+", add, "usage:\n  + <values>...\nreturn the sum of the inputs; non-numbers are ignored."),
    ("*", mul, "usage:\n  * <values>...\nreturn the product of the inputs; non-numbers are ignored."),
    ("-", sub, "usage:\n  - <number>\n  - <number> <numbers>...\nnegate one number, or subtract the rest from the first.\nlater non-numbers are ignored."),
    ("/", div, "usage:\n  / <number> <values>...\ndivide the first number by each later number.\nthe first must be a number; later non-numbers are ignored."),
    ("%", rem, "usage:\n  % <a> <b>\nreturn <a> modulo <b>, with the sign of <b>."),
    (">", gt, "usage:\n  > <numbers>...\ntrue if each number is larger than the next."),
    (">=", ge, "usage:\n  >= <numbers>...\ntrue if each number is larger than or equal to the next."),
    ("==", num_eq, "usage:\n  == <numbers>...\ntrue if all numbers are equal."),
    ("<=", le, "usage:\n  <= <numbers>...\ntrue if each number is smaller than or equal to the next."),
    ("<", lt, "usage:\n  < <numbers>...\ntrue if each number is smaller than the next."),
    ("=", str_eq, "usage:\n  = <strings>...\ntrue if all strings are equal."),
    ("!=", distinct, "usage:\n  != <strings>...\ntrue if no two strings are equal."),
    ("!", not, "usage:\n  ! <value>\ntrue if <value> is false (empty)."),
    ("and", and, "usage:\n  and <values>...\ntrue if every value is non-empty."),
    ("or", or, "usage:\n  or <values>...\ntrue if any value is non-empty."),
    ("number?", is_number, "usage:\n  number? <value>\ntrue if <value> is a valid number."),
    ("integer?", is_integer, "usage:\n  integer? <value>\ntrue if <value> is a number without a fractional part."),
    ("round", round, "usage:\n  round <number>\nround to the nearest integer, ties to even."),
    ("floor", floor, "usage:\n  floor <number>\nround down to an integer."),
    ("ceil", ceil, "usage:\n  ceil <number>\nround up to an integer."),
];

pub fn register(registry: &mut CommandRegistry) -> Result<(), RegistryError> {
    registry.add_table(COMMANDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str) -> Signal {
        let mut interp = Interpreter::new();
        let mut task = Task::default();
        interp.evaluate(&mut task, src, Vec::new(), None)
    }

    fn ok(src: &str) -> String {
        match eval(src) {
            Signal::Normal(v) => v,
            other => panic!("{src:?} gave {other:?}"),
        }
    }

    /// Call a command directly, bypassing sentence parsing.  Names such as
    /// `<=` read as modifiers when written at the head of a sentence.
    fn call(name: &str, args: &[&str]) -> Signal {
        let mut interp = Interpreter::new();
        let mut task = Task::default();
        interp.call(&mut task, name, args.iter().map(|a| a.to_string()).collect())
    }

    #[test]
    fn sums_and_products_skip_non_numbers() {
        assert_eq!(ok("+ 1 2 x 3.5"), "6.5");
        assert_eq!(ok("+"), "0");
        assert_eq!(ok("* 2 y 3"), "6");
        assert_eq!(ok("*"), "1");
    }

    #[test]
    fn subtraction() {
        assert_eq!(ok("- 5"), "-5");
        assert_eq!(ok("- 10 3 x 2"), "5");
        assert!(eval("- x").is_error());
        assert!(eval("-").is_error());
    }

    #[test]
    fn division_is_true_division() {
        assert_eq!(ok("/ 7 2"), "3.5");
        assert_eq!(ok("/ 6 3"), "2");
        assert_eq!(ok("/ 6"), "6");
        assert!(eval("/ x 2").is_error());
        assert!(eval("/ 1 0").is_error());
    }

    #[test]
    fn modulo_follows_divisor_sign() {
        assert_eq!(ok("% 7 3"), "1");
        assert_eq!(ok("% -7 3"), "2");
        assert_eq!(ok("% 7 -3"), "-2");
        assert!(eval("% 7 0").is_error());
        assert!(eval("% 7").is_error());
    }

    #[test]
    fn comparisons_chain() {
        assert_eq!(ok("< 1 2 3"), "true");
        assert_eq!(ok("< 1 3 2"), "");
        assert_eq!(call("<=", &["1", "1", "2"]), Signal::ok("true"));
        assert_eq!(ok("> 3 2 1"), "true");
        assert_eq!(call(">=", &["3", "3", "4"]), Signal::ok(""));
        assert_eq!(ok("== 2 2.0"), "true");
        assert_eq!(ok("< 5"), "true");
    }

    #[test]
    fn comparison_names_ending_in_equals_are_modifiers() {
        assert_eq!(ok("set x 7\n>= x 5\nget x"), "true");
        assert_eq!(ok("set x 7\n<= x 5\nget x"), "");
        assert_eq!(ok("set s a\n!= s b\nget s"), "");
    }

    #[test]
    fn comparisons_reject_non_numbers() {
        let sig = eval("< 1 x");
        assert!(matches!(&sig, Signal::Error(m) if m.starts_with("<<> all arguments must be numbers, arg 2 is not")));
        assert!(eval("> x 1").is_error());
    }

    #[test]
    fn string_equality() {
        assert_eq!(ok("= a a a"), "true");
        assert_eq!(ok("= 2 2.0"), "");
        assert_eq!(call("!=", &["a", "b", "c"]), Signal::ok("true"));
        assert_eq!(call("!=", &["a", "b", "a"]), Signal::ok(""));
        assert!(eval("= a").is_error());
    }

    #[test]
    fn logic() {
        assert_eq!(ok("! {}"), "true");
        assert_eq!(ok("! x"), "");
        assert_eq!(ok("and a b"), "true");
        assert_eq!(ok("and a {}"), "");
        assert_eq!(ok("or {} b"), "true");
        assert_eq!(ok("or"), "");
    }

    #[test]
    fn number_predicates() {
        assert_eq!(ok("number? 1e3"), "true");
        assert_eq!(ok("number? abc"), "");
        assert_eq!(ok("integer? 4.0"), "true");
        assert_eq!(ok("integer? 4.5"), "");
    }

    #[test]
    fn rounding_commands() {
        assert_eq!(ok("round 2.5"), "2");
        assert_eq!(ok("round 2.6"), "3");
        assert_eq!(ok("floor -1.5"), "-2");
        assert_eq!(ok("ceil 1.2"), "2");
        assert_eq!(ok("round 7"), "7");
        assert!(eval("round x").is_error());
    }
}
