//! The core operator set.

mod binary;
mod unary;

pub use binary::{Concat, Divisible, Filter, Infix, Property, Range, RuntimeCall, Xor};
pub use unary::{Conditional, IsEmpty, IsSet, Parity, Prefix, Step};

use quill_compiler::{Associativity, Operator, ACCESS_PRECEDENCE};

pub fn binary_operators() -> Vec<Operator> {
    use Associativity::{Left, None, Right};
    vec![
        Operator::new(&["."], ACCESS_PRECEDENCE, Left, Property),
        Operator::new(&["|"], 90, Left, Filter),
        Operator::new(&["^"], 70, Right, Infix("**")),
        Operator::new(&["*"], 40, Left, Infix("*")),
        Operator::new(&["/"], 40, Left, Infix("/")),
        Operator::new(&["%"], 40, Left, Infix("%")),
        Operator::new(&["+"], 30, Left, Infix("+")),
        Operator::new(&["-"], 30, Left, Infix("-")),
        Operator::new(&["~"], 30, Left, Concat),
        Operator::new(&["<<"], 28, Left, Infix("<<")),
        Operator::new(&[">>"], 28, Left, Infix(">>")),
        Operator::new(&["..", "..."], 25, None, Range),
        Operator::new(&["=", "=="], 20, None, Infix("==")),
        Operator::new(&["!="], 20, None, Infix("!=")),
        Operator::new(&["==="], 20, None, Infix("===")),
        Operator::new(&["!=="], 20, None, Infix("!==")),
        Operator::new(&["<"], 20, None, Infix("<")),
        Operator::new(&["<="], 20, None, Infix("<=")),
        Operator::new(&[">"], 20, None, Infix(">")),
        Operator::new(&[">="], 20, None, Infix(">=")),
        Operator::new(
            &["starts with", "does not start with"],
            20,
            None,
            RuntimeCall::new("startsWith"),
        ),
        Operator::new(
            &["ends with", "does not end with"],
            20,
            None,
            RuntimeCall::new("endsWith"),
        ),
        Operator::new(
            &["matches", "does not match"],
            20,
            None,
            RuntimeCall::new("matches"),
        ),
        Operator::new(
            &["contains", "does not contain"],
            20,
            None,
            RuntimeCall::new("contains"),
        ),
        Operator::new(
            &["is divisible by", "is not divisible by"],
            20,
            None,
            Divisible,
        ),
        Operator::new(&["&"], 18, Left, Infix("&")),
        Operator::new(&["b-xor"], 17, Left, Infix("^")),
        Operator::new(&["b-or"], 16, Left, Infix("|")),
        Operator::new(&["??"], 14, Right, RuntimeCall::new("coalesce")),
        Operator::new(&["and"], 12, Left, Infix("&&")),
        Operator::new(&["xor"], 11, Left, Xor),
        Operator::new(&["or"], 10, Left, Infix("||")),
    ]
}

pub fn prefix_operators() -> Vec<Operator> {
    vec![
        Operator::new(&["-"], 60, Associativity::Right, Prefix("-")),
        Operator::new(&["+"], 60, Associativity::Right, Prefix("+")),
        Operator::new(&["~"], 60, Associativity::Right, Prefix("~")),
        Operator::new(&["not", "!"], 50, Associativity::Right, Prefix("!")),
    ]
}

pub fn postfix_operators() -> Vec<Operator> {
    vec![
        Operator::new(&["isset", "is set", "is not set"], 80, Associativity::Left, IsSet),
        Operator::new(&["empty", "is empty", "is not empty"], 80, Associativity::Left, IsEmpty),
        Operator::new(&["even", "is even"], 80, Associativity::Left, Parity { odd: false }),
        Operator::new(&["odd", "is odd"], 80, Associativity::Left, Parity { odd: true }),
        Operator::new(&["++"], 80, Associativity::Left, Step),
        Operator::new(&["--"], 80, Associativity::Left, Step),
    ]
}

pub fn conditional_operator() -> Operator {
    Operator::new(&["?"], 0, Associativity::Right, Conditional)
}
