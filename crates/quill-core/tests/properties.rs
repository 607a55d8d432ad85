//! Structural properties of tokenizing and parsing with the core vocabulary.

use pretty_assertions::assert_eq;
use quill_compiler::{Ast, Environment, EnvironmentOptions, NodeId, NodeKind, TokenKind, Value};

fn env() -> Environment {
    quill_core::environment(EnvironmentOptions::default()).unwrap()
}

/// The expression of the first statement of the main template.
fn printed(env: &Environment, source: &str) -> (Ast, NodeId) {
    let (ast, file) = env.parse(source, "test.txt").unwrap();
    let NodeKind::File { classes } = ast.kind(file) else {
        panic!("expected a file node");
    };
    let NodeKind::Class { body, .. } = ast.kind(classes[0]) else {
        panic!("expected a class node");
    };
    let NodeKind::Root { children, .. } = ast.kind(*body) else {
        panic!("expected a root node");
    };
    let NodeKind::Print { expression, .. } = ast.kind(children[0]) else {
        panic!("expected a print node, got {:?}", ast.kind(children[0]));
    };
    let expression = *expression;
    (ast, expression)
}

fn operator(ast: &Ast, node: NodeId) -> (&str, &[NodeId]) {
    match ast.kind(node) {
        NodeKind::Operator {
            symbol, operands, ..
        } => (symbol.as_str(), operands.as_slice()),
        other => panic!("expected an operator, got {:?}", other),
    }
}

fn int(ast: &Ast, node: NodeId) -> i64 {
    match ast.kind(node) {
        NodeKind::Data(Value::Int(i)) => *i,
        other => panic!("expected an integer, got {:?}", other),
    }
}

fn string(ast: &Ast, node: NodeId) -> &str {
    match ast.kind(node) {
        NodeKind::Data(Value::String(s)) => s,
        other => panic!("expected a string, got {:?}", other),
    }
}

fn parse_error(env: &Environment, source: &str) -> &'static str {
    match env.parse(source, "test.txt") {
        Ok(_) => panic!("{:?} parsed", source),
        Err(err) => err.code(),
    }
}

#[test]
fn test_adjacent_text_is_merged() {
    let env = env();
    let stream = env
        .tokenizer()
        .tokenize("a{# note #}b{raw}{x}{endraw}c{y}d{#x#}e", &env)
        .unwrap();
    let tokens = stream.tokens();
    for pair in tokens.windows(2) {
        assert!(
            !(pair[0].kind == TokenKind::Text && pair[1].kind == TokenKind::Text),
            "unmerged text: {:?}",
            tokens
        );
    }
    assert_eq!(tokens[0].value, "ab{x}c");
}

#[test]
fn test_multiplication_binds_tighter() {
    let env = env();
    let (ast, root) = printed(&env, "{5 * 6 + 7}");
    let (symbol, operands) = operator(&ast, root);
    assert_eq!(symbol, "+");
    let (left, product) = operator(&ast, operands[0]);
    assert_eq!(left, "*");
    assert_eq!((int(&ast, product[0]), int(&ast, product[1])), (5, 6));
    assert_eq!(int(&ast, operands[1]), 7);
}

#[test]
fn test_parentheses_group() {
    let env = env();
    let (ast, root) = printed(&env, "{5 * (6 + 7)}");
    let (symbol, operands) = operator(&ast, root);
    assert_eq!(symbol, "*");
    assert_eq!(int(&ast, operands[0]), 5);
    let (right, sum) = operator(&ast, operands[1]);
    assert_eq!(right, "+");
    assert_eq!((int(&ast, sum[0]), int(&ast, sum[1])), (6, 7));
}

#[test]
fn test_associativity() {
    let env = env();

    let (ast, root) = printed(&env, "{1 - 2 - 3}");
    let (_, operands) = operator(&ast, root);
    assert_eq!(operator(&ast, operands[0]).0, "-");
    assert_eq!(int(&ast, operands[1]), 3);

    let (ast, root) = printed(&env, "{2 ^ 3 ^ 2}");
    let (_, operands) = operator(&ast, root);
    assert_eq!(int(&ast, operands[0]), 2);
    assert_eq!(operator(&ast, operands[1]).0, "^");
}

#[test]
fn test_non_associative_chain_is_rejected() {
    let env = env();
    assert_eq!(
        parse_error(&env, "{a is divisible by 2 is divisible by 3}"),
        "non-associative"
    );
    assert_eq!(parse_error(&env, "{a == b == c}"), "non-associative");
    assert!(env.parse("{(a == b) == c}", "test.txt").is_ok());
}

#[test]
fn test_keyed_array_forms() {
    let env = env();
    for source in [r#"{["k": "v"]}"#, r#"{["k" => "v"]}"#, r#"{["k" => "v", ]}"#] {
        let (ast, root) = printed(&env, source);
        let NodeKind::Array { entries } = ast.kind(root) else {
            panic!("{} is not an array", source);
        };
        assert_eq!(entries.len(), 1, "{}", source);
        let key = entries[0].key.expect("keyed entry");
        assert_eq!(string(&ast, key), "k");
        assert_eq!(string(&ast, entries[0].value), "v");
    }
}

#[test]
fn test_nested_index() {
    let env = env();
    let (ast, root) = printed(&env, "{a[1][2]}");
    let NodeKind::ArrayIndex { collection, key } = ast.kind(root) else {
        panic!("expected an index");
    };
    assert_eq!(int(&ast, *key), 2);
    let NodeKind::ArrayIndex { collection, key } = ast.kind(*collection) else {
        panic!("expected a nested index");
    };
    assert_eq!(int(&ast, *key), 1);
    assert!(matches!(ast.kind(*collection), NodeKind::Identifier { name, .. } if name == "a"));
}

#[test]
fn test_property_access_binds_before_postfix() {
    let env = env();
    let (ast, root) = printed(&env, "{a.b is set}");
    let (symbol, operands) = operator(&ast, root);
    assert_eq!(symbol, "is set");
    let NodeKind::Identifier {
        name,
        receiver: Some(receiver),
    } = ast.kind(operands[0])
    else {
        panic!("expected a property access");
    };
    assert_eq!(name, "b");
    assert!(matches!(ast.kind(*receiver), NodeKind::Identifier { name, .. } if name == "a"));
}

#[test]
fn test_method_call_takes_receiver() {
    let env = env();
    let (ast, root) = printed(&env, "{user.greet(1)}");
    let NodeKind::Function {
        name,
        arguments,
        receiver,
    } = ast.kind(root)
    else {
        panic!("expected a call");
    };
    assert_eq!(name, "greet");
    assert_eq!(arguments.len(), 1);
    assert!(receiver.is_some());
}

#[test]
fn test_filter_prepends_argument() {
    let env = env();
    let (ast, root) = printed(&env, "{items | join(\", \")}");
    let NodeKind::Function {
        name, arguments, ..
    } = ast.kind(root)
    else {
        panic!("expected a call");
    };
    assert_eq!(name, "join");
    assert_eq!(arguments.len(), 2);
    assert!(matches!(ast.kind(arguments[0]), NodeKind::Identifier { name, .. } if name == "items"));

    let (ast, root) = printed(&env, "{name | upper}");
    assert!(matches!(ast.kind(root), NodeKind::Function { name, .. } if name == "upper"));
}

#[test]
fn test_invalid_filter_target() {
    let env = env();
    assert_eq!(parse_error(&env, "{name | 5}"), "invalid-operand");
    assert_eq!(parse_error(&env, "{name.\"x\"}"), "invalid-operand");
}

#[test]
fn test_unknown_function() {
    let env = env();
    assert_eq!(parse_error(&env, "{shout(name)}"), "unknown-function");
    assert_eq!(parse_error(&env, "{name | shout}"), "unknown-function");
}

#[test]
fn test_trailing_comma_in_call_is_rejected() {
    let env = env();
    assert!(env.parse("{max(1, 2,)}", "test.txt").is_err());
    assert!(env.parse("{max(1, 2)}", "test.txt").is_ok());
}

#[test]
fn test_ternary_forms() {
    let env = env();
    let (ast, root) = printed(&env, "{a ? b : c}");
    assert_eq!(operator(&ast, root).1.len(), 3);

    let (ast, root) = printed(&env, "{a ?: b}");
    assert_eq!(operator(&ast, root).1.len(), 2);

    let (ast, root) = printed(&env, "{a ?:b}");
    let (symbol, operands) = operator(&ast, root);
    assert_eq!(symbol, "?:");
    assert!(matches!(ast.kind(operands[1]), NodeKind::Identifier { name, .. } if name == "b"));

    assert_eq!(parse_error(&env, "{a ? b}"), "invalid-ternary");
}

#[test]
fn test_closing_tags_are_required() {
    let env = env();
    let cases = [
        ("{if x}a", "{endif}"),
        ("{if x}a{elseif y}b{else}c", "{endif}"),
        ("{for v in xs}a", "{endfor}"),
        ("{for k: v in xs}a{else}b", "{endfor}"),
        ("{switch x}{case 1}a", "{endswitch}"),
        ("{block title}a", "{endblock}"),
        ("{define title}a", "{enddefine}"),
        ("{embed \"base.html\"}a", "{endembed}"),
        ("{capture into c}a", "{endcapture}"),
        ("{autofilter off}a", "{endautofilter}"),
    ];
    for (open, close) in cases {
        assert_eq!(parse_error(&env, open), "unclosed-tag", "{}", open);
        let closed = format!("{}{}", open, close);
        assert!(env.parse(&closed, "test.txt").is_ok(), "{}", closed);
    }

    assert_eq!(parse_error(&env, "{raw}a"), "unterminated");
    assert!(env.parse("{raw}a{endraw}", "test.txt").is_ok());
}

#[test]
fn test_stray_closing_tag() {
    let env = env();
    assert_eq!(parse_error(&env, "a{endif}"), "unknown-tag");
    assert_eq!(parse_error(&env, "{else}"), "unknown-tag");
}

#[test]
fn test_scope_rules() {
    let env = env();
    assert_eq!(
        parse_error(&env, "{if x}{extends \"base.html\"}{endif}"),
        "invalid-scope"
    );
    assert_eq!(
        parse_error(&env, "{extends \"a.html\"}{extends \"b.html\"}"),
        "invalid-scope"
    );
    assert_eq!(parse_error(&env, "{parent}"), "invalid-scope");
    assert_eq!(
        parse_error(&env, "{block a}x{endblock}{block a}y{endblock}"),
        "duplicate-block"
    );
}

#[test]
fn test_switch_rejects_text_before_first_case() {
    let env = env();
    assert_eq!(
        parse_error(&env, "{switch x}oops{case 1}a{endswitch}"),
        "unexpected-token"
    );
    assert!(env
        .parse("{switch x}\n  {case 1}a{endswitch}", "test.txt")
        .is_ok());
}

#[test]
fn test_nesting_limit() {
    let mut options = EnvironmentOptions::default();
    options.max_nesting = 3;
    let env = quill_core::environment(options).unwrap();
    assert!(env.parse("{if a}{if b}x{endif}{endif}", "test.txt").is_ok());
    assert_eq!(
        parse_error(&env, "{if a}{if b}{if c}{if d}x{endif}{endif}{endif}{endif}"),
        "nesting-too-deep"
    );
}

#[test]
fn test_expression_nesting_limit() {
    let env = env();
    let parens = format!("{{{}1{}}}", "(".repeat(10_000), ")".repeat(10_000));
    assert_eq!(parse_error(&env, &parens), "nesting-too-deep");
    let arrays = format!("{{{}1{}}}", "[".repeat(200), "]".repeat(200));
    assert_eq!(parse_error(&env, &arrays), "nesting-too-deep");
    let calls = format!("{{{}1{}}}", "max(".repeat(200), ")".repeat(200));
    assert_eq!(parse_error(&env, &calls), "nesting-too-deep");

    let shallow = format!("{{{}1{}}}", "(".repeat(20), ")".repeat(20));
    assert!(env.parse(&shallow, "test.txt").is_ok());
}

#[test]
fn test_slash_closing_prefix() {
    let mut options = EnvironmentOptions::default();
    options.lexer.closing_tag_prefix = "/".to_string();
    let env = quill_core::environment(options).unwrap();
    assert!(env.parse("{if x}a{else}b{/if}", "test.txt").is_ok());
    assert_eq!(parse_error(&env, "{if x}a"), "unclosed-tag");
}

#[test]
fn test_compilation_is_deterministic() {
    let env = env();
    let source = "{extends \"base.html\"}\
        {block body}{for k: v in items}{k}={v | upper}{endfor}{endblock}\
        {embed \"card.html\"}{block title}{title}{endblock}{endembed}";
    let first = env.compile(source, "page.html").unwrap();
    let second = env.compile(source, "page.html").unwrap();
    assert_eq!(first.code, second.code);
}
