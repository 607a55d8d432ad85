//! Runs generated classes under node against the runtime in
//! `fixtures/runtime.js`. Skipped when no `node` binary is installed.

use pretty_assertions::assert_eq;
use quill_compiler::{Environment, EnvironmentOptions};
use std::io::Write;
use std::process::Command;

const RUNTIME: &str = include_str!("fixtures/runtime.js");

fn env() -> Environment {
    quill_core::environment(EnvironmentOptions::default()).unwrap()
}

/// Compile `templates`, render `main` with the context given as a JS
/// expression, and return the output. `None` when node is unavailable.
fn render(env: &Environment, templates: &[(&str, &str)], main: &str, context: &str) -> Option<String> {
    let Ok(node) = which::which("node") else {
        eprintln!("node not found; skipping render");
        return None;
    };

    let mut script = String::from(RUNTIME);
    let mut classes = Vec::new();
    for (name, source) in templates {
        let compiled = env.compile(source, name).unwrap();
        script.push('\n');
        script.push_str(&compiled.code);
        classes.push(format!("{:?}: {}", name, compiled.class_name));
        for embedded in compiled.embedded_templates() {
            classes.push(format!("{:?}: {}", embedded, env.class_name(embedded)));
        }
    }
    script.push_str(&format!(
        "\nconst env = new Environment({{ {} }});\nprocess.stdout.write(env.render({:?}, {}));\n",
        classes.join(", "),
        main,
        context
    ));

    let mut file = tempfile::Builder::new().suffix(".js").tempfile().unwrap();
    file.write_all(script.as_bytes()).unwrap();
    let output = Command::new(node).arg(file.path()).output().unwrap();
    assert!(
        output.status.success(),
        "node failed: {}\n{}",
        String::from_utf8_lossy(&output.stderr),
        script
    );
    Some(String::from_utf8(output.stdout).unwrap())
}

fn render_one(source: &str, name: &str, context: &str) -> Option<String> {
    render(&env(), &[(name, source)], name, context)
}

#[test]
fn test_if_else() {
    let source = "{if x > 1}big{else}small{endif}";
    let Some(big) = render_one(source, "size.txt", r#"{ "x": 5 }"#) else {
        return;
    };
    assert_eq!(big, "big");
    assert_eq!(render_one(source, "size.txt", r#"{ "x": 0 }"#).unwrap(), "small");
}

#[test]
fn test_for_over_pairs() {
    let output = render_one(
        "{for k:v in list}{k}:{v};{endfor}",
        "pairs.txt",
        r#"{ list: new Map([["a", 1], ["b", 2]]) }"#,
    );
    if let Some(output) = output {
        assert_eq!(output, "a:1;b:2;");
    }
}

#[test]
fn test_for_else_and_context_restore() {
    let source = "{for v in items}[{v}]{else}none{endfor}{v ?? \"unset\"}";
    let Some(output) = render_one(source, "list.txt", r#"{ "items": [1, 2] }"#) else {
        return;
    };
    assert_eq!(output, "[1][2]unset");
    assert_eq!(
        render_one(source, "list.txt", r#"{ "items": [] }"#).unwrap(),
        "noneunset"
    );
}

#[test]
fn test_nested_loops() {
    let output = render_one(
        "{for row in rows}{for cell in row}{cell}{endfor};{endfor}",
        "grid.txt",
        r#"{ "rows": [[1, 2], [3]] }"#,
    );
    if let Some(output) = output {
        assert_eq!(output, "12;3;");
    }
}

#[test]
fn test_html_is_escaped() {
    let output = render_one(
        "<p>{name}</p>{raw(name)}{autofilter off}{name}{endautofilter}",
        "page.html",
        r#"{ "name": "<b>" }"#,
    );
    if let Some(output) = output {
        assert_eq!(output, "<p>&lt;b&gt;</p><b><b>");
    }
}

#[test]
fn test_filters_and_operators() {
    let output = render_one(
        r#"{name | upper}-{items | join(",")}-{2 ^ 3}-{"a" ~ 1}-{n is divisible by 3 ? "yes" : "no"}-{missing ?: "fallback"}"#,
        "misc.txt",
        r#"{ "name": "quill", "items": [1, 2, 3], "n": 9 }"#,
    );
    if let Some(output) = output {
        assert_eq!(output, "QUILL-1,2,3-8-a1-yes-fallback");
    }
}

#[test]
fn test_set_capture_and_switch() {
    let output = render_one(
        "{set a: 2, b: a * 3}{capture into c}<{b}>{endcapture}{c}{c}\
         {switch a}{case 1}one{case 2}two{else}many{endswitch}",
        "vars.txt",
        "{}",
    );
    if let Some(output) = output {
        assert_eq!(output, "<6><6>two");
    }
}

#[test]
fn test_inheritance() {
    let env = env();
    let templates = [
        ("base.txt", "<{block title}Base{endblock}|{block body}{endblock}>"),
        (
            "child.txt",
            "{extends \"base.txt\"}ignored{block title}Child {parent}{endblock}{block body}{name}{endblock}",
        ),
    ];
    let output = render(&env, &templates, "child.txt", r#"{ "name": "x" }"#);
    if let Some(output) = output {
        assert_eq!(output, "<Child Base|x>");
    }
}

#[test]
fn test_embed_include_and_display() {
    let env = env();
    let templates = [
        ("card.txt", "[{block title}card{endblock}]"),
        ("greeting.txt", "hello {who}"),
        (
            "page.txt",
            "{embed \"card.txt\"}{block title}custom{endblock}{endembed}\
             {include \"greeting.txt\" using [\"who\": \"you\"]}\
             {define row}({n}){enddefine}{display row using [\"n\": 1]}{display row using [\"n\": 2]}",
        ),
    ];
    let output = render(&env, &templates, "page.txt", "{}");
    if let Some(output) = output {
        assert_eq!(output, "[custom]hello you(1)(2)");
    }
}

#[test]
fn test_list_and_import() {
    let env = env();
    let templates = [
        ("item.txt", "<{item}>"),
        ("macros.txt", "{define bold}*{text}*{enddefine}"),
        (
            "page.txt",
            "{list items using \"item.txt\"}{import bold from \"macros.txt\"}{display bold using [\"text\": \"hi\"]}",
        ),
    ];
    let output = render(&env, &templates, "page.txt", r#"{ "items": ["a", "b"] }"#);
    if let Some(output) = output {
        assert_eq!(output, "<a><b>*hi*");
    }
}
