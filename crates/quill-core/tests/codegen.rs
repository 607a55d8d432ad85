//! Shape of the generated JavaScript.

use pretty_assertions::assert_eq;
use quill_compiler::{AutofilterMode, CompiledTemplate, Environment, EnvironmentOptions};

fn env() -> Environment {
    quill_core::environment(EnvironmentOptions::default()).unwrap()
}

fn compile(source: &str, name: &str) -> CompiledTemplate {
    env().compile(source, name).unwrap()
}

#[test]
fn test_class_shape() {
    let compiled = compile("Hello {name}", "hello.txt");
    assert_eq!(compiled.class_name, "Template_hello_txt");
    assert_eq!(
        compiled.code,
        r#"class Template_hello_txt extends Template {
    constructor(env) {
        super(env, "hello.txt");
    }

    displayTemplate(context) {
        this.write("Hello ");
        this.write(context.get("name"));
    }
}
"#
    );
}

#[test]
fn test_html_output_is_escaped() {
    let compiled = compile("{name}", "page.html");
    assert!(compiled.code.contains("const env = this.getEnvironment();"));
    assert!(compiled
        .code
        .contains(r#"this.write(env.getFunction("filter")(env, context.get("name"), "html"));"#));
}

#[test]
fn test_strategy_follows_extension() {
    let compiled = compile("{name}", "app.js");
    assert!(compiled.code.contains(r#"context.get("name"), "js"));"#));

    let compiled = compile("{name}", "notes.txt");
    assert!(!compiled.code.contains("getEnvironment"));
}

#[test]
fn test_safe_expressions_are_not_escaped() {
    let code = compile(r#"{raw(name)}{"a" ~ "b"}{1 + 2}"#, "page.html").code;
    assert!(!code.contains("getFunction"), "{}", code);
    assert!(code.contains(r#"this.write(context.get("name"));"#));
    assert!(code.contains(r#"this.write(("" + "a" + "b"));"#));
    assert!(code.contains("this.write((1 + 2));"));
}

#[test]
fn test_autofilter_regions() {
    let code = compile(
        "{autofilter off}{a}{autofilter on}{b}{endautofilter}{c}{endautofilter}",
        "notes.txt",
    )
    .code;
    assert!(code.contains(r#"this.write(context.get("a"));"#));
    assert!(code.contains(r#"this.write(env.getFunction("filter")(env, context.get("b"), "html"));"#));
    assert!(code.contains(r#"this.write(context.get("c"));"#));
}

#[test]
fn test_autofilter_region_covers_blocks() {
    let code = compile(
        "{autofilter off}{block b}{x}{endblock}{x}{endautofilter}{block c}{y}{endblock}",
        "page.html",
    )
    .code;
    assert!(!code.contains(r#"context.get("x"), "html")"#), "{}", code);
    assert!(code.contains(r#"this.write(context.get("x"));"#));
    assert!(code.contains(r#"this.write(env.getFunction("filter")(env, context.get("y"), "html"));"#));

    let code = compile(
        "{autofilter off}{define d}{x}{enddefine}{endautofilter}{display d}",
        "page.html",
    )
    .code;
    assert!(!code.contains("getFunction"), "{}", code);
}

#[test]
fn test_autofilter_region_covers_embeds() {
    let code = compile(
        "{autofilter off}{embed \"card.html\"}{block title}{x}{endblock}{endembed}{endautofilter}",
        "page.html",
    )
    .code;
    assert!(!code.contains("getFunction"), "{}", code);

    let code = compile(
        "{embed \"card.html\"}{block title}{x}{endblock}{endembed}",
        "page.html",
    )
    .code;
    assert!(code.contains(r#"context.get("x"), "html")"#), "{}", code);
}

#[test]
fn test_default_autofilter_mode() {
    let mut options = EnvironmentOptions::default();
    options.autofilter = AutofilterMode::On;
    let env = quill_core::environment(options).unwrap();
    let code = env.compile("{a}", "notes.txt").unwrap().code;
    assert!(code.contains(r#"context.get("a"), "html"));"#));

    let mut options = EnvironmentOptions::default();
    options.autofilter = AutofilterMode::Off;
    let env = quill_core::environment(options).unwrap();
    let code = env.compile("{a}", "page.html").unwrap().code;
    assert!(!code.contains("filter"));
}

#[test]
fn test_empty_string_prints_are_dropped() {
    let code = compile(r#"a{""}b"#, "notes.txt").code;
    assert!(!code.contains(r#"this.write("");"#));
    assert!(code.contains(r#"this.write("a");"#));
}

#[test]
fn test_function_strategies() {
    let code = compile(
        "{max(1, 2)}{length(items)}{user.greet(1)}{items | join(\",\")}",
        "notes.txt",
    )
    .code;
    assert!(code.contains("this.write(Math.max(1, 2));"));
    assert!(code.contains(r#"this.write(env.getFunction("length")(context.get("items")));"#));
    assert!(code.contains(r#"this.write(this.callMethod(context.get("user"), "greet", [1]));"#));
    assert!(code.contains(r#"env.getFunction("join")(context.get("items"), ",")"#));
}

#[test]
fn test_operator_output() {
    let code = compile(
        r#"{a starts with "x"}{a does not start with "x"}{1 .. 3}{n is divisible by 3}{a ?? b}{a ? b : c}{x is set}"#,
        "notes.txt",
    )
    .code;
    assert!(code.contains(r#"this.write(this.startsWith(context.get("a"), "x"));"#));
    assert!(code.contains(r#"this.write(!this.startsWith(context.get("a"), "x"));"#));
    assert!(code.contains("this.write(this.range(1, 3, true));"));
    assert!(code.contains(r#"this.write((context.get("n") % 3 === 0));"#));
    assert!(code.contains(r#"this.write(this.coalesce(context.get("a"), context.get("b")));"#));
    assert!(code.contains(
        r#"this.write((context.get("a") ? context.get("b") : context.get("c")));"#
    ));
    assert!(code.contains(r#"this.write(context.has("x"));"#));
}

#[test]
fn test_keyed_arrays_become_maps() {
    let code = compile(r#"{set m: ["a": 1, "b": [2, 3]]}"#, "notes.txt").code;
    assert!(code.contains(r#"context.set("m", new Map([["a", 1], ["b", [2, 3]]]));"#));
}

#[test]
fn test_set_and_capture() {
    let code = compile(
        "{set a: 1, b: a + 1}{capture into c}x{endcapture}{unset a}",
        "notes.txt",
    )
    .code;
    assert!(code.contains(r#"context.set("a", 1);"#));
    assert!(code.contains(r#"context.set("b", (context.get("a") + 1));"#));
    assert!(code.contains("this.startCapture();"));
    assert!(code.contains(r#"context.set("c", this.endCapture());"#));
    assert!(code.contains(r#"context.unset("a");"#));
}

#[test]
fn test_print_default() {
    let code = compile("{print title: \"Untitled\"}", "notes.txt").code;
    assert!(code.contains(r#"this.write(this.coalesce(context.get("title"), "Untitled"));"#));
}

#[test]
fn test_only_outer_loop_saves_context() {
    let code = compile(
        "{for row in rows}{for cell in row}{cell}{endfor}{endfor}",
        "notes.txt",
    )
    .code;
    assert_eq!(code.matches("context.save()").count(), 1);
    assert_eq!(code.matches("context.restore(").count(), 1);
    assert_eq!(code.matches("this.iterate(").count(), 2);
}

#[test]
fn test_loops_in_for_else_save_their_own_context() {
    let code = compile(
        "{for a in xs}{a}{else}{for b in ys}{b}{endfor}{endfor}",
        "notes.txt",
    )
    .code;
    assert_eq!(code.matches("context.save()").count(), 2);
    assert_eq!(code.matches("context.restore(").count(), 2);
}

#[test]
fn test_each_block_saves_its_own_context() {
    let code = compile(
        "{for a in xs}{a}{endfor}{block items}{for b in ys}{b}{endfor}{endblock}",
        "notes.txt",
    )
    .code;
    assert_eq!(code.matches("context.save()").count(), 2);
}

#[test]
fn test_blocks_become_methods() {
    let code = compile("<h1>{block title}Home{endblock}</h1>", "page.html").code;
    assert!(code.contains(r#"this.renderBlock("title", context);"#));
    assert!(code.contains("    block_title(context) {\n        this.write(\"Home\");\n    }"));
}

#[test]
fn test_define_and_display() {
    let code = compile("{define row}<tr>{enddefine}{display row}", "page.html").code;
    assert!(code.contains("block_row(context) {"));
    assert_eq!(code.matches(r#"this.renderBlock("row", context);"#).count(), 1);
}

#[test]
fn test_extends_discards_child_body() {
    let compiled = compile(
        "{extends \"base.html\"}ignored{block title}Child{endblock}",
        "child.html",
    );
    assert_eq!(compiled.parent_template(), Some("base.html"));
    let code = &compiled.code;
    assert!(code.contains(r#"this.setParentTemplate("base.html");"#));
    assert!(code.contains("super.displayTemplate(context);"));
    assert!(code.contains("block_title(context) {"));
    assert!(!code.contains("ignored"));
    assert!(!code.contains("renderBlock"));
}

#[test]
fn test_dynamic_parent() {
    let compiled = compile("{extends layout}", "child.html");
    assert_eq!(compiled.parent_template(), None);
    assert!(compiled
        .code
        .contains(r#"this.setParentTemplate(context.get("layout"));"#));
}

#[test]
fn test_parent_block() {
    let code = compile(
        "{extends \"base.html\"}{block title}{parent} and more{endblock}",
        "child.html",
    )
    .code;
    assert!(code.contains(r#"this.renderParentBlock("title", context);"#));
}

#[test]
fn test_embed_creates_a_class() {
    let compiled = compile(
        "{embed \"card.html\" using [\"x\": 1]}{block title}Hi{endblock}{endembed}",
        "page.html",
    );
    assert_eq!(compiled.embedded_templates(), ["page.html__embedded_1"]);
    let code = &compiled.code;
    assert!(code.contains("class Template_page_html extends Template {"));
    assert!(code.contains("class Template_page_html__embedded_1 extends Template {"));
    assert!(code.contains(r#"super(env, "page.html__embedded_1");"#));
    assert!(code.contains(
        r#"this.renderEmbedded("page.html__embedded_1", this.createContext(context, new Map([["x", 1]])));"#
    ));
    assert!(code.contains(r#"this.setParentTemplate("card.html");"#));
}

#[test]
fn test_composition_tags() {
    let code = compile(
        "{include \"nav.html\"}{list posts using \"post.html\"}{import \"macros.html\"}{import row, cell from \"table.html\"}{display row using [\"r\": 1]}",
        "page.html",
    )
    .code;
    assert!(code.contains(r#"this.include("nav.html", context);"#));
    assert!(code.contains(r#"this.renderList(context.get("posts"), "post.html", context);"#));
    assert!(code.contains(r#"this.importBlocks("macros.html", null);"#));
    assert!(code.contains(r#"this.importBlocks("table.html", ["row", "cell"]);"#));
    assert!(code.contains(
        r#"this.renderBlock("row", this.createContext(context, new Map([["r", 1]])));"#
    ));
}

#[test]
fn test_switch() {
    let code = compile(
        "{switch x}{case 1}one{case 2}two{else}many{endswitch}",
        "notes.txt",
    )
    .code;
    assert!(code.contains(r#"const switch1 = context.get("x");"#));
    assert!(code.contains("if (switch1 == 1) {"));
    assert!(code.contains("} else if (switch1 == 2) {"));
    assert!(code.contains("} else {"));
}
