use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use xpt_engine::prelude::*;
use xpt_engine::XPath;

const CATALOG: &str = r#"<?xml version="1.0"?>
<catalog xmlns:bk="urn:books" xml:lang="en-GB">
  <!-- inventory -->
  <book id="b1" price="10">
    <title>Alpha</title>
    <bk:isbn>111</bk:isbn>
  </book>
  <book id="b2" price="25.5">
    <title>Beta</title>
    <bk:isbn>222</bk:isbn>
  </book>
  <book id="b3" price="7">
    <title>  Gamma  </title>
  </book>
  <?render mode="fast"?>
</catalog>"#;

fn doc() -> Arc<Document> {
    QuickXmlParser::default().parse(CATALOG).unwrap()
}

fn rows(expression: &str) -> Vec<String> {
    XPath1Evaluator
        .evaluate(&doc(), expression)
        .unwrap()
        .items()
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn scalar(expression: &str) -> String {
    let result = XPath1Evaluator.evaluate(&doc(), expression).unwrap();
    match result {
        EvaluationResult::Scalar(scalar) => scalar.to_string(),
        EvaluationResult::Sequence(_) => panic!("{expression} returned a node-set"),
    }
}

fn error(expression: &str) -> XPathError {
    XPath1Evaluator.evaluate(&doc(), expression).unwrap_err()
}

#[test]
fn test_child_and_descendant_paths() {
    assert_eq!(
        rows("/catalog/book/title"),
        vec![
            "<title>Alpha</title>",
            "<title>Beta</title>",
            "<title>  Gamma  </title>"
        ]
    );
    assert_eq!(rows("//title/text()"), vec!["Alpha", "Beta", "  Gamma  "]);
    assert_eq!(rows("count(//*)"), vec!["9"]);
}

#[test]
fn test_attribute_axis() {
    assert_eq!(rows("//book/@id"), vec![r#"id="b1""#, r#"id="b2""#, r#"id="b3""#]);
    assert_eq!(rows("//book[@price > 9]/@id"), vec![r#"id="b1""#, r#"id="b2""#]);
    assert_eq!(scalar("count(/catalog/@*)"), "1");
}

#[test]
fn test_positional_predicates() {
    assert_eq!(rows("//book[2]/title/text()"), vec!["Beta"]);
    assert_eq!(rows("//book[last()]/@id"), vec![r#"id="b3""#]);
    assert_eq!(rows("(//title)[position() > 1]/text()"), vec!["Beta", "  Gamma  "]);
}

#[test]
fn test_reverse_axes_use_proximity_positions() {
    assert_eq!(rows("//book[3]/preceding-sibling::book[1]/@id"), vec![r#"id="b2""#]);
    assert_eq!(rows("//title[. = 'Alpha']/ancestor::*[1]/@id"), vec![r#"id="b1""#]);
    assert_eq!(scalar("name(//title[1]/ancestor::*[last()])"), "catalog");
    assert_eq!(scalar("string(//book[3]/title/preceding::title[1])"), "Beta");
    assert_eq!(scalar("name(//book[2]/ancestor-or-self::*[1])"), "book");
}

#[test]
fn test_sibling_following_and_preceding_axes() {
    assert_eq!(rows("//book[1]/following-sibling::book/@id").len(), 2);
    assert_eq!(scalar("count(//book[2]/following::title)"), "1");
    assert_eq!(scalar("count(//book[2]/preceding::title)"), "1");
    assert_eq!(scalar("count(//book[2]/title/preceding::book)"), "1");
    assert_eq!(scalar("count(//book/@id/following-sibling::node())"), "0");
}

#[test]
fn test_parent_self_and_abbreviations() {
    assert_eq!(rows("//title[. = 'Beta']/../@id"), vec![r#"id="b2""#]);
    assert_eq!(scalar("count(//book/self::book)"), "3");
    assert_eq!(scalar("count(//book/descendant-or-self::node())"), "13");
}

#[test]
fn test_comment_and_processing_instruction_tests() {
    assert_eq!(rows("//comment()"), vec!["<!-- inventory -->"]);
    assert_eq!(rows("//processing-instruction('render')"), vec![r#"<?render mode="fast"?>"#]);
    assert_eq!(scalar("count(//processing-instruction('other'))"), "0");
}

#[test]
fn test_namespaces() {
    assert_eq!(rows("//bk:isbn/text()"), vec!["111", "222"]);
    assert_eq!(scalar("count(//bk:*)"), "2");
    assert_eq!(scalar("count(//isbn)"), "0");
    assert_eq!(scalar("namespace-uri(//bk:isbn)"), "urn:books");
    assert_eq!(scalar("local-name(//bk:isbn)"), "isbn");
    assert_eq!(scalar("name(//bk:isbn)"), "bk:isbn");
    assert_eq!(
        error("//zz:isbn"),
        XPathError::UndefinedPrefix {
            prefix: "zz".to_string()
        }
    );
}

#[test]
fn test_comparisons() {
    assert_eq!(scalar("//book/@price = 7"), "true");
    assert_eq!(scalar("//book/@price != 7"), "true");
    assert_eq!(scalar("//book/@price > 100"), "false");
    assert_eq!(scalar("//title = 'Beta'"), "true");
    assert_eq!(scalar("//title = //bk:isbn"), "false");
    assert_eq!(scalar("//missing = false()"), "true");
    assert_eq!(scalar("'10' = 10.0"), "true");
    assert_eq!(scalar("true() = 'x'"), "true");
    assert_eq!(scalar("'abc' < 'abd'"), "false");
    assert_eq!(scalar("number('x') = number('x')"), "false");
}

#[test]
fn test_arithmetic() {
    assert_eq!(scalar("1 + 2 * 3"), "7");
    assert_eq!(scalar("7 mod 3"), "1");
    assert_eq!(scalar("-7 mod 3"), "-1");
    assert_eq!(scalar("10 div 4"), "2.5");
    assert_eq!(scalar("0 div 0"), "NaN");
    assert_eq!(scalar("-1 div 0"), "-Infinity");
    assert_eq!(scalar("sum(//book/@price)"), "42.5");
    assert_eq!(scalar("- - 2"), "2");
}

#[test]
fn test_string_functions() {
    assert_eq!(scalar("concat('a', 'b', 'c')"), "abc");
    assert_eq!(scalar("normalize-space(//book[3]/title)"), "Gamma");
    assert_eq!(scalar("string-length('héllo')"), "5");
    assert_eq!(scalar("substring('12345', 2, 3)"), "234");
    assert_eq!(scalar("substring-before('1999/04/01', '/')"), "1999");
    assert_eq!(scalar("substring-after('1999/04/01', '/')"), "04/01");
    assert_eq!(scalar("translate('bar', 'abc', 'ABC')"), "BAr");
    assert_eq!(scalar("starts-with(//title, 'Al')"), "true");
    assert_eq!(scalar("contains(//book[2]/title, 'et')"), "true");
    assert_eq!(scalar("string(//book[1]/@price)"), "10");
}

#[test]
fn test_number_and_boolean_functions() {
    assert_eq!(scalar("floor(2.7)"), "2");
    assert_eq!(scalar("ceiling(2.1)"), "3");
    assert_eq!(scalar("round(2.5)"), "3");
    assert_eq!(scalar("number(' 12 ')"), "12");
    assert_eq!(scalar("boolean(//book)"), "true");
    assert_eq!(scalar("not(//missing)"), "true");
    assert_eq!(scalar("lang('en')"), "false");
    assert_eq!(scalar("count(//book[lang('en')])"), "3");
    assert_eq!(scalar("count(//book[lang('en-gb')])"), "3");
    assert_eq!(scalar("count(//book[lang('fr')])"), "0");
}

#[test]
fn test_id_function() {
    assert_eq!(rows("id('b3 b1')/title/text()"), vec!["Alpha", "  Gamma  "]);
    assert_eq!(rows("id(//missing)"), Vec::<String>::new());
}

#[test]
fn test_union_is_in_document_order() {
    assert_eq!(
        rows("//book[3]/@id | //book[1]/@id | //book[1]/@id"),
        vec![r#"id="b1""#, r#"id="b3""#]
    );
}

#[test]
fn test_root_node_serializes_whole_document() {
    let out = rows("/");
    assert_eq!(out.len(), 1);
    assert!(out[0].starts_with("<catalog xmlns:bk=\"urn:books\" xml:lang=\"en-GB\">\n  <!-- inventory -->"));
}

#[test]
fn test_runtime_errors() {
    assert!(matches!(error("count('x')"), XPathError::NodeSetExpected { .. }));
    assert!(matches!(error("'x' | //book"), XPathError::NodeSetExpected { .. }));
    assert!(matches!(error("$v"), XPathError::UnboundVariable { .. }));
    assert!(matches!(error("'a'/b"), XPathError::NodeSetExpected { .. }));
}

#[test]
fn test_compile_errors() {
    assert!(matches!(error("//book["), XPathError::Syntax { .. }));
    assert!(matches!(error("foo()"), XPathError::UnknownFunction { .. }));
    assert!(matches!(error("count(1, 2)"), XPathError::Arity { .. }));
    assert!(matches!(error("namespace::node()"), XPathError::Unsupported { .. }));
    assert!(error("  ").is_compile_time());
}

#[test]
fn test_deeply_nested_expressions_are_rejected() {
    for source in [
        format!("{}1{}", "(".repeat(1000), ")".repeat(1000)),
        vec!["1"; 10_000].join("+"),
    ] {
        let err = error(&source);
        assert!(err.is_compile_time());
        assert!(err.to_string().contains("expression nested too deeply"));
    }
    assert_eq!(scalar(&format!("{}'2'", "-".repeat(5000))), "2");
    assert_eq!(scalar(&format!("{}2", "-".repeat(5001))), "-2");
}

#[test]
fn test_adjacent_text_and_cdata_form_one_node() {
    let doc = QuickXmlParser::default()
        .parse("<r>a<![CDATA[b]]>c<!--x-->d</r>")
        .unwrap();
    let texts: Vec<String> = XPath1Evaluator
        .evaluate(&doc, "/r/text()")
        .unwrap()
        .items()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(texts, vec!["abc", "d"]);
    assert_eq!(
        XPath1Evaluator
            .evaluate(&doc, "count(/r/text()[1][. = 'abc'])")
            .unwrap()
            .items()[0]
            .to_string(),
        "1"
    );
}

#[test]
fn test_deep_documents_serialize() {
    const DEPTH: usize = 20_000;
    let xml = format!("{}{}", "<d>t".repeat(DEPTH), "</d>".repeat(DEPTH));
    let doc = QuickXmlParser::default().parse(&xml).unwrap();
    let out: Vec<String> = XPath1Evaluator
        .evaluate(&doc, "/")
        .unwrap()
        .items()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(out, vec![xml]);
}

#[test]
fn test_compiled_expression_is_reusable() {
    let xpath = XPath::compile("count(//book)").unwrap();
    assert_eq!(xpath.source(), "count(//book)");
    let doc = doc();
    assert_eq!(xpath.evaluate(&doc).unwrap(), xpt_engine::Value::Number(3.0));
    assert_eq!(xpath.evaluate(&doc).unwrap(), xpt_engine::Value::Number(3.0));
}

const EXPRESSIONS: [&str; 8] = [
    "//book",
    "//title/text()",
    "//book/@*",
    "count(//book)",
    "//book[@price > 8]",
    "//node()",
    "//bk:isbn | //title",
    "string(//book[2])",
];

proptest! {
    #[test]
    fn prop_evaluation_is_deterministic(index in 0..EXPRESSIONS.len()) {
        let expression = EXPRESSIONS[index];
        let first = rows(expression);
        let second = rows(expression);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_number_round_trips_through_string(n in -1_000_000i64..1_000_000) {
        let expression = format!("number(string({n}))");
        prop_assert_eq!(scalar(&expression), n.to_string());
    }
}
