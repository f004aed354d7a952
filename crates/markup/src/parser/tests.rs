use super::*;
use crate::document::MarkupElement;
use crate::error::{ParseError, ParseErrorCode};

fn parse(input: &str, settings: MarkupSettings) -> Result<Markup, MarkupError> {
    parse_str(input, settings, DocumentKey::new(3, 9))
}

fn parse_ok(input: &str) -> Markup {
    parse(input, MarkupSettings::default()).unwrap_or_else(|err| panic!("parse failed: {err}"))
}

fn describe(markup: &Markup) -> Vec<String> {
    markup
        .elements()
        .iter()
        .map(|element| match element {
            MarkupElement::Raw(text) => format!("RAW {text:?}"),
            MarkupElement::Tag(component) => {
                let suffix = if component.no_close_tag { " (no close)" } else { "" };
                format!("TAG {}{suffix}", component.tag.to_markup())
            }
        })
        .collect()
}

#[test]
fn component_tags_split_raw_text() {
    let markup = parse_ok(r#"<div><span wicket:id="label">x</span><b>y</b></div>"#);
    assert_eq!(
        describe(&markup),
        [
            r#"RAW "<div>""#,
            r#"TAG <span wicket:id="label">"#,
            r#"RAW "x""#,
            "TAG </span>",
            r#"RAW "<b>y</b></div>""#,
        ]
    );
    assert_eq!(markup.key(), DocumentKey::new(3, 9));
}

#[test]
fn unmodified_markup_round_trips() {
    let input = "<!DOCTYPE html>\n<html><body>\n  <p wicket:id=\"a\" >a<br>b</p>\n<!-- c -->\n</body></html>\n";
    let markup = parse_ok(input);
    assert_eq!(markup.to_markup_string(), input);
    assert_eq!(markup.doctype(), Some("<!DOCTYPE html>"));
}

#[test]
fn framework_tags_get_auto_ids_and_are_frozen() {
    let markup = parse_ok("<wicket:panel>hi</wicket:panel>");
    assert_eq!(
        describe(&markup),
        [
            r#"TAG <wicket:panel wicket:id="_panel_1">"#,
            r#"RAW "hi""#,
            "TAG </wicket:panel>",
        ]
    );
    assert!(markup.component_tags().all(|component| !component.tag.is_draft()));
    let tags: Vec<_> = markup.component_tags().collect();
    assert!(tags[1].tag.closes(&tags[0].tag));
}

#[test]
fn remove_regions_vanish_from_markup() {
    let markup = parse_ok("<p>a</p><wicket:remove><i>preview</i></wicket:remove><p>b</p>");
    assert_eq!(markup.to_markup_string(), "<p>a</p><p>b</p>");
    assert_eq!(markup.len(), 1);
}

#[test]
fn implicitly_closed_component_tags_are_marked() {
    let markup = parse_ok(r#"<div><p wicket:id="para">text</div>"#);
    assert_eq!(
        describe(&markup),
        [
            r#"RAW "<div>""#,
            r#"TAG <p wicket:id="para"> (no close)"#,
            r#"RAW "text</div>""#,
        ]
    );
}

#[test]
fn strip_comments_keeps_conditional_comments() {
    let settings = MarkupSettings {
        strip_comments: true,
        ..MarkupSettings::default()
    };
    let input = "a<!-- gone -->b<!--[if IE]><p>ie</p><![endif]--><!--[if !IE]><!--><i>x</i><!--<![endif]-->";
    let markup = parse(input, settings).expect("parse");
    assert_eq!(
        markup.to_markup_string(),
        "ab<!--[if IE]><p>ie</p><![endif]--><!--[if !IE]><!--><i>x</i><!--<![endif]-->"
    );
}

#[test]
fn compress_whitespace_leaves_pre_alone() {
    let settings = MarkupSettings {
        compress_whitespace: true,
        ..MarkupSettings::default()
    };
    let input = "<div>  a \t b\n\n   c</div><pre>  keep\n\n  this </pre>  end  ";
    let markup = parse(input, settings).expect("parse");
    assert_eq!(
        markup.to_markup_string(),
        "<div> a b\nc</div><pre>  keep\n\n  this </pre> end "
    );
}

#[test]
fn compress_whitespace_rules() {
    assert_eq!(compress_whitespace("a  \n\n  b"), "a\nb");
    assert_eq!(compress_whitespace("a\r\n\tb"), "a\nb");
    assert_eq!(compress_whitespace("<preview>  x</preview>"), "<preview> x</preview>");
    assert_eq!(compress_whitespace("<PRE class=x>  x  </PRE>  y"), "<PRE class=x>  x  </PRE> y");
    assert_eq!(compress_whitespace("<pre>  unterminated"), "<pre>  unterminated");
}

#[test]
fn xml_declaration_is_reported() {
    let markup = parse_ok("<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><p>x</p>");
    assert_eq!(markup.xml_encoding(), Some("ISO-8859-1"));
}

#[test]
fn missing_xml_declaration_can_be_required() {
    let settings = MarkupSettings {
        require_xml_declaration: true,
        ..MarkupSettings::default()
    };
    let err = parse("<p>x</p>", settings.clone()).unwrap_err();
    assert!(
        matches!(err, MarkupError::MissingXmlDeclaration),
        "unexpected error: {err:?}"
    );
    parse("<?xml version=\"1.0\" encoding=\"UTF-8\"?><p>x</p>", settings).expect("declared");
}

#[test]
fn parse_errors_surface_unchanged() {
    let err = parse("<div><span></div>", MarkupSettings::default()).unwrap_err();
    let parse_err = err.as_parse().expect("parse error");
    assert_eq!(parse_err.code(), ParseErrorCode::MismatchedCloseTag);

    let err = parse("<div>", MarkupSettings::default()).unwrap_err();
    assert!(
        matches!(&err, MarkupError::Parse(ParseError::UnclosedTag { name, .. }) if name == "div"),
        "unexpected error: {err:?}"
    );
}

#[test]
fn custom_namespace() {
    let settings = MarkupSettings {
        namespace: "tpl".to_string(),
        ..MarkupSettings::default()
    };
    let markup = parse("<tpl:slot/><wicket:panel/>", settings).expect("parse");
    assert_eq!(
        describe(&markup),
        [r#"TAG <tpl:slot tpl:id="_slot_1"/>"#, r#"RAW "<wicket:panel/>""#]
    );
}

struct RenameBold;

impl MarkupFilter for RenameBold {
    fn name(&self) -> &'static str {
        "rename-bold"
    }

    fn on_event(
        &mut self,
        event: MarkupEvent,
        _ctx: &mut DocumentParseContext,
    ) -> Result<crate::filter::FilterAction, ParseError> {
        let MarkupEvent::Tag(mut tag) = event else {
            return Ok(crate::filter::FilterAction::Keep(event));
        };
        if tag.name() == "b" {
            tag.make_mut().set_name("strong");
        }
        Ok(crate::filter::FilterAction::Keep(MarkupEvent::Tag(tag)))
    }
}

#[test]
fn modified_plain_tags_become_raw_markup() {
    let parser = MarkupParser::new(
        CharSource::new("<p><b class='x'>y</b></p>"),
        MarkupSettings::default(),
        DocumentKey::default(),
    )
    .with_filter(RenameBold);
    assert_eq!(
        parser.stage_names(),
        ["rename-bold", "remove-region", "tag-balance", "auto-id", "tokenizer"]
    );
    let markup = parser.parse().expect("parse");
    assert_eq!(markup.to_markup_string(), r#"<p><strong class="x">y</strong></p>"#);
}

#[test]
fn parse_file_reads_from_disk() {
    let path = std::env::temp_dir().join(format!("markup-parse-file-{}.html", std::process::id()));
    std::fs::write(&path, "<wicket:panel>\u{E9}</wicket:panel>").expect("write fixture");
    let markup = parse_file(&path, MarkupSettings::default(), DocumentKey::default());
    std::fs::remove_file(&path).expect("remove fixture");
    let markup = markup.expect("parse file");
    assert_eq!(markup.len(), 3);

    let err = parse_file(
        Path::new("/no/such/markup.html"),
        MarkupSettings::default(),
        DocumentKey::default(),
    )
    .unwrap_err();
    assert!(matches!(err, MarkupError::Source(_)), "unexpected error: {err:?}");
}
