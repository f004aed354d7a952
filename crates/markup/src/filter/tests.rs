use super::*;
use crate::balance::TagBalanceValidator;
use crate::error::ParseErrorCode;
use crate::source::CharSource;
use crate::token_fmt::format_event;
use crate::tokenizer::TokenizerConfig;
use core_types::DocumentKey;
use std::cell::RefCell;
use std::rc::Rc;

fn ctx() -> DocumentParseContext {
    DocumentParseContext::new(DocumentKey::new(1, 1))
}

fn chain(input: &str) -> FilterChain {
    FilterChain::new(Tokenizer::new(
        CharSource::new(input),
        TokenizerConfig::default(),
    ))
}

fn drain(chain: &mut FilterChain, ctx: &mut DocumentParseContext) -> Result<Vec<String>, ParseError> {
    let mut out = Vec::new();
    while let Some(event) = chain.next_event(ctx)? {
        out.push(format_event(&event, chain.tokenizer().source()));
    }
    Ok(out)
}

struct DropBodies;

impl MarkupFilter for DropBodies {
    fn name(&self) -> &'static str {
        "drop-bodies"
    }

    fn on_event(
        &mut self,
        event: MarkupEvent,
        _ctx: &mut DocumentParseContext,
    ) -> Result<FilterAction, ParseError> {
        Ok(match event {
            MarkupEvent::Body(_) => FilterAction::Drop,
            other => FilterAction::Keep(other),
        })
    }
}

struct Recorder {
    name: &'static str,
    log: Rc<RefCell<Vec<String>>>,
}

impl MarkupFilter for Recorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn on_event(
        &mut self,
        event: MarkupEvent,
        _ctx: &mut DocumentParseContext,
    ) -> Result<FilterAction, ParseError> {
        self.log.borrow_mut().push(format!("{} event", self.name));
        Ok(FilterAction::Keep(event))
    }

    fn on_end(&mut self, _ctx: &mut DocumentParseContext) -> Result<(), ParseError> {
        self.log.borrow_mut().push(format!("{} end", self.name));
        Ok(())
    }

    fn post_process(
        &mut self,
        _markup: &mut Markup,
        _ctx: &mut DocumentParseContext,
    ) -> Result<(), ParseError> {
        self.log.borrow_mut().push(format!("{} post", self.name));
        Ok(())
    }
}

struct UppercaseNames;

impl MarkupFilter for UppercaseNames {
    fn name(&self) -> &'static str {
        "uppercase"
    }

    fn on_event(
        &mut self,
        event: MarkupEvent,
        _ctx: &mut DocumentParseContext,
    ) -> Result<FilterAction, ParseError> {
        let MarkupEvent::Tag(mut tag) = event else {
            return Ok(FilterAction::Keep(event));
        };
        let upper = tag.name().to_ascii_uppercase();
        tag.make_mut().set_name(&upper);
        Ok(FilterAction::Keep(MarkupEvent::Tag(tag)))
    }
}

#[test]
fn long_runs_of_dropped_events_do_not_recurse() {
    let input = "text<br/>".repeat(50_000);
    let mut ctx = ctx();
    let mut chain = chain(&input).with(DropBodies);
    let lines = drain(&mut chain, &mut ctx).expect("drain");
    assert_eq!(lines.len(), 50_000);
    assert_eq!(ctx.counters.events_dropped, 50_000);

    let mut ctx = self::ctx();
    let mut chain = self::chain(&"text ".repeat(10)).with(DropBodies);
    assert!(drain(&mut chain, &mut ctx).expect("drain").is_empty());
}

#[test]
fn replaced_events_reach_the_consumer() {
    let mut ctx = ctx();
    let mut chain = chain("<p>x</p>").with(UppercaseNames);
    assert_eq!(
        drain(&mut chain, &mut ctx).expect("drain"),
        ["OPEN P", r#"BODY "x""#, "CLOSE P"]
    );
}

#[test]
fn stages_run_in_construction_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut ctx = ctx();
    let mut chain = chain("<b/>")
        .with(Recorder {
            name: "inner",
            log: Rc::clone(&log),
        })
        .with(Recorder {
            name: "outer",
            log: Rc::clone(&log),
        });
    assert_eq!(chain.stage_names(), ["outer", "inner", "tokenizer"]);

    drain(&mut chain, &mut ctx).expect("drain");
    assert!(chain.next_event(&mut ctx).expect("after end").is_none());
    let mut markup = Markup::new(ctx.key);
    chain.post_process(&mut markup, &mut ctx).expect("post-process");
    assert_eq!(
        *log.borrow(),
        [
            "inner event",
            "outer event",
            "inner end",
            "outer end",
            "outer post",
            "inner post",
        ]
    );
}

#[test]
fn errors_propagate_through_upstream_stages() {
    let mut ctx = ctx();
    let mut chain = chain("<div><span></div>")
        .with(TagBalanceValidator::new())
        .with(DropBodies);
    let err = drain(&mut chain, &mut ctx).unwrap_err();
    assert_eq!(err.code(), ParseErrorCode::MismatchedCloseTag);
    assert_eq!(chain.next_event(&mut ctx).unwrap_err().code(), ParseErrorCode::MismatchedCloseTag);
}

#[test]
fn tokenizer_is_reachable_through_the_chain() {
    let mut ctx = ctx();
    let mut chain = chain("<a>b</a>").with(DropBodies).with(DropBodies);
    chain.next_event(&mut ctx).expect("first");
    chain.tokenizer_mut().mark_position();
    chain.next_event(&mut ctx).expect("second");
    assert_eq!(chain.tokenizer().current_text(), Some("</a>"));
    assert_eq!(chain.tokenizer().input_from_marker(8), "b</a>");
}

#[test]
fn auto_ids_use_the_document_counter() {
    let input = r#"<wicket:panel><wicket:message key="k"/><wicket:child wicket:id="c"/></wicket:panel><div/>"#;
    let mut ctx = ctx();
    let mut chain = chain(input).with(AutoIdFilter::new("wicket"));
    assert_eq!(
        drain(&mut chain, &mut ctx).expect("drain"),
        [
            r#"OPEN wicket:panel wicket:id="_panel_1""#,
            r#"OPEN_CLOSE wicket:message key="k" wicket:id="_message_2""#,
            r#"OPEN_CLOSE wicket:child wicket:id="c""#,
            "CLOSE wicket:panel",
            "OPEN_CLOSE div",
        ]
    );
    assert_eq!(ctx.counters.auto_ids_assigned, 2);

    let mut other = DocumentParseContext::new(DocumentKey::new(1, 2));
    let mut chain = self::chain("<wicket:panel/>").with(AutoIdFilter::new("wicket"));
    assert_eq!(
        drain(&mut chain, &mut other).expect("drain"),
        [r#"OPEN_CLOSE wicket:panel wicket:id="_panel_1""#]
    );
}

#[test]
fn auto_id_drafts_keep_their_lineage() {
    let mut ctx = ctx();
    let mut chain = chain("<wicket:panel></wicket:panel>")
        .with(AutoIdFilter::new("wicket"))
        .with(TagBalanceValidator::new());
    let open = chain.next_event(&mut ctx).expect("open").and_then(MarkupEvent::into_tag);
    let close = chain.next_event(&mut ctx).expect("close").and_then(MarkupEvent::into_tag);
    let (Some(open), Some(close)) = (open, close) else {
        panic!("expected two tags");
    };
    assert!(open.is_draft());
    assert!(close.closes(&open));
}

#[test]
fn remove_regions_are_dropped() {
    let mut ctx = ctx();
    let mut chain = chain("<p>keep</p><wicket:remove><p>preview</p></wicket:remove>end")
        .with(RemoveRegionFilter::new("wicket"));
    assert_eq!(
        drain(&mut chain, &mut ctx).expect("drain"),
        ["OPEN p", r#"BODY "keep""#, "CLOSE p", r#"BODY "end""#]
    );
}

#[test]
fn remove_region_errors() {
    for (input, reason) in [
        (
            "<wicket:remove><wicket:remove></wicket:remove></wicket:remove>",
            "remove regions may not be nested",
        ),
        ("<wicket:remove/>", "remove tag must have a body"),
        ("</wicket:remove>", "close tag without an open remove region"),
        ("<wicket:remove>x", "remove region is never closed"),
    ] {
        let mut ctx = ctx();
        let mut chain = chain(input).with(RemoveRegionFilter::new("wicket"));
        let err = drain(&mut chain, &mut ctx).unwrap_err();
        assert!(
            matches!(&err, ParseError::InvalidRemoveRegion { reason: r, .. } if *r == reason),
            "input {input:?}: unexpected error {err:?}"
        );
    }
}
