#![no_main]

use core_types::DocumentKey;
use libfuzzer_sys::fuzz_target;
use markup::{MarkupElement, MarkupSettings, parse_str};

fuzz_target!(|data: &[u8]| {
    let Some((&flags, rest)) = data.split_first() else {
        return;
    };
    let text = String::from_utf8_lossy(rest);
    let settings = MarkupSettings {
        strip_comments: flags & 1 != 0,
        compress_whitespace: flags & 2 != 0,
        ..MarkupSettings::default()
    };
    let Ok(markup) = parse_str(&text, settings, DocumentKey::default()) else {
        return;
    };
    for element in markup.elements() {
        if let MarkupElement::Tag(component) = element {
            assert!(!component.tag.is_draft(), "component tags are frozen after parsing");
        }
    }
    let mut previous_raw = false;
    for element in markup.elements() {
        let raw = matches!(element, MarkupElement::Raw(_));
        assert!(!(raw && previous_raw), "adjacent raw elements are merged");
        previous_raw = raw;
    }
});
