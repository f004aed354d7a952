#![no_main]

use core_types::DocumentKey;
use libfuzzer_sys::fuzz_target;
use markup::{CharSource, DocumentParseContext, Tokenizer, TokenizerConfig};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let mut ctx = DocumentParseContext::new(DocumentKey::default());
    let mut tokenizer = Tokenizer::new(CharSource::new(text.as_ref()), TokenizerConfig::default());
    let mut cursor = 0;
    loop {
        match tokenizer.next_event(&mut ctx) {
            Ok(Some(event)) => {
                let span = event.span();
                assert_eq!(span.start, cursor, "events must tile the input");
                assert!(span.end <= text.len());
                cursor = span.end;
            }
            Ok(None) => {
                assert_eq!(cursor, text.len(), "input not fully consumed");
                break;
            }
            Err(err) => {
                let again = tokenizer
                    .next_event(&mut ctx)
                    .expect_err("a failed tokenizer stays failed");
                assert_eq!(err, again);
                break;
            }
        }
    }
});
