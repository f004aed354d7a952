use core_types::DocumentKey;
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use markup::{
    CharSource, DocumentParseContext, MarkupSettings, TokenizerConfig, parse_str, tokenize,
};

const SMALL_BLOCKS: usize = 64;
const LARGE_BLOCKS: usize = 20_000;

fn make_blocks(blocks: usize) -> String {
    let block = "<div class=box><span wicket:id=\"label\">hello</span><img src=x><wicket:container>a</wicket:container></div>\n";
    let mut out = String::with_capacity(block.len() * blocks + 32);
    out.push_str("<html><body>\n");
    for _ in 0..blocks {
        out.push_str(block);
    }
    out.push_str("</body></html>\n");
    out
}

fn make_rawtext_adversarial(bytes: usize) -> String {
    let mut body = String::with_capacity(bytes + 32);
    body.push_str("<script>");
    while body.len() < bytes {
        body.push_str("</scri");
        body.push('<');
        body.push_str("pt");
    }
    body.push_str("</script>");
    body
}

fn bench_tokenize(c: &mut Criterion, name: &str, input: &str) {
    c.bench_function(name, |b| {
        b.iter_batched(
            || CharSource::new(input),
            |source| {
                let mut ctx = DocumentParseContext::new(DocumentKey::default());
                let events = tokenize(black_box(source), TokenizerConfig::default(), &mut ctx)
                    .expect("bench input should tokenize");
                black_box(events.len());
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_tokenize_small(c: &mut Criterion) {
    bench_tokenize(c, "bench_tokenize_small", &make_blocks(SMALL_BLOCKS));
}

fn bench_tokenize_large(c: &mut Criterion) {
    bench_tokenize(c, "bench_tokenize_large", &make_blocks(LARGE_BLOCKS));
}

fn bench_tokenize_rawtext_adversarial(c: &mut Criterion) {
    bench_tokenize(
        c,
        "bench_tokenize_rawtext_adversarial",
        &make_rawtext_adversarial(512 * 1024),
    );
}

fn bench_parse_large_end_to_end(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    c.bench_function("bench_parse_large_end_to_end", |b| {
        b.iter(|| {
            let markup = parse_str(
                black_box(&input),
                MarkupSettings::default(),
                DocumentKey::default(),
            )
            .expect("bench input should parse");
            black_box(markup.len());
        });
    });
}

fn bench_parse_compressed(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    let settings = MarkupSettings {
        strip_comments: true,
        compress_whitespace: true,
        ..MarkupSettings::default()
    };
    c.bench_function("bench_parse_compressed", |b| {
        b.iter(|| {
            let markup = parse_str(black_box(&input), settings.clone(), DocumentKey::default())
                .expect("bench input should parse");
            black_box(markup.len());
        });
    });
}

criterion_group!(
    benches,
    bench_tokenize_small,
    bench_tokenize_large,
    bench_tokenize_rawtext_adversarial,
    bench_parse_large_end_to_end,
    bench_parse_compressed
);
criterion_main!(benches);
