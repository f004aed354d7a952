//! `stencil`: inspect and validate template markup from the command line.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use core_types::{DocumentKey, SourceKind};
use markup::{
    CharSource, DocumentParseContext, MarkupParser, MarkupSettings, Tokenizer, TokenizerConfig,
    format_element, format_event,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Tokenize, balance-check and assemble template markup
#[derive(Parser, Debug)]
#[command(name = "stencil")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Print every tokenizer event
    stencil events page.html

    # Check tag balance, reading from stdin
    cat page.html | stencil check -

    # Show the assembled markup of an inline snippet
    stencil markup --html '<wicket:panel>hi</wicket:panel>'
"#)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print one line per tokenizer event
    Events(InputArgs),
    /// Run the full filter chain and report only success or the first error
    Check(InputArgs),
    /// Print the assembled markup: raw text and component tags
    Markup(InputArgs),
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Markup file, or `-` for stdin
    #[arg(value_name = "FILE", required_unless_present = "html")]
    path: Option<PathBuf>,

    /// Parse the given markup string instead of a file
    #[arg(long, value_name = "MARKUP", conflicts_with = "path")]
    html: Option<String>,

    /// Framework namespace prefix
    #[arg(long, default_value = markup::parser::DEFAULT_NAMESPACE)]
    namespace: String,

    /// Drop plain comments from the assembled markup
    #[arg(long)]
    strip_comments: bool,

    /// Collapse whitespace runs outside <pre>
    #[arg(long)]
    compress_whitespace: bool,

    /// Fail unless the document starts with an XML declaration
    #[arg(long)]
    require_xml_declaration: bool,
}

impl InputArgs {
    fn source_kind(&self) -> SourceKind {
        match (&self.html, &self.path) {
            (Some(_), _) => SourceKind::Inline,
            (None, Some(path)) if path.as_os_str() == "-" => SourceKind::Stream,
            _ => SourceKind::File,
        }
    }

    fn label(&self) -> String {
        match self.source_kind() {
            SourceKind::Inline => "<inline>".to_string(),
            SourceKind::Stream => "<stdin>".to_string(),
            SourceKind::File => self
                .path
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_default(),
        }
    }

    fn load(&self) -> Result<CharSource> {
        let kind = self.source_kind();
        log::debug!(target: "stencil", "loading {} source {}", kind.as_str(), self.label());
        let source = match kind {
            SourceKind::Inline => CharSource::new(self.html.clone().unwrap_or_default()),
            SourceKind::Stream => CharSource::from_reader(io::stdin().lock())
                .context("failed to read markup from stdin")?,
            SourceKind::File => {
                let Some(path) = &self.path else {
                    bail!("no input given");
                };
                CharSource::open(path)
                    .with_context(|| format!("failed to load {}", path.display()))?
            }
        };
        Ok(source)
    }

    fn settings(&self) -> MarkupSettings {
        MarkupSettings {
            namespace: self.namespace.clone(),
            strip_comments: self.strip_comments,
            compress_whitespace: self.compress_whitespace,
            require_xml_declaration: self.require_xml_declaration,
            tokenizer: TokenizerConfig::default(),
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let key = DocumentKey::new(u64::from(std::process::id()), 1);
    match cli.command {
        Command::Events(args) => events(&args, key),
        Command::Check(args) => check(&args, key),
        Command::Markup(args) => markup(&args, key),
    }
}

fn events(args: &InputArgs, key: DocumentKey) -> Result<ExitCode> {
    let source = args.load()?;
    let mut ctx = DocumentParseContext::new(key);
    let mut tokenizer = Tokenizer::new(source.clone(), args.settings().tokenizer);
    while let Some(event) = tokenizer
        .next_event(&mut ctx)
        .with_context(|| format!("tokenizing {}", args.label()))?
    {
        println!("{}", format_event(&event, &source));
    }
    println!("EOF");
    Ok(ExitCode::SUCCESS)
}

fn check(args: &InputArgs, key: DocumentKey) -> Result<ExitCode> {
    let source = args.load()?;
    let parser = MarkupParser::new(source, args.settings(), key);
    let stages = parser.stage_names().join(" <- ");
    match parser.parse() {
        Ok(markup) => {
            let components = markup.component_tags().count();
            println!(
                "{}: ok ({} elements, {} component tags; {stages})",
                args.label(),
                markup.len(),
                components
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            let category = err
                .as_parse()
                .map(|parse| format!(" [{:?}]", parse.category()))
                .unwrap_or_default();
            eprintln!("{}: {err}{category}", args.label());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn markup(args: &InputArgs, key: DocumentKey) -> Result<ExitCode> {
    let source = args.load()?;
    let markup = MarkupParser::new(source, args.settings(), key)
        .parse()
        .with_context(|| format!("parsing {}", args.label()))?;
    if let Some(doctype) = markup.doctype() {
        println!("# doctype: {doctype}");
    }
    if let Some(encoding) = markup.xml_encoding() {
        println!("# encoding: {encoding}");
    }
    for element in markup.elements() {
        println!("{}", format_element(element));
    }
    println!("EOF");
    Ok(ExitCode::SUCCESS)
}
