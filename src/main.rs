use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use bibstream::{CommentGroup, Declaration, Parser, ParserConfig, Scanner, TokenStream};
use clap::Parser as _;
use tracing::Level;

#[derive(clap::Parser)]
#[command(name = "bibstream", version)]
#[command(about = "Print the declarations of a BibTeX file")]
struct Args {
    /// BibTeX file to read, or standard input when omitted
    path: Option<PathBuf>,
    /// Write one JSON object per line
    #[arg(long)]
    json: bool,
    /// Print the token stream instead of declarations
    #[arg(long, conflicts_with_all = ["lowercase_types", "no_comments"])]
    tokens: bool,
    /// Lowercase the type names of regular entries
    #[arg(long)]
    lowercase_types: bool,
    /// Do not report comments
    #[arg(long)]
    no_comments: bool,
    /// Log to standard error; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let input: Box<dyn Read> = match &args.path {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin().lock()),
    };
    tracing::info!(path = ?args.path, "reading");

    let mut out = BufWriter::new(io::stdout().lock());
    let result = if args.tokens {
        write_tokens(&mut out, Scanner::from_reader(input), args.json)
    } else {
        let config = ParserConfig {
            lowercase_entry_types: args.lowercase_types,
            discard_comments: args.no_comments,
        };
        let parser = Parser::with_config(Scanner::from_reader(input), config);
        write_declarations(&mut out, parser, args.json)
    };
    out.flush()?;
    result
}

fn write_tokens<W: Write, T: TokenStream + Iterator<Item = bibstream::Token>>(
    out: &mut W,
    mut scanner: T,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    for token in scanner.by_ref() {
        if json {
            serde_json::to_writer(&mut *out, &token)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}\t{:?}\t{}", token.position, token.kind, token.text)?;
        }
    }

    match scanner.error() {
        Some(err) => Err(err.clone().into()),
        None => Ok(()),
    }
}

fn write_declarations<W: Write, T: TokenStream>(
    out: &mut W,
    parser: Parser<T>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    for decl in parser {
        let decl = decl?;
        if json {
            serde_json::to_writer(&mut *out, &decl)?;
            writeln!(out)?;
        } else {
            write_declaration(out, &decl)?;
        }
    }
    Ok(())
}

fn write_comments<W: Write>(out: &mut W, comments: &CommentGroup) -> io::Result<()> {
    writeln!(out, "Comments:")?;
    for (i, comment) in comments.iter().enumerate() {
        writeln!(out, "{i}: {comment}")?;
    }
    Ok(())
}

fn write_declaration<W: Write>(out: &mut W, decl: &Declaration) -> io::Result<()> {
    match decl {
        Declaration::Entry(entry) => {
            writeln!(out, "Type: {}", entry.type_name)?;
            writeln!(out, "Cite key: {}", entry.cite_key)?;
            write_comments(out, &entry.comments)?;
            writeln!(out, "Fields:")?;
            for field in &entry.fields {
                writeln!(out, "{} = {}", field.key, field.value)?;
            }
        }
        Declaration::Preamble(preamble) => {
            writeln!(out, "Type: preamble")?;
            write_comments(out, &preamble.comments)?;
            writeln!(out, "Value:")?;
            writeln!(out, "{}", preamble.value)?;
        }
        Declaration::Abbrev(abbrev) => {
            writeln!(out, "Type: string")?;
            write_comments(out, &abbrev.comments)?;
            writeln!(out, "Field:")?;
            writeln!(out, "{} = {}", abbrev.field.key, abbrev.field.value)?;
        }
        Declaration::Bad => return Ok(()),
    }
    writeln!(out)
}
