use std::path::PathBuf;

use anyhow::bail;
use baa_lexer::{Lexer, TokenKind};
use baa_preprocessor::{Preprocessor, PreprocessorConfig, SourceInput};
use baa_syntax::{types::TypeRegistry, Parser as BaaParser};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use tracing::{error, metadata::LevelFilter};
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "baa", about = "أدوات الواجهة الأمامية للغة باء")]
pub struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the preprocessor and print the processed text, or the
    /// diagnostic summary on failure.
    Preprocess {
        /// Source file (UTF-8 or UTF-16LE).
        file: Utf8PathBuf,

        /// Include search directories for `#تضمين <…>`.
        #[arg(short = 'I', long = "include")]
        include: Vec<Utf8PathBuf>,

        /// Print every collected diagnostic instead of only the summary.
        #[arg(long)]
        dump_diagnostics: bool,
    },
    /// Preprocess, lex, and parse; print the token-consumption trace and
    /// the final error state.
    Parse {
        /// Source file (UTF-8 or UTF-16LE).
        file: Utf8PathBuf,

        /// Include search directories for `#تضمين <…>`.
        #[arg(short = 'I', long = "include")]
        include: Vec<Utf8PathBuf>,
    },
}

fn run_preprocessor(file: &Utf8PathBuf, include: &[Utf8PathBuf]) -> (String, Preprocessor) {
    let include_dirs: Vec<PathBuf> = include.iter().map(|dir| dir.as_std_path().into()).collect();
    let mut preprocessor = Preprocessor::new(include_dirs, PreprocessorConfig::default());
    let output = preprocessor.run(SourceInput::File(file.as_std_path().into()));
    (output, preprocessor)
}

pub fn fallible_main(args: Args) -> anyhow::Result<()> {
    match args.command {
        Command::Preprocess {
            file,
            include,
            dump_diagnostics,
        } => {
            let (output, preprocessor) = run_preprocessor(&file, &include);
            if dump_diagnostics {
                for diagnostic in preprocessor.diagnostics.iter() {
                    eprintln!("{}", diagnostic.message);
                }
            }
            if preprocessor.diagnostics.had_fatal() || preprocessor.diagnostics.error_count() > 0 {
                bail!("{}", preprocessor.diagnostics.summary());
            }
            print!("{output}");
            Ok(())
        }
        Command::Parse { file, include } => {
            let (processed, preprocessor) = run_preprocessor(&file, &include);
            if preprocessor.diagnostics.had_fatal() || preprocessor.diagnostics.error_count() > 0 {
                bail!("{}", preprocessor.diagnostics.summary());
            }

            // The consumption trace: every non-trivia token in order.
            let mut lexer = Lexer::new(&processed, file.as_str());
            loop {
                let token = lexer.next_token();
                if token.kind.is_trivia() {
                    continue;
                }
                println!(
                    "{}:{}\t{:?}\t'{}'",
                    token.span.start.line, token.span.start.column, token.kind, token.lexeme
                );
                if token.kind == TokenKind::Eof {
                    break;
                }
            }

            let registry = TypeRegistry::new();
            let mut parser = BaaParser::new(Lexer::new(&processed, file.as_str()), &registry);
            let program = parser.parse_program();
            for diagnostic in parser.diagnostics() {
                eprintln!("{}", diagnostic.message);
            }
            let declaration_count = match &program.kind {
                baa_syntax::ast::NodeKind::Program { declarations } => declarations.len(),
                _ => 0,
            };
            println!("الإعلانات: {declaration_count}");
            println!(
                "حالة الأخطاء: {}",
                if parser.had_error() {
                    "فشل"
                } else {
                    "نجاح"
                }
            );
            if parser.had_error() {
                bail!("فشل التحليل: راجع الأخطاء أعلاه.");
            }
            Ok(())
        }
    }
}

fn main() {
    let subscriber = tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        );
    tracing::subscriber::set_global_default(subscriber)
        .expect("cannot set default tracing subscriber");

    let args = Args::parse();

    match fallible_main(args) {
        Ok(_) => (),
        Err(error) => {
            error!("{error}");
            std::process::exit(1);
        }
    }
}
