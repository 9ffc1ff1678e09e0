mod theme;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser, Subcommand};
use crossterm::tty::IsTty;
use stylescan_core::FormattedText;
use stylescan_grammars::{calc, GrammarKind};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::theme::Theme;

#[derive(Parser)]
#[command(name = "stylescan")]
#[command(about = "Grammar-driven syntax highlighting")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Highlight a file to the terminal
    Highlight {
        #[arg(short, long, default_value = "json")]
        grammar: GrammarKind,
        /// JSON theme file extending the grammar's built-in theme
        #[arg(short, long)]
        theme: Option<PathBuf>,
        /// Print plain text even on a terminal
        #[arg(long)]
        no_color: bool,
        /// Input file (stdin if omitted)
        path: Option<PathBuf>,
    },

    /// Highlight a file to HTML
    Html {
        #[arg(short, long, default_value = "json")]
        grammar: GrammarKind,
        /// Class of the wrapping <pre> element
        #[arg(long, default_value = "highlight")]
        css_class: String,
        /// Input file (stdin if omitted)
        path: Option<PathBuf>,
    },

    /// Print the fragments of each line as JSON
    Lines {
        #[arg(short, long, default_value = "json")]
        grammar: GrammarKind,
        /// Input file (stdin if omitted)
        path: Option<PathBuf>,
    },

    /// Check that a file matches a grammar
    Check {
        #[arg(short, long, default_value = "json")]
        grammar: GrammarKind,
        /// Report columns only, without line numbers
        #[arg(long)]
        single_line: bool,
        /// Input file (stdin if omitted)
        path: Option<PathBuf>,
    },

    /// Evaluate a calculator expression
    Eval {
        /// Expression (stdin if omitted)
        expr: Option<String>,
    },

    /// List the available grammars
    Grammars,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Highlight {
            grammar,
            theme,
            no_color,
            path,
        } => cmd_highlight(grammar, theme.as_deref(), no_color, path.as_deref()),
        Command::Html {
            grammar,
            css_class,
            path,
        } => cmd_html(grammar, &css_class, path.as_deref()),
        Command::Lines { grammar, path } => cmd_lines(grammar, path.as_deref()),
        Command::Check {
            grammar,
            single_line,
            path,
        } => cmd_check(grammar, single_line, path.as_deref()),
        Command::Eval { expr } => cmd_eval(expr),
        Command::Grammars => cmd_grammars(),
    }
}

fn init_logging(verbose: u8) {
    let filter = if verbose > 0 {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

fn read_source(path: Option<&Path>) -> String {
    match path {
        Some(p) => {
            if !p.exists() {
                fail(format!("file not found: {}", p.display()));
            }
            match std::fs::read(p) {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(source) => source,
                    Err(e) => fail(format!("{} is not UTF-8 text: {e}", p.display())),
                },
                Err(e) => fail(format!("reading {}: {e}", p.display())),
            }
        }
        None => match io::read_to_string(io::stdin()) {
            Ok(source) => source,
            Err(e) => fail(format!("reading stdin: {e}")),
        },
    }
}

fn source_label(path: Option<&Path>) -> String {
    path.map_or_else(|| "<stdin>".to_string(), |p| p.display().to_string())
}

fn write_stdout(text: &str) {
    let mut stdout = io::stdout().lock();
    if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
        fail(format!("writing output: {e}"));
    }
}

fn paint(fragments: &FormattedText, theme: &Theme) -> String {
    let mut out = String::new();
    for fragment in fragments.iter() {
        let style = theme.resolve(&fragment.style);
        if style.is_plain() {
            out.push_str(&fragment.text);
        } else {
            out.push_str(&style.to_content_style().apply(&fragment.text).to_string());
        }
    }
    out
}

fn cmd_highlight(
    grammar: GrammarKind,
    theme_path: Option<&Path>,
    no_color: bool,
    path: Option<&Path>,
) {
    let source = read_source(path);
    let pph = grammar.highlighter();
    debug!(%grammar, bytes = source.len(), "highlighting");
    let fragments = pph.highlight(&source);

    if no_color || !io::stdout().is_tty() {
        write_stdout(&fragments.text());
        return;
    }

    let mut theme = Theme::from_pairs(grammar.default_theme().iter().copied());
    if let Some(theme_path) = theme_path {
        match Theme::load(theme_path) {
            Ok(custom) => theme.extend(custom),
            Err(e) => fail(e),
        }
    }
    write_stdout(&paint(&fragments, &theme));
}

fn cmd_html(grammar: GrammarKind, css_class: &str, path: Option<&Path>) {
    let source = read_source(path);
    let mut html = grammar
        .highlighter()
        .highlight_html_with_class(&source, css_class);
    html.push('\n');
    write_stdout(&html);
}

fn cmd_lines(grammar: GrammarKind, path: Option<&Path>) {
    let source = read_source(path);
    let view = grammar.highlighter().lex_document(&source);
    let mut out = String::new();
    for line in view.iter() {
        match serde_json::to_string(line) {
            Ok(json) => {
                out.push_str(&json);
                out.push('\n');
            }
            Err(e) => fail(format!("encoding line: {e}")),
        }
    }
    write_stdout(&out);
}

fn cmd_check(grammar: GrammarKind, single_line: bool, path: Option<&Path>) {
    let source = read_source(path);
    let label = source_label(path);
    let Some(validator) = grammar.validator() else {
        fail(format!(
            "the {grammar} grammar matches single tokens and cannot check whole inputs"
        ));
    };
    match validator.multiline(!single_line).validate(&source) {
        Ok(()) => eprintln!("OK: {label}"),
        Err(e) => {
            eprintln!("{label}: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_eval(expr: Option<String>) {
    let source = expr.unwrap_or_else(|| read_source(None));
    match calc::evaluate(&source) {
        Ok(value) => println!("{value}"),
        Err(e) => {
            let (_, column) = e.line_col(&source);
            fail(format!("column {column}: {e}"));
        }
    }
}

fn cmd_grammars() {
    for kind in GrammarKind::ALL {
        println!("{:<6} {}", kind.name(), kind.description());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_paint_leaves_unstyled_text_plain() {
        let theme = Theme::from_pairs(GrammarKind::Calc.default_theme().iter().copied());
        let fragments = GrammarKind::Calc.highlighter().highlight("(1)");
        let painted = paint(&fragments, &theme);
        assert!(painted.starts_with('('));
        assert!(painted.ends_with(')'));
        assert_eq!(paint(&fragments, &Theme::default()), "(1)");
    }
}
