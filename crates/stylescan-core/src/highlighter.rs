use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use stylescan_grammar::Rule;

use crate::fragment::{assemble, FormattedText};
use crate::html::{self, DEFAULT_CSS_CLASS};
use crate::lines::LineView;
use crate::scanner::{ScanReport, Scanner};
use crate::style::{StyleTag, TokenType};
use crate::styler::{SpanTable, Styler};
use crate::HighlightError;

/// Highlighter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlighterOptions {
    /// The grammar styles with [`TokenType`]s rather than style strings.
    pub uses_token_styles: bool,
    /// Class of the wrapping element in HTML output.
    pub css_class: String,
}

impl Default for HighlighterOptions {
    fn default() -> Self {
        Self {
            uses_token_styles: false,
            css_class: DEFAULT_CSS_CLASS.to_string(),
        }
    }
}

/// Syntax highlighting driven by a grammar.
///
/// The grammar is built by a parser factory that receives the highlighter's
/// [`Styler`] and wraps the rules whose matches should be styled:
///
/// ```
/// use stylescan_core::Highlighter;
/// use stylescan_grammar::{integer, literal};
///
/// let pph = Highlighter::new(|styler| {
///     styler
///         .wrap("class:int", integer())
///         .padded()
///         .separated(literal(",").padded())
/// });
/// let fragments = pph.highlight("1, 2, 3");
/// assert_eq!(fragments.len(), 5);
/// assert_eq!(fragments[1].text, ", ");
/// ```
///
/// A highlighter owns one span table and is neither `Send` nor `Sync`.
pub struct Highlighter<O = ()> {
    styler: Styler,
    table: Rc<RefCell<SpanTable>>,
    rule: Rule<O>,
    options: HighlighterOptions,
    last_report: RefCell<ScanReport>,
}

impl<O: 'static> Highlighter<O> {
    pub fn new(factory: impl FnOnce(&Styler) -> Rule<O>) -> Self {
        Self::with_options(factory, HighlighterOptions::default())
    }

    pub fn with_options(
        factory: impl FnOnce(&Styler) -> Rule<O>,
        options: HighlighterOptions,
    ) -> Self {
        let table = Rc::new(RefCell::new(SpanTable::new()));
        let styler = Styler::with_table(Rc::clone(&table));
        let rule = factory(&styler);
        Self {
            styler,
            table,
            rule,
            options,
            last_report: RefCell::new(ScanReport::default()),
        }
    }

    /// The grammar's top-level rule.
    pub fn rule(&self) -> &Rule<O> {
        &self.rule
    }

    pub fn styler(&self) -> &Styler {
        &self.styler
    }

    pub fn options(&self) -> &HighlighterOptions {
        &self.options
    }

    /// Report of the most recent scan.
    pub fn last_report(&self) -> ScanReport {
        self.last_report.borrow().clone()
    }

    fn default_style(&self) -> StyleTag {
        if self.options.uses_token_styles {
            StyleTag::Token(TokenType::TEXT)
        } else {
            StyleTag::default()
        }
    }

    /// Scan `source` and assemble its fragments with the grammar's own tags.
    fn fragments(&self, source: &str) -> FormattedText {
        self.table.borrow_mut().clear();
        let report = Scanner::scan(&self.rule, Rc::clone(&self.table), source);
        *self.last_report.borrow_mut() = report;
        let table = self.table.borrow();
        assemble(source, &table, &self.default_style())
    }

    /// Highlight `source`. With token styles, tags are converted to
    /// `class:pygments.<token>` style strings.
    pub fn highlight(&self, source: &str) -> FormattedText {
        let fragments = self.fragments(source);
        if self.options.uses_token_styles {
            fragments.map_styles(StyleTag::to_class_style)
        } else {
            fragments
        }
    }

    /// Highlight raw bytes, which must be UTF-8.
    pub fn highlight_bytes(&self, source: &[u8]) -> Result<FormattedText, HighlightError> {
        let source = std::str::from_utf8(source)?;
        Ok(self.highlight(source))
    }

    /// Highlight `source` as HTML using the configured wrapper class.
    pub fn highlight_html(&self, source: &str) -> String {
        self.highlight_html_with_class(source, &self.options.css_class)
    }

    pub fn highlight_html_with_class(&self, source: &str, css_class: &str) -> String {
        html::render(&self.fragments(source), css_class)
    }

    /// Highlight `source` for line-by-line access.
    pub fn lex_document(&self, source: &str) -> LineView {
        LineView::new(self.highlight(source))
    }
}

impl<O> fmt::Debug for Highlighter<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Highlighter")
            .field("rule", &self.rule)
            .field("options", &self.options)
            .finish()
    }
}
