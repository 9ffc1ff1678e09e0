//! WASM bindings for the stylescan highlighter.
//!
//! Exposes highlighting with the bundled grammars to JavaScript via
//! wasm-bindgen. Fragments cross the boundary as `[style, text]` pairs;
//! unknown grammar names throw.

use stylescan_core::{FormattedText, Highlighter};
use stylescan_grammars::{GrammarKind, UnknownGrammar};
use wasm_bindgen::prelude::*;

type Pairs = Vec<(String, String)>;

fn highlighter(grammar: &str) -> Result<Highlighter, UnknownGrammar> {
    grammar.parse::<GrammarKind>().map(GrammarKind::highlighter)
}

fn pairs(fragments: &FormattedText) -> Pairs {
    fragments
        .iter()
        .map(|f| (f.style.to_string(), f.text.clone()))
        .collect()
}

fn fragment_pairs(grammar: &str, source: &str) -> Result<Pairs, UnknownGrammar> {
    Ok(pairs(&highlighter(grammar)?.highlight(source)))
}

fn line_pairs(grammar: &str, source: &str) -> Result<Vec<Pairs>, UnknownGrammar> {
    let view = highlighter(grammar)?.lex_document(source);
    Ok(view.iter().map(pairs).collect())
}

fn render_html(
    grammar: &str,
    source: &str,
    css_class: Option<&str>,
) -> Result<String, UnknownGrammar> {
    let pph = highlighter(grammar)?;
    Ok(match css_class {
        Some(class) => pph.highlight_html_with_class(source, class),
        None => pph.highlight_html(source),
    })
}

fn js_error(err: impl std::fmt::Display) -> JsError {
    JsError::new(&err.to_string())
}

/// Highlight `source` with the named grammar.
///
/// Returns an array of `[style, text]` pairs whose texts concatenate to
/// `source`.
#[wasm_bindgen]
pub fn highlight(grammar: &str, source: &str) -> Result<JsValue, JsError> {
    let fragments = fragment_pairs(grammar, source).map_err(js_error)?;
    serde_wasm_bindgen::to_value(&fragments).map_err(js_error)
}

/// Highlight `source` as a `<pre>` element with one `<span>` per styled
/// fragment. `css_class` defaults to `highlight`.
#[wasm_bindgen(js_name = highlightHtml)]
pub fn highlight_html(
    grammar: &str,
    source: &str,
    css_class: Option<String>,
) -> Result<String, JsError> {
    render_html(grammar, source, css_class.as_deref()).map_err(js_error)
}

/// Highlight `source` and split the fragments into lines, one array of
/// `[style, text]` pairs per line.
#[wasm_bindgen(js_name = highlightLines)]
pub fn highlight_lines(grammar: &str, source: &str) -> Result<js_sys::Array, JsError> {
    let lines = line_pairs(grammar, source).map_err(js_error)?;
    let array = js_sys::Array::new();
    for line in &lines {
        array.push(&serde_wasm_bindgen::to_value(line).map_err(js_error)?);
    }
    Ok(array)
}

/// Names of the bundled grammars.
#[wasm_bindgen]
pub fn grammars() -> js_sys::Array {
    GrammarKind::ALL
        .iter()
        .map(|kind| JsValue::from_str(kind.name()))
        .collect()
}

/// Get the highlighter version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
