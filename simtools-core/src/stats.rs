//! Narrative content statistics for the game script.
//!
//! The script is mined with five independent passes, one per [`Category`].
//! Each pass yields [`NarrativeUnit`]s; the [`Report`] sums screens over the
//! four screen-like categories and words over all of them. Categories are
//! never deduplicated against each other.

use regex::Regex;
use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::config::DEFAULT_LOOKBACK;
use crate::escape::decode_literal;
use crate::{Result, ToolsError};

const INTRO_ARRAY_NAME: &str = "introDialogues";
const INTRO_SCREEN_FN: &str = "showIntroScreen";
const INTRO_FN: &str = "showIntro";
const DIALOGUE_FN: &str = "setDialogue";
const CHOICES_FN: &str = "showChoicesHTML";

/// A single- or double-quoted literal on one line. Group 1 holds the body of
/// a `'...'` literal, group 2 the body of a `"..."` literal.
const LITERAL: &str = r#"(?:'((?:\\.|[^'\\\n])*)'|"((?:\\.|[^"\\\n])*)")"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    IntroArray,
    IntroScreenCall,
    IntroCall,
    DialogueCall,
    ChoiceButton,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::IntroArray,
        Category::IntroScreenCall,
        Category::IntroCall,
        Category::DialogueCall,
        Category::ChoiceButton,
    ];

    /// Choice buttons contribute words but are not screens.
    pub fn is_screen(self) -> bool {
        !matches!(self, Category::ChoiceButton)
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::IntroArray => "intro-array",
            Category::IntroScreenCall => "intro-screen-call",
            Category::IntroCall => "intro-call",
            Category::DialogueCall => "dialogue-call",
            Category::ChoiceButton => "choice-button",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrativeUnit {
    pub category: Category,
    /// Text as captured from the source.
    pub raw: String,
    /// Escapes resolved and whitespace normalised.
    pub text: String,
    /// Byte offset of the match in the normalised source.
    pub offset: usize,
}

impl NarrativeUnit {
    pub fn word_count(&self) -> usize {
        count_words(&self.text)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryTally {
    pub units: usize,
    pub words: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub screens: usize,
    pub words: usize,
    pub breakdown: Vec<(Category, CategoryTally)>,
}

impl Report {
    pub fn from_units(units: &[NarrativeUnit]) -> Self {
        let mut breakdown: Vec<(Category, CategoryTally)> = Category::ALL
            .iter()
            .map(|c| (*c, CategoryTally::default()))
            .collect();

        let mut screens = 0;
        let mut words = 0;
        for unit in units {
            let w = unit.word_count();
            words += w;
            if unit.category.is_screen() {
                screens += 1;
            }
            if let Some((_, tally)) = breakdown.iter_mut().find(|(c, _)| *c == unit.category) {
                tally.units += 1;
                tally.words += w;
            }
        }

        Self {
            screens,
            words,
            breakdown,
        }
    }

    pub fn tally(&self, category: Category) -> CategoryTally {
        self.breakdown
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, t)| *t)
            .unwrap_or_default()
    }

    /// The per-category lines printed under the two summary lines.
    pub fn breakdown_lines(&self) -> Vec<String> {
        self.breakdown
            .iter()
            .map(|(c, t)| format!("  {}: {} units, {} words", c, t.units, t.words))
            .collect()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SCREENS: {}", self.screens)?;
        write!(f, "WORDS: {}", self.words)
    }
}

/// A call pass: `callee(<literal>...)`, optionally ignoring matches that
/// follow a `function <guard>(` header too closely.
struct CallPass {
    category: Category,
    pattern: Regex,
    guard: Option<Regex>,
}

fn static_regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static pattern is valid"))
}

fn intro_array_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, &format!(r"(?s)const\s+{INTRO_ARRAY_NAME}\s*=\s*\[(.*?)\];"))
}

fn literal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, LITERAL)
}

fn choices_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, &format!(r"(?s){CHOICES_FN}\(\s*`(.*?)`\s*\)"))
}

fn button_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"(?s)<button[^>]*>(.*?)</button>")
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"\s+")
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    static_regex(&RE, r"[\w\x{0400}-\x{04FF}]+")
}

fn call_pattern(callee: &str, sole_argument: bool) -> Regex {
    let tail = if sole_argument { r"\s*\)" } else { "" };
    Regex::new(&format!(r"{}\(\s*{LITERAL}{tail}", regex::escape(callee)))
        .expect("call pattern is built from a literal name")
}

fn declaration_pattern(name: &str) -> Regex {
    Regex::new(&format!(r"function\s+{}\s*\(", regex::escape(name)))
        .expect("declaration pattern is built from a literal name")
}

/// Count maximal runs of word characters, Cyrillic included.
pub fn count_words(text: &str) -> usize {
    word_re().find_iter(&normalize(text)).count()
}

/// Replace non-breaking spaces with plain spaces.
pub fn normalize(source: &str) -> String {
    source.replace('\u{00A0}', " ")
}

fn literal_body<'t>(caps: &regex::Captures<'t>) -> Option<regex::Match<'t>> {
    caps.get(1).or_else(|| caps.get(2))
}

/// Spans of every `function <name>(` header in `text`.
fn declaration_spans(text: &str, pattern: &Regex) -> Vec<Range<usize>> {
    pattern.find_iter(text).map(|m| m.range()).collect()
}

/// True when `start` lies inside a header span or at most `lookback`
/// characters past its end.
fn is_guarded(text: &str, start: usize, spans: &[Range<usize>], lookback: usize) -> bool {
    spans.iter().any(|span| {
        if start < span.start {
            return false;
        }
        if start < span.end {
            return true;
        }
        text[span.end..start].chars().count() <= lookback
    })
}

pub struct Extractor {
    lookback: usize,
    calls: Vec<CallPass>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKBACK)
    }
}

impl Extractor {
    pub fn new(lookback: usize) -> Self {
        let calls = vec![
            CallPass {
                category: Category::IntroScreenCall,
                pattern: call_pattern(INTRO_SCREEN_FN, false),
                guard: Some(declaration_pattern(INTRO_SCREEN_FN)),
            },
            CallPass {
                category: Category::IntroCall,
                pattern: call_pattern(INTRO_FN, true),
                guard: Some(declaration_pattern(INTRO_SCREEN_FN)),
            },
            CallPass {
                category: Category::DialogueCall,
                pattern: call_pattern(DIALOGUE_FN, true),
                guard: None,
            },
        ];
        Self { lookback, calls }
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    /// Run every pass over `source` and return the units in pass order.
    pub fn extract(&self, source: &str) -> Vec<NarrativeUnit> {
        let text = normalize(source);
        let mut units = intro_array_units(&text);
        for pass in &self.calls {
            units.extend(self.call_units(&text, pass));
        }
        units.extend(choice_units(&text));

        for unit in &units {
            debug!(
                category = %unit.category,
                offset = unit.offset,
                raw = %unit.raw,
                text = %unit.text,
                "unit"
            );
        }
        units
    }

    pub fn report(&self, source: &str) -> Report {
        Report::from_units(&self.extract(source))
    }

    fn call_units(&self, text: &str, pass: &CallPass) -> Vec<NarrativeUnit> {
        let spans = pass
            .guard
            .as_ref()
            .map(|g| declaration_spans(text, g))
            .unwrap_or_default();

        pass.pattern
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                if is_guarded(text, whole.start(), &spans, self.lookback) {
                    debug!(category = %pass.category, offset = whole.start(), "skipped guarded call");
                    return None;
                }
                let body = literal_body(&caps)?;
                Some(NarrativeUnit {
                    category: pass.category,
                    raw: body.as_str().to_string(),
                    text: normalize(&decode_literal(body.as_str())),
                    offset: whole.start(),
                })
            })
            .collect()
    }
}

fn intro_array_units(text: &str) -> Vec<NarrativeUnit> {
    let Some(caps) = intro_array_re().captures(text) else {
        return Vec::new();
    };
    let Some(body) = caps.get(1) else {
        return Vec::new();
    };

    literal_re()
        .captures_iter(body.as_str())
        .filter_map(|lit| {
            let m = literal_body(&lit)?;
            Some(NarrativeUnit {
                category: Category::IntroArray,
                raw: m.as_str().to_string(),
                text: normalize(&decode_literal(m.as_str())),
                offset: body.start() + m.start(),
            })
        })
        .collect()
}

fn choice_units(text: &str) -> Vec<NarrativeUnit> {
    let mut units = Vec::new();
    for block in choices_re().captures_iter(text) {
        let Some(html) = block.get(1) else {
            continue;
        };
        for button in button_re().captures_iter(html.as_str()) {
            let Some(inner) = button.get(1) else {
                continue;
            };
            let collapsed = whitespace_re().replace_all(inner.as_str(), " ");
            units.push(NarrativeUnit {
                category: Category::ChoiceButton,
                raw: inner.as_str().to_string(),
                text: collapsed.trim().to_string(),
                offset: html.start() + inner.start(),
            });
        }
    }
    units
}

/// Read the script at `path` and report on it.
pub fn report_file(path: &Path, lookback: usize) -> Result<Report> {
    if !path.is_file() {
        return Err(ToolsError::Config(format!(
            "script not found: {}",
            path.display()
        )));
    }
    let source = fs::read_to_string(path)?;
    let extractor = Extractor::new(lookback);
    let report = extractor.report(&source);
    info!(
        path = %path.display(),
        lookback = extractor.lookback(),
        screens = report.screens,
        words = report.words,
        "script scanned"
    );
    Ok(report)
}
