//! Prompt templates with `{query}` and `{document}` placeholders.

use crate::error::{OtrError, Result};
use std::path::Path;

const QUERY_PLACEHOLDER: &str = "{query}";
const DOCUMENT_PLACEHOLDER: &str = "{document}";

const VERBOSE: &str = r#"Task: Evaluate Relevance of Search Result
Definition of On-Topic Rate: The on-topic rate measures the percentage of search results that are relevant to the intended topic. A document is considered "on-topic" if it is primarily about the query or strongly relevant to the query.
The question is "{query}"
Instructions:
1. Focus on Semantic Matching: Do not rely solely on keyword matching. Carefully consider the user's intent behind the query and whether the document truly addresses that intent.
2. Thoroughly Analyze Document Content: Take into account all provided information about the document, including the title, body, and any additional context.
3. Provide Detailed Reasoning: Explain your reasoning for the relevance decision, highlighting specific aspects of the document that support your judgment.
Query: "{query}"
Document: "{document}"
Response Format:
respond with a JSON object
{"relevance": <0 or 1>} where 1 means relevant and 0 not relevant.
"#;

const CONCISE: &str = r#"Decide whether the document is on-topic for the query. A document is on-topic if it is primarily about the query or strongly relevant to it.
Query: "{query}"
Document: "{document}"
Respond with only a JSON object {"relevance": <0 or 1>} where 1 means relevant and 0 not relevant.
"#;

/// Built-in prompt wordings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptPreset {
    Verbose,
    Concise,
}

impl std::str::FromStr for PromptPreset {
    type Err = OtrError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "verbose" => Ok(PromptPreset::Verbose),
            "concise" => Ok(PromptPreset::Concise),
            other => Err(OtrError::Template(format!(
                "unknown prompt preset '{}' (expected verbose or concise)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Literal(usize, usize),
    Query,
    Document,
}

/// Parsed template. Placeholders are located once; rendering substitutes the
/// query and document verbatim, so placeholder-looking text inside either value
/// is never expanded.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse a template. It must mention both `{query}` and `{document}`.
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let mut segments = Vec::new();
        let mut start = 0;
        let mut pos = 0;

        while let Some(offset) = source[pos..].find('{') {
            let at = pos + offset;
            let rest = &source[at..];
            let hit = if rest.starts_with(QUERY_PLACEHOLDER) {
                Some((Segment::Query, QUERY_PLACEHOLDER.len()))
            } else if rest.starts_with(DOCUMENT_PLACEHOLDER) {
                Some((Segment::Document, DOCUMENT_PLACEHOLDER.len()))
            } else {
                None
            };
            match hit {
                Some((segment, len)) => {
                    if at > start {
                        segments.push(Segment::Literal(start, at));
                    }
                    segments.push(segment);
                    pos = at + len;
                    start = pos;
                }
                None => pos = at + 1,
            }
        }
        if start < source.len() {
            segments.push(Segment::Literal(start, source.len()));
        }

        let required = [
            (Segment::Query, QUERY_PLACEHOLDER),
            (Segment::Document, DOCUMENT_PLACEHOLDER),
        ];
        for (segment, name) in required {
            if !segments.contains(&segment) {
                return Err(OtrError::Template(format!("template is missing {}", name)));
            }
        }

        Ok(Self { source, segments })
    }

    pub fn preset(preset: PromptPreset) -> Self {
        let source = match preset {
            PromptPreset::Verbose => VERBOSE,
            PromptPreset::Concise => CONCISE,
        };
        Self::new(source).expect("built-in templates contain both placeholders")
    }

    /// Load a custom template from a text file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            OtrError::Template(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::new(source)
    }

    pub fn render(&self, query: &str, document: &str) -> String {
        let mut out = String::with_capacity(self.source.len() + query.len() * 2 + document.len());
        for segment in &self.segments {
            match *segment {
                Segment::Literal(from, to) => out.push_str(&self.source[from..to]),
                Segment::Query => out.push_str(query),
                Segment::Document => out.push_str(document),
            }
        }
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::preset(PromptPreset::Verbose)
    }
}
