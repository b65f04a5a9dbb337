use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::TypeError;

/// URL path separator.
pub const SEPARATOR: char = '/';

/// Characters escaped when a name is placed into a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Join URL parts with exactly one separator between each pair.
///
/// Separators at the joins are collapsed; the leading separator of the first
/// part and the trailing separator of the last part are kept. Parts that are
/// empty once trimmed are skipped.
pub fn join_url_parts(parts: &[&str]) -> String {
    let mut out = String::new();
    let last = parts.len().saturating_sub(1);
    for (i, part) in parts.iter().enumerate() {
        let mut piece = *part;
        if i > 0 {
            piece = piece.trim_start_matches(SEPARATOR);
        }
        if i < last {
            piece = piece.trim_end_matches(SEPARATOR);
        }
        if i == 0 {
            out.push_str(piece);
            continue;
        }
        if piece.is_empty() && i < last {
            continue;
        }
        if !out.ends_with(SEPARATOR) {
            out.push(SEPARATOR);
        }
        out.push_str(piece);
    }
    out
}

/// Strip the trailing separator, leaving paths without one untouched.
pub fn remove_trailing_slash(path: &str) -> &str {
    path.trim_end_matches(SEPARATOR)
}

/// Percent-encode a name for use as one URL path segment.
pub fn encode_segment(name: &str) -> String {
    utf8_percent_encode(name, SEGMENT).to_string()
}

/// Percent-decode one URL path segment.
pub fn decode_segment(raw: &str) -> Result<String, TypeError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| TypeError::InvalidSegment(raw.to_string()))
}

/// The part of a request URL following the reserved prefix.
///
/// The first segment is expected to be a content identifier but is kept as
/// raw text: validating it is the node's job. The remaining segments address
/// a location inside the DAG rooted at that identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestPath {
    identifier: String,
    segments: Vec<String>,
    trailing_slash: bool,
}

impl RequestPath {
    /// Parse the raw (percent-encoded) remainder of a request path.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let trailing_slash = raw.ends_with(SEPARATOR);
        let mut parts = raw.split(SEPARATOR).filter(|s| !s.is_empty());

        let first = parts.next().ok_or(TypeError::EmptyPath)?;
        let identifier =
            decode_segment(first).map_err(|_| TypeError::InvalidIdentifier(first.to_string()))?;
        let segments = parts.map(decode_segment).collect::<Result<Vec<_>, _>>()?;
        if let Some(bad) = segments.iter().find(|s| *s == "." || *s == "..") {
            return Err(TypeError::InvalidSegment(bad.clone()));
        }

        Ok(Self {
            identifier,
            segments,
            trailing_slash,
        })
    }

    /// Build a path from already-decoded parts.
    pub fn new(identifier: impl Into<String>, segments: Vec<String>) -> Self {
        Self {
            identifier: identifier.into(),
            segments,
            trailing_slash: false,
        }
    }

    /// The raw identifier segment.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Segments below the identifier.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether the request URL ended with a separator.
    pub fn has_trailing_slash(&self) -> bool {
        self.trailing_slash
    }

    /// The last sub-path segment, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// A path whose last segment carries an extension, e.g. `page.html`.
    pub fn is_file_shaped(&self) -> bool {
        self.file_name()
            .and_then(|name| name.rfind('.').map(|dot| dot > 0 && dot + 1 < name.len()))
            .unwrap_or(false)
    }

    /// Whether the path addresses the identifier itself.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path of a named child.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.into());
        Self {
            identifier: self.identifier.clone(),
            segments,
            trailing_slash: false,
        }
    }

    /// The parent path, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self {
            identifier: self.identifier.clone(),
            segments,
            trailing_slash: false,
        })
    }

    /// Decoded `identifier/seg/...` form, without leading separator.
    pub fn content_path(&self) -> String {
        let mut out = self.identifier.clone();
        for seg in &self.segments {
            out.push(SEPARATOR);
            out.push_str(seg);
        }
        out
    }

    /// Percent-encoded `identifier/seg/...` form, suitable for URLs.
    pub fn to_url_path(&self) -> String {
        let mut out = encode_segment(&self.identifier);
        for seg in &self.segments {
            out.push(SEPARATOR);
            out.push_str(&encode_segment(seg));
        }
        out
    }
}

impl fmt::Display for RequestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.content_path())
    }
}
