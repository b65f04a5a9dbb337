//! Content-type inference from leading bytes.
//!
//! Only the first non-empty chunk of a stream is examined; later chunks pass
//! through untouched. Binary formats are matched by magic-byte signature,
//! markup by the WHATWG tag patterns after leading whitespace.

/// A MIME type inferred from content.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SniffedType {
    pub mime: &'static str,
    pub extension: &'static str,
}

struct Signature {
    offset: usize,
    magic: &'static [u8],
    mime: &'static str,
    extension: &'static str,
}

const fn sig(
    offset: usize,
    magic: &'static [u8],
    mime: &'static str,
    extension: &'static str,
) -> Signature {
    Signature {
        offset,
        magic,
        mime,
        extension,
    }
}

const SIGNATURES: &[Signature] = &[
    sig(0, b"\x89PNG\r\n\x1a\n", "image/png", "png"),
    sig(0, b"\xff\xd8\xff", "image/jpeg", "jpg"),
    sig(0, b"GIF87a", "image/gif", "gif"),
    sig(0, b"GIF89a", "image/gif", "gif"),
    sig(0, b"BM", "image/bmp", "bmp"),
    sig(0, b"\x00\x00\x01\x00", "image/x-icon", "ico"),
    sig(0, b"II*\x00", "image/tiff", "tif"),
    sig(0, b"MM\x00*", "image/tiff", "tif"),
    sig(0, b"%PDF-", "application/pdf", "pdf"),
    sig(0, b"PK\x03\x04", "application/zip", "zip"),
    sig(0, b"\x1f\x8b\x08", "application/gzip", "gz"),
    sig(0, b"BZh", "application/x-bzip2", "bz2"),
    sig(0, b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed", "7z"),
    sig(0, b"\xfd7zXZ\x00", "application/x-xz", "xz"),
    sig(0, b"\x00asm", "application/wasm", "wasm"),
    sig(0, b"\x1a\x45\xdf\xa3", "video/webm", "webm"),
    sig(0, b"OggS", "audio/ogg", "ogg"),
    sig(0, b"fLaC", "audio/flac", "flac"),
    sig(0, b"ID3", "audio/mpeg", "mp3"),
    sig(0, b"wOFF", "font/woff", "woff"),
    sig(0, b"wOF2", "font/woff2", "woff2"),
    sig(0, b"OTTO", "font/otf", "otf"),
    sig(0, b"\x00\x01\x00\x00\x00", "font/ttf", "ttf"),
];

const RIFF_FORMS: &[(&[u8], &str, &str)] = &[
    (b"WEBP", "image/webp", "webp"),
    (b"WAVE", "audio/wav", "wav"),
    (b"AVI ", "video/x-msvideo", "avi"),
];

const FTYP_BRANDS: &[(&[u8], &str, &str)] = &[
    (b"avif", "image/avif", "avif"),
    (b"heic", "image/heic", "heic"),
    (b"qt  ", "video/quicktime", "mov"),
    (b"M4A ", "audio/mp4", "m4a"),
];

const HTML_TAGS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
    b"<!--",
];

const HTML: SniffedType = SniffedType { mime: "text/html", extension: "html" };
const XML: SniffedType = SniffedType { mime: "application/xml", extension: "xml" };
const SVG: SniffedType = SniffedType { mime: "image/svg+xml", extension: "svg" };

/// Infer a type from one chunk. Returns `None` for empty or unrecognized input.
pub fn sniff(chunk: &[u8]) -> Option<SniffedType> {
    if chunk.is_empty() {
        return None;
    }
    if let Some(found) = SIGNATURES.iter().find(|s| matches_at(chunk, s.offset, s.magic)) {
        return Some(SniffedType {
            mime: found.mime,
            extension: found.extension,
        });
    }
    if matches_at(chunk, 0, b"RIFF") {
        let found = RIFF_FORMS.iter().find(|(form, ..)| matches_at(chunk, 8, form));
        if let Some(&(_, mime, extension)) = found {
            return Some(SniffedType { mime, extension });
        }
    }
    if matches_at(chunk, 4, b"ftyp") {
        let found = FTYP_BRANDS.iter().find(|(brand, ..)| matches_at(chunk, 8, brand));
        return Some(match found {
            Some(&(_, mime, extension)) => SniffedType { mime, extension },
            None => SniffedType { mime: "video/mp4", extension: "mp4" },
        });
    }
    sniff_markup(chunk)
}

fn sniff_markup(chunk: &[u8]) -> Option<SniffedType> {
    let text = chunk.strip_prefix(b"\xef\xbb\xbf").unwrap_or(chunk);
    let start = text.iter().position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))?;
    let text = &text[start..];

    if HTML_TAGS.iter().any(|tag| tag_matches(text, tag)) {
        return Some(HTML);
    }
    if tag_matches(text, b"<SVG") {
        return Some(SVG);
    }
    if starts_with_ignore_case(text, b"<?xml") {
        return Some(if contains_ignore_case(text, b"<svg") { SVG } else { XML });
    }
    None
}

/// Case-insensitive tag prefix followed by a space or `>`.
fn tag_matches(text: &[u8], tag: &[u8]) -> bool {
    starts_with_ignore_case(text, tag) && matches!(text.get(tag.len()), Some(b' ' | b'>'))
}

fn starts_with_ignore_case(text: &[u8], prefix: &[u8]) -> bool {
    text.len() >= prefix.len() && text[..prefix.len()].eq_ignore_ascii_case(prefix)
}

fn contains_ignore_case(text: &[u8], needle: &[u8]) -> bool {
    text.windows(needle.len()).any(|w| w.eq_ignore_ascii_case(needle))
}

fn matches_at(chunk: &[u8], offset: usize, magic: &[u8]) -> bool {
    chunk
        .get(offset..offset + magic.len())
        .is_some_and(|window| window == magic)
}

/// Guess a MIME type from a file name's extension.
pub fn guess_from_path(name: &str) -> Option<&'static str> {
    mime_guess::from_path(name).first_raw()
}

/// One step of sniffing a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SniffStep {
    /// Empty chunk; classification waits for the next one.
    Deferred,
    /// First non-empty chunk was examined.
    Classified(Option<SniffedType>),
    /// Classification already happened; forward the chunk as is.
    PassThrough,
}

impl SniffStep {
    /// The inferred MIME type, if this step classified one.
    pub fn mime(&self) -> Option<&'static str> {
        match self {
            Self::Classified(Some(found)) => Some(found.mime),
            _ => None,
        }
    }
}

/// Tracks whether a stream has been sniffed yet.
#[derive(Debug, Default)]
pub struct Sniffer {
    checked: bool,
}

impl Sniffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of the stream.
    pub fn observe(&mut self, chunk: &[u8]) -> SniffStep {
        if self.checked {
            return SniffStep::PassThrough;
        }
        if chunk.is_empty() {
            return SniffStep::Deferred;
        }
        self.checked = true;
        SniffStep::Classified(sniff(chunk))
    }

    pub fn is_checked(&self) -> bool {
        self.checked
    }
}
