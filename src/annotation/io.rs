use std::collections::HashMap;
use std::io::BufRead;

use crate::types::{Block, Strand};

/// File dialect detected from attribute syntax.
///
/// - GFF3 typically uses: key=value;key2=value2
/// - GTF typically uses: key "value"; key2 "value2";
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Gff3,
    Gtf,
    Unknown,
}

/// A single parsed record line from GTF/GFF3.
///
/// Coordinates are converted to 0-based half-open on parse.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub seqname: String,      // chromosome / contig
    pub source: String,       // column 2
    pub feature_type: String, // column 3
    pub block: Block,         // columns 4-5, converted
    pub score: Option<f32>,   // '.' => None
    pub strand: Strand,       // + / - / . / ?
    pub phase: Option<u8>,    // '.' => None, else 0/1/2
    pub attrs: HashMap<String, String>,
    pub dialect: Dialect,
}

impl AnnotationRecord {
    /// Convenience: get an attribute value.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(|s| s.as_str())
    }

    /// Feature-type subsetting: does this record match any of the given types?
    pub fn is_feature_of_type(&self, types: &[String]) -> bool {
        types.iter().any(|t| t == &self.feature_type)
    }

    /// First non-empty attribute value among the given keys.
    pub fn pick_first_attr(&self, keys: &[String]) -> Option<String> {
        for k in keys {
            if let Some(v) = self.attr(k) {
                let v = v.trim();
                if !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
        None
    }
}

/// Parsing errors for GTF/GFF3.
#[derive(Debug)]
pub enum ParseError {
    IoPath {
        path: String,
        source: std::io::Error,
    },
    MalformedLine {
        line: String,
    },
    BadCoordinates {
        line: String,
    },
    MissingAttribute {
        line: String,
        tried: Vec<String>,
    },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::IoPath { path, source } => {
                write!(f, "I/O error while reading '{}': {}", path, source)
            }
            ParseError::MalformedLine { line } => write!(f, "Malformed GTF/GFF line: {}", line),
            ParseError::BadCoordinates { line } => write!(f, "Bad coordinates in line: {}", line),
            ParseError::MissingAttribute { line, tried } => write!(
                f,
                "Missing required attribute (tried keys {:?}) in line: {}",
                tried, line
            ),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::IoPath { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Low-level streaming parser for GTF/GFF3 files.
///
/// Most users should **not** use this directly.
/// Use [`crate::annotation::CatalogBuilder`] to build a full `ExonCatalog`
/// from a file in one step.
///
/// # Example (streaming low-level usage)
/// ```no_run
/// use std::fs::File;
/// use std::io::BufReader;
/// use gtf_novel_blocks::annotation::io::AnnotationReader;
///
/// let file = File::open("genes.gtf").unwrap();
/// let rdr = AnnotationReader::new(BufReader::new(file));
/// for rec in rdr.records() {
///     let rec = rec.unwrap();
///     println!("{} {}", rec.seqname, rec.block);
/// }
/// ```
pub struct AnnotationReader<R: BufRead> {
    reader: R,
    buf: String,
}

impl<R: BufRead> AnnotationReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
        }
    }

    /// Returns an iterator over parsed records.
    ///
    /// - Skips blank lines
    /// - Skips comment lines starting with '#'
    pub fn records(mut self) -> impl Iterator<Item = Result<AnnotationRecord, ParseError>> {
        std::iter::from_fn(move || loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    return Some(Err(ParseError::IoPath {
                        path: "<reader>".to_string(),
                        source: e,
                    }))
                }
            }

            let line = self.buf.trim_end_matches(['\n', '\r']);
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            return Some(parse_record_line(line));
        })
    }
}

/// Parse a single non-comment line into an `AnnotationRecord`.
///
/// GTF/GFF have 9 tab-separated columns:
/// seqname source feature start end score strand phase attributes
pub fn parse_record_line(line: &str) -> Result<AnnotationRecord, ParseError> {
    let malformed = || ParseError::MalformedLine {
        line: line.to_string(),
    };
    let bad_coords = || ParseError::BadCoordinates {
        line: line.to_string(),
    };

    let cols: Vec<&str> = line.split('\t').collect();
    let &[seqname, source, feature_type, start_s, end_s, score_s, strand_s, phase_s, attrs_s] =
        cols.as_slice()
    else {
        return Err(malformed());
    };

    // Coordinates: input is 1-based inclusive; convert to 0-based half-open [start-1, end)
    let start_1: u64 = start_s.parse().map_err(|_| bad_coords())?;
    let end_1: u64 = end_s.parse().map_err(|_| bad_coords())?;
    if start_1 == 0 || end_1 < start_1 || end_1 > u32::MAX as u64 {
        return Err(bad_coords());
    }
    let block = Block::new((start_1 - 1) as u32, end_1 as u32);

    let score = match score_s {
        "." => None,
        s => Some(s.parse::<f32>().map_err(|_| malformed())?),
    };

    let strand = Strand::from_symbol(strand_s).ok_or_else(malformed)?;

    let phase = match phase_s {
        "." => None,
        s => match s.parse::<u8>() {
            Ok(p) if p <= 2 => Some(p),
            _ => return Err(malformed()),
        },
    };

    let (dialect, attrs) = parse_attributes(attrs_s);

    Ok(AnnotationRecord {
        seqname: seqname.to_string(),
        source: source.to_string(),
        feature_type: feature_type.to_string(),
        block,
        score,
        strand,
        phase,
        attrs,
        dialect,
    })
}

/// Parse the attributes field for either GFF3 or GTF.
///
/// Returns (Dialect, map).
///
/// Heuristics:
/// - If it contains '=' => treat as GFF3
/// - Else if it contains quotes => treat as GTF
/// - Else Unknown, but parse best-effort
pub fn parse_attributes(s: &str) -> (Dialect, HashMap<String, String>) {
    let s = s.trim();

    let dialect = if s.contains('=') {
        Dialect::Gff3
    } else if s.contains('"') {
        Dialect::Gtf
    } else {
        Dialect::Unknown
    };

    let mut map = HashMap::new();

    for part in s.split(';') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let kv = match dialect {
            Dialect::Gff3 => split_eq(part),
            Dialect::Gtf => split_space(part),
            // Best effort: per-part detection.
            Dialect::Unknown => {
                if part.contains('=') {
                    split_eq(part)
                } else {
                    split_space(part)
                }
            }
        };

        if let Some((k, v)) = kv {
            map.insert(k.to_string(), unquote(v));
        }
    }

    (dialect, map)
}

/// GFF3 style: key=value
fn split_eq(part: &str) -> Option<(&str, &str)> {
    let (k, v) = part.split_once('=')?;
    let k = k.trim();
    if k.is_empty() {
        return None;
    }
    Some((k, v.trim()))
}

/// GTF style: key "value"
fn split_space(part: &str) -> Option<(&str, &str)> {
    let (k, v) = part.split_once(char::is_whitespace)?;
    let k = k.trim();
    let v = v.trim();
    if k.is_empty() || v.is_empty() {
        return None;
    }
    Some((k, v))
}

fn unquote(v: &str) -> String {
    let v = v.trim();
    let v = v.strip_prefix('"').unwrap_or(v);
    let v = v.strip_suffix('"').unwrap_or(v);
    v.to_string()
}
