//! `/PageLabels` number tree from the document catalog (PDF 32000-1, 12.4.2).

use std::path::Path;

use lopdf::{Dictionary, Object};

const MAX_TREE_DEPTH: usize = 32;
/// Label numbers above this fall back to the page number. Roman and letter labels
/// grow linearly with the number.
const MAX_LABEL_NUMBER: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumberStyle {
    Decimal,
    UpperRoman,
    LowerRoman,
    UpperLetters,
    LowerLetters,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LabelRange {
    /// 0-based index of the first page in the range.
    start: usize,
    style: Option<NumberStyle>,
    prefix: String,
    first_number: usize,
}

pub(super) fn default_labels(page_count: usize) -> Vec<String> {
    (1..=page_count).map(|n| n.to_string()).collect()
}

/// Labels for every page, falling back to the page number outside labelled ranges.
pub(super) fn read_page_labels(path: &Path, page_count: usize) -> lopdf::Result<Vec<String>> {
    let doc = lopdf::Document::load(path)?;
    let catalog = doc.catalog()?;
    let Ok(root) = catalog.get(b"PageLabels") else {
        return Ok(default_labels(page_count));
    };

    let mut ranges = Vec::new();
    walk_number_tree(&doc, root, &mut ranges, 0)?;
    ranges.sort_by_key(|r| r.start);
    Ok(labels_for(&ranges, page_count))
}

fn walk_number_tree(
    doc: &lopdf::Document,
    node: &Object,
    out: &mut Vec<LabelRange>,
    depth: usize,
) -> lopdf::Result<()> {
    if depth > MAX_TREE_DEPTH {
        return Ok(());
    }
    let (_, node) = doc.dereference(node)?;
    let dict = node.as_dict()?;

    if let Ok(nums) = dict.get(b"Nums") {
        let (_, nums) = doc.dereference(nums)?;
        for pair in nums.as_array()?.chunks(2) {
            let [key, value] = pair else {
                continue;
            };
            let Some(start) = key.as_i64().ok().and_then(|n| usize::try_from(n).ok()) else {
                continue;
            };
            let (_, value) = doc.dereference(value)?;
            if let Ok(label_dict) = value.as_dict() {
                out.push(parse_range(start, label_dict));
            }
        }
    }

    if let Ok(kids) = dict.get(b"Kids") {
        let (_, kids) = doc.dereference(kids)?;
        for kid in kids.as_array()? {
            walk_number_tree(doc, kid, out, depth + 1)?;
        }
    }
    Ok(())
}

fn parse_range(start: usize, dict: &Dictionary) -> LabelRange {
    let style = dict
        .get(b"S")
        .and_then(Object::as_name)
        .ok()
        .and_then(|name| match name {
            b"D" => Some(NumberStyle::Decimal),
            b"R" => Some(NumberStyle::UpperRoman),
            b"r" => Some(NumberStyle::LowerRoman),
            b"A" => Some(NumberStyle::UpperLetters),
            b"a" => Some(NumberStyle::LowerLetters),
            _ => None,
        });
    let prefix = dict
        .get(b"P")
        .and_then(Object::as_str)
        .map(decode_text_string)
        .unwrap_or_default();
    let first_number = dict
        .get(b"St")
        .and_then(Object::as_i64)
        .ok()
        .and_then(|n| usize::try_from(n).ok())
        .filter(|n| *n > 0)
        .unwrap_or(1);

    LabelRange {
        start,
        style,
        prefix,
        first_number,
    }
}

fn labels_for(ranges: &[LabelRange], page_count: usize) -> Vec<String> {
    (0..page_count)
        .map(|page| {
            let Some(range) = ranges.iter().rev().find(|r| r.start <= page) else {
                return (page + 1).to_string();
            };
            let number = range.first_number.saturating_add(page - range.start);
            if number > MAX_LABEL_NUMBER {
                return (page + 1).to_string();
            }
            let mut label = range.prefix.clone();
            if let Some(style) = range.style {
                label.push_str(&format_number(style, number));
            }
            label
        })
        .collect()
}

fn format_number(style: NumberStyle, n: usize) -> String {
    match style {
        NumberStyle::Decimal => n.to_string(),
        NumberStyle::UpperRoman => to_roman(n),
        NumberStyle::LowerRoman => to_roman(n).to_lowercase(),
        NumberStyle::UpperLetters => to_letters(n),
        NumberStyle::LowerLetters => to_letters(n).to_lowercase(),
    }
}

fn to_roman(mut n: usize) -> String {
    const TABLE: [(usize, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for (value, numeral) in TABLE {
        while n >= value {
            out.push_str(numeral);
            n -= value;
        }
    }
    out
}

/// A..Z, then AA..ZZ, then AAA..ZZZ.
fn to_letters(n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let letter = char::from(b'A' + u8::try_from((n - 1) % 26).unwrap_or(0));
    let repeat = (n - 1) / 26 + 1;
    std::iter::repeat_n(letter, repeat).collect()
}

/// PDF text strings are UTF-16BE with a BOM or PDFDocEncoding (Latin-1 superset for
/// printable characters).
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xfe, 0xff]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}
