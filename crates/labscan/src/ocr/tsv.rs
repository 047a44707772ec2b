//! Tesseract TSV parsing.
//!
//! TSV output carries one line per recognized element (level, page, block,
//! paragraph, line, word, bbox, confidence, text). Only word-level lines
//! (level 5) become tokens; the block index is kept so the recognizer can
//! group tokens into text blocks.

use super::error::OcrError;
use serde::{Deserialize, Serialize};

/// Word-level rows in Tesseract TSV output.
const TSV_WORD_LEVEL: u32 = 5;

/// Minimum fields per TSV row (through the text column).
const TSV_MIN_FIELDS: usize = 12;

/// One recognized word with position and confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrToken {
    pub text: String,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
    /// Engine confidence on the 0-100 scale
    pub confidence: f64,
    /// Block index used for text-block grouping
    pub block: u32,
}

/// Parse word-level tokens out of Tesseract TSV output.
///
/// Malformed lines are skipped; the header line and non-word levels are
/// ignored.
pub fn parse_tokens(tsv_data: &str) -> Result<Vec<OcrToken>, OcrError> {
    let mut tokens = Vec::new();

    for (line_num, line) in tsv_data.lines().enumerate() {
        if line_num == 0 {
            continue;
        }

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < TSV_MIN_FIELDS {
            continue;
        }

        let level = fields[0].parse::<u32>().unwrap_or(0);
        if level != TSV_WORD_LEVEL {
            continue;
        }

        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }

        tokens.push(OcrToken {
            text: text.to_string(),
            left: fields[6].parse().unwrap_or(0),
            top: fields[7].parse().unwrap_or(0),
            width: fields[8].parse().unwrap_or(0),
            height: fields[9].parse().unwrap_or(0),
            confidence: fields[10].parse().unwrap_or(-1.0),
            block: fields[2].parse().unwrap_or(0),
        });
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    #[test]
    fn test_parse_tokens_basic() {
        let tsv = format!(
            "{}\n5\t1\t0\t0\t0\t0\t100\t50\t80\t30\t95.5\tGlucose\n5\t1\t0\t0\t0\t1\t190\t50\t70\t30\t92.3\t145",
            HEADER
        );

        let tokens = parse_tokens(&tsv).unwrap();
        assert_eq!(tokens.len(), 2);

        assert_eq!(tokens[0].text, "Glucose");
        assert_eq!(tokens[0].left, 100);
        assert_eq!(tokens[0].top, 50);
        assert_eq!(tokens[0].confidence, 95.5);
        assert_eq!(tokens[0].block, 0);

        assert_eq!(tokens[1].text, "145");
        assert_eq!(tokens[1].left, 190);
    }

    #[test]
    fn test_parse_tokens_level_filter() {
        let tsv = format!(
            "{}\n3\t1\t0\t0\t0\t0\t100\t50\t80\t30\t95.5\tParagraph\n5\t1\t0\t0\t0\t0\t100\t50\t80\t30\t95.5\tWord\n4\t1\t0\t0\t0\t1\t190\t50\t70\t30\t92.3\tLine",
            HEADER
        );

        let tokens = parse_tokens(&tsv).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "Word");
    }

    #[test]
    fn test_parse_tokens_block_index_kept() {
        let tsv = format!(
            "{}\n5\t1\t1\t0\t0\t0\t10\t10\t40\t12\t90.0\tfirst\n5\t1\t2\t0\t0\t0\t10\t60\t40\t12\t85.0\tsecond",
            HEADER
        );

        let tokens = parse_tokens(&tsv).unwrap();
        assert_eq!(tokens[0].block, 1);
        assert_eq!(tokens[1].block, 2);
    }

    #[test]
    fn test_parse_tokens_empty_text_skipped() {
        let tsv = format!(
            "{}\n5\t1\t0\t0\t0\t0\t100\t50\t80\t30\t95.5\t\n5\t1\t0\t0\t0\t1\t190\t50\t70\t30\t92.3\tWord",
            HEADER
        );

        let tokens = parse_tokens(&tsv).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "Word");
    }

    #[test]
    fn test_parse_tokens_malformed_lines_skipped() {
        let tsv = format!(
            "{}\ninvalid line\n5\t1\t0\t0\t0\t0\t100\t50\t80\t30\t95.5\tWord",
            HEADER
        );

        let tokens = parse_tokens(&tsv).unwrap();
        assert_eq!(tokens.len(), 1);
    }
}
