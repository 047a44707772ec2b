//! Grid-structured table recovery from PDF pages.
//!
//! Character positions from pdfium are grouped into words, words into
//! phrases, and phrases into a row/column grid by clustering their
//! positions. A lattice pass with tight clustering thresholds runs first
//! (bordered tables align exactly); when it finds nothing, a stream pass
//! with loose thresholds takes over for borderless layouts. Each recovered
//! table carries an accuracy figure derived from grid coherence, which the
//! recognizer later turns into per-value confidence.

use super::bindings::bind_pdfium;
use super::error::{PdfError, Result};
use crate::types::{TableFlavor, TableRecord};
use pdfium_render::prelude::*;

/// Spacing threshold for word boundary detection (in PDF units).
///
/// Characters separated by more than this distance are considered separate
/// words.
const WORD_SPACING_THRESHOLD: f32 = 3.0;

/// Grid clustering thresholds for one detection pass.
#[derive(Debug, Clone, Copy)]
pub struct GridOptions {
    /// Maximum left-edge spread (PDF units) within one column
    pub column_threshold: f64,
    /// Row threshold as a ratio of the median word height
    pub row_threshold_ratio: f64,
}

/// Bordered tables align columns exactly; cluster tightly.
pub const LATTICE_OPTIONS: GridOptions = GridOptions {
    column_threshold: 18.0,
    row_threshold_ratio: 0.5,
};

/// Borderless fallback: tolerate sloppier alignment.
pub const STREAM_OPTIONS: GridOptions = GridOptions {
    column_threshold: 45.0,
    row_threshold_ratio: 0.8,
};

/// Minimum grid shape for a plausible results table.
const MIN_GRID_ROWS: usize = 2;
const MIN_GRID_COLS: usize = 2;

/// A positioned word in top-left-origin page coordinates.
#[derive(Debug, Clone)]
pub(crate) struct Word {
    pub text: String,
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Word {
    fn right(&self) -> u32 {
        self.left + self.width
    }

    fn y_center(&self) -> f64 {
        self.top as f64 + self.height as f64 / 2.0
    }
}

pub struct TableExtractor {
    pdfium: Pdfium,
}

impl TableExtractor {
    pub fn new() -> Result<Self> {
        let binding = bind_pdfium(PdfError::TableExtractionFailed, "table extraction")?;
        Ok(Self {
            pdfium: Pdfium::new(binding),
        })
    }

    /// Recover tables from every page of the document.
    ///
    /// Runs the lattice pass first and falls back to the stream pass when no
    /// table survives. Per-page failures are skipped, never fatal.
    pub fn extract_tables(&self, pdf_bytes: &[u8]) -> Result<Vec<TableRecord>> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(pdf_bytes, None)
            .map_err(|e| PdfError::InvalidPdf(e.to_string()))?;

        let lattice = detect_pass(&document, &LATTICE_OPTIONS, TableFlavor::Lattice);
        if !lattice.is_empty() {
            return Ok(lattice);
        }

        tracing::info!("no tables found with lattice pass, trying stream pass");
        Ok(detect_pass(&document, &STREAM_OPTIONS, TableFlavor::Stream))
    }
}

fn detect_pass(document: &PdfDocument<'_>, options: &GridOptions, flavor: TableFlavor) -> Vec<TableRecord> {
    let mut tables = Vec::new();

    for (page_idx, page) in document.pages().iter().enumerate() {
        let page_number = page_idx + 1;

        let words = match extract_words_from_page(&page) {
            Ok(words) => words,
            Err(e) => {
                tracing::warn!(page = page_number, error = %e, "word extraction failed, skipping page");
                continue;
            }
        };

        if let Some(cells) = reconstruct_grid(&words, options) {
            let accuracy = grid_accuracy(&cells);
            tracing::debug!(
                page = page_number,
                rows = cells.len(),
                cols = cells[0].len(),
                accuracy,
                ?flavor,
                "recovered table grid"
            );
            tables.push(TableRecord {
                cells,
                page_number,
                accuracy,
                flavor,
            });
        }
    }

    tables
}

/// Character with position information extracted from PDF.
#[derive(Debug, Clone)]
struct CharInfo {
    text: char,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

/// Extract positioned words from a PDF page.
///
/// Groups adjacent characters into words based on spacing heuristics and
/// converts PDF bottom-left-origin coordinates into top-left-origin page
/// coordinates.
pub(crate) fn extract_words_from_page(page: &PdfPage) -> Result<Vec<Word>> {
    let page_height = page.height().value as i32;

    let page_text = page
        .text()
        .map_err(|e| PdfError::TableExtractionFailed(format!("Failed to get page text: {}", e)))?;

    let mut words: Vec<Word> = Vec::new();
    let mut current_word_chars: Vec<CharInfo> = Vec::new();

    for pdf_char in page_text.chars().iter() {
        let bounds = pdf_char
            .loose_bounds()
            .map_err(|e| PdfError::TableExtractionFailed(format!("Failed to get char bounds: {}", e)))?;

        let Some(ch) = pdf_char.unicode_char() else {
            continue;
        };

        let char_info = CharInfo {
            text: ch,
            x: bounds.left().value,
            y: bounds.bottom().value, // PDF coordinates: bottom-left origin
            width: bounds.width().value,
            height: bounds.height().value,
        };

        if char_info.text.is_whitespace() {
            if !current_word_chars.is_empty() {
                if let Some(word) = finalize_word(&current_word_chars, page_height) {
                    words.push(word);
                }
                current_word_chars.clear();
            }
            continue;
        }

        if should_start_new_word(&current_word_chars, &char_info) && !current_word_chars.is_empty() {
            if let Some(word) = finalize_word(&current_word_chars, page_height) {
                words.push(word);
            }
            current_word_chars.clear();
        }

        current_word_chars.push(char_info);
    }

    if !current_word_chars.is_empty()
        && let Some(word) = finalize_word(&current_word_chars, page_height)
    {
        words.push(word);
    }

    Ok(words)
}

/// Determine if a new character should start a new word.
fn should_start_new_word(current_word_chars: &[CharInfo], new_char: &CharInfo) -> bool {
    let Some(last_char) = current_word_chars.last() else {
        return false;
    };

    let vertical_distance = (new_char.y - last_char.y).abs();
    if vertical_distance > last_char.height * 0.5 {
        return true;
    }

    let horizontal_gap = new_char.x - (last_char.x + last_char.width);
    horizontal_gap > WORD_SPACING_THRESHOLD
}

/// Convert a group of characters into a positioned word.
fn finalize_word(chars: &[CharInfo], page_height: i32) -> Option<Word> {
    if chars.is_empty() {
        return None;
    }

    let text: String = chars.iter().map(|c| c.text).collect();

    let left = chars.iter().map(|c| c.x).fold(f32::INFINITY, f32::min);
    let right = chars.iter().map(|c| c.x + c.width).fold(f32::NEG_INFINITY, f32::max);
    let bottom = chars.iter().map(|c| c.y).fold(f32::INFINITY, f32::min);
    let top = chars.iter().map(|c| c.y + c.height).fold(f32::NEG_INFINITY, f32::max);

    let width = (right - left).round() as i32;
    let height = (top - bottom).round() as i32;

    // Convert to top-left origin like image coordinates
    let top_in_page_coords = (page_height as f32 - top).round() as i32;

    Some(Word {
        text,
        left: left.round().max(0.0) as u32,
        top: top_in_page_coords.max(0) as u32,
        width: width.max(0) as u32,
        height: height.max(0) as u32,
    })
}

/// A run of words close enough to belong to one cell.
#[derive(Debug)]
struct Phrase {
    text: String,
    left: u32,
}

/// Reconstruct a cell grid from positioned words.
///
/// Words are clustered into rows by vertical center, grouped into phrases
/// within each row, and phrases are clustered into columns by left edge.
/// Returns `None` when no plausible grid (≥2×2) emerges.
pub(crate) fn reconstruct_grid(words: &[Word], options: &GridOptions) -> Option<Vec<Vec<String>>> {
    if words.len() < MIN_GRID_ROWS * MIN_GRID_COLS {
        return None;
    }

    let mut heights: Vec<u32> = words.iter().map(|w| w.height).collect();
    heights.sort_unstable();
    let median_height = heights[heights.len() / 2].max(1);
    let row_threshold = (median_height as f64 * options.row_threshold_ratio).max(1.0);

    // Cluster words into rows by vertical center
    let mut sorted: Vec<&Word> = words.iter().collect();
    sorted.sort_by(|a, b| {
        a.y_center()
            .partial_cmp(&b.y_center())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.left.cmp(&b.left))
    });

    let mut rows: Vec<Vec<&Word>> = Vec::new();
    let mut current_center = f64::NEG_INFINITY;
    for word in sorted {
        let extends_row = !rows.is_empty() && (word.y_center() - current_center).abs() <= row_threshold;
        if extends_row && let Some(row) = rows.last_mut() {
            row.push(word);
            let n = row.len() as f64;
            current_center += (word.y_center() - current_center) / n;
        } else {
            current_center = word.y_center();
            rows.push(vec![word]);
        }
    }

    if rows.len() < MIN_GRID_ROWS {
        return None;
    }

    // Group each row's words into phrases (cell candidates)
    let phrase_gap = (options.column_threshold / 2.0).max(WORD_SPACING_THRESHOLD as f64);
    let phrase_rows: Vec<Vec<Phrase>> = rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.sort_by_key(|w| w.left);

            let mut phrases: Vec<Phrase> = Vec::new();
            let mut last_right = 0u32;
            for word in row {
                let joins_phrase = !phrases.is_empty() && (word.left as f64 - last_right as f64) <= phrase_gap;
                if joins_phrase && let Some(phrase) = phrases.last_mut() {
                    phrase.text.push(' ');
                    phrase.text.push_str(&word.text);
                } else {
                    phrases.push(Phrase {
                        text: word.text.clone(),
                        left: word.left,
                    });
                }
                last_right = word.right();
            }
            phrases
        })
        .collect();

    // Cluster phrase left edges into column centers
    let mut lefts: Vec<u32> = phrase_rows.iter().flatten().map(|p| p.left).collect();
    lefts.sort_unstable();

    let mut columns: Vec<(f64, usize)> = Vec::new(); // (mean left, member count)
    for left in lefts {
        let extends_column = matches!(
            columns.last(),
            Some((mean, _)) if (left as f64 - mean).abs() <= options.column_threshold
        );
        if extends_column && let Some((mean, count)) = columns.last_mut() {
            *count += 1;
            *mean += (left as f64 - *mean) / *count as f64;
        } else {
            columns.push((left as f64, 1));
        }
    }

    if columns.len() < MIN_GRID_COLS {
        return None;
    }

    // Assign phrases to their nearest column
    let mut cells = vec![vec![String::new(); columns.len()]; phrase_rows.len()];
    for (row_idx, phrases) in phrase_rows.iter().enumerate() {
        for phrase in phrases {
            let col_idx = columns
                .iter()
                .enumerate()
                .min_by(|(_, (a, _)), (_, (b, _))| {
                    let da = (phrase.left as f64 - a).abs();
                    let db = (phrase.left as f64 - b).abs();
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(idx, _)| idx)
                .unwrap_or(0);

            let cell = &mut cells[row_idx][col_idx];
            if cell.is_empty() {
                *cell = phrase.text.clone();
            } else {
                cell.push(' ');
                cell.push_str(&phrase.text);
            }
        }
    }

    Some(cells)
}

/// Grid coherence score in [0, 1].
///
/// Combines the fraction of populated cells with the fraction of fully
/// populated rows; ragged or sparse grids score low and the recognizer
/// discounts their values accordingly.
pub(crate) fn grid_accuracy(cells: &[Vec<String>]) -> f64 {
    let total: usize = cells.iter().map(|row| row.len()).sum();
    if total == 0 {
        return 0.0;
    }

    let populated: usize = cells
        .iter()
        .map(|row| row.iter().filter(|cell| !cell.trim().is_empty()).count())
        .sum();
    let populated_fraction = populated as f64 / total as f64;

    let complete_rows = cells
        .iter()
        .filter(|row| row.iter().all(|cell| !cell.trim().is_empty()))
        .count();
    let complete_fraction = complete_rows as f64 / cells.len() as f64;

    0.6 * populated_fraction + 0.4 * complete_fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, left: u32, top: u32, width: u32) -> Word {
        Word {
            text: text.to_string(),
            left,
            top,
            width,
            height: 12,
        }
    }

    fn lab_table_words() -> Vec<Word> {
        vec![
            word("Test", 50, 100, 30),
            word("Result", 200, 100, 45),
            word("Units", 330, 100, 40),
            word("HbA1c", 50, 120, 40),
            word("7.2", 200, 120, 25),
            word("%", 330, 120, 10),
            word("Glucose", 50, 140, 50),
            word("Fasting", 105, 140, 48),
            word("145", 200, 140, 25),
            word("mg/dL", 330, 140, 38),
        ]
    }

    #[test]
    fn test_reconstruct_grid_lattice() {
        let cells = reconstruct_grid(&lab_table_words(), &LATTICE_OPTIONS).unwrap();

        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0], vec!["Test", "Result", "Units"]);
        assert_eq!(cells[1], vec!["HbA1c", "7.2", "%"]);
        // Adjacent words in one cell merge into a phrase
        assert_eq!(cells[2], vec!["Glucose Fasting", "145", "mg/dL"]);
    }

    #[test]
    fn test_prose_yields_no_grid() {
        // A paragraph: tightly packed words on consecutive lines collapse
        // into single phrases, so no multi-column grid emerges
        let words = vec![
            word("The", 50, 100, 24),
            word("patient", 78, 100, 48),
            word("was", 130, 100, 26),
            word("seen", 160, 100, 30),
            word("again", 50, 115, 36),
            word("for", 90, 115, 20),
            word("followup", 114, 115, 58),
            word("visit", 176, 115, 30),
        ];

        assert!(reconstruct_grid(&words, &LATTICE_OPTIONS).is_none());
    }

    #[test]
    fn test_too_few_words_yields_no_grid() {
        let words = vec![word("Glucose", 50, 100, 50), word("95", 200, 100, 20)];
        assert!(reconstruct_grid(&words, &LATTICE_OPTIONS).is_none());
    }

    #[test]
    fn test_stream_pass_tolerates_sloppy_columns() {
        // Value column drifts by ~30 units between rows: too loose for the
        // lattice pass, fine for stream
        let words = vec![
            word("Test", 50, 100, 30),
            word("Result", 200, 100, 45),
            word("Hemoglobin", 50, 122, 70),
            word("14.2", 230, 122, 28),
            word("Hematocrit", 52, 144, 70),
            word("42", 198, 144, 18),
        ];

        let lattice = reconstruct_grid(&words, &LATTICE_OPTIONS);
        let stream = reconstruct_grid(&words, &STREAM_OPTIONS).unwrap();

        assert_eq!(stream.len(), 3);
        assert_eq!(stream[0].len(), 2);
        // The lattice pass either fails or splits the drifting column
        if let Some(lattice) = lattice {
            assert!(lattice[0].len() > 2);
        }
    }

    #[test]
    fn test_grid_accuracy_full_grid() {
        let cells = vec![
            vec!["Test".to_string(), "Result".to_string()],
            vec!["HbA1c".to_string(), "7.2".to_string()],
        ];
        assert_eq!(grid_accuracy(&cells), 1.0);
    }

    #[test]
    fn test_grid_accuracy_sparse_grid() {
        let cells = vec![
            vec!["Test".to_string(), "Result".to_string()],
            vec!["HbA1c".to_string(), String::new()],
        ];
        let accuracy = grid_accuracy(&cells);
        assert!(accuracy < 1.0);
        assert!(accuracy > 0.0);
    }

    #[test]
    fn test_grid_accuracy_empty() {
        assert_eq!(grid_accuracy(&[]), 0.0);
    }

    #[test]
    fn test_should_start_new_word_spacing() {
        let chars = vec![CharInfo {
            text: 'A',
            x: 100.0,
            y: 50.0,
            width: 10.0,
            height: 12.0,
        }];

        let close_char = CharInfo {
            text: 'B',
            x: 111.0, // 1 unit gap
            y: 50.0,
            width: 10.0,
            height: 12.0,
        };
        assert!(!should_start_new_word(&chars, &close_char));

        let far_char = CharInfo {
            text: 'C',
            x: 120.0, // 10 unit gap (> WORD_SPACING_THRESHOLD)
            y: 50.0,
            width: 10.0,
            height: 12.0,
        };
        assert!(should_start_new_word(&chars, &far_char));
    }

    #[test]
    fn test_should_start_new_word_different_line() {
        let chars = vec![CharInfo {
            text: 'A',
            x: 100.0,
            y: 50.0,
            width: 10.0,
            height: 12.0,
        }];

        let new_line_char = CharInfo {
            text: 'B',
            x: 100.0,
            y: 70.0,
            width: 10.0,
            height: 12.0,
        };
        assert!(should_start_new_word(&chars, &new_line_char));
    }

    #[test]
    fn test_finalize_word_coordinate_conversion() {
        let chars = vec![
            CharInfo {
                text: 'H',
                x: 100.0,
                y: 700.0, // PDF coordinates: bottom-left origin
                width: 10.0,
                height: 12.0,
            },
            CharInfo {
                text: 'i',
                x: 110.0,
                y: 700.0,
                width: 8.0,
                height: 12.0,
            },
        ];

        let word = finalize_word(&chars, 800).unwrap();

        assert_eq!(word.text, "Hi");
        assert_eq!(word.left, 100);
        assert_eq!(word.width, 18);
        assert_eq!(word.height, 12);
        // top = page_height - (y + height) = 800 - 712 = 88
        assert_eq!(word.top, 88);
    }

    #[test]
    fn test_finalize_word_empty() {
        assert!(finalize_word(&[], 800).is_none());
    }
}
