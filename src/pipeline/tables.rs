//! Best-effort table detection over positioned text.
//!
//! PDF pages carry no table structure, only text drawn at coordinates. This
//! module recovers simple grid tables from that geometry:
//!
//! 1. runs are grouped into lines by vertical overlap (top of page first);
//! 2. within a line, runs separated by at least `column_gap` points start a
//!    new cell, closer runs are joined with a space;
//! 3. a line with two or more cells is a candidate row;
//! 4. two or more consecutive candidate rows with the same cell count form
//!    a table.
//!
//! It misses ragged and merged-cell tables on purpose. False negatives only
//! cost the model a little structure; false positives would turn ordinary
//! two-column prose into a fake table.

/// A piece of text with its bounding box in PDF user space (y grows upward).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl TextRun {
    fn middle(&self) -> f32 {
        (self.top + self.bottom) / 2.0
    }
}

/// Rows of cells of one detected table.
pub type TableRows = Vec<Vec<String>>;

/// Find grid tables among `runs`, in top-to-bottom order.
pub fn detect_tables(runs: &[TextRun], column_gap: f32) -> Vec<TableRows> {
    let rows: Vec<Vec<String>> = group_lines(runs)
        .into_iter()
        .map(|line| split_cells(&line, column_gap))
        .collect();

    let mut tables = Vec::new();
    let mut current: TableRows = Vec::new();

    for cells in rows {
        let continues = cells.len() >= 2 && current.first().is_some_and(|r| r.len() == cells.len());
        if continues {
            current.push(cells);
            continue;
        }
        flush(&mut current, &mut tables);
        if cells.len() >= 2 {
            current.push(cells);
        }
    }
    flush(&mut current, &mut tables);

    tables
}

fn flush(current: &mut TableRows, tables: &mut Vec<TableRows>) {
    if current.len() >= 2 {
        tables.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

/// Group runs into lines, top of the page first, each line sorted left to right.
fn group_lines(runs: &[TextRun]) -> Vec<Vec<&TextRun>> {
    let mut sorted: Vec<&TextRun> = runs.iter().filter(|r| !r.text.trim().is_empty()).collect();
    sorted.sort_by(|a, b| b.top.total_cmp(&a.top).then(a.left.total_cmp(&b.left)));

    let mut lines: Vec<Vec<&TextRun>> = Vec::new();
    let mut span: Option<(f32, f32)> = None;

    for run in sorted {
        match span {
            Some((bottom, top)) if run.middle() >= bottom && run.middle() <= top => {
                if let Some(line) = lines.last_mut() {
                    line.push(run);
                }
                span = Some((bottom.min(run.bottom), top.max(run.top)));
            }
            _ => {
                lines.push(vec![run]);
                span = Some((run.bottom, run.top));
            }
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.left.total_cmp(&b.left));
    }
    lines
}

fn split_cells(line: &[&TextRun], column_gap: f32) -> Vec<String> {
    let mut cells: Vec<String> = Vec::new();
    let mut prev_right: Option<f32> = None;

    for run in line {
        let text = run.text.trim();
        match (prev_right, cells.last_mut()) {
            (Some(right), Some(cell)) if run.left - right < column_gap => {
                cell.push(' ');
                cell.push_str(text);
            }
            _ => cells.push(text.to_string()),
        }
        prev_right = Some(prev_right.map_or(run.right, |r| r.max(run.right)));
    }

    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, left: f32, top: f32) -> TextRun {
        TextRun {
            text: text.into(),
            left,
            right: left + 6.0 * text.len() as f32,
            top,
            bottom: top - 10.0,
        }
    }

    #[test]
    fn aligned_columns_form_a_table() {
        let runs = vec![
            run("Year", 50.0, 700.0),
            run("Value", 200.0, 700.0),
            run("2023", 50.0, 686.0),
            run("17", 200.0, 686.0),
            run("2024", 50.0, 672.0),
            run("42", 200.0, 672.0),
        ];
        let tables = detect_tables(&runs, 12.0);
        assert_eq!(tables.len(), 1);
        assert_eq!(
            tables[0],
            vec![
                vec!["Year".to_string(), "Value".to_string()],
                vec!["2023".to_string(), "17".to_string()],
                vec!["2024".to_string(), "42".to_string()],
            ]
        );
    }

    #[test]
    fn prose_is_not_a_table() {
        let runs = vec![
            run("The quick", 50.0, 700.0),
            run("brown fox", 110.0, 700.0),
            run("jumps over", 50.0, 686.0),
        ];
        assert!(detect_tables(&runs, 12.0).is_empty());
    }

    #[test]
    fn single_row_is_not_a_table() {
        let runs = vec![run("Name", 50.0, 700.0), run("Score", 200.0, 700.0)];
        assert!(detect_tables(&runs, 12.0).is_empty());
    }

    #[test]
    fn changing_column_count_splits_tables() {
        let runs = vec![
            run("a", 50.0, 700.0),
            run("b", 200.0, 700.0),
            run("c", 50.0, 686.0),
            run("d", 200.0, 686.0),
            run("x", 50.0, 672.0),
            run("y", 150.0, 672.0),
            run("z", 250.0, 672.0),
        ];
        let tables = detect_tables(&runs, 12.0);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 2);
    }

    #[test]
    fn input_order_does_not_matter() {
        let runs = vec![
            run("2", 200.0, 686.0),
            run("B", 200.0, 700.0),
            run("1", 50.0, 686.0),
            run("A", 50.0, 700.0),
        ];
        let tables = detect_tables(&runs, 12.0);
        assert_eq!(tables[0][0], vec!["A".to_string(), "B".to_string()]);
        assert_eq!(tables[0][1], vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn close_runs_join_into_one_cell() {
        let runs = vec![
            run("New", 50.0, 700.0),
            run("York", 72.0, 700.0),
            run("8.3", 200.0, 700.0),
            run("Oslo", 50.0, 686.0),
            run("0.7", 200.0, 686.0),
        ];
        let tables = detect_tables(&runs, 12.0);
        assert_eq!(tables[0][0], vec!["New York".to_string(), "8.3".to_string()]);
    }
}
