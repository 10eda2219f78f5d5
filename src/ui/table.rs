//! Box-drawn tables.

use console::measure_text_width;

/// Column alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Right,
}

/// A table whose cells may contain ANSI styling.
#[derive(Debug)]
pub struct Table {
    headers: Vec<String>,
    align: Vec<Align>,
    rows: Vec<Vec<String>>,
    widths: Vec<usize>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            align: vec![Align::Left; headers.len()],
            rows: Vec::new(),
            widths: headers.iter().map(|h| measure_text_width(h)).collect(),
        }
    }

    /// Right-align a column (durations, counts).
    pub fn align(mut self, column: usize, align: Align) -> Self {
        if let Some(slot) = self.align.get_mut(column) {
            *slot = align;
        }
        self
    }

    /// Extra cells beyond the header count are dropped.
    pub fn add_row(&mut self, row: Vec<String>) {
        for (width, cell) in self.widths.iter_mut().zip(&row) {
            *width = (*width).max(measure_text_width(cell));
        }
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.rows.len() + 4);
        lines.push(self.border('┌', '┬', '┐'));
        lines.push(self.line(&self.headers));
        lines.push(self.border('├', '┼', '┤'));
        for row in &self.rows {
            lines.push(self.line(row));
        }
        lines.push(self.border('└', '┴', '┘'));
        lines.join("\n")
    }

    fn border(&self, left: char, mid: char, right: char) -> String {
        let inner: Vec<String> = self.widths.iter().map(|w| "─".repeat(w + 2)).collect();
        format!("{}{}{}", left, inner.join(&mid.to_string()), right)
    }

    fn line(&self, row: &[String]) -> String {
        let mut out = String::from("│");
        for (i, width) in self.widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            let pad = " ".repeat(width.saturating_sub(measure_text_width(cell)));
            match self.align[i] {
                Align::Left => out.push_str(&format!(" {}{} │", cell, pad)),
                Align::Right => out.push_str(&format!(" {}{} │", pad, cell)),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_box_with_rows() {
        let mut table = Table::new(&["Step", "Status"]);
        table.add_row(vec!["s1".into(), "succeeded".into()]);
        table.add_row(vec!["s2".into(), "failed".into()]);

        let output = table.render();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "┌──────┬───────────┐");
        assert_eq!(lines[3], "│ s1   │ succeeded │");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn right_alignment_and_missing_cells() {
        let mut table = Table::new(&["Step", "Time"]).align(1, Align::Right);
        table.add_row(vec!["long-step".into(), "5ms".into()]);
        table.add_row(vec!["x".into()]);

        let output = table.render();
        assert!(output.contains("│ long-step │  5ms │"));
        assert!(output.contains("│ x         │      │"));
    }

    #[test]
    fn styled_cells_measure_visible_width() {
        let mut table = Table::new(&["S"]);
        table.add_row(vec!["\u{1b}[32mok\u{1b}[0m".into()]);
        let output = table.render();
        assert!(output.lines().next().unwrap().starts_with("┌────┐"));
    }
}
