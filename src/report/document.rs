//! Fixed-layout text document split into pages of a set number of lines.
//!
//! Blocks are kept on one page whenever they fit; a block taller than a page
//! is split. Pages are separated by a form feed and carry a page footer.

pub const DEFAULT_LINES_PER_PAGE: usize = 56;
const FOOTER_LINES: usize = 2;
const MIN_BODY_LINES: usize = 4;
const PAGE_BREAK: char = '\u{000C}';

#[derive(Debug, Clone)]
pub struct PagedDocument {
    body_lines: usize,
    pages: Vec<Vec<String>>,
}

impl Default for PagedDocument {
    fn default() -> Self {
        Self::new(DEFAULT_LINES_PER_PAGE)
    }
}

impl PagedDocument {
    pub fn new(lines_per_page: usize) -> Self {
        Self {
            body_lines: lines_per_page.saturating_sub(FOOTER_LINES).max(MIN_BODY_LINES),
            pages: vec![Vec::new()],
        }
    }

    pub fn title(&mut self, title: &str) {
        self.push_block(vec![
            title.to_string(),
            "=".repeat(title.chars().count()),
            String::new(),
        ]);
    }

    /// A headed block of `label: value` rows with aligned values.
    pub fn section(&mut self, heading: &str, rows: &[(&str, String)]) {
        let width = rows
            .iter()
            .map(|(label, _)| label.chars().count() + 1)
            .max()
            .unwrap_or(0);

        let mut lines = Vec::with_capacity(rows.len() + 3);
        lines.push(heading.to_string());
        lines.push("-".repeat(heading.chars().count()));
        for (label, value) in rows {
            let label = format!("{label}:");
            lines.push(format!("  {label:<width$} {value}").trim_end().to_string());
        }
        lines.push(String::new());
        self.push_block(lines);
    }

    pub fn line(&mut self, text: &str) {
        self.push_block(vec![text.to_string()]);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn render(&self) -> String {
        let total = self.pages.len();
        let mut out = String::new();

        for (index, page) in self.pages.iter().enumerate() {
            if index > 0 {
                out.push(PAGE_BREAK);
            }
            for line in page {
                out.push_str(line);
                out.push('\n');
            }
            for _ in page.len()..self.body_lines {
                out.push('\n');
            }
            out.push('\n');
            out.push_str(&format!("Page {} of {}\n", index + 1, total));
        }

        out
    }

    fn push_block(&mut self, lines: Vec<String>) {
        let used = self.current_page().len();
        if used > 0 && used + lines.len() > self.body_lines {
            self.pages.push(Vec::new());
        }

        for line in lines {
            if self.current_page().len() == self.body_lines {
                self.pages.push(Vec::new());
            }
            self.current_page().push(line);
        }
    }

    fn current_page(&mut self) -> &mut Vec<String> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }
}
