use crate::history::Surface;

/// Line terminator detected when text was loaded, used again by `text()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Line buffer with a cursor and a scroll viewport.
///
/// Every mutation that changes the text raises a pending edit
/// notification, drained with [`Surface::take_edit`].
#[derive(Debug)]
pub struct Document {
    // Each line is a vector of characters so cursor columns index directly
    lines: Vec<Vec<char>>,
    cursor_x: usize,
    cursor_y: usize,
    // Horizontal offset is in screen columns, not characters
    offset_x: usize,
    offset_y: usize,
    tab_size: usize,
    line_ending: LineEnding,
    edited: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Document {
    pub fn new(tab_size: usize) -> Self {
        Document {
            lines: vec![Vec::new()],
            cursor_x: 0,
            cursor_y: 0,
            offset_x: 0,
            offset_y: 0,
            tab_size,
            line_ending: LineEnding::Lf,
            edited: false,
        }
    }

    /// Build a document holding `text` without raising a notification.
    pub fn with_text(text: &str, tab_size: usize) -> Self {
        let mut doc = Self::new(tab_size);
        doc.replace_lines(text);
        doc
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.cursor_x, self.cursor_y)
    }

    pub fn offset(&self) -> (usize, usize) {
        (self.offset_x, self.offset_y)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> Option<&[char]> {
        self.lines.get(index).map(Vec::as_slice)
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Screen cells for line `index` as `(source char index, glyph)`.
    ///
    /// Tabs expand to the next tab stop and control characters show in
    /// caret notation, so nothing reaching the terminal moves its cursor.
    pub fn cells(&self, index: usize) -> Option<Vec<(usize, char)>> {
        self.lines
            .get(index)
            .map(|line| layout_cells(line, self.tab_size))
    }

    /// Screen column of the cursor within its line.
    pub fn cursor_column(&self) -> usize {
        layout_cells(&self.current_line()[..self.cursor_x], self.tab_size).len()
    }

    fn current_line(&self) -> &Vec<char> {
        &self.lines[self.cursor_y]
    }

    fn replace_lines(&mut self, text: &str) {
        self.line_ending = if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };
        // split('\n') rather than lines() so a trailing newline survives
        let pieces: Vec<&str> = text.split('\n').collect();
        let last = pieces.len() - 1;
        let ending = self.line_ending;
        self.lines = pieces
            .into_iter()
            .enumerate()
            .map(|(i, piece)| {
                // Only a '\r' directly before '\n' belongs to the terminator
                let piece = match ending {
                    LineEnding::CrLf if i < last => piece.strip_suffix('\r').unwrap_or(piece),
                    _ => piece,
                };
                piece.chars().collect()
            })
            .collect();
        if self.lines.is_empty() {
            self.lines.push(Vec::new());
        }
        self.cursor_y = self.lines.len() - 1;
        self.cursor_x = self.lines[self.cursor_y].len();
        self.offset_x = 0;
        self.offset_y = 0;
    }

    // Editing

    pub fn insert_char(&mut self, c: char) {
        self.lines[self.cursor_y].insert(self.cursor_x, c);
        self.cursor_x += 1;
        self.edited = true;
    }

    pub fn insert_tab(&mut self) {
        for _ in 0..self.tab_size {
            self.insert_char(' ');
        }
    }

    pub fn insert_newline(&mut self) {
        let current_line = &mut self.lines[self.cursor_y];
        let new_line: Vec<char> = current_line.drain(self.cursor_x..).collect();
        self.lines.insert(self.cursor_y + 1, new_line);
        self.cursor_y += 1;
        self.cursor_x = 0;
        self.edited = true;
    }

    pub fn backspace(&mut self) {
        if self.cursor_x > 0 {
            self.lines[self.cursor_y].remove(self.cursor_x - 1);
            self.cursor_x -= 1;
            self.edited = true;
        } else if self.cursor_y > 0 {
            let current_line = self.lines.remove(self.cursor_y);
            self.cursor_y -= 1;
            self.cursor_x = self.lines[self.cursor_y].len();
            self.lines[self.cursor_y].extend(current_line);
            self.edited = true;
        }
    }

    pub fn delete(&mut self) {
        let line_len = self.current_line().len();
        if self.cursor_x < line_len {
            self.lines[self.cursor_y].remove(self.cursor_x);
            self.edited = true;
        } else if self.cursor_y < self.lines.len() - 1 {
            let next_line = self.lines.remove(self.cursor_y + 1);
            self.lines[self.cursor_y].extend(next_line);
            self.edited = true;
        }
    }

    // Movement

    pub fn move_left(&mut self) {
        if self.cursor_x > 0 {
            self.cursor_x -= 1;
        } else if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.cursor_x = self.current_line().len();
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor_x < self.current_line().len() {
            self.cursor_x += 1;
        } else if self.cursor_y < self.lines.len() - 1 {
            self.cursor_y += 1;
            self.cursor_x = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor_y > 0 {
            self.cursor_y -= 1;
            self.clamp_x();
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor_y < self.lines.len() - 1 {
            self.cursor_y += 1;
            self.clamp_x();
        }
    }

    pub fn move_home(&mut self) {
        self.cursor_x = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_x = self.current_line().len();
    }

    pub fn page_up(&mut self, page_size: usize) {
        self.cursor_y = self.cursor_y.saturating_sub(page_size);
        self.clamp_x();
    }

    pub fn page_down(&mut self, page_size: usize) {
        self.cursor_y = (self.cursor_y + page_size).min(self.lines.len() - 1);
        self.clamp_x();
    }

    fn clamp_x(&mut self) {
        self.cursor_x = self.cursor_x.min(self.current_line().len());
    }

    /// Keep the cursor inside a `width` x `height` viewport.
    pub fn scroll_to_cursor(&mut self, width: usize, height: usize) {
        let column = self.cursor_column();
        if self.cursor_y < self.offset_y {
            self.offset_y = self.cursor_y;
        } else if height > 0 && self.cursor_y >= self.offset_y + height {
            self.offset_y = self.cursor_y - height + 1;
        }

        if column < self.offset_x {
            self.offset_x = column;
        } else if width > 0 && column >= self.offset_x + width {
            self.offset_x = column - width + 1;
        }
    }
}

impl Surface for Document {
    fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.iter().collect::<String>())
            .collect::<Vec<String>>()
            .join(self.line_ending.as_str())
    }

    fn set_text(&mut self, text: &str) {
        self.replace_lines(text);
        self.edited = true;
    }

    fn take_edit(&mut self) -> bool {
        std::mem::take(&mut self.edited)
    }
}

fn layout_cells(line: &[char], tab_size: usize) -> Vec<(usize, char)> {
    let mut cells = Vec::with_capacity(line.len());
    for (index, &c) in line.iter().enumerate() {
        match c {
            '\t' => {
                let stop = tab_size.max(1);
                let width = stop - cells.len() % stop;
                cells.extend(std::iter::repeat((index, ' ')).take(width));
            }
            '\u{0}'..='\u{1f}' => {
                cells.push((index, '^'));
                cells.push((index, char::from(c as u8 + b'@')));
            }
            '\u{7f}' => {
                cells.push((index, '^'));
                cells.push((index, '?'));
            }
            c if c.is_control() => cells.push((index, '?')),
            c => cells.push((index, c)),
        }
    }
    cells
}
