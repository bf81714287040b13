/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderStyle {
    /// Everything on one line; statements separated by single spaces.
    #[default]
    Compact,
    /// One statement per line, four-space indentation.
    Pretty,
}

/// Emitter owns the output buffer and indentation state, keeping layout
/// decisions out of the tree walk.
pub struct Emitter {
    pub output: String,
    indent_level: usize,
    indent_str: String,
    style: RenderStyle,
}

impl Emitter {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            indent_str: String::new(),
            style: RenderStyle::Compact,
        }
    }

    pub fn with_style(mut self, style: RenderStyle) -> Self {
        self.style = style;
        self.indent_str = match style {
            RenderStyle::Compact => String::new(),
            RenderStyle::Pretty => "    ".to_string(),
        };
        self
    }

    pub fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    /// Separator between statements.
    pub fn newline(&mut self) {
        match self.style {
            RenderStyle::Compact => self.output.push(' '),
            RenderStyle::Pretty => {
                self.output.push('\n');
                for _ in 0..self.indent_level {
                    self.output.push_str(&self.indent_str);
                }
            }
        }
    }

    pub fn indent(&mut self) {
        self.indent_level += 1;
    }

    pub fn dedent(&mut self) {
        if self.indent_level > 0 {
            self.indent_level -= 1;
        }
    }

    pub fn last_char(&self) -> Option<char> {
        self.output.chars().last()
    }

    pub fn finish(self) -> String {
        self.output
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}
