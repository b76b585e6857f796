use crate::error::{AlignError, Result};

/// Glyphs of one horizontal rule: `left`, repeated `rule`, `junction`
/// between columns, `right`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuleGlyphs {
    pub left: char,
    pub rule: char,
    pub junction: char,
    pub right: char,
}

impl RuleGlyphs {
    fn contains(&self, ch: char) -> bool {
        ch == self.left || ch == self.rule || ch == self.junction || ch == self.right
    }
}

/// Which horizontal rule of a box table a separator row is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RulePosition {
    Top,
    Middle,
    Bottom,
}

/// The box-drawing glyphs one table family uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Charset {
    pub name: String,
    pub top: RuleGlyphs,
    pub middle: RuleGlyphs,
    pub bottom: RuleGlyphs,
    pub bar: char,
}

impl Charset {
    pub fn ascii() -> Self {
        let rule = RuleGlyphs {
            left: '+',
            rule: '-',
            junction: '+',
            right: '+',
        };
        Self {
            name: "ascii".to_string(),
            top: rule,
            middle: rule,
            bottom: rule,
            bar: '|',
        }
    }

    pub fn unicode() -> Self {
        Self {
            name: "unicode".to_string(),
            top: RuleGlyphs {
                left: '┌',
                rule: '─',
                junction: '┬',
                right: '┐',
            },
            middle: RuleGlyphs {
                left: '├',
                rule: '─',
                junction: '┼',
                right: '┤',
            },
            bottom: RuleGlyphs {
                left: '└',
                rule: '─',
                junction: '┴',
                right: '┘',
            },
            bar: '│',
        }
    }

    /// Parses a 4x4 grid, one rule per row:
    ///
    /// ```text
    /// ┌─┬┐
    /// │ ││
    /// ├─┼┤
    /// └─┴┘
    /// ```
    ///
    /// The second row names the vertical bar in its first column.
    pub fn from_grid(name: &str, grid: &str) -> Result<Self> {
        let invalid = |reason: &str| AlignError::InvalidCharset {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        let rows: Vec<Vec<char>> = grid
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().collect())
            .collect();
        if rows.len() != 4 {
            return Err(invalid("grid needs exactly four rows"));
        }
        if rows.iter().any(|row| row.len() != 4) {
            return Err(invalid("every grid row needs exactly four glyphs"));
        }
        let rule = |row: &[char]| RuleGlyphs {
            left: row[0],
            rule: row[1],
            junction: row[2],
            right: row[3],
        };
        let bar = rows[1][0];
        if bar == ' ' {
            return Err(invalid("vertical bar glyph is blank"));
        }
        Ok(Self {
            name: name.to_string(),
            top: rule(&rows[0]),
            middle: rule(&rows[2]),
            bottom: rule(&rows[3]),
            bar,
        })
    }

    pub fn rule_glyphs(&self, position: RulePosition) -> &RuleGlyphs {
        match position {
            RulePosition::Top => &self.top,
            RulePosition::Middle => &self.middle,
            RulePosition::Bottom => &self.bottom,
        }
    }

    /// Any glyph that may open a table line: a left edge of any rule or the bar.
    pub fn opens_line(&self, ch: char) -> bool {
        ch == self.top.left || ch == self.middle.left || ch == self.bottom.left || ch == self.bar
    }

    pub fn is_rule_edge(&self, ch: char) -> bool {
        ch == self.top.left || ch == self.middle.left || ch == self.bottom.left
    }

    /// Glyphs that end a rule segment on a separator row.
    pub fn segment_delimiters(&self) -> Vec<char> {
        let mut delimiters = Vec::new();
        for glyphs in [&self.top, &self.middle, &self.bottom] {
            for ch in [glyphs.junction, glyphs.right] {
                if !delimiters.contains(&ch) {
                    delimiters.push(ch);
                }
            }
        }
        delimiters
    }

    /// True when the trimmed line is drawn only with this charset's top rule.
    pub fn matches_top_rule(&self, line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.starts_with(self.top.left) && trimmed.chars().all(|ch| self.top.contains(ch))
    }
}

/// Registered charsets, consulted in registration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharsetRegistry {
    charsets: Vec<Charset>,
}

impl Default for CharsetRegistry {
    fn default() -> Self {
        Self {
            charsets: vec![Charset::ascii(), Charset::unicode()],
        }
    }
}

impl CharsetRegistry {
    pub fn empty() -> Self {
        Self {
            charsets: Vec::new(),
        }
    }

    /// Adds `charset`, replacing any charset with the same name.
    pub fn register(&mut self, charset: Charset) {
        if let Some(existing) = self.charsets.iter_mut().find(|c| c.name == charset.name) {
            *existing = charset;
        } else {
            self.charsets.push(charset);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Charset> {
        self.charsets.iter().find(|c| c.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Charset> {
        self.charsets.iter()
    }

    pub fn opens_line(&self, ch: char) -> bool {
        self.charsets.iter().any(|c| c.opens_line(ch))
    }

    /// The first charset whose top rule draws the whole of `line`.
    pub fn classify_top_rule(&self, line: &str) -> Option<&Charset> {
        self.charsets.iter().find(|c| c.matches_top_rule(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_match_their_grids() {
        assert_eq!(
            Charset::from_grid("unicode", "┌─┬┐\n│ ││\n├─┼┤\n└─┴┘").unwrap(),
            Charset::unicode()
        );
        assert_eq!(
            Charset::from_grid("ascii", "+-++\n| ||\n+-++\n+-++").unwrap(),
            Charset::ascii()
        );
    }

    #[test]
    fn builtin_glyphs() {
        let unicode = Charset::unicode();
        assert_eq!(unicode.top.left, '┌');
        assert_eq!(unicode.middle.junction, '┼');
        assert_eq!(unicode.bottom.right, '┘');
        assert_eq!(unicode.bar, '│');
        let ascii = Charset::ascii();
        assert_eq!(ascii.top.left, '+');
        assert_eq!(ascii.top.rule, '-');
        assert_eq!(ascii.bar, '|');
        assert_eq!(ascii.segment_delimiters(), vec!['+']);
    }

    #[test]
    fn grid_with_wrong_shape_is_rejected() {
        let err = Charset::from_grid("broken", "┌─┐\n│ │\n└─┘").unwrap_err();
        assert!(matches!(err, AlignError::InvalidCharset { .. }));
    }

    #[test]
    fn registry_classifies_top_rules() {
        let registry = CharsetRegistry::default();
        assert_eq!(
            registry.classify_top_rule("  +---+--+").map(|c| c.name.as_str()),
            Some("ascii")
        );
        assert_eq!(
            registry.classify_top_rule("┌──┬─┐").map(|c| c.name.as_str()),
            Some("unicode")
        );
        assert!(registry.classify_top_rule("+-- x --+").is_none());
        assert!(registry.classify_top_rule("├──┼─┤").is_none());
    }

    #[test]
    fn register_adds_and_replaces() {
        let mut registry = CharsetRegistry::default();
        let heavy = Charset::from_grid("heavy", "┏━┳┓\n┃ ┃┃\n┣━╋┫\n┗━┻┛").unwrap();
        registry.register(heavy);
        assert!(registry.opens_line('┏'));
        assert!(registry.opens_line('┃'));
        assert_eq!(registry.iter().count(), 3);
        let ascii = Charset::from_grid("ascii", "*-**\n! !!\n*-**\n*-**").unwrap();
        registry.register(ascii);
        assert_eq!(registry.iter().count(), 3);
        assert_eq!(registry.get("ascii").map(|c| c.bar), Some('!'));
    }
}
