#![forbid(unsafe_code)]

//! Compound CSS selectors (`tag`, `#id`, `.class`, and combinations).
//!
//! Only what element lookup for drag targets needs: one compound selector,
//! no combinators, no attribute or pseudo-class matching.

use core::str::FromStr;

/// Errors from parsing a selector string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// Blank input.
    Empty,
    /// `#` or `.` not followed by an identifier.
    MissingIdentifier { position: usize },
    /// Character outside the supported grammar (combinators, brackets, ...).
    Unsupported { character: char, position: usize },
}

impl core::fmt::Display for SelectorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Empty => f.write_str("empty selector"),
            Self::MissingIdentifier { position } => {
                write!(f, "expected identifier at position {position}")
            }
            Self::Unsupported {
                character,
                position,
            } => write!(f, "unsupported character {character:?} at position {position}"),
        }
    }
}

impl std::error::Error for SelectorError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Tag,
    Id,
    Class,
}

/// Parsed compound selector.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
}

impl Selector {
    /// Parse a selector string.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut selector = Self::default();
        let mut part = Part::Tag;
        let mut part_start = 0;
        let mut buf = String::new();
        for (position, c) in trimmed.char_indices() {
            match c {
                '#' | '.' => {
                    selector.push(part, std::mem::take(&mut buf), part_start)?;
                    part = if c == '#' { Part::Id } else { Part::Class };
                    part_start = position;
                }
                '*' if part == Part::Tag && buf.is_empty() && position == 0 => buf.push(c),
                c if c.is_ascii_alphanumeric() || c == '-' || c == '_' => {
                    if buf == "*" {
                        return Err(SelectorError::Unsupported {
                            character: c,
                            position,
                        });
                    }
                    buf.push(c);
                }
                other => {
                    return Err(SelectorError::Unsupported {
                        character: other,
                        position,
                    });
                }
            }
        }
        selector.push(part, buf, part_start)?;
        Ok(selector)
    }

    fn push(&mut self, part: Part, ident: String, position: usize) -> Result<(), SelectorError> {
        match part {
            Part::Tag => {
                if !ident.is_empty() && ident != "*" {
                    self.tag = Some(ident.to_ascii_lowercase());
                }
            }
            Part::Id | Part::Class if ident.is_empty() => {
                return Err(SelectorError::MissingIdentifier { position });
            }
            Part::Id => self.ids.push(ident),
            Part::Class => self.classes.push(ident),
        }
        Ok(())
    }

    /// Whether an element with these attributes matches.
    #[must_use]
    pub fn matches(&self, tag: &str, id: Option<&str>, classes: &[String]) -> bool {
        if let Some(want) = &self.tag
            && !want.eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if !self.ids.iter().all(|want| id == Some(want.as_str())) {
            return false;
        }
        self.classes
            .iter()
            .all(|want| classes.iter().any(|class| class == want))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
