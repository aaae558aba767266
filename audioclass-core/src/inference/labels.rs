//! Class label maps.
//!
//! Two layouts are accepted:
//!
//! | Layout | Example |
//! |--------|---------|
//! | AudioSet class map CSV (`index,mid,display_name` header) | `0,/m/09x0r,Speech` |
//! | One label per line | `Speech` |
//!
//! CSV display names may be double-quoted and contain commas.

use std::path::Path;

use crate::error::{AudioClassError, Result};

/// One entry of a label map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    pub name: String,
    pub display_name: Option<String>,
}

/// Ordered class labels; position is the model's class index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    entries: Vec<LabelEntry>,
}

impl LabelMap {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse either layout.
    ///
    /// # Errors
    /// `InvalidArgument` for a CSV row with fewer than three fields.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty()).peekable();

        let is_csv = lines
            .peek()
            .map(|header| {
                let h = header.to_ascii_lowercase();
                h.contains("index") && h.contains("display_name")
            })
            .unwrap_or(false);

        if !is_csv {
            let entries = lines
                .map(|l| LabelEntry {
                    name: l.trim().to_string(),
                    display_name: None,
                })
                .collect();
            return Ok(Self { entries });
        }

        lines.next();
        let mut entries = Vec::new();
        for (row, line) in lines.enumerate() {
            let fields = split_csv_line(line);
            if fields.len() < 3 {
                return Err(AudioClassError::InvalidArgument(format!(
                    "class map row {} has {} fields, expected 3",
                    row + 1,
                    fields.len()
                )));
            }
            let display = fields[2].trim().to_string();
            entries.push(LabelEntry {
                name: display.clone(),
                display_name: Some(display).filter(|d| !d.is_empty()),
            });
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&LabelEntry> {
        self.entries.get(index)
    }

    /// Label for `index`, or a positional `class_<index>` placeholder.
    pub fn name_or_index(&self, index: usize) -> String {
        self.get(index)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| format!("class_{index}"))
    }
}

fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
