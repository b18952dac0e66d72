//! Debian control-file parsing.
//!
//! Parses the first paragraph of a control file into ordered key/value
//! fields. Continuation lines (leading space or tab) append to the previous
//! field's value, as in `Description:` blocks.

use crate::error::{Error, Result};

/// Ordered control fields from one paragraph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlFields {
    fields: Vec<(String, String)>,
}

impl ControlFields {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`get`](Self::get) but a missing field is an `InvalidArchive`
    /// error naming the field.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::invalid_archive(format!("control file is missing {key:?}")))
    }
}

/// Parse control-file text.
///
/// Fails with `InvalidArchive` when a continuation line has no preceding
/// field or a field line has no `:` separator.
pub fn parse(text: &str) -> Result<ControlFields> {
    let mut fields: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if fields.is_empty() {
                continue;
            }
            // Blank line ends the first paragraph.
            break;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            let Some((_, value)) = fields.last_mut() else {
                return Err(Error::invalid_archive(
                    "continuation line with no preceding field",
                ));
            };
            value.push('\n');
            value.push_str(line.trim_start());
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            return Err(Error::invalid_archive(format!(
                "control line without a ':' separator: {line:?}"
            )));
        };
        fields.push((key.trim().to_string(), value.trim().to_string()));
    }

    if fields.is_empty() {
        return Err(Error::invalid_archive("control file has no fields"));
    }

    Ok(ControlFields { fields })
}
