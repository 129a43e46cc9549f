// SPDX-License-Identifier: MIT

//! Reader for IFC models in STEP physical file format (ISO 10303-21).
//!
//! Records are located with the `ifc-lite-core` scanner when the model is
//! loaded. Attributes are decoded on demand from the stored byte ranges.

use std::collections::BTreeMap;
use std::path::Path;

use ifc_lite_core::{parse_entity, EntityScanner, Token};
use thiserror::Error;

use super::{EntityProps, ModelSource};

const STEP_MAGIC: &str = "ISO-10303-21";

/// How many more semicolons a record may swallow before it is given up on.
const MAX_RECORD_EXTENSIONS: usize = 64;

/// Types that carry a GlobalId but are not selectable building elements.
const NON_ELEMENT_PREFIXES: [&str; 5] = [
    "IFCREL",
    "IFCPROPERTY",
    "IFCELEMENTQUANTITY",
    "IFCQUANTITY",
    "IFCOWNERHISTORY",
];

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Failed to read model: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a STEP file")]
    NotStep,
    #[error("Model is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Byte range and type of one `#id=TYPE(...);` record.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Record {
    type_name: String,
    start: usize,
    end: usize,
}

/// An IFC model held in memory with an index from express id to record.
pub struct IfcModel {
    content: String,
    index: BTreeMap<u32, Record>,
}

impl IfcModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let content = String::from_utf8(std::fs::read(path)?)?;
        let model = Self::parse(content)?;
        log::info!(
            "Loaded IFC model {} with {} entities",
            path.display(),
            model.len()
        );
        Ok(model)
    }

    pub fn parse(content: String) -> Result<Self, ModelError> {
        if !content.trim_start().starts_with(STEP_MAGIC) {
            return Err(ModelError::NotStep);
        }
        let data_start = memchr::memmem::find(content.as_bytes(), b"DATA;")
            .ok_or(ModelError::NotStep)?
            + "DATA;".len();
        let index = build_entity_index(&content, data_start);
        Ok(Self { content, index })
    }

    /// Number of indexed entities.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn decode(&self, express_id: u32, record: &Record) -> Option<EntityProps> {
        let text = self.content.get(record.start..record.end)?;
        let (_, _, tokens) = parse_entity(text).ok()?;

        Some(EntityProps {
            express_id,
            type_name: record.type_name.clone(),
            global_id: string_attribute(&tokens, 0),
            name: string_attribute(&tokens, 2),
        })
    }
}

impl ModelSource for IfcModel {
    fn properties(&self, express_id: u32) -> Option<EntityProps> {
        let record = self.index.get(&express_id)?;
        self.decode(express_id, record)
    }

    fn elements(&self) -> Vec<EntityProps> {
        self.index
            .iter()
            .filter_map(|(&id, record)| self.decode(id, record))
            .filter(|props| props.global_id.is_some())
            .filter(|props| {
                !NON_ELEMENT_PREFIXES
                    .iter()
                    .any(|prefix| props.type_name.starts_with(prefix))
            })
            .collect()
    }
}

/// Index the records of the DATA section that start at `data_start`.
///
/// The scanner ends a record at its first semicolon. A record cut short by a
/// semicolon inside a string is extended and scanning resumes behind it.
fn build_entity_index(content: &str, data_start: usize) -> BTreeMap<u32, Record> {
    let mut index = BTreeMap::new();
    let mut offset = data_start;

    'scan: loop {
        let mut scanner = EntityScanner::new(&content[offset..]);
        while let Some((id, type_name, start, end)) = scanner.next_entity() {
            let (start, end) = (offset + start, offset + end);
            let Some(record_end) = complete_record(content, start, end) else {
                log::debug!("Skipping unparsable entity #{id}");
                continue;
            };

            index.insert(
                id,
                Record {
                    type_name: type_name.to_ascii_uppercase(),
                    start,
                    end: record_end,
                },
            );
            if record_end != end {
                offset = record_end;
                continue 'scan;
            }
        }
        break;
    }

    index
}

/// End of the record starting at `start`, the first candidate end being `end`.
fn complete_record(content: &str, start: usize, mut end: usize) -> Option<usize> {
    for _ in 0..=MAX_RECORD_EXTENSIONS {
        if parse_entity(&content[start..end]).is_ok() {
            return Some(end);
        }
        end += content[end..].find(';')? + 1;
    }
    None
}

/// The attribute at `index` if it is a string. `$` and other values yield `None`.
fn string_attribute(tokens: &[Token], index: usize) -> Option<String> {
    match tokens.get(index)? {
        Token::String(raw) => Some(decode_escapes(&raw.replace("''", "'"))),
        _ => None,
    }
}

/// Resolve `\X2\...\X0\` runs of UTF-16 code units.
fn decode_escapes(value: &str) -> String {
    let mut decoded = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("\\X2\\") {
        decoded.push_str(&rest[..start]);
        let after = &rest[start + 4..];
        let Some(end) = after.find("\\X0\\") else {
            decoded.push_str(&rest[start..]);
            return decoded;
        };

        let units: Vec<u16> = after[..end]
            .as_bytes()
            .chunks(4)
            .filter_map(|chunk| std::str::from_utf8(chunk).ok())
            .filter_map(|hex| u16::from_str_radix(hex, 16).ok())
            .collect();
        decoded.extend(
            char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
        );
        rest = &after[end + 4..];
    }
    decoded.push_str(rest);
    decoded
}
