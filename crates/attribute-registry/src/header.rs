//! Import of generated `device-description.h` profile headers.
//!
//! The generator emits one `#define` per constant: `AF_BOARD_<NAME>` board ids, an
//! `AF_BOARD` selection, `ATTRIBUTE_TYPE_<NAME>` tags and, per attribute, an
//! `AF_<NAME>` id with `AF_<NAME>_SZ` and `AF_<NAME>_TYPE` companions preceded by a
//! `// Attribute <Label>` comment.

use crate::error::ProfileError;
use crate::types::{AttributeDescriptor, AttributeType, BoardVariant, ProfileFile};
use std::collections::HashMap;

const BOARD_SELECT: &str = "AF_BOARD";
const BOARD_PREFIX: &str = "AF_BOARD_";
const TYPE_PREFIX: &str = "ATTRIBUTE_TYPE_";
const SIZE_SUFFIX: &str = "_SZ";
const TYPE_SUFFIX: &str = "_TYPE";

#[derive(Debug)]
struct Define {
    line: usize,
    name: String,
    value: String,
    label: Option<String>,
}

fn err(line: usize, reason: impl Into<String>) -> ProfileError {
    ProfileError::Header {
        line,
        reason: reason.into(),
    }
}

/// Parse a generated header into a profile named `name`.
pub fn parse_header(src: &str, name: &str) -> Result<ProfileFile, ProfileError> {
    let mut schema_version = None;
    let mut description = None;
    let mut label: Option<String> = None;
    let mut defines: Vec<Define> = Vec::new();

    for (idx, raw) in src.lines().enumerate() {
        let line = idx + 1;
        let t = raw.trim();
        if let Some(rest) = t.strip_prefix("// Attribute ") {
            label = Some(rest.trim().to_string());
        } else if let Some(rest) = t.trim_start_matches('*').trim().strip_prefix("Schema Version:") {
            let v = rest
                .trim()
                .parse::<u32>()
                .map_err(|_| err(line, format!("bad schema version {:?}", rest.trim())))?;
            schema_version = Some(v);
        } else if let Some(rest) = t
            .trim_start_matches('*')
            .trim()
            .strip_prefix("Device Description:")
        {
            let d = rest.trim();
            if !d.is_empty() {
                description = Some(d.to_string());
            }
        } else if let Some(rest) = t.strip_prefix("#define") {
            let mut parts = rest.split_whitespace();
            let (Some(n), Some(v)) = (parts.next(), parts.next()) else {
                return Err(err(line, "#define without a value"));
            };
            if parts.next().is_some() {
                return Err(err(line, format!("unexpected tokens after {n}")));
            }
            defines.push(Define {
                line,
                name: n.to_string(),
                value: v.to_string(),
                label: label.take(),
            });
        }
    }

    let schema_version = schema_version.ok_or_else(|| err(1, "missing Schema Version comment"))?;
    let by_name: HashMap<&str, &Define> = defines.iter().map(|d| (d.name.as_str(), d)).collect();

    let board = resolve_board(&defines, &by_name)?;
    let tags = type_tags(&defines)?;

    let mut attributes = Vec::new();
    for d in &defines {
        if d.name == BOARD_SELECT || d.name.starts_with(BOARD_PREFIX) || d.name.starts_with(TYPE_PREFIX)
        {
            continue;
        }
        let size_key = format!("{}{SIZE_SUFFIX}", d.name);
        let type_key = format!("{}{TYPE_SUFFIX}", d.name);
        let Some(size_def) = by_name.get(size_key.as_str()) else {
            if is_companion(&d.name, &by_name) {
                continue;
            }
            return Err(err(d.line, format!("{} has no {size_key}", d.name)));
        };
        let type_def = by_name
            .get(type_key.as_str())
            .ok_or_else(|| err(d.line, format!("{} has no {type_key}", d.name)))?;

        let id = parse_num::<u16>(d)?;
        let size = parse_num::<u16>(size_def)?;
        let ty = match type_def.value.strip_prefix(TYPE_PREFIX) {
            Some(sym) => tags.get(sym).copied().ok_or_else(|| {
                err(type_def.line, format!("unknown type symbol {}", type_def.value))
            })?,
            None => {
                let tag = parse_num::<u8>(type_def)?;
                AttributeType::from_tag(tag)
                    .ok_or_else(|| err(type_def.line, format!("unknown type tag {tag}")))?
            }
        };
        let label = d
            .label
            .clone()
            .unwrap_or_else(|| d.name.trim_start_matches("AF_").to_string());
        attributes.push(AttributeDescriptor::new(id, label, size, ty));
    }
    attributes.sort_by_key(|a| a.id);

    Ok(ProfileFile {
        name: name.to_string(),
        schema_version,
        board,
        description,
        attributes,
    })
}

/// Drop attributes identical (id, size, type) to an entry of the shared system table.
pub fn strip_base(mut file: ProfileFile, system: &[AttributeDescriptor]) -> ProfileFile {
    file.attributes.retain(|a| {
        !system
            .iter()
            .any(|s| s.id == a.id && s.size == a.size && s.ty == a.ty)
    });
    file
}

fn is_companion(name: &str, by_name: &HashMap<&str, &Define>) -> bool {
    [SIZE_SUFFIX, TYPE_SUFFIX].iter().any(|suffix| {
        name.strip_suffix(suffix)
            .is_some_and(|base| by_name.contains_key(base))
    })
}

fn resolve_board(
    defines: &[Define],
    by_name: &HashMap<&str, &Define>,
) -> Result<BoardVariant, ProfileError> {
    for d in defines.iter().filter(|d| d.name.starts_with(BOARD_PREFIX)) {
        let suffix = &d.name[BOARD_PREFIX.len()..];
        let board = BoardVariant::from_header_name(suffix)
            .ok_or_else(|| err(d.line, format!("unknown board {suffix}")))?;
        let id = parse_num::<u8>(d)?;
        if board.id() != id {
            return Err(err(
                d.line,
                format!("board {suffix} is {id}, expected {}", board.id()),
            ));
        }
    }

    let select = by_name
        .get(BOARD_SELECT)
        .ok_or_else(|| err(1, "missing AF_BOARD selection"))?;
    let id = match by_name.get(select.value.as_str()) {
        Some(target) => parse_num::<u8>(target)?,
        None => parse_num::<u8>(select)?,
    };
    BoardVariant::from_id(id).ok_or_else(|| err(select.line, format!("unknown board id {id}")))
}

fn type_tags(defines: &[Define]) -> Result<HashMap<String, AttributeType>, ProfileError> {
    let mut tags = HashMap::new();
    for d in defines.iter().filter(|d| d.name.starts_with(TYPE_PREFIX)) {
        let sym = &d.name[TYPE_PREFIX.len()..];
        let tag = parse_num::<u8>(d)?;
        let ty = AttributeType::from_header_name(sym)
            .ok_or_else(|| err(d.line, format!("unknown attribute type {sym}")))?;
        if ty.tag() != tag {
            return Err(err(
                d.line,
                format!("type {sym} is {tag}, expected {}", ty.tag()),
            ));
        }
        tags.insert(sym.to_string(), ty);
    }
    Ok(tags)
}

fn parse_num<T: std::str::FromStr>(d: &Define) -> Result<T, ProfileError> {
    d.value
        .parse::<T>()
        .map_err(|_| err(d.line, format!("{} = {:?} is not a valid number", d.name, d.value)))
}
