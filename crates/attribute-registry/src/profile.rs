use crate::error::{CodecError, ProfileError};
use crate::types::{
    AttributeDescriptor, BoardVariant, ProfileFile, SystemTableFile, SCHEMA_VERSION,
};
use std::collections::{HashMap, HashSet};

/// Attribute table for one device configuration, with the system base already merged in.
///
/// Built once from a [`ProfileFile`] and never mutated, so it can be shared across
/// threads and queried without locking.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    pub name: String,
    pub board: BoardVariant,
    pub description: Option<String>,
    attributes: HashMap<u16, AttributeDescriptor>,
}

impl DeviceProfile {
    /// Validate `file` and merge it over the shared `system` table.
    ///
    /// Entries in `file` replace base entries with the same id, so per-profile
    /// variations of a system attribute survive the merge.
    pub fn from_file(
        file: ProfileFile,
        system: &[AttributeDescriptor],
    ) -> Result<Self, ProfileError> {
        check_schema(file.schema_version)?;
        let mut seen = HashSet::with_capacity(file.attributes.len());
        for attr in &file.attributes {
            if !seen.insert(attr.id) {
                return Err(ProfileError::DuplicateAttribute {
                    profile: file.name.clone(),
                    id: attr.id,
                });
            }
            validate_descriptor(attr)?;
        }

        let mut attributes: HashMap<u16, AttributeDescriptor> = system
            .iter()
            .map(|d| (d.id, d.clone()))
            .collect();
        for attr in file.attributes {
            attributes.insert(attr.id, attr);
        }

        Ok(Self {
            name: file.name,
            board: file.board,
            description: file.description,
            attributes,
        })
    }

    pub fn get(&self, id: u16) -> Option<&AttributeDescriptor> {
        self.attributes.get(&id)
    }

    pub fn lookup(&self, id: u16) -> Result<&AttributeDescriptor, CodecError> {
        self.get(id).ok_or_else(|| CodecError::UnknownAttribute {
            profile: self.name.clone(),
            id,
        })
    }

    pub fn contains(&self, id: u16) -> bool {
        self.attributes.contains_key(&id)
    }

    /// All attributes ordered by id.
    pub fn attributes(&self) -> Vec<&AttributeDescriptor> {
        let mut out: Vec<_> = self.attributes.values().collect();
        out.sort_by_key(|d| d.id);
        out
    }

    pub fn system_attributes(&self) -> Vec<&AttributeDescriptor> {
        self.attributes()
            .into_iter()
            .filter(|d| d.is_system())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

/// Validate the shared system table and return its descriptors.
pub fn system_table(file: SystemTableFile) -> Result<Vec<AttributeDescriptor>, ProfileError> {
    check_schema(file.schema_version)?;
    let mut seen = HashSet::with_capacity(file.attributes.len());
    for attr in &file.attributes {
        if !seen.insert(attr.id) {
            return Err(ProfileError::DuplicateAttribute {
                profile: "system".into(),
                id: attr.id,
            });
        }
        validate_descriptor(attr)?;
    }
    Ok(file.attributes)
}

pub fn validate_descriptor(attr: &AttributeDescriptor) -> Result<(), ProfileError> {
    if attr.size == 0 {
        return Err(ProfileError::ZeroSize { id: attr.id });
    }
    if let Some(width) = attr.ty.fixed_width() {
        if usize::from(attr.size) != width {
            return Err(ProfileError::SizeTypeMismatch {
                id: attr.id,
                ty: attr.ty,
                expected: width,
                size: attr.size,
            });
        }
    }
    Ok(())
}

fn check_schema(found: u32) -> Result<(), ProfileError> {
    if found != SCHEMA_VERSION {
        return Err(ProfileError::UnsupportedSchema {
            found,
            expected: SCHEMA_VERSION,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AttributeType;

    fn base() -> Vec<AttributeDescriptor> {
        vec![
            AttributeDescriptor::new(65012, "Command", 64, AttributeType::Bytes),
            AttributeDescriptor::new(65019, "Reboot Reason", 100, AttributeType::Utf8String),
        ]
    }

    fn file(attributes: Vec<AttributeDescriptor>) -> ProfileFile {
        ProfileFile {
            name: "test".into(),
            schema_version: SCHEMA_VERSION,
            board: BoardVariant::Modulo2,
            description: None,
            attributes,
        }
    }

    #[test]
    fn merges_system_base() {
        let p = DeviceProfile::from_file(
            file(vec![AttributeDescriptor::new(1, "Current Temp", 2, AttributeType::Sint16)]),
            &base(),
        )
        .unwrap();
        assert_eq!(p.len(), 3);
        assert_eq!(p.lookup(65019).unwrap().size, 100);
        assert_eq!(p.system_attributes().len(), 2);
        assert_eq!(p.attributes()[0].id, 1);
    }

    #[test]
    fn profile_entry_overrides_base() {
        let p = DeviceProfile::from_file(
            file(vec![AttributeDescriptor::new(65012, "Command", 4, AttributeType::Sint32)]),
            &base(),
        )
        .unwrap();
        let cmd = p.lookup(65012).unwrap();
        assert_eq!(cmd.size, 4);
        assert_eq!(cmd.ty, AttributeType::Sint32);
    }

    #[test]
    fn unknown_attribute() {
        let p = DeviceProfile::from_file(file(vec![]), &base()).unwrap();
        assert_eq!(
            p.lookup(1202),
            Err(CodecError::UnknownAttribute {
                profile: "test".into(),
                id: 1202
            })
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = DeviceProfile::from_file(
            file(vec![
                AttributeDescriptor::new(3, "Sample Rate", 1, AttributeType::Sint8),
                AttributeDescriptor::new(3, "Sample Rate", 1, AttributeType::Sint8),
            ]),
            &base(),
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::DuplicateAttribute { id: 3, .. }));
    }

    #[test]
    fn rejects_size_type_mismatch() {
        let err = DeviceProfile::from_file(
            file(vec![AttributeDescriptor::new(1, "Current Temp", 4, AttributeType::Sint16)]),
            &base(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ProfileError::SizeTypeMismatch {
                expected: 2,
                size: 4,
                ..
            }
        ));
        let err = validate_descriptor(&AttributeDescriptor::new(
            9,
            "Empty",
            0,
            AttributeType::Bytes,
        ))
        .unwrap_err();
        assert!(matches!(err, ProfileError::ZeroSize { id: 9 }));
    }

    #[test]
    fn rejects_other_schema_versions() {
        let mut f = file(vec![]);
        f.schema_version = 1;
        let err = DeviceProfile::from_file(f, &base()).unwrap_err();
        assert!(matches!(err, ProfileError::UnsupportedSchema { found: 1, .. }));
    }
}
