use crate::error::{CodecError, ProfileError};
use crate::profile::{system_table, DeviceProfile};
use crate::types::{AttributeDescriptor, ProfileFile, SystemTableFile};
use anyhow::Context;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the shared system table inside a profiles directory.
pub const SYSTEM_TABLE_FILE: &str = "system.yaml";

const BUILTIN_SYSTEM: &str = include_str!("../profiles/system.yaml");
const BUILTIN_PROFILES: &[(&str, &str)] = &[
    (
        "mcu_update_all_1b.yaml",
        include_str!("../profiles/mcu_update_all_1b.yaml"),
    ),
    (
        "mcu_update_all_2.yaml",
        include_str!("../profiles/mcu_update_all_2.yaml"),
    ),
    (
        "afero_clock2.yaml",
        include_str!("../profiles/afero_clock2.yaml"),
    ),
];

/// Loaded profiles keyed by name, plus the system table they were merged with.
#[derive(Debug, Default, Clone)]
pub struct ProfileRegistry {
    pub system: Vec<AttributeDescriptor>,
    pub profiles: HashMap<String, DeviceProfile>,
}

impl ProfileRegistry {
    pub fn new(system: Vec<AttributeDescriptor>) -> Self {
        Self {
            system,
            profiles: HashMap::new(),
        }
    }

    pub fn insert(&mut self, profile: DeviceProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn get(&self, name: &str) -> Option<&DeviceProfile> {
        self.profiles.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn lookup(&self, profile: &str, id: u16) -> Result<&AttributeDescriptor, CodecError> {
        match self.get(profile) {
            Some(p) => p.lookup(id),
            None => Err(CodecError::UnknownAttribute {
                profile: profile.to_string(),
                id,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

pub fn parse_system_str(raw: &str) -> Result<Vec<AttributeDescriptor>, ProfileError> {
    let file: SystemTableFile = serde_yaml::from_str(raw)?;
    system_table(file)
}

pub fn parse_profile_str(
    raw: &str,
    system: &[AttributeDescriptor],
) -> Result<DeviceProfile, ProfileError> {
    let file: ProfileFile = serde_yaml::from_str(raw)?;
    DeviceProfile::from_file(file, system)
}

/// Build the registry from the tables compiled into this crate.
pub fn load_builtin() -> Result<ProfileRegistry, ProfileError> {
    let system = parse_system_str(BUILTIN_SYSTEM)?;
    let mut reg = ProfileRegistry::new(system);
    for (file, raw) in BUILTIN_PROFILES {
        let profile = parse_profile_str(raw, &reg.system)?;
        debug!(file, profile = %profile.name, attributes = profile.len(), "loaded builtin profile");
        reg.insert(profile);
    }
    info!(profiles = reg.len(), "builtin profile registry ready");
    Ok(reg)
}

pub fn load_system_table(path: impl AsRef<Path>) -> anyhow::Result<Vec<AttributeDescriptor>> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading system table: {}", path.display()))?;
    let system =
        parse_system_str(&raw).with_context(|| format!("decoding system table: {}", path.display()))?;
    Ok(system)
}

pub fn load_profile_file(
    path: impl AsRef<Path>,
    system: &[AttributeDescriptor],
) -> anyhow::Result<DeviceProfile> {
    let path = path.as_ref();
    let raw =
        fs::read_to_string(path).with_context(|| format!("reading profile: {}", path.display()))?;
    let profile = parse_profile_str(&raw, system)
        .with_context(|| format!("decoding profile: {}", path.display()))?;
    debug!(path = %path.display(), profile = %profile.name, attributes = profile.len(), "loaded profile");
    Ok(profile)
}

/// Load `system.yaml` from `dir` as the base table, then every other YAML file as a profile.
pub fn load_profiles_dir(dir: impl AsRef<Path>) -> anyhow::Result<ProfileRegistry> {
    let dir = dir.as_ref();
    let system = load_system_table(dir.join(SYSTEM_TABLE_FILE))?;
    let mut reg = ProfileRegistry::new(system);
    let mut entries: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.file_name().is_some_and(|n| n == SYSTEM_TABLE_FILE) {
            continue;
        }
        if let Some(ext) = path.extension() {
            if ext == "yml" || ext == "yaml" {
                entries.push(path);
            }
        }
    }
    entries.sort();
    for p in entries {
        let profile = load_profile_file(&p, &reg.system)?;
        if reg.get(&profile.name).is_some() {
            anyhow::bail!("profile {} defined twice ({})", profile.name, p.display());
        }
        reg.insert(profile);
    }
    info!(dir = %dir.display(), profiles = reg.len(), "profile registry loaded");
    Ok(reg)
}
