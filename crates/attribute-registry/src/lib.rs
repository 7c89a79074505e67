//! attribute-registry: device profile attribute tables and their value codec
//!
//! Each profile maps attribute ids to a declared size and wire type. Reserved system
//! attributes (ids >= 65000) live in a shared base table merged into every profile.
//! Tables are loaded once (from the embedded YAML or a directory) and are read-only
//! afterwards, so lookups, decodes and encodes need no synchronization.

mod types;
pub use types::*;

mod error;
pub use error::{CodecError, ProfileError, Result};

mod profile;
pub use profile::{system_table, validate_descriptor, DeviceProfile};

mod loader;
pub use loader::{
    load_builtin, load_profile_file, load_profiles_dir, load_system_table, parse_profile_str,
    parse_system_str, ProfileRegistry, SYSTEM_TABLE_FILE,
};

mod value;
pub use value::{parse_hex, to_hex, Value};

mod decode;
pub use decode::{decode, decode_attribute, decode_record, AttributeRecord, Q15_16_ONE};

mod encode;
pub use encode::{encode, encode_attribute};

mod header;
pub use header::{parse_header, strip_base};

mod metrics;
pub use metrics::{CodecMetrics, MetricsHub};
