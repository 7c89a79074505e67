use crate::error::{CodecError, Result};
use crate::profile::DeviceProfile;
use crate::types::{AttributeDescriptor, AttributeType};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Scale of the Q15.16 fixed point format.
pub const Q15_16_ONE: f64 = 65536.0;

/// A decoded value together with the attribute it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub profile: String,
    pub id: u16,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: AttributeType,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
}

/// Decode `data` according to `desc`.
///
/// Numeric types must match the declared size exactly and are read as little-endian
/// two's complement. Text and byte strings may be shorter than the declared size;
/// text stops at the first NUL so zero padding is dropped.
pub fn decode(desc: &AttributeDescriptor, data: &[u8]) -> Result<Value> {
    match desc.ty {
        AttributeType::Boolean => {
            let [b] = fixed::<1>(desc, data)?;
            Ok(Value::Bool(b != 0))
        }
        AttributeType::Sint8 => Ok(Value::Int(i8::from_le_bytes(fixed(desc, data)?).into())),
        AttributeType::Sint16 => Ok(Value::Int(i16::from_le_bytes(fixed(desc, data)?).into())),
        AttributeType::Sint32 => Ok(Value::Int(i32::from_le_bytes(fixed(desc, data)?).into())),
        AttributeType::Sint64 => Ok(Value::Int(i64::from_le_bytes(fixed(desc, data)?))),
        AttributeType::Q15_16 => {
            let raw = i32::from_le_bytes(fixed(desc, data)?);
            Ok(Value::Fixed(f64::from(raw) / Q15_16_ONE))
        }
        AttributeType::Utf8String => {
            within_max(desc, data.len())?;
            let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
            let text = std::str::from_utf8(&data[..end]).map_err(|e| {
                CodecError::InvalidEncoding {
                    id: desc.id,
                    valid_up_to: e.valid_up_to(),
                }
            })?;
            Ok(Value::Text(text.to_string()))
        }
        AttributeType::Bytes => {
            within_max(desc, data.len())?;
            Ok(Value::Bytes(data.to_vec()))
        }
    }
}

/// Look up `id` in `profile` and decode `data` against it.
pub fn decode_attribute(profile: &DeviceProfile, id: u16, data: &[u8]) -> Result<Value> {
    decode(profile.lookup(id)?, data)
}

/// Like [`decode_attribute`] but returns a serializable record stamped with `ts`.
pub fn decode_record(
    profile: &DeviceProfile,
    id: u16,
    data: &[u8],
    ts: Option<OffsetDateTime>,
) -> Result<AttributeRecord> {
    let desc = profile.lookup(id)?;
    let value = decode(desc, data)?;
    Ok(AttributeRecord {
        profile: profile.name.clone(),
        id,
        name: desc.name.clone(),
        ty: desc.ty,
        value,
        ts: ts.and_then(|t| {
            t.format(&time::format_description::well_known::Rfc3339)
                .ok()
        }),
    })
}

fn fixed<const N: usize>(desc: &AttributeDescriptor, data: &[u8]) -> Result<[u8; N]> {
    if data.len() != desc.max_len() {
        return Err(CodecError::LengthMismatch {
            id: desc.id,
            expected: desc.max_len(),
            actual: data.len(),
        });
    }
    data.try_into().map_err(|_| CodecError::LengthMismatch {
        id: desc.id,
        expected: N,
        actual: data.len(),
    })
}

pub(crate) fn within_max(desc: &AttributeDescriptor, len: usize) -> Result<()> {
    if len > desc.max_len() {
        return Err(CodecError::SizeExceeded {
            id: desc.id,
            max: desc.max_len(),
            actual: len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_builtin;

    fn desc(ty: AttributeType, size: u16) -> AttributeDescriptor {
        AttributeDescriptor::new(42, "test", size, ty)
    }

    #[test]
    fn q15_16_one() {
        let v = decode(&desc(AttributeType::Q15_16, 4), &[0x00, 0x00, 0x01, 0x00]).unwrap();
        assert_eq!(v, Value::Fixed(1.0));
        let v = decode(&desc(AttributeType::Q15_16, 4), &[0x00, 0x80, 0xff, 0xff]).unwrap();
        assert_eq!(v, Value::Fixed(-0.5));
    }

    #[test]
    fn booleans() {
        let d = desc(AttributeType::Boolean, 1);
        assert_eq!(decode(&d, &[0x00]).unwrap(), Value::Bool(false));
        assert_eq!(decode(&d, &[0x01]).unwrap(), Value::Bool(true));
        assert_eq!(decode(&d, &[0x7f]).unwrap(), Value::Bool(true));
        assert!(matches!(
            decode(&d, &[0x01, 0x00]),
            Err(CodecError::LengthMismatch {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[test]
    fn little_endian_signed() {
        assert_eq!(
            decode(&desc(AttributeType::Sint8, 1), &[0xff]).unwrap(),
            Value::Int(-1)
        );
        assert_eq!(
            decode(&desc(AttributeType::Sint16, 2), &[0x34, 0x12]).unwrap(),
            Value::Int(0x1234)
        );
        assert_eq!(
            decode(&desc(AttributeType::Sint32, 4), &[0x00, 0x00, 0x00, 0x80]).unwrap(),
            Value::Int(i64::from(i32::MIN))
        );
        assert_eq!(
            decode(&desc(AttributeType::Sint64, 8), &[1, 0, 0, 0, 0, 0, 0, 0]).unwrap(),
            Value::Int(1)
        );
    }

    #[test]
    fn integer_length_mismatch() {
        let err = decode(&desc(AttributeType::Sint16, 2), &[0x01]).unwrap_err();
        assert_eq!(
            err,
            CodecError::LengthMismatch {
                id: 42,
                expected: 2,
                actual: 1
            }
        );
        // descriptor whose size disagrees with its type
        let err = decode(&desc(AttributeType::Sint16, 4), &[0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, CodecError::LengthMismatch { expected: 2, .. }));
    }

    #[test]
    fn text_is_variable_length() {
        let d = desc(AttributeType::Utf8String, 8);
        assert_eq!(decode(&d, b"hi").unwrap(), Value::Text("hi".into()));
        assert_eq!(decode(&d, b"").unwrap(), Value::Text(String::new()));
        assert_eq!(
            decode(&d, b"ok\0\0\0\0\0\0").unwrap(),
            Value::Text("ok".into())
        );
        assert!(matches!(
            decode(&d, b"123456789"),
            Err(CodecError::SizeExceeded {
                max: 8,
                actual: 9,
                ..
            })
        ));
    }

    #[test]
    fn invalid_utf8() {
        let d = desc(AttributeType::Utf8String, 8);
        assert_eq!(
            decode(&d, &[b'a', 0xc3, 0x28]).unwrap_err(),
            CodecError::InvalidEncoding {
                id: 42,
                valid_up_to: 1
            }
        );
    }

    #[test]
    fn bytes_passthrough() {
        let d = desc(AttributeType::Bytes, 3);
        assert_eq!(
            decode(&d, &[1, 2, 3]).unwrap(),
            Value::Bytes(vec![1, 2, 3])
        );
        assert_eq!(decode(&d, &[9]).unwrap(), Value::Bytes(vec![9]));
        assert!(matches!(
            decode(&d, &[1, 2, 3, 4]),
            Err(CodecError::SizeExceeded { .. })
        ));
    }

    #[test]
    fn record_for_current_temp() {
        let reg = load_builtin().unwrap();
        let p = reg.get("MCUUpdateAll1B").unwrap();
        let ts = OffsetDateTime::from_unix_timestamp(0).unwrap();
        let rec = decode_record(p, 1, &[0xe7, 0x00], Some(ts)).unwrap();
        assert_eq!(rec.name, "Current Temp");
        assert_eq!(rec.value, Value::Int(231));
        assert_eq!(rec.ts.as_deref(), Some("1970-01-01T00:00:00Z"));
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "SINT16");
        assert_eq!(json["value"], 231);
    }

    #[test]
    fn decode_attribute_unknown_id() {
        let reg = load_builtin().unwrap();
        let p = reg.get("MCUUpdateAll1B").unwrap();
        assert!(matches!(
            decode_attribute(p, 1202, &[0; 8]),
            Err(CodecError::UnknownAttribute { id: 1202, .. })
        ));
    }
}
