use crate::decode::{within_max, Q15_16_ONE};
use crate::error::{CodecError, Result};
use crate::profile::DeviceProfile;
use crate::types::{AttributeDescriptor, AttributeType};
use crate::value::Value;

/// Encode `value` for `desc`; the inverse of `decode`.
///
/// Never pads: text and byte strings are written at their own length.
pub fn encode(desc: &AttributeDescriptor, value: &Value) -> Result<Vec<u8>> {
    if let Some(width) = desc.ty.fixed_width() {
        if desc.max_len() != width {
            return Err(CodecError::LengthMismatch {
                id: desc.id,
                expected: width,
                actual: desc.max_len(),
            });
        }
    }
    let out = match (desc.ty, value) {
        (AttributeType::Boolean, Value::Bool(b)) => vec![u8::from(*b)],
        (AttributeType::Sint8, Value::Int(v)) => i8::try_from(*v)
            .map_err(|_| out_of_range(desc, v))?
            .to_le_bytes()
            .to_vec(),
        (AttributeType::Sint16, Value::Int(v)) => i16::try_from(*v)
            .map_err(|_| out_of_range(desc, v))?
            .to_le_bytes()
            .to_vec(),
        (AttributeType::Sint32, Value::Int(v)) => i32::try_from(*v)
            .map_err(|_| out_of_range(desc, v))?
            .to_le_bytes()
            .to_vec(),
        (AttributeType::Sint64, Value::Int(v)) => v.to_le_bytes().to_vec(),
        (AttributeType::Q15_16, Value::Fixed(x)) => {
            let raw = (x * Q15_16_ONE).round();
            if !raw.is_finite() || raw < f64::from(i32::MIN) || raw > f64::from(i32::MAX) {
                return Err(out_of_range(desc, x));
            }
            (raw as i32).to_le_bytes().to_vec()
        }
        (AttributeType::Utf8String, Value::Text(s)) => {
            within_max(desc, s.len())?;
            if let Some(nul) = s.bytes().position(|b| b == 0) {
                return Err(CodecError::InvalidEncoding {
                    id: desc.id,
                    valid_up_to: nul,
                });
            }
            s.as_bytes().to_vec()
        }
        (AttributeType::Bytes, Value::Bytes(b)) => {
            within_max(desc, b.len())?;
            b.clone()
        }
        (ty, v) => {
            return Err(CodecError::TypeMismatch {
                id: desc.id,
                ty,
                kind: v.kind(),
            })
        }
    };
    Ok(out)
}

/// Look up `id` in `profile` and encode `value` against it.
pub fn encode_attribute(profile: &DeviceProfile, id: u16, value: &Value) -> Result<Vec<u8>> {
    encode(profile.lookup(id)?, value)
}

fn out_of_range(desc: &AttributeDescriptor, value: impl ToString) -> CodecError {
    CodecError::ValueOutOfRange {
        id: desc.id,
        ty: desc.ty,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::loader::load_builtin;

    fn desc(ty: AttributeType, size: u16) -> AttributeDescriptor {
        AttributeDescriptor::new(7, "test", size, ty)
    }

    #[test]
    fn boolean_bytes() {
        let d = desc(AttributeType::Boolean, 1);
        assert_eq!(encode(&d, &Value::Bool(true)).unwrap(), vec![0x01]);
        assert_eq!(encode(&d, &Value::Bool(false)).unwrap(), vec![0x00]);
    }

    #[test]
    fn integer_bounds() {
        let cases = [
            (AttributeType::Sint8, 1u16, i64::from(i8::MIN), i64::from(i8::MAX)),
            (AttributeType::Sint16, 2, i64::from(i16::MIN), i64::from(i16::MAX)),
            (AttributeType::Sint32, 4, i64::from(i32::MIN), i64::from(i32::MAX)),
        ];
        for (ty, size, min, max) in cases {
            let d = desc(ty, size);
            assert!(encode(&d, &Value::Int(min)).is_ok(), "{ty} min");
            assert!(encode(&d, &Value::Int(max)).is_ok(), "{ty} max");
            assert!(
                matches!(
                    encode(&d, &Value::Int(max + 1)),
                    Err(CodecError::ValueOutOfRange { .. })
                ),
                "{ty} max + 1"
            );
            assert!(
                matches!(
                    encode(&d, &Value::Int(min - 1)),
                    Err(CodecError::ValueOutOfRange { .. })
                ),
                "{ty} min - 1"
            );
        }
        let d = desc(AttributeType::Sint64, 8);
        assert_eq!(
            encode(&d, &Value::Int(i64::MIN)).unwrap(),
            vec![0, 0, 0, 0, 0, 0, 0, 0x80]
        );
    }

    #[test]
    fn fixed_point() {
        let d = desc(AttributeType::Q15_16, 4);
        assert_eq!(
            encode(&d, &Value::Fixed(1.0)).unwrap(),
            vec![0x00, 0x00, 0x01, 0x00]
        );
        assert_eq!(
            encode(&d, &Value::Fixed(-32768.0)).unwrap(),
            vec![0x00, 0x00, 0x00, 0x80]
        );
        assert!(matches!(
            encode(&d, &Value::Fixed(32768.0)),
            Err(CodecError::ValueOutOfRange { .. })
        ));
        assert!(matches!(
            encode(&d, &Value::Fixed(f64::NAN)),
            Err(CodecError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn strings_and_bytes_respect_max() {
        let d = desc(AttributeType::Utf8String, 4);
        assert_eq!(encode(&d, &Value::Text("abcd".into())).unwrap(), b"abcd");
        assert_eq!(
            encode(&d, &Value::Text("abcde".into())).unwrap_err(),
            CodecError::SizeExceeded {
                id: 7,
                max: 4,
                actual: 5
            }
        );
        // multi-byte characters count in bytes
        assert!(encode(&d, &Value::Text("ééé".into())).is_err());
        assert!(matches!(
            encode(&d, &Value::Text("a\0b".into())),
            Err(CodecError::InvalidEncoding { valid_up_to: 1, .. })
        ));

        let d = desc(AttributeType::Bytes, 2);
        assert_eq!(encode(&d, &Value::Bytes(vec![5])).unwrap(), vec![5]);
        assert!(matches!(
            encode(&d, &Value::Bytes(vec![1, 2, 3])),
            Err(CodecError::SizeExceeded { max: 2, actual: 3, .. })
        ));
    }

    #[test]
    fn type_mismatch() {
        let d = desc(AttributeType::Sint16, 2);
        assert_eq!(
            encode(&d, &Value::Text("1".into())).unwrap_err(),
            CodecError::TypeMismatch {
                id: 7,
                ty: AttributeType::Sint16,
                kind: "text"
            }
        );
        assert!(encode(&desc(AttributeType::Q15_16, 4), &Value::Int(1)).is_err());
    }

    #[test]
    fn round_trips_through_every_builtin_attribute() {
        let reg = load_builtin().unwrap();
        for name in reg.names() {
            let p = reg.get(name).unwrap();
            for d in p.attributes() {
                let v = match d.ty {
                    AttributeType::Boolean => Value::Bool(true),
                    AttributeType::Sint8 => Value::Int(-100),
                    AttributeType::Sint16 => Value::Int(-30_000),
                    AttributeType::Sint32 => Value::Int(2_000_000_000),
                    AttributeType::Sint64 => Value::Int(-9_000_000_000_000),
                    AttributeType::Q15_16 => Value::Fixed(-12.25),
                    AttributeType::Utf8String => Value::Text("é".repeat(d.max_len() / 2)),
                    AttributeType::Bytes => Value::Bytes((0..d.size).map(|b| b as u8).collect()),
                };
                let bytes = encode_attribute(p, d.id, &v).unwrap();
                assert_eq!(decode(d, &bytes).unwrap(), v, "{name}/{}", d.id);
            }
        }
    }
}
