//! Packing and unpacking of structured records.
//!
//! A [`Record`] is an ordered list of named [`Value`]s matching a [`Schema`]. Records
//! can be packed with (`include_type`) or without their schema; a buffer packed with
//! its schema can be unpacked with no prior knowledge of the record shape.
//!
//! Round-trip law: for every supported field type,
//! `unpack_data(&pack_data(v, s, t)?, ..)? == v`.

use sha2::{Digest, Sha512_256};

use crate::{CodecError, FieldType, Reader, Schema, Writer, MAX_COUNT};

/// 12-byte tag prepended to 20-byte Ethereum addresses to extend them to the
/// canonical 32-byte address width.
pub const ETHEREUM_ADDR_PREFIX: &[u8; 12] = b"EthereumAddr";

const HASH_LEN: usize = 32;

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Used for both `Uint` and `Number` fields.
    Uint(u64),
    /// 20 or 32 bytes on input; unpacking always yields the 32-byte form.
    Address(Vec<u8>),
    Double(f64),
    Boolean(bool),
    String(String),
    Bytes(Vec<u8>),
    /// Base64 text; the decoded bytes are what goes on the wire.
    Base64(String),
    Object(Record),
    /// A 32-byte content digest, typically computed with [`hash_record`].
    Hash([u8; HASH_LEN]),
    Array(Vec<Value>),
    /// Constant bytes; must match the schema's constant when supplied.
    Fixed(Vec<u8>),
}

/// An ordered record, field order matching its schema.
pub type Record = Vec<(String, Value)>;

fn find<'a>(record: &'a Record, name: &str) -> Option<&'a Value> {
    record.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

/// SHA-512/256 digest of `record` packed *with* its schema. Content hashes always
/// cover the typed encoding so they stay comparable across schema revisions.
pub fn hash_record(record: &Record, schema: &Schema) -> Result<[u8; HASH_LEN], CodecError> {
    let packed = pack_data(record, schema, true)?;
    let mut h = Sha512_256::new();
    h.update(&packed);
    Ok(h.finalize().into())
}

/// Pack `record` against `schema`. With `include_type` the packed schema is
/// prepended, length-prefixed with a `u64`, making the buffer self-describing.
pub fn pack_data(
    record: &Record,
    schema: &Schema,
    include_type: bool,
) -> Result<Vec<u8>, CodecError> {
    let mut w = Writer::new();

    if include_type {
        let packed = schema.pack()?;
        w.write_u64(packed.len() as u64);
        w.write_bytes(&packed);
    }

    for (name, ty) in schema.fields() {
        match find(record, name) {
            Some(value) => pack_field(&mut w, name, ty, value)?,
            // Constant fields carry no per-record information and may be omitted.
            None if matches!(ty, FieldType::Fixed(_)) => {
                pack_field(&mut w, name, ty, &Value::Fixed(vec![]))?
            }
            None => return Err(CodecError::MissingField(name.clone())),
        }
    }

    Ok(w.into_vec())
}

fn mismatch(name: &str, expected: &'static str) -> CodecError {
    CodecError::TypeMismatch {
        field: name.to_string(),
        expected,
    }
}

fn pack_field(
    w: &mut Writer,
    name: &str,
    ty: &FieldType,
    value: &Value,
) -> Result<(), CodecError> {
    match (ty, value) {
        (FieldType::Uint | FieldType::Number, Value::Uint(v)) => w.write_u64(*v),

        (FieldType::Address, Value::Address(bytes)) => match bytes.len() {
            20 => {
                w.write_bytes(ETHEREUM_ADDR_PREFIX);
                w.write_bytes(bytes);
            }
            32 => w.write_bytes(bytes),
            other => return Err(CodecError::InvalidAddressLength(other)),
        },

        (FieldType::Double, Value::Double(v)) => w.write_bytes(&v.to_le_bytes()),

        (FieldType::Boolean, Value::Boolean(v)) => w.write_u8(u8::from(*v)),

        (FieldType::String { size }, Value::String(s)) => {
            if s.len() != *size {
                return Err(CodecError::InvalidLength {
                    field: name.to_string(),
                    expected: *size,
                    got: s.len(),
                });
            }
            w.write_bytes(s.as_bytes());
        }

        (FieldType::EmptyString, Value::String(s)) => {
            if !s.is_empty() {
                return Err(CodecError::InvalidLength {
                    field: name.to_string(),
                    expected: 0,
                    got: s.len(),
                });
            }
        }

        (FieldType::Bytes { size }, Value::Bytes(bytes)) => {
            if bytes.len() != *size {
                return Err(CodecError::InvalidLength {
                    field: name.to_string(),
                    expected: *size,
                    got: bytes.len(),
                });
            }
            w.write_bytes(bytes);
        }

        (FieldType::Base64 { size }, Value::Base64(text)) => {
            let bytes = base64::decode(text)
                .map_err(|_| CodecError::InvalidBase64(name.to_string()))?;
            if bytes.len() != *size {
                return Err(CodecError::InvalidLength {
                    field: name.to_string(),
                    expected: *size,
                    got: bytes.len(),
                });
            }
            w.write_bytes(&bytes);
        }

        (FieldType::Object(nested), Value::Object(record)) => {
            w.write_bytes(&pack_data(record, nested, false)?)
        }

        (FieldType::Hash(_), Value::Hash(digest)) => w.write_bytes(digest),

        (FieldType::Array(elem), Value::Array(values)) => {
            if values.len() >= MAX_COUNT {
                return Err(CodecError::CountTooLarge {
                    what: "array",
                    len: values.len(),
                });
            }
            w.write_u8(values.len() as u8);
            for v in values {
                pack_field(w, name, elem, v)?;
            }
        }

        (FieldType::Fixed(constant), Value::Fixed(bytes)) => {
            if !bytes.is_empty() && bytes != constant {
                return Err(CodecError::FixedMismatch(name.to_string()));
            }
            w.write_bytes(constant);
        }

        (FieldType::Uint | FieldType::Number, _) => return Err(mismatch(name, "uint")),
        (FieldType::Address, _) => return Err(mismatch(name, "address")),
        (FieldType::Double, _) => return Err(mismatch(name, "double")),
        (FieldType::Boolean, _) => return Err(mismatch(name, "boolean")),
        (FieldType::String { .. } | FieldType::EmptyString, _) => {
            return Err(mismatch(name, "string"))
        }
        (FieldType::Bytes { .. }, _) => return Err(mismatch(name, "bytes")),
        (FieldType::Base64 { .. }, _) => return Err(mismatch(name, "base64")),
        (FieldType::Object(_), _) => return Err(mismatch(name, "object")),
        (FieldType::Hash(_), _) => return Err(mismatch(name, "hash")),
        (FieldType::Array(_), _) => return Err(mismatch(name, "array")),
        (FieldType::Fixed(_), _) => return Err(mismatch(name, "fixed")),
    }

    Ok(())
}

/// Unpack a record from `data`.
///
/// With a schema supplied the buffer is expected to contain field data only; without
/// one the buffer must be self-describing (packed with `include_type`). The whole
/// input must be consumed.
pub fn unpack_data(data: &[u8], schema: Option<&Schema>) -> Result<Record, CodecError> {
    let mut r = Reader::new(data);

    let owned;
    let schema = match schema {
        Some(schema) => schema,
        None => {
            let len = r.read_u64()? as usize;
            owned = Schema::unpack(r.take(len)?)?;
            &owned
        }
    };

    let record = unpack_record(&mut r, schema)?;
    r.finish()?;
    Ok(record)
}

fn unpack_record(r: &mut Reader<'_>, schema: &Schema) -> Result<Record, CodecError> {
    let mut record = Vec::with_capacity(schema.fields().len());
    for (name, ty) in schema.fields() {
        record.push((name.clone(), unpack_field(r, name, ty)?));
    }
    Ok(record)
}

fn unpack_field(r: &mut Reader<'_>, name: &str, ty: &FieldType) -> Result<Value, CodecError> {
    Ok(match ty {
        FieldType::Uint | FieldType::Number => Value::Uint(r.read_u64()?),
        FieldType::Address => Value::Address(r.take(32)?.to_vec()),
        FieldType::Double => Value::Double(f64::from_le_bytes(r.read_fixed::<8>()?)),
        FieldType::Boolean => Value::Boolean(r.read_u8()? == 1),
        FieldType::String { size } => Value::String(
            std::str::from_utf8(r.take(*size)?)
                .map_err(|_| CodecError::InvalidFieldName)?
                .to_string(),
        ),
        FieldType::EmptyString => Value::String(String::new()),
        FieldType::Bytes { size } => Value::Bytes(r.take(*size)?.to_vec()),
        FieldType::Base64 { size } => Value::Base64(base64::encode(r.take(*size)?)),
        FieldType::Object(nested) => Value::Object(unpack_record(r, nested)?),
        FieldType::Hash(_) => Value::Hash(r.read_fixed::<HASH_LEN>()?),
        FieldType::Array(elem) => {
            let count = r.read_u8()?;
            let mut values = Vec::with_capacity(count.into());
            for _ in 0..count {
                values.push(unpack_field(r, name, elem)?);
            }
            Value::Array(values)
        }
        FieldType::Fixed(constant) => {
            if r.take(constant.len())? != constant.as_slice() {
                return Err(CodecError::FixedMismatch(name.to_string()));
            }
            Value::Fixed(constant.clone())
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;

    fn point_schema() -> Schema {
        Schema::new()
            .field("x", FieldType::Uint)
            .field("y", FieldType::Uint)
    }

    fn point(x: u64, y: u64) -> Record {
        vec![
            ("x".to_string(), Value::Uint(x)),
            ("y".to_string(), Value::Uint(y)),
        ]
    }

    /// One record exercising every supported field type, packed self-describing.
    #[test]
    fn self_describing_round_trip() {
        let schema = Schema::new()
            .field("count", FieldType::Uint)
            .field("total", FieldType::Number)
            .field("ratio", FieldType::Double)
            .field("live", FieldType::Boolean)
            .field("name", FieldType::String { size: 5 })
            .field("note", FieldType::EmptyString)
            .field("id", FieldType::Bytes { size: 4 })
            .field("blob", FieldType::Base64 { size: 3 })
            .field("origin", FieldType::Address)
            .field("inner", FieldType::Object(point_schema()))
            .field("content", FieldType::Hash(point_schema()))
            .field("points", FieldType::Array(Box::new(FieldType::Uint)))
            .field("magic", FieldType::Fixed(vec![0xca, 0xfe]));

        let content = hash_record(&point(7, 9), &point_schema()).unwrap();
        let record: Record = vec![
            ("count".to_string(), Value::Uint(42)),
            ("total".to_string(), Value::Uint(1 << 40)),
            ("ratio".to_string(), Value::Double(0.5)),
            ("live".to_string(), Value::Boolean(true)),
            ("name".to_string(), Value::String("oracl".to_string())),
            ("note".to_string(), Value::String(String::new())),
            ("id".to_string(), Value::Bytes(vec![1, 2, 3, 4])),
            ("blob".to_string(), Value::Base64(base64::encode([9, 8, 7]))),
            ("origin".to_string(), Value::Address(vec![0xab; 32])),
            ("inner".to_string(), Value::Object(point(1, 2))),
            ("content".to_string(), Value::Hash(content)),
            (
                "points".to_string(),
                Value::Array(vec![Value::Uint(3), Value::Uint(5)]),
            ),
            ("magic".to_string(), Value::Fixed(vec![0xca, 0xfe])),
        ];

        let packed = pack_data(&record, &schema, true).unwrap();

        // No external schema needed.
        assert_eq!(unpack_data(&packed, None).unwrap(), record);

        // And the schema-supplied form skips the descriptor.
        let bare = pack_data(&record, &schema, false).unwrap();
        assert!(bare.len() < packed.len());
        assert_eq!(unpack_data(&bare, Some(&schema)).unwrap(), record);
    }

    #[test]
    fn determinism() {
        let record = point(11, 13);
        let a = pack_data(&record, &point_schema(), true).unwrap();
        let b = pack_data(&record, &point_schema(), true).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            hash_record(&record, &point_schema()).unwrap(),
            hash_record(&record, &point_schema()).unwrap()
        );
    }

    #[test]
    fn ethereum_address_is_extended() {
        let schema = Schema::new().field("addr", FieldType::Address);
        let record: Record = vec![("addr".to_string(), Value::Address(vec![0x11; 20]))];

        let packed = pack_data(&record, &schema, false).unwrap();
        assert_eq!(packed.len(), 32);
        assert_eq!(&packed[..12], ETHEREUM_ADDR_PREFIX);
        assert_eq!(&packed[12..], &[0x11; 20]);

        // Unpacking yields the extended 32-byte form.
        let unpacked = unpack_data(&packed, Some(&schema)).unwrap();
        assert_eq!(unpacked[0].1, Value::Address(packed.clone()));
    }

    #[test]
    fn invalid_address_length() {
        let schema = Schema::new().field("addr", FieldType::Address);
        let record: Record = vec![("addr".to_string(), Value::Address(vec![0x11; 21]))];
        assert_eq!(
            pack_data(&record, &schema, false),
            Err(CodecError::InvalidAddressLength(21))
        );
    }

    #[test]
    fn double_is_little_endian() {
        let schema = Schema::new().field("ratio", FieldType::Double);
        let record: Record = vec![("ratio".to_string(), Value::Double(1.0))];
        let packed = pack_data(&record, &schema, false).unwrap();
        assert_eq!(packed, 1.0f64.to_le_bytes());
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut packed = pack_data(&point(1, 2), &point_schema(), false).unwrap();
        packed.push(0);
        assert_eq!(
            unpack_data(&packed, Some(&point_schema())),
            Err(CodecError::TrailingBytes {
                consumed: 16,
                len: 17
            })
        );
    }

    #[test]
    fn missing_field() {
        let record: Record = vec![("x".to_string(), Value::Uint(1))];
        assert_eq!(
            pack_data(&record, &point_schema(), false),
            Err(CodecError::MissingField("y".to_string()))
        );
    }

    #[test]
    fn type_mismatch() {
        let record: Record = vec![
            ("x".to_string(), Value::Boolean(true)),
            ("y".to_string(), Value::Uint(2)),
        ];
        assert!(matches!(
            pack_data(&record, &point_schema(), false),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn fixed_field_round_trip() {
        // The constant precedes another field, so a decoder that fails to consume
        // it would misalign everything after it.
        let schema = Schema::new()
            .field("magic", FieldType::Fixed(vec![0xde, 0xad]))
            .field("x", FieldType::Uint);
        let record: Record = vec![
            ("magic".to_string(), Value::Fixed(vec![0xde, 0xad])),
            ("x".to_string(), Value::Uint(0x0102_0304)),
        ];

        let packed = pack_data(&record, &schema, false).unwrap();
        assert_eq!(packed.len(), 2 + 8);
        assert_eq!(unpack_data(&packed, Some(&schema)).unwrap(), record);
    }

    #[test]
    fn fixed_bytes_mismatch_on_unpack() {
        let schema = Schema::new().field("magic", FieldType::Fixed(vec![0xde, 0xad]));
        let record: Record = vec![("magic".to_string(), Value::Fixed(vec![]))];

        let mut packed = pack_data(&record, &schema, false).unwrap();
        packed[0] = 0x00;
        assert_eq!(
            unpack_data(&packed, Some(&schema)),
            Err(CodecError::FixedMismatch("magic".to_string()))
        );
    }

    #[test]
    fn fixed_constant_mismatch() {
        let schema = Schema::new().field("magic", FieldType::Fixed(vec![1, 2]));
        let record: Record = vec![("magic".to_string(), Value::Fixed(vec![3, 4]))];
        assert_eq!(
            pack_data(&record, &schema, false),
            Err(CodecError::FixedMismatch("magic".to_string()))
        );
    }
}
