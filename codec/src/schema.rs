//! Recursively-encoded record descriptors.
//!
//! A [`Schema`] describes the shape of a structured record: an ordered list of named,
//! typed fields. Schemas can themselves be encoded and prepended to the data they
//! describe (see [`crate::value::pack_data`]), so a decoder with no prior knowledge of
//! the record shape can still parse it.

use crate::{CodecError, Reader, Writer, MAX_COUNT};

/// Wire tags for every supported field type.
///
/// NOTE: !!!! ONLY MODIFY THIS BY APPENDING TO THE END. THE INDEXES EFFECT THE
/// MERKLE LOG HASH VALUES !!!!
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    Uint = 0,
    Number = 1,
    Address = 2,
    Double = 3,
    Boolean = 4,
    String = 5,
    Bytes = 6,
    Base64 = 7,
    Object = 8,
    Hash = 9,
    Array = 10,
    EmptyString = 11,
    Fixed = 12,
}

impl TryFrom<u8> for TypeTag {
    type Error = CodecError;

    fn try_from(tag: u8) -> Result<Self, CodecError> {
        Ok(match tag {
            0 => TypeTag::Uint,
            1 => TypeTag::Number,
            2 => TypeTag::Address,
            3 => TypeTag::Double,
            4 => TypeTag::Boolean,
            5 => TypeTag::String,
            6 => TypeTag::Bytes,
            7 => TypeTag::Base64,
            8 => TypeTag::Object,
            9 => TypeTag::Hash,
            10 => TypeTag::Array,
            11 => TypeTag::EmptyString,
            12 => TypeTag::Fixed,
            other => return Err(CodecError::UnknownTypeTag(other)),
        })
    }
}

/// The type of a single record field, including any type-specific metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// 8-byte big-endian unsigned integer.
    Uint,
    /// Same wire shape as [`FieldType::Uint`]; kept as a distinct tag for
    /// compatibility with persisted schemas.
    Number,
    /// 32-byte address. 20-byte Ethereum addresses are extended on encode, see
    /// [`crate::value::pack_data`].
    Address,
    /// IEEE-754 f64, little-endian.
    Double,
    /// Single byte, 0 or 1.
    Boolean,
    /// UTF-8 string of exactly `size` bytes.
    String { size: usize },
    /// Raw bytes of exactly `size` bytes.
    Bytes { size: usize },
    /// Base64 text whose decoded form is exactly `size` bytes.
    Base64 { size: usize },
    /// Nested record, encoded inline without its own schema.
    Object(Schema),
    /// 32-byte SHA-512/256 content digest of a nested record. The digest always
    /// covers the *typed* encoding of the nested record, see [`crate::hash_record`].
    Hash(Schema),
    /// Homogeneous array with a 1-byte element count.
    Array(Box<FieldType>),
    /// Constant bytes baked into the schema; contributes no per-record information.
    Fixed(Vec<u8>),
    /// Zero-byte placeholder for a string field that is always empty.
    EmptyString,
}

impl FieldType {
    pub fn tag(&self) -> TypeTag {
        match self {
            FieldType::Uint => TypeTag::Uint,
            FieldType::Number => TypeTag::Number,
            FieldType::Address => TypeTag::Address,
            FieldType::Double => TypeTag::Double,
            FieldType::Boolean => TypeTag::Boolean,
            FieldType::String { .. } => TypeTag::String,
            FieldType::Bytes { .. } => TypeTag::Bytes,
            FieldType::Base64 { .. } => TypeTag::Base64,
            FieldType::Object(_) => TypeTag::Object,
            FieldType::Hash(_) => TypeTag::Hash,
            FieldType::Array(_) => TypeTag::Array,
            FieldType::EmptyString => TypeTag::EmptyString,
            FieldType::Fixed(_) => TypeTag::Fixed,
        }
    }
}

/// An ordered list of named, typed fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Vec<(String, FieldType)>,
}

/// Name used to wrap an array's element type when its descriptor is encoded as a
/// nested single-field schema.
const ARRAY_VALUE_FIELD: &str = "value";

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field append, preserving declaration order.
    pub fn field(mut self, name: &str, ty: FieldType) -> Self {
        self.fields.push((name.to_string(), ty));
        self
    }

    pub fn fields(&self) -> &[(String, FieldType)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldType> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| ty)
    }

    /// Encode the schema itself: `fieldCount:u8` then, per field, `nameLen:u8`,
    /// the name bytes, `typeTag:u8` and type-specific metadata.
    pub fn pack(&self) -> Result<Vec<u8>, CodecError> {
        let mut w = Writer::new();
        self.pack_into(&mut w)?;
        Ok(w.into_vec())
    }

    fn pack_into(&self, w: &mut Writer) -> Result<(), CodecError> {
        if self.fields.len() >= MAX_COUNT {
            return Err(CodecError::CountTooLarge {
                what: "field count",
                len: self.fields.len(),
            });
        }
        w.write_u8(self.fields.len() as u8);

        for (name, ty) in &self.fields {
            if name.len() >= MAX_COUNT {
                return Err(CodecError::CountTooLarge {
                    what: "field name",
                    len: name.len(),
                });
            }
            w.write_u8(name.len() as u8);
            w.write_bytes(name.as_bytes());
            w.write_u8(ty.tag() as u8);

            match ty {
                FieldType::String { size }
                | FieldType::Bytes { size }
                | FieldType::Base64 { size } => {
                    if *size >= MAX_COUNT {
                        return Err(CodecError::CountTooLarge {
                            what: "sized field",
                            len: *size,
                        });
                    }
                    w.write_u8(*size as u8);
                }
                FieldType::Object(nested) | FieldType::Hash(nested) => {
                    let packed = nested.pack()?;
                    w.write_u64(packed.len() as u64);
                    w.write_bytes(&packed);
                }
                FieldType::Array(elem) => {
                    // An array's element descriptor is wrapped in a synthetic
                    // single-field schema so it reuses the record encoding.
                    let nested =
                        Schema::new().field(ARRAY_VALUE_FIELD, (**elem).clone());
                    let packed = nested.pack()?;
                    w.write_u64(packed.len() as u64);
                    w.write_bytes(&packed);
                }
                FieldType::Fixed(bytes) => {
                    if bytes.len() >= MAX_COUNT {
                        return Err(CodecError::CountTooLarge {
                            what: "fixed field",
                            len: bytes.len(),
                        });
                    }
                    w.write_u8(bytes.len() as u8);
                    w.write_bytes(bytes);
                }
                FieldType::Uint
                | FieldType::Number
                | FieldType::Address
                | FieldType::Double
                | FieldType::Boolean
                | FieldType::EmptyString => {}
            }
        }

        Ok(())
    }

    /// Decode a schema from `data`, consuming the whole input.
    pub fn unpack(data: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(data);
        let schema = Self::unpack_from(&mut r)?;
        r.finish()?;
        Ok(schema)
    }

    fn unpack_from(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let field_count = r.read_u8()?;

        let mut fields = Vec::with_capacity(field_count.into());
        for _ in 0..field_count {
            let name_len = r.read_u8()?;
            let name = std::str::from_utf8(r.take(name_len.into())?)
                .map_err(|_| CodecError::InvalidFieldName)?
                .to_string();

            let tag = TypeTag::try_from(r.read_u8()?)?;
            let ty = match tag {
                TypeTag::Uint => FieldType::Uint,
                TypeTag::Number => FieldType::Number,
                TypeTag::Address => FieldType::Address,
                TypeTag::Double => FieldType::Double,
                TypeTag::Boolean => FieldType::Boolean,
                TypeTag::EmptyString => FieldType::EmptyString,
                TypeTag::String => FieldType::String {
                    size: r.read_u8()?.into(),
                },
                TypeTag::Bytes => FieldType::Bytes {
                    size: r.read_u8()?.into(),
                },
                TypeTag::Base64 => FieldType::Base64 {
                    size: r.read_u8()?.into(),
                },
                TypeTag::Object | TypeTag::Hash | TypeTag::Array => {
                    let len = r.read_u64()? as usize;
                    let nested = Schema::unpack(r.take(len)?)?;
                    match tag {
                        TypeTag::Object => FieldType::Object(nested),
                        TypeTag::Hash => FieldType::Hash(nested),
                        _ => {
                            let elem = nested
                                .get(ARRAY_VALUE_FIELD)
                                .cloned()
                                .ok_or(CodecError::MissingField(
                                    ARRAY_VALUE_FIELD.to_string(),
                                ))?;
                            FieldType::Array(Box::new(elem))
                        }
                    }
                }
                TypeTag::Fixed => {
                    let len = r.read_u8()?;
                    FieldType::Fixed(r.take(len.into())?.to_vec())
                }
            };

            fields.push((name, ty));
        }

        Ok(Schema { fields })
    }
}
