/*!
 Decodes the class metadata that precedes member values: class names, member names, and member types.
*/

use crate::{
    error::nrbf::{DecodeError, NrbfError},
    util::nrbf::{
        models::{BinaryType, ClassInfo, ClassTypeInfo, MemberType, MemberTypeInfo},
        stream::ByteStream,
    },
};

impl ClassInfo {
    /// Read the object id, class name, and member names of a class definition
    pub fn read(stream: &mut ByteStream) -> Result<Self, DecodeError> {
        let object_id = stream.read_i32()?;
        let name = stream.read_string()?;
        let member_count = stream.read_count()?;

        let mut member_names = vec![];
        for _ in 0..member_count {
            member_names.push(stream.read_string()?);
        }

        Ok(Self {
            object_id,
            name,
            member_names,
        })
    }
}

impl MemberTypeInfo {
    /// Read the types of `member_count` members
    ///
    /// Every [`BinaryType`] tag is stored before any of the additional type information, so all of the
    /// tags are read first and then the additional information for each tag in order.
    pub fn read(stream: &mut ByteStream, member_count: usize) -> Result<Self, DecodeError> {
        let mut binary_types = vec![];
        for _ in 0..member_count {
            binary_types.push(read_binary_type(stream)?);
        }

        let types = binary_types
            .into_iter()
            .map(|binary_type| MemberType::read_additional_info(stream, binary_type))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { types })
    }
}

impl MemberType {
    /// Read a single [`BinaryType`] tag immediately followed by its additional type information
    pub fn read(stream: &mut ByteStream) -> Result<Self, DecodeError> {
        let binary_type = read_binary_type(stream)?;
        Self::read_additional_info(stream, binary_type)
    }

    /// Read the additional type information stored for a [`BinaryType`], if any
    pub fn read_additional_info(
        stream: &mut ByteStream,
        binary_type: BinaryType,
    ) -> Result<Self, DecodeError> {
        Ok(match binary_type {
            BinaryType::Primitive => MemberType::Primitive(stream.read_primitive_type()?),
            BinaryType::PrimitiveArray => {
                MemberType::PrimitiveArray(stream.read_primitive_type()?)
            }
            BinaryType::SystemClass => MemberType::SystemClass(stream.read_string()?),
            BinaryType::Class => MemberType::Class(ClassTypeInfo {
                type_name: stream.read_string()?,
                library_id: stream.read_i32()?,
            }),
            BinaryType::String => MemberType::String,
            BinaryType::Object => MemberType::Object,
            BinaryType::ObjectArray => MemberType::ObjectArray,
            BinaryType::StringArray => MemberType::StringArray,
        })
    }
}

fn read_binary_type(stream: &mut ByteStream) -> Result<BinaryType, DecodeError> {
    let start = stream.position();
    let byte = stream.read_u8()?;
    BinaryType::from_byte(byte)
        .ok_or_else(|| DecodeError::new(start, NrbfError::UnknownBinaryType(byte)))
}
