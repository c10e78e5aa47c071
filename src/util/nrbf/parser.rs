/*!
 Contains logic to decode the records of a binary-serialized object graph into native Rust data structures.

 Every record starts with a one-byte [`RecordType`] tag. Class records define (or reuse) a member layout and
 then store one value per member; any value that is not an inline primitive is itself a full record, so decoding
 recurses through nested objects, arrays, nulls, and references.
*/

use std::collections::HashMap;

use crate::{
    error::nrbf::{DecodeError, NrbfError, PartialDecode},
    util::nrbf::{
        layouts::LayoutField,
        models::{
            BinaryLibrary, BinaryObjectString, ClassInfo, ClassRecord, ClassWithId, MemberType,
            MemberTypeInfo, ObjectId, Record, RecordType, SerializationHeader, Value,
        },
        objects::{ClassTemplate, LibraryTable, ObjectKind, ObjectTable},
        options::ReaderOptions,
        stream::ByteStream,
    },
};

/// Contains logic and data used to decode records from a stream
///
/// A reader is a single decode session: the object and library tables it builds only ever describe its own stream.
#[derive(Debug)]
pub struct NrbfReader<'a> {
    /// The stream we want to decode
    pub(crate) stream: ByteStream<'a>,
    /// Every object id assigned so far
    pub(crate) objects: ObjectTable,
    /// Every library declared so far
    libraries: LibraryTable,
    options: ReaderOptions,
    /// How many records are currently being decoded inside one another
    depth: usize,
    /// Every back-reference read so far, with the offset of its record
    ///
    /// References may point forward to objects defined later in the stream, so they are checked once it ends.
    references: Vec<(ObjectId, usize)>,
}

impl<'a> NrbfReader<'a> {
    pub fn new(stream: &'a [u8]) -> Self {
        Self::with_options(stream, ReaderOptions::default())
    }

    pub fn with_options(stream: &'a [u8], options: ReaderOptions) -> Self {
        Self {
            stream: ByteStream::new(stream),
            objects: ObjectTable::new(),
            libraries: LibraryTable::new(),
            options,
            depth: 0,
            references: vec![],
        }
    }

    /// The offset of the next byte to be read
    pub fn position(&self) -> usize {
        self.stream.position()
    }

    pub fn objects(&self) -> &ObjectTable {
        &self.objects
    }

    pub fn libraries(&self) -> &LibraryTable {
        &self.libraries
    }

    /// End the session, keeping the tables it built
    pub fn into_tables(self) -> (ObjectTable, LibraryTable) {
        (self.objects, self.libraries)
    }

    /// Read the next top-level record, or [`None`] if the stream ended cleanly between records
    pub fn read_record(&mut self) -> Result<Option<Record>, DecodeError> {
        if self.stream.is_exhausted() {
            return Ok(None);
        }
        let offset = self.stream.position();
        let record = self.decode_record()?;
        log::debug!("[nrbf] {:?} at {offset:#x}", record.record_type());
        Ok(Some(record))
    }

    /// Ensure every back-reference read so far points to an object defined in the stream
    pub fn verify_references(&self) -> Result<(), DecodeError> {
        for (id, offset) in &self.references {
            if !self.objects.contains(*id) {
                return Err(DecodeError::new(
                    *offset,
                    NrbfError::UnresolvedReference(*id),
                ));
            }
        }
        Ok(())
    }

    /// Decode every record in the stream
    ///
    /// Stops at the first error, returning it along with the records decoded before it.
    pub fn parse(&mut self) -> Result<Vec<Record>, PartialDecode> {
        let mut out_v = vec![];

        loop {
            match self.read_record() {
                Ok(Some(record)) => out_v.push(record),
                Ok(None) => break,
                Err(error) => {
                    return Err(PartialDecode {
                        records: out_v,
                        error,
                    })
                }
            }
        }

        match self.verify_references() {
            Ok(()) => Ok(out_v),
            Err(error) => Err(PartialDecode {
                records: out_v,
                error,
            }),
        }
    }

    /// Decode a single record, which may be nested inside another
    ///
    /// Running out of bytes here is always an error; only [`NrbfReader::read_record`] treats it as the end of the stream.
    pub(crate) fn decode_record(&mut self) -> Result<Record, DecodeError> {
        if self.depth >= self.options.max_depth {
            return Err(self
                .stream
                .fail(NrbfError::GraphTooDeep(self.options.max_depth)));
        }
        self.depth += 1;
        let record = self.dispatch();
        self.depth -= 1;
        record
    }

    fn dispatch(&mut self) -> Result<Record, DecodeError> {
        let offset = self.stream.position();
        let tag = self.stream.read_u8()?;
        let record_type = RecordType::from_byte(tag)
            .ok_or(DecodeError::new(offset, NrbfError::UnknownRecordType(tag)))?;

        match record_type {
            RecordType::SerializedStreamHeader => self.read_header(),
            RecordType::ClassWithId => self.read_class_with_id(offset),
            RecordType::SystemClassWithMembers => {
                self.read_class(record_type, offset, Record::SystemClassWithMembers)
            }
            RecordType::ClassWithMembers => {
                self.read_class(record_type, offset, Record::ClassWithMembers)
            }
            RecordType::SystemClassWithMembersAndTypes => {
                self.read_class(record_type, offset, Record::SystemClassWithMembersAndTypes)
            }
            RecordType::ClassWithMembersAndTypes => {
                self.read_class(record_type, offset, Record::ClassWithMembersAndTypes)
            }
            RecordType::BinaryObjectString => self.read_object_string(offset),
            RecordType::BinaryArray => self.read_binary_array(offset),
            RecordType::MemberPrimitiveTyped => {
                let kind = self.stream.read_primitive_type()?;
                Ok(Record::MemberPrimitiveTyped(self.stream.read_primitive(kind)?))
            }
            RecordType::MemberReference => {
                let id = self.stream.read_i32()?;
                self.references.push((id, offset));
                Ok(Record::MemberReference(id))
            }
            RecordType::ObjectNull => Ok(Record::ObjectNull),
            RecordType::MessageEnd => Ok(Record::MessageEnd),
            RecordType::BinaryLibrary => self.read_library(),
            RecordType::ObjectNullMultiple256 => {
                let count = self.stream.read_u8()?;
                if count == 0 {
                    return Err(DecodeError::new(offset, NrbfError::InvalidCount(0)));
                }
                Ok(Record::ObjectNullMultiple256(count))
            }
            RecordType::ObjectNullMultiple => {
                let count = self.stream.read_i32()?;
                if count <= 0 {
                    return Err(DecodeError::new(
                        offset,
                        NrbfError::InvalidCount(i64::from(count)),
                    ));
                }
                Ok(Record::ObjectNullMultiple(count))
            }
            RecordType::ArraySinglePrimitive => self.read_array_single_primitive(offset),
            RecordType::ArraySingleObject => {
                self.read_array_single(offset, Record::ArraySingleObject)
            }
            RecordType::ArraySingleString => {
                self.read_array_single(offset, Record::ArraySingleString)
            }
            RecordType::MethodCall | RecordType::MethodReturn => Err(DecodeError::new(
                offset,
                NrbfError::UnsupportedRecordType(record_type),
            )),
        }
    }

    /// Assign an id to the object whose record starts at `offset`
    pub(crate) fn register(
        &mut self,
        id: ObjectId,
        kind: ObjectKind,
        offset: usize,
    ) -> Result<(), DecodeError> {
        self.objects
            .register(id, kind, offset)
            .map_err(|error| DecodeError::new(offset, error))
    }

    fn read_header(&mut self) -> Result<Record, DecodeError> {
        Ok(Record::SerializedStreamHeader(SerializationHeader {
            root_id: self.stream.read_i32()?,
            header_id: self.stream.read_i32()?,
            major_version: self.stream.read_i32()?,
            minor_version: self.stream.read_i32()?,
        }))
    }

    fn read_library(&mut self) -> Result<Record, DecodeError> {
        let library_id = self.stream.read_i32()?;
        let name = self.stream.read_string()?;
        self.libraries.register(library_id, name.clone());
        Ok(Record::BinaryLibrary(BinaryLibrary { library_id, name }))
    }

    fn read_object_string(&mut self, offset: usize) -> Result<Record, DecodeError> {
        let object_id = self.stream.read_i32()?;
        let value = self.stream.read_string()?;
        self.register(object_id, ObjectKind::String, offset)?;
        self.objects.complete(object_id);
        Ok(Record::BinaryObjectString(BinaryObjectString { object_id, value }))
    }

    /// Read any of the four records that define a class layout along with an instance of it
    ///
    /// The layout is registered before the members are read so that members can refer back to this object
    /// or reuse its layout.
    fn read_class(
        &mut self,
        record_type: RecordType,
        offset: usize,
        wrap: fn(ClassRecord) -> Record,
    ) -> Result<Record, DecodeError> {
        let class_info = ClassInfo::read(&mut self.stream)?;
        let member_types = if record_type.has_member_types() {
            Some(MemberTypeInfo::read(
                &mut self.stream,
                class_info.member_count(),
            )?)
        } else {
            None
        };
        let library_id = if record_type.has_library_id() {
            Some(self.stream.read_i32()?)
        } else {
            None
        };

        let template = ClassTemplate::new(
            &class_info,
            member_types.clone(),
            library_id,
            record_type.is_system_class(),
        );
        let object_id = class_info.object_id;
        self.register(object_id, ObjectKind::Class(template.clone()), offset)?;

        let members = self.read_members(&template)?;
        self.objects.complete(object_id);

        Ok(wrap(ClassRecord {
            class_info,
            member_types,
            library_id,
            members,
        }))
    }

    /// Read an instance of a class whose layout was defined earlier in the stream
    fn read_class_with_id(&mut self, offset: usize) -> Result<Record, DecodeError> {
        let object_id = self.stream.read_i32()?;
        let metadata_id = self.stream.read_i32()?;

        // The template is cloned since reading members needs to mutate the table it lives in
        let template = self
            .objects
            .resolve_template(metadata_id)
            .map_err(|error| DecodeError::new(offset, error))?
            .clone();
        self.register(object_id, ObjectKind::Instance(template.object_id), offset)?;

        let members = self.read_members(&template)?;
        self.objects.complete(object_id);

        Ok(Record::ClassWithId(ClassWithId {
            object_id,
            metadata_id,
            class_name: template.name,
            member_names: template.member_names,
            members,
        }))
    }

    /// Read the member values of an instance laid out by `template`
    fn read_members(&mut self, template: &ClassTemplate) -> Result<Vec<Value>, DecodeError> {
        match &template.member_types {
            Some(member_types) => {
                let mut members = Vec::with_capacity(template.member_count());
                for (name, member_type) in template.member_names.iter().zip(&member_types.types) {
                    log::trace!(
                        "[nrbf] {}.{name}: {:?}",
                        template.name,
                        member_type.binary_type()
                    );
                    members.push(self.read_typed_value(member_type)?);
                }
                Ok(members)
            }
            // Untyped system classes have a fixed layout for the whole class
            None if template.system => {
                let fields = self
                    .options
                    .layouts
                    .class_layout(&template.name)
                    .map_err(|error| self.stream.fail(error))?
                    .to_vec();
                fields
                    .into_iter()
                    .map(|field| self.read_layout_field(field))
                    .collect()
            }
            // Untyped user classes have a fixed layout for each member
            None => {
                let mut members = Vec::with_capacity(template.member_count());
                for name in &template.member_names {
                    let field = self
                        .options
                        .layouts
                        .member_layout(&template.name, name)
                        .map_err(|error| self.stream.fail(error))?;
                    members.push(self.read_layout_field(field)?);
                }
                Ok(members)
            }
        }
    }

    /// Read a member or array element whose type was described in the stream
    pub(crate) fn read_typed_value(
        &mut self,
        member_type: &MemberType,
    ) -> Result<Value, DecodeError> {
        match member_type {
            MemberType::Primitive(kind) => Ok(Value::Primitive(self.stream.read_primitive(*kind)?)),
            _ => Ok(Value::Record(Box::new(self.decode_record()?))),
        }
    }

    fn read_layout_field(&mut self, field: LayoutField) -> Result<Value, DecodeError> {
        match field {
            LayoutField::Primitive(kind) => Ok(Value::Primitive(self.stream.read_primitive(kind)?)),
            LayoutField::Record => Ok(Value::Record(Box::new(self.decode_record()?))),
        }
    }
}

/// Everything produced by decoding a complete stream
#[derive(Debug)]
pub struct Decoded {
    /// Top-level records, in stream order
    pub records: Vec<Record>,
    pub objects: ObjectTable,
    pub libraries: LibraryTable,
}

impl Decoded {
    /// Build a lookup from object id to the record that defined it, at any depth
    ///
    /// Follow a [`Record::MemberReference`] by looking up its id here.
    pub fn index(&self) -> HashMap<ObjectId, &Record> {
        let mut index = HashMap::new();
        self.records
            .iter()
            .for_each(|record| index_record(record, &mut index));
        index
    }

    /// The object named as the root of the graph by the stream header
    pub fn root(&self) -> Option<&Record> {
        let root_id = self.records.iter().find_map(|record| match record {
            Record::SerializedStreamHeader(header) => Some(header.root_id),
            _ => None,
        })?;
        self.index().get(&root_id).copied()
    }
}

fn index_record<'a>(record: &'a Record, index: &mut HashMap<ObjectId, &'a Record>) {
    if let Some(id) = record.object_id() {
        index.insert(id, record);
    }

    match record {
        Record::BinaryArray(array) => array
            .elements
            .iter()
            .filter_map(Value::as_record)
            .for_each(|element| index_record(element, index)),
        Record::ArraySingleObject(array) | Record::ArraySingleString(array) => array
            .elements
            .iter()
            .for_each(|element| index_record(element, index)),
        _ => record
            .members()
            .unwrap_or_default()
            .iter()
            .filter_map(Value::as_record)
            .for_each(|member| index_record(member, index)),
    }
}

/// Decode a complete stream with the default options
pub fn decode(stream: &[u8]) -> Result<Decoded, PartialDecode> {
    decode_with_options(stream, ReaderOptions::default())
}

/// Decode a complete stream
pub fn decode_with_options(stream: &[u8], options: ReaderOptions) -> Result<Decoded, PartialDecode> {
    let mut reader = NrbfReader::with_options(stream, options);
    let records = reader.parse()?;
    let (objects, libraries) = reader.into_tables();
    Ok(Decoded {
        records,
        objects,
        libraries,
    })
}
