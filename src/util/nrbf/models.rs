/*!
 Data structures used to represent records decoded from a binary-serialized object graph.
*/

use chrono::NaiveDateTime;

/// Identifies an object within a single stream; any value, including zero and negatives, is valid
pub type ObjectId = i32;
/// Identifies a [`BinaryLibrary`] within a single stream
pub type LibraryId = i32;

/// The kind of a record, read from the first byte of every record in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    SerializedStreamHeader,
    ClassWithId,
    SystemClassWithMembers,
    ClassWithMembers,
    SystemClassWithMembersAndTypes,
    ClassWithMembersAndTypes,
    BinaryObjectString,
    BinaryArray,
    MemberPrimitiveTyped,
    MemberReference,
    ObjectNull,
    MessageEnd,
    BinaryLibrary,
    ObjectNullMultiple256,
    ObjectNullMultiple,
    ArraySinglePrimitive,
    ArraySingleObject,
    ArraySingleString,
    MethodCall,
    MethodReturn,
}

impl RecordType {
    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::SerializedStreamHeader,
            1 => Self::ClassWithId,
            2 => Self::SystemClassWithMembers,
            3 => Self::ClassWithMembers,
            4 => Self::SystemClassWithMembersAndTypes,
            5 => Self::ClassWithMembersAndTypes,
            6 => Self::BinaryObjectString,
            7 => Self::BinaryArray,
            8 => Self::MemberPrimitiveTyped,
            9 => Self::MemberReference,
            10 => Self::ObjectNull,
            11 => Self::MessageEnd,
            12 => Self::BinaryLibrary,
            13 => Self::ObjectNullMultiple256,
            14 => Self::ObjectNullMultiple,
            15 => Self::ArraySinglePrimitive,
            16 => Self::ArraySingleObject,
            17 => Self::ArraySingleString,
            21 => Self::MethodCall,
            22 => Self::MethodReturn,
            _ => return None,
        })
    }

    /// Class definitions that carry a [`MemberTypeInfo`] block
    pub(crate) fn has_member_types(&self) -> bool {
        matches!(
            self,
            Self::SystemClassWithMembersAndTypes | Self::ClassWithMembersAndTypes
        )
    }

    /// Class definitions that end their metadata with a [`LibraryId`]
    pub(crate) fn has_library_id(&self) -> bool {
        matches!(self, Self::ClassWithMembers | Self::ClassWithMembersAndTypes)
    }

    pub(crate) fn is_system_class(&self) -> bool {
        matches!(
            self,
            Self::SystemClassWithMembers | Self::SystemClassWithMembersAndTypes
        )
    }
}

/// How a member or array element value is laid out in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryType {
    Primitive,
    String,
    Object,
    SystemClass,
    Class,
    ObjectArray,
    StringArray,
    PrimitiveArray,
}

impl BinaryType {
    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::Primitive,
            1 => Self::String,
            2 => Self::Object,
            3 => Self::SystemClass,
            4 => Self::Class,
            5 => Self::ObjectArray,
            6 => Self::StringArray,
            7 => Self::PrimitiveArray,
            _ => return None,
        })
    }
}

/// The concrete kind of a primitive value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Char,
    Decimal,
    Double,
    Int16,
    Int32,
    Int64,
    SByte,
    Single,
    TimeSpan,
    DateTime,
    UInt16,
    UInt32,
    UInt64,
    Null,
    String,
}

impl PrimitiveType {
    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => Self::Boolean,
            2 => Self::Byte,
            3 => Self::Char,
            5 => Self::Decimal,
            6 => Self::Double,
            7 => Self::Int16,
            8 => Self::Int32,
            9 => Self::Int64,
            10 => Self::SByte,
            11 => Self::Single,
            12 => Self::TimeSpan,
            13 => Self::DateTime,
            14 => Self::UInt16,
            15 => Self::UInt32,
            16 => Self::UInt64,
            17 => Self::Null,
            18 => Self::String,
            _ => return None,
        })
    }
}

/// The shape of a [`RecordType::BinaryArray`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryArrayType {
    Single,
    Jagged,
    Rectangular,
    SingleOffset,
    JaggedOffset,
    RectangularOffset,
}

impl BinaryArrayType {
    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::Single,
            1 => Self::Jagged,
            2 => Self::Rectangular,
            3 => Self::SingleOffset,
            4 => Self::JaggedOffset,
            5 => Self::RectangularOffset,
            _ => return None,
        })
    }

    /// The offset kinds store a lower bound for every dimension after the lengths
    pub fn has_lower_bounds(&self) -> bool {
        matches!(
            self,
            Self::SingleOffset | Self::JaggedOffset | Self::RectangularOffset
        )
    }
}

/// A user-defined class type, named along with the library that declares it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTypeInfo {
    pub type_name: String,
    pub library_id: LibraryId,
}

/// A [`BinaryType`] along with the additional type information stored for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberType {
    Primitive(PrimitiveType),
    String,
    Object,
    /// A class from the system library, by name
    SystemClass(String),
    Class(ClassTypeInfo),
    ObjectArray,
    StringArray,
    PrimitiveArray(PrimitiveType),
}

impl MemberType {
    pub fn binary_type(&self) -> BinaryType {
        match self {
            MemberType::Primitive(_) => BinaryType::Primitive,
            MemberType::String => BinaryType::String,
            MemberType::Object => BinaryType::Object,
            MemberType::SystemClass(_) => BinaryType::SystemClass,
            MemberType::Class(_) => BinaryType::Class,
            MemberType::ObjectArray => BinaryType::ObjectArray,
            MemberType::StringArray => BinaryType::StringArray,
            MemberType::PrimitiveArray(_) => BinaryType::PrimitiveArray,
        }
    }
}

/// The name and member names of a class, shared by all of the class definition records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub object_id: ObjectId,
    pub name: String,
    pub member_names: Vec<String>,
}

impl ClassInfo {
    pub fn member_count(&self) -> usize {
        self.member_names.len()
    }
}

/// The types of each member of a class, in member order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberTypeInfo {
    pub types: Vec<MemberType>,
}

/// The first record of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializationHeader {
    /// The object that is the root of the serialized graph
    pub root_id: ObjectId,
    pub header_id: ObjectId,
    pub major_version: i32,
    pub minor_version: i32,
}

/// Associates a library name with a [`LibraryId`] for the rest of the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryLibrary {
    pub library_id: LibraryId,
    pub name: String,
}

/// A class instance whose record also defines the class layout
///
/// Used for all four class definition records; [`ClassRecord::member_types`] is only present on the
/// `...AndTypes` variants and [`ClassRecord::library_id`] is absent on the system class variants.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassRecord {
    pub class_info: ClassInfo,
    pub member_types: Option<MemberTypeInfo>,
    pub library_id: Option<LibraryId>,
    /// Member values, in member order
    pub members: Vec<Value>,
}

impl ClassRecord {
    /// Get the value of a member by name
    pub fn member(&self, name: &str) -> Option<&Value> {
        member_by_name(&self.class_info.member_names, &self.members, name)
    }
}

/// A class instance that reuses the layout of an earlier class definition
#[derive(Debug, Clone, PartialEq)]
pub struct ClassWithId {
    pub object_id: ObjectId,
    /// The object that defined the layout used to read this instance
    pub metadata_id: ObjectId,
    pub class_name: String,
    pub member_names: Vec<String>,
    pub members: Vec<Value>,
}

impl ClassWithId {
    /// Get the value of a member by name
    pub fn member(&self, name: &str) -> Option<&Value> {
        member_by_name(&self.member_names, &self.members, name)
    }
}

fn member_by_name<'a>(names: &[String], members: &'a [Value], name: &str) -> Option<&'a Value> {
    names
        .iter()
        .position(|member| member == name)
        .and_then(|idx| members.get(idx))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryObjectString {
    pub object_id: ObjectId,
    pub value: String,
}

/// A multi-dimensional, jagged, or offset array
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryArray {
    pub object_id: ObjectId,
    pub array_type: BinaryArrayType,
    /// The length of each dimension; the rank is the number of lengths
    pub lengths: Vec<i32>,
    pub lower_bounds: Option<Vec<i32>>,
    pub element_type: MemberType,
    /// Decoded elements; a null run occupies a single entry
    pub elements: Vec<Value>,
}

impl BinaryArray {
    pub fn rank(&self) -> usize {
        self.lengths.len()
    }

    /// Expand null runs so that there is one entry per logical array position
    pub fn logical_elements(&self) -> Vec<Option<&Value>> {
        expand_null_runs(&self.elements)
    }
}

/// A single-dimension array of primitive values
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySinglePrimitive {
    pub object_id: ObjectId,
    pub primitive_type: PrimitiveType,
    pub elements: Vec<Primitive>,
}

/// A single-dimension array of objects or strings, where each element is a full record
#[derive(Debug, Clone, PartialEq)]
pub struct ArraySingle {
    pub object_id: ObjectId,
    /// The declared number of logical elements
    pub length: usize,
    /// Decoded elements; a null run occupies a single entry
    pub elements: Vec<Record>,
}

impl ArraySingle {
    /// Expand null runs so that there is one entry per logical array position
    pub fn logical_elements(&self) -> Vec<Option<&Record>> {
        expand_null_runs(&self.elements)
    }
}

/// A decoded date and time
///
/// The two kind bits are kept as read; the value is never shifted to account for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetDateTime {
    /// Signed count of 100-nanosecond intervals since 0001-01-01T00:00:00
    pub ticks: i64,
    /// 0 for unspecified, 1 for UTC, 2 for local time
    pub kind: u8,
    pub value: NaiveDateTime,
}

/// A primitive value read inline from the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Boolean(bool),
    Byte(u8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    DateTime(NetDateTime),
}

impl Primitive {
    /// Signed integer types are coerced into the largest container
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Primitive::Int16(value) => Some(i64::from(*value)),
            Primitive::Int32(value) => Some(i64::from(*value)),
            Primitive::Int64(value) => Some(*value),
            _ => None,
        }
    }

    /// Unsigned integer types are coerced into the largest container
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Primitive::Byte(value) => Some(u64::from(*value)),
            Primitive::UInt16(value) => Some(u64::from(*value)),
            Primitive::UInt32(value) => Some(u64::from(*value)),
            Primitive::UInt64(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Primitive::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&NetDateTime> {
        match self {
            Primitive::DateTime(value) => Some(value),
            _ => None,
        }
    }
}

/// The value of a class member or array element
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Primitive(Primitive),
    /// Any non-primitive value is a full record: a nested class, string, array, null, or reference
    Record(Box<Record>),
}

impl Value {
    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Value::Primitive(primitive) => Some(primitive),
            Value::Record(_) => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            Value::Primitive(_) => None,
        }
    }

    /// The text of an inline string record
    pub fn as_str(&self) -> Option<&str> {
        self.as_record().and_then(Record::as_str)
    }

    pub fn is_null(&self) -> bool {
        self.as_record().is_some_and(Record::is_null)
    }
}

/// A single decoded record
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    SerializedStreamHeader(SerializationHeader),
    ClassWithId(ClassWithId),
    SystemClassWithMembers(ClassRecord),
    ClassWithMembers(ClassRecord),
    SystemClassWithMembersAndTypes(ClassRecord),
    ClassWithMembersAndTypes(ClassRecord),
    BinaryObjectString(BinaryObjectString),
    BinaryArray(BinaryArray),
    MemberPrimitiveTyped(Primitive),
    /// A back-reference to an object by id, resolved through the object table
    MemberReference(ObjectId),
    ObjectNull,
    MessageEnd,
    BinaryLibrary(BinaryLibrary),
    ObjectNullMultiple256(u8),
    ObjectNullMultiple(i32),
    ArraySinglePrimitive(ArraySinglePrimitive),
    ArraySingleObject(ArraySingle),
    ArraySingleString(ArraySingle),
}

impl Record {
    pub fn record_type(&self) -> RecordType {
        match self {
            Record::SerializedStreamHeader(_) => RecordType::SerializedStreamHeader,
            Record::ClassWithId(_) => RecordType::ClassWithId,
            Record::SystemClassWithMembers(_) => RecordType::SystemClassWithMembers,
            Record::ClassWithMembers(_) => RecordType::ClassWithMembers,
            Record::SystemClassWithMembersAndTypes(_) => {
                RecordType::SystemClassWithMembersAndTypes
            }
            Record::ClassWithMembersAndTypes(_) => RecordType::ClassWithMembersAndTypes,
            Record::BinaryObjectString(_) => RecordType::BinaryObjectString,
            Record::BinaryArray(_) => RecordType::BinaryArray,
            Record::MemberPrimitiveTyped(_) => RecordType::MemberPrimitiveTyped,
            Record::MemberReference(_) => RecordType::MemberReference,
            Record::ObjectNull => RecordType::ObjectNull,
            Record::MessageEnd => RecordType::MessageEnd,
            Record::BinaryLibrary(_) => RecordType::BinaryLibrary,
            Record::ObjectNullMultiple256(_) => RecordType::ObjectNullMultiple256,
            Record::ObjectNullMultiple(_) => RecordType::ObjectNullMultiple,
            Record::ArraySinglePrimitive(_) => RecordType::ArraySinglePrimitive,
            Record::ArraySingleObject(_) => RecordType::ArraySingleObject,
            Record::ArraySingleString(_) => RecordType::ArraySingleString,
        }
    }

    /// The id of the object this record defines, if it defines one
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Record::ClassWithId(class) => Some(class.object_id),
            Record::SystemClassWithMembers(class)
            | Record::ClassWithMembers(class)
            | Record::SystemClassWithMembersAndTypes(class)
            | Record::ClassWithMembersAndTypes(class) => Some(class.class_info.object_id),
            Record::BinaryObjectString(string) => Some(string.object_id),
            Record::BinaryArray(array) => Some(array.object_id),
            Record::ArraySinglePrimitive(array) => Some(array.object_id),
            Record::ArraySingleObject(array) | Record::ArraySingleString(array) => {
                Some(array.object_id)
            }
            _ => None,
        }
    }

    /// The class definition carried by this record, if it is one of the four class definitions
    pub fn as_class(&self) -> Option<&ClassRecord> {
        match self {
            Record::SystemClassWithMembers(class)
            | Record::ClassWithMembers(class)
            | Record::SystemClassWithMembersAndTypes(class)
            | Record::ClassWithMembersAndTypes(class) => Some(class),
            _ => None,
        }
    }

    /// Member values of any class instance record
    pub fn members(&self) -> Option<&[Value]> {
        match self {
            Record::ClassWithId(class) => Some(&class.members),
            _ => self.as_class().map(|class| class.members.as_slice()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Record::BinaryObjectString(string) => Some(&string.value),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.null_run().is_some()
    }
}

/// Values that may stand for one or more consecutive null array entries
pub trait NullRun {
    /// The number of logical positions this null marker covers, or [`None`] for a non-null value
    fn null_run(&self) -> Option<usize>;
}

impl NullRun for Record {
    fn null_run(&self) -> Option<usize> {
        match self {
            Record::ObjectNull => Some(1),
            Record::ObjectNullMultiple256(count) => Some(usize::from(*count)),
            Record::ObjectNullMultiple(count) => usize::try_from(*count).ok(),
            _ => None,
        }
    }
}

impl NullRun for Value {
    fn null_run(&self) -> Option<usize> {
        self.as_record().and_then(NullRun::null_run)
    }
}

/// Expand a decoded element list into one entry per logical position, with [`None`] for nulls
pub fn expand_null_runs<T: NullRun>(elements: &[T]) -> Vec<Option<&T>> {
    let mut out_v = vec![];
    for element in elements {
        match element.null_run() {
            Some(count) => out_v.extend(std::iter::repeat(None).take(count)),
            None => out_v.push(Some(element)),
        }
    }
    out_v
}
