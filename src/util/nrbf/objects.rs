/*!
 Tables built while decoding a single stream: every object id seen so far, and every declared library.

 Both tables belong to one [`NrbfReader`](crate::util::nrbf::parser::NrbfReader) and are dropped with it
 (or handed to the caller in a [`Decoded`](crate::util::nrbf::parser::Decoded)); they are never shared between streams.
*/

use std::collections::{hash_map::Entry, HashMap};

use crate::{
    error::nrbf::NrbfError,
    util::nrbf::models::{ClassInfo, LibraryId, MemberTypeInfo, ObjectId},
};

/// The reusable layout of a class, registered by the record that defined it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassTemplate {
    /// The object that defined this layout
    pub object_id: ObjectId,
    pub name: String,
    pub member_names: Vec<String>,
    /// Only present when the defining record carried member types
    pub member_types: Option<MemberTypeInfo>,
    pub library_id: Option<LibraryId>,
    /// Whether the class comes from the system library; untyped system classes are read by class name
    pub system: bool,
}

impl ClassTemplate {
    pub(crate) fn new(
        class_info: &ClassInfo,
        member_types: Option<MemberTypeInfo>,
        library_id: Option<LibraryId>,
        system: bool,
    ) -> Self {
        Self {
            object_id: class_info.object_id,
            name: class_info.name.clone(),
            member_names: class_info.member_names.clone(),
            member_types,
            library_id,
            system,
        }
    }

    pub fn member_count(&self) -> usize {
        self.member_names.len()
    }
}

/// What kind of object an id was assigned to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    /// A class instance whose record also defined the class layout
    Class(ClassTemplate),
    /// A class instance that reused the layout defined by the given object
    Instance(ObjectId),
    String,
    Array,
}

/// An entry in the [`ObjectTable`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub kind: ObjectKind,
    /// The offset of the record that assigned the id
    pub offset: usize,
    /// Cleared while the object's own members are still being decoded
    complete: bool,
}

impl ObjectEntry {
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Maps every object id in a stream to the object it was assigned to
///
/// Objects are registered as soon as their id is read, before their members, so members can refer back
/// to an object that is still being built. References are only ever resolved by id.
#[derive(Debug, Default)]
pub struct ObjectTable {
    entries: HashMap<ObjectId, ObjectEntry>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign an id to a new, still incomplete object
    pub fn register(
        &mut self,
        id: ObjectId,
        kind: ObjectKind,
        offset: usize,
    ) -> Result<(), NrbfError> {
        match self.entries.entry(id) {
            Entry::Occupied(_) => Err(NrbfError::DuplicateObjectId(id)),
            Entry::Vacant(slot) => {
                slot.insert(ObjectEntry {
                    kind,
                    offset,
                    complete: false,
                });
                Ok(())
            }
        }
    }

    /// Mark an object as fully decoded
    pub(crate) fn complete(&mut self, id: ObjectId) {
        if let Some(entry) = self.entries.get_mut(&id) {
            entry.complete = true;
        }
    }

    pub fn resolve(&self, id: ObjectId) -> Result<&ObjectEntry, NrbfError> {
        self.entries
            .get(&id)
            .ok_or(NrbfError::UnresolvedReference(id))
    }

    /// Resolve an id to the class layout it carries
    ///
    /// Instances that reused a layout resolve to the template of the class that defined it.
    pub fn resolve_template(&self, id: ObjectId) -> Result<&ClassTemplate, NrbfError> {
        match &self.resolve(id)?.kind {
            ObjectKind::Class(template) => Ok(template),
            ObjectKind::Instance(metadata_id) => match &self.resolve(*metadata_id)?.kind {
                ObjectKind::Class(template) => Ok(template),
                _ => Err(NrbfError::NotAClassTemplate(id)),
            },
            ObjectKind::String | ObjectKind::Array => Err(NrbfError::NotAClassTemplate(id)),
        }
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &ObjectEntry)> {
        self.entries.iter()
    }
}

/// Maps library ids to the library names declared in a stream
#[derive(Debug, Default)]
pub struct LibraryTable {
    libraries: HashMap<LibraryId, String>,
}

impl LibraryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a library; a redeclared id replaces the earlier name
    pub fn register(&mut self, id: LibraryId, name: String) {
        if let Some(previous) = self.libraries.insert(id, name) {
            log::warn!("[nrbf] Library {id} redeclared, replacing {previous}");
        }
    }

    pub fn name(&self, id: LibraryId) -> Option<&str> {
        self.libraries.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LibraryId, &String)> {
        self.libraries.iter()
    }
}
