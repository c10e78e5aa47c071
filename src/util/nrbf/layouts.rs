/*!
 Hardcoded member layouts for records that do not describe their own member types.

 Untyped class records assume the reader already knows how their members are stored. System classes are
 matched by class name and user classes by member name; callers can register more rules on a [`LayoutRegistry`].
*/

use uuid::Uuid;

use crate::{
    error::nrbf::NrbfError,
    util::nrbf::models::{Primitive, PrimitiveType, Value},
};

/// How a class or member name is matched against a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    Exact(String),
    /// Matches any name starting with the prefix, i.e. every instantiation of a generic type
    Prefix(String),
}

impl NameMatch {
    pub fn exact(name: &str) -> Self {
        Self::Exact(name.to_string())
    }

    pub fn prefix(prefix: &str) -> Self {
        Self::Prefix(prefix.to_string())
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameMatch::Exact(expected) => expected == name,
            NameMatch::Prefix(prefix) => name.starts_with(prefix.as_str()),
        }
    }
}

/// A single stored value in a known layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutField {
    /// A primitive stored inline
    Primitive(PrimitiveType),
    /// A full record, such as a reference or a nested object
    Record,
}

#[derive(Debug, Clone)]
struct ClassLayout {
    name: NameMatch,
    fields: Vec<LayoutField>,
}

#[derive(Debug, Clone)]
struct MemberLayout {
    name: NameMatch,
    field: LayoutField,
}

/// The table of known layouts consulted for untyped class records
///
/// Rules are checked newest first, so a registered rule takes precedence over the defaults.
#[derive(Debug, Clone)]
pub struct LayoutRegistry {
    classes: Vec<ClassLayout>,
    members: Vec<MemberLayout>,
}

impl LayoutRegistry {
    /// A registry without any rules
    pub fn empty() -> Self {
        Self {
            classes: vec![],
            members: vec![],
        }
    }

    /// Add a rule for the member values of a system class, in stored order
    pub fn register_class(&mut self, name: NameMatch, fields: Vec<LayoutField>) -> &mut Self {
        self.classes.push(ClassLayout { name, fields });
        self
    }

    /// Add a rule for a single member of a user class
    pub fn register_member(&mut self, name: NameMatch, field: LayoutField) -> &mut Self {
        self.members.push(MemberLayout { name, field });
        self
    }

    /// Get the stored fields of a system class by class name
    pub fn class_layout(&self, class_name: &str) -> Result<&[LayoutField], NrbfError> {
        self.classes
            .iter()
            .rev()
            .find(|layout| layout.name.matches(class_name))
            .map(|layout| layout.fields.as_slice())
            .ok_or_else(|| NrbfError::UnknownLayout(class_name.to_string()))
    }

    /// Get the stored field of a single member by member name
    pub fn member_layout(
        &self,
        class_name: &str,
        member_name: &str,
    ) -> Result<LayoutField, NrbfError> {
        self.members
            .iter()
            .rev()
            .find(|layout| layout.name.matches(member_name))
            .map(|layout| layout.field)
            .ok_or_else(|| NrbfError::UnknownLayout(format!("{class_name}.{member_name}")))
    }
}

impl Default for LayoutRegistry {
    /// The layouts of the system types commonly found in streams
    fn default() -> Self {
        use LayoutField::{Primitive as P, Record};
        use PrimitiveType::{Byte, Int32, UInt16, UInt32};

        let mut registry = Self::empty();
        registry
            // Packed as one u32, two u16s, and eight bytes
            .register_class(
                NameMatch::exact("System.Guid"),
                vec![
                    P(UInt32),
                    P(UInt16),
                    P(UInt16),
                    P(Byte),
                    P(Byte),
                    P(Byte),
                    P(Byte),
                    P(Byte),
                    P(Byte),
                    P(Byte),
                    P(Byte),
                ],
            )
            // Major, minor, build, revision
            .register_class(NameMatch::exact("System.Version"), vec![P(Int32); 4])
            // Backing array, count, version
            .register_class(
                NameMatch::prefix("System.Collections.Generic.List`1"),
                vec![Record, P(Int32), P(Int32)],
            )
            // The underlying value of an enum
            .register_member(NameMatch::exact("value__"), P(Int32))
            // Monitor bookkeeping
            .register_member(NameMatch::exact("_busyCount"), P(Int32))
            .register_member(NameMatch::exact("_monitor"), Record)
            .register_member(NameMatch::exact("Collection`1+items"), Record);
        registry
    }
}

/// Rebuild a [`Uuid`] from the eleven member values of a `System.Guid`
pub fn guid_from_members(members: &[Value]) -> Option<Uuid> {
    let mut primitives = members.iter().map(Value::as_primitive);

    let Some(Some(Primitive::UInt32(d1))) = primitives.next() else {
        return None;
    };
    let Some(Some(Primitive::UInt16(d2))) = primitives.next() else {
        return None;
    };
    let Some(Some(Primitive::UInt16(d3))) = primitives.next() else {
        return None;
    };

    let mut d4 = [0; 8];
    for byte in d4.iter_mut() {
        let Some(Some(Primitive::Byte(value))) = primitives.next() else {
            return None;
        };
        *byte = *value;
    }

    if primitives.next().is_some() {
        return None;
    }

    Some(Uuid::from_fields(*d1, *d2, *d3, &d4))
}
