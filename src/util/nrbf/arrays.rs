/*!
 Contains logic to decode the array records.

 Arrays of objects and strings may compress consecutive nulls into a single null-run record, so the number of
 decoded elements can be smaller than the declared length. Decoding stops once the logical positions covered by
 the elements reach the declared length exactly.
*/

use crate::{
    error::nrbf::{DecodeError, NrbfError},
    util::nrbf::{
        models::{
            ArraySingle, ArraySinglePrimitive, BinaryArray, BinaryArrayType, MemberType, NullRun,
            Record,
        },
        objects::ObjectKind,
        parser::NrbfReader,
    },
};

impl<'a> NrbfReader<'a> {
    /// Read an array of any rank, shape, and element type
    pub(crate) fn read_binary_array(&mut self, offset: usize) -> Result<Record, DecodeError> {
        let object_id = self.stream.read_i32()?;

        let type_offset = self.stream.position();
        let type_byte = self.stream.read_u8()?;
        let array_type = BinaryArrayType::from_byte(type_byte).ok_or(DecodeError::new(
            type_offset,
            NrbfError::UnknownArrayType(type_byte),
        ))?;

        let rank = self.stream.read_count()?;
        let lengths = self.read_i32s(rank)?;
        let lower_bounds = if array_type.has_lower_bounds() {
            Some(self.read_i32s(rank)?)
        } else {
            None
        };

        // One type describes every element
        let element_type = MemberType::read(&mut self.stream)?;
        let total = element_count(&lengths).map_err(|error| DecodeError::new(offset, error))?;

        self.register(object_id, ObjectKind::Array, offset)?;
        let elements =
            self.read_elements(total, |reader| reader.read_typed_value(&element_type))?;
        self.objects.complete(object_id);

        Ok(Record::BinaryArray(BinaryArray {
            object_id,
            array_type,
            lengths,
            lower_bounds,
            element_type,
            elements,
        }))
    }

    /// Read a single-dimension array of primitives; primitives cannot be null, so there are no null runs
    pub(crate) fn read_array_single_primitive(
        &mut self,
        offset: usize,
    ) -> Result<Record, DecodeError> {
        let object_id = self.stream.read_i32()?;
        let length = self.stream.read_count()?;
        let primitive_type = self.stream.read_primitive_type()?;

        self.register(object_id, ObjectKind::Array, offset)?;
        let mut elements = vec![];
        for _ in 0..length {
            elements.push(self.stream.read_primitive(primitive_type)?);
        }
        self.objects.complete(object_id);

        Ok(Record::ArraySinglePrimitive(ArraySinglePrimitive {
            object_id,
            primitive_type,
            elements,
        }))
    }

    /// Read a single-dimension array whose elements are full records
    pub(crate) fn read_array_single(
        &mut self,
        offset: usize,
        wrap: fn(ArraySingle) -> Record,
    ) -> Result<Record, DecodeError> {
        let object_id = self.stream.read_i32()?;
        let length = self.stream.read_count()?;

        self.register(object_id, ObjectKind::Array, offset)?;
        let elements = self.read_elements(length, |reader| reader.decode_record())?;
        self.objects.complete(object_id);

        Ok(wrap(ArraySingle {
            object_id,
            length,
            elements,
        }))
    }

    /// Read elements until they cover exactly `total` logical positions
    fn read_elements<T: NullRun>(
        &mut self,
        total: usize,
        mut read: impl FnMut(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let mut out_v = vec![];
        let mut position: usize = 0;

        while position < total {
            let offset = self.stream.position();
            let element = read(self)?;
            position = position.saturating_add(element.null_run().unwrap_or(1));
            if position > total {
                return Err(DecodeError::new(
                    offset,
                    NrbfError::ArrayLengthMismatch(total, position),
                ));
            }
            out_v.push(element);
        }

        log::trace!("[nrbf] Read {} entries for {total} elements", out_v.len());
        Ok(out_v)
    }

    fn read_i32s(&mut self, count: usize) -> Result<Vec<i32>, DecodeError> {
        let mut out_v = vec![];
        for _ in 0..count {
            out_v.push(self.stream.read_i32()?);
        }
        Ok(out_v)
    }
}

/// The number of logical elements in an array with the given dimension lengths
fn element_count(lengths: &[i32]) -> Result<usize, NrbfError> {
    lengths.iter().try_fold(1_usize, |total, length| {
        usize::try_from(*length)
            .ok()
            .and_then(|length| total.checked_mul(length))
            .ok_or(NrbfError::InvalidCount(i64::from(*length)))
    })
}
