//! Incremental updates.
//!
//! New and replaced objects are appended after the original bytes, followed
//! by a cross-reference section covering only those objects and a trailer
//! whose `/Prev` points at the previous section. The original bytes are
//! never rewritten.

use super::object::{Dict, Object, ObjectRef};
use super::reader::PdfFile;
use super::serializer::ObjectSerializer;
use std::collections::BTreeMap;
use std::io::Write;

/// Trailer keys that only make sense on a cross-reference stream dictionary.
const XREF_STREAM_KEYS: &[&str] = &[
    "Type", "W", "Index", "Filter", "DecodeParms", "Length", "XRefStm", "Prev", "N", "First",
];

/// Pending incremental update against a parsed file.
#[derive(Debug)]
pub struct IncrementalUpdate<'f, 'a> {
    file: &'f PdfFile<'a>,
    next_id: u32,
    objects: BTreeMap<u32, (u16, Object)>,
}

impl<'f, 'a> IncrementalUpdate<'f, 'a> {
    /// Start an update. New object numbers continue after the highest one in use.
    pub fn new(file: &'f PdfFile<'a>) -> Self {
        Self {
            file,
            next_id: file.max_object_id() + 1,
            objects: BTreeMap::new(),
        }
    }

    /// Add a new object and return its reference.
    pub fn add(&mut self, object: Object) -> ObjectRef {
        let id = self.next_id;
        self.next_id += 1;
        self.objects.insert(id, (0, object));
        ObjectRef::new(id, 0)
    }

    /// Replace an existing object, keeping its generation number.
    pub fn replace(&mut self, target: ObjectRef, object: Object) {
        self.objects.insert(target.id, (target.gen, object));
    }

    /// Append the update to the original bytes.
    pub fn finish(self) -> std::io::Result<Vec<u8>> {
        let serializer = ObjectSerializer::new();
        let original = self.file.data();
        let mut output = Vec::with_capacity(original.len() + 4096);
        output.extend_from_slice(original);
        if !output.ends_with(b"\n") {
            output.push(b'\n');
        }

        let mut offsets: Vec<(u32, u16, usize)> = Vec::with_capacity(self.objects.len());
        for (id, (gen, object)) in &self.objects {
            offsets.push((*id, *gen, output.len()));
            output.extend_from_slice(&serializer.serialize_indirect(*id, *gen, object)?);
        }

        let xref_start = output.len();
        writeln!(output, "xref")?;
        for run in contiguous_runs(&offsets) {
            writeln!(output, "{} {}", run[0].0, run.len())?;
            for (_, gen, offset) in run {
                writeln!(output, "{:010} {:05} n ", offset, gen)?;
            }
        }

        let mut trailer: Dict = self.file.trailer().clone();
        for key in XREF_STREAM_KEYS {
            trailer.remove(*key);
        }
        let size = self.next_id.max(self.file.max_object_id() + 1);
        trailer.insert("Size".to_string(), Object::Integer(size as i64));
        if let Some(prev) = self.file.startxref() {
            trailer.insert("Prev".to_string(), Object::Integer(prev as i64));
        }

        writeln!(output, "trailer")?;
        serializer.write_object(&mut output, &Object::Dictionary(trailer))?;
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        writeln!(output, "%%EOF")?;
        Ok(output)
    }
}

/// Split sorted xref entries into runs of consecutive object numbers.
fn contiguous_runs(entries: &[(u32, u16, usize)]) -> Vec<&[(u32, u16, usize)]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=entries.len() {
        if i == entries.len() || entries[i].0 != entries[i - 1].0 + 1 {
            if start < i {
                runs.push(&entries[start..i]);
            }
            start = i;
        }
    }
    runs
}
