//! Object-level PDF reader.
//!
//! Objects are located by scanning the file for `N G obj` markers rather
//! than by trusting the cross-reference table, the same recovery approach
//! used for damaged files. Later definitions of an object number win, which
//! is what incremental updates require. Objects packed in object streams
//! are unpacked when the stream is unfiltered or Flate-compressed.

use super::object::{Dict, Object, ObjectRef};
use super::parser::{find, parse_dictionary, parse_indirect, parse_integer_pairs, parse_object, rfind};
use crate::error::{Error, Result};
use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};
use std::io::Read;

lazy_static! {
    /// "N G obj" marker
    static ref RE_OBJ_PATTERN: regex::bytes::Regex =
        regex::bytes::Regex::new(r"(\d+)\s+(\d+)\s+obj\b").unwrap();
}

static NULL: Object = Object::Null;

/// Maximum depth of the page tree.
const MAX_TREE_DEPTH: usize = 64;

/// Attributes inherited from parent page tree nodes.
const INHERITABLE: &[&str] = &["MediaBox", "CropBox", "Resources", "Rotate"];

/// A leaf of the page tree with its inherited attributes applied.
#[derive(Debug, Clone)]
pub struct PageInfo {
    /// Page object reference
    pub id: ObjectRef,
    /// Page dictionary, including inherited attributes
    pub dict: Dict,
}

impl PageInfo {
    /// Visible page box `[llx, lly, urx, ury]` (CropBox, else MediaBox, else A4).
    pub fn visible_box(&self, file: &PdfFile<'_>) -> [f64; 4] {
        for key in ["CropBox", "MediaBox"] {
            if let Some(rect) = self
                .dict
                .get(key)
                .map(|o| file.resolve(o))
                .and_then(Object::as_array)
                .and_then(|a| rect_from(a, file))
            {
                return rect;
            }
        }
        [0.0, 0.0, 595.0, 842.0]
    }
}

fn rect_from(items: &[Object], file: &PdfFile<'_>) -> Option<[f64; 4]> {
    if items.len() != 4 {
        return None;
    }
    let mut out = [0.0; 4];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = file.resolve(item).as_number()?;
    }
    Some([
        out[0].min(out[2]),
        out[1].min(out[3]),
        out[0].max(out[2]),
        out[1].max(out[3]),
    ])
}

/// Parsed view of a PDF file.
#[derive(Debug)]
pub struct PdfFile<'a> {
    data: &'a [u8],
    objects: HashMap<u32, (u16, Object)>,
    trailer: Dict,
    startxref: Option<usize>,
}

impl<'a> PdfFile<'a> {
    /// Parse a complete PDF file held in memory.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let header_window = &data[..data.len().min(1024)];
        if find(header_window, b"%PDF-").is_none() {
            return Err(Error::Watermark("input is not a PDF (missing %PDF- header)".to_string()));
        }

        let mut objects: HashMap<u32, (u16, Object)> = HashMap::new();
        let mut last_xref_stream: Option<Dict> = None;
        let mut pos = 0;
        while let Some(m) = RE_OBJ_PATTERN.find_at(data, pos) {
            match parse_indirect(&data[m.start()..]) {
                Ok((rest, (id, object))) => {
                    if let Object::Stream { dict, .. } = &object {
                        if dict.get("Type").and_then(Object::as_name) == Some("XRef") {
                            last_xref_stream = Some(dict.clone());
                        }
                    }
                    objects.insert(id.id, (id.gen, object));
                    pos = data.len() - rest.len();
                },
                Err(_) => pos = m.end(),
            }
        }

        unpack_object_streams(&mut objects)?;

        let trailer = match rfind(data, b"trailer") {
            Some(at) => parse_dictionary(&data[at + b"trailer".len()..])
                .map(|(_, d)| d)
                .map_err(|_| Error::Watermark("unreadable trailer dictionary".to_string()))?,
            None => last_xref_stream
                .ok_or_else(|| Error::Watermark("no trailer or cross-reference stream".to_string()))?,
        };
        if trailer.contains_key("Encrypt") {
            return Err(Error::Watermark("encrypted PDFs are not supported".to_string()));
        }

        let startxref = rfind(data, b"startxref").and_then(|at| {
            parse_object(&data[at + b"startxref".len()..])
                .ok()
                .and_then(|(_, o)| o.as_integer())
                .and_then(|n| usize::try_from(n).ok())
        });

        log::debug!("Parsed {} PDF objects", objects.len());
        Ok(Self {
            data,
            objects,
            trailer,
            startxref,
        })
    }

    /// Original file bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current trailer dictionary.
    pub fn trailer(&self) -> &Dict {
        &self.trailer
    }

    /// Offset of the last cross-reference section, if the file declares one.
    pub fn startxref(&self) -> Option<usize> {
        self.startxref
    }

    /// Highest object number in use.
    pub fn max_object_id(&self) -> u32 {
        let declared = self
            .trailer
            .get("Size")
            .and_then(Object::as_integer)
            .and_then(|s| u32::try_from(s).ok())
            .map(|s| s.saturating_sub(1))
            .unwrap_or(0);
        self.objects.keys().copied().max().unwrap_or(0).max(declared)
    }

    /// Look up an object definition.
    pub fn get(&self, r: ObjectRef) -> Option<&Object> {
        self.objects.get(&r.id).map(|(_, o)| o)
    }

    /// Follow references until a direct object is reached.
    ///
    /// Dangling references resolve to `null`.
    pub fn resolve<'b>(&'b self, obj: &'b Object) -> &'b Object {
        let mut current = obj;
        for _ in 0..MAX_TREE_DEPTH {
            match current {
                Object::Reference(r) => match self.get(*r) {
                    Some(target) => current = target,
                    None => return &NULL,
                },
                _ => return current,
            }
        }
        &NULL
    }

    /// Resolve an entry of a dictionary to an owned dictionary, if it is one.
    pub fn resolve_dict(&self, obj: Option<&Object>) -> Option<Dict> {
        obj.map(|o| self.resolve(o)).and_then(Object::as_dict).cloned()
    }

    /// All pages in document order.
    pub fn pages(&self) -> Result<Vec<PageInfo>> {
        let root = self
            .trailer
            .get("Root")
            .and_then(Object::as_reference)
            .ok_or_else(|| Error::Watermark("trailer has no /Root".to_string()))?;
        let catalog = self
            .get(root)
            .and_then(Object::as_dict)
            .ok_or_else(|| Error::Watermark(format!("catalog {} not found", root)))?;
        let pages_ref = catalog
            .get("Pages")
            .and_then(Object::as_reference)
            .ok_or_else(|| Error::Watermark("catalog has no /Pages reference".to_string()))?;

        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        self.walk(pages_ref, &Dict::new(), 0, &mut visited, &mut pages)?;
        if pages.is_empty() {
            return Err(Error::Watermark("document has no pages".to_string()));
        }
        Ok(pages)
    }

    fn walk(
        &self,
        node_ref: ObjectRef,
        inherited: &Dict,
        depth: usize,
        visited: &mut HashSet<ObjectRef>,
        pages: &mut Vec<PageInfo>,
    ) -> Result<()> {
        if depth > MAX_TREE_DEPTH || !visited.insert(node_ref) {
            return Err(Error::Watermark(format!("page tree cycle at {}", node_ref)));
        }
        let node = self
            .get(node_ref)
            .and_then(Object::as_dict)
            .ok_or_else(|| Error::Watermark(format!("page tree node {} not found", node_ref)))?;

        let mut attrs = inherited.clone();
        for key in INHERITABLE {
            if let Some(value) = node.get(*key) {
                attrs.insert(key.to_string(), value.clone());
            }
        }

        match node.get("Type").and_then(Object::as_name) {
            Some("Page") => {
                let mut dict = node.clone();
                for (key, value) in attrs {
                    dict.entry(key).or_insert(value);
                }
                pages.push(PageInfo { id: node_ref, dict });
                Ok(())
            },
            _ => {
                let kids = node
                    .get("Kids")
                    .map(|k| self.resolve(k))
                    .and_then(Object::as_array)
                    .ok_or_else(|| Error::Watermark(format!("page tree node {} has no /Kids", node_ref)))?;
                for kid in kids {
                    let kid_ref = kid.as_reference().ok_or_else(|| {
                        Error::Watermark("page tree kid is not an indirect reference".to_string())
                    })?;
                    self.walk(kid_ref, &attrs, depth + 1, visited, pages)?;
                }
                Ok(())
            },
        }
    }
}

/// Decode stream data. Supports unfiltered and FlateDecode streams without predictors.
pub fn decode_stream(dict: &Dict, data: &[u8]) -> Result<Vec<u8>> {
    let filters: Vec<&str> = match dict.get("Filter") {
        None => Vec::new(),
        Some(Object::Name(n)) => vec![n.as_str()],
        Some(Object::Array(items)) => items.iter().filter_map(Object::as_name).collect(),
        Some(other) => {
            return Err(Error::Watermark(format!("unsupported /Filter {}", other.type_name())))
        },
    };
    let mut current = data.to_vec();
    for filter in filters {
        match filter {
            "FlateDecode" | "Fl" => {
                let mut out = Vec::new();
                flate2::read::ZlibDecoder::new(current.as_slice())
                    .read_to_end(&mut out)
                    .map_err(|e| Error::Watermark(format!("FlateDecode failed: {}", e)))?;
                current = out;
            },
            other => return Err(Error::Watermark(format!("unsupported stream filter {}", other))),
        }
    }
    Ok(current)
}

/// Move objects out of `/Type /ObjStm` streams into the object table.
/// Top-level definitions keep precedence over packed ones.
fn unpack_object_streams(objects: &mut HashMap<u32, (u16, Object)>) -> Result<()> {
    let mut streams: Vec<(u32, Dict, bytes::Bytes)> = objects
        .iter()
        .filter_map(|(id, (_, obj))| match obj {
            Object::Stream { dict, data }
                if dict.get("Type").and_then(Object::as_name) == Some("ObjStm") =>
            {
                Some((*id, dict.clone(), data.clone()))
            },
            _ => None,
        })
        .collect();
    streams.sort_by_key(|(id, _, _)| *id);

    for (stream_id, dict, data) in streams {
        let count = dict.get("N").and_then(Object::as_integer).unwrap_or(0);
        let first = dict.get("First").and_then(Object::as_integer).unwrap_or(0);
        let (Ok(count), Ok(first)) = (usize::try_from(count), usize::try_from(first)) else {
            continue;
        };
        let decoded = decode_stream(&dict, &data)?;
        let Some(header) = parse_integer_pairs(&decoded, count) else {
            log::warn!("Object stream {} has an unreadable header", stream_id);
            continue;
        };
        for (id, offset) in header {
            if objects.contains_key(&id) {
                continue;
            }
            let start = first.saturating_add(offset);
            if start >= decoded.len() {
                continue;
            }
            if let Ok((_, obj)) = parse_object(&decoded[start..]) {
                objects.insert(id, (0, obj));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PAGES: &[u8] = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 /MediaBox [0 0 612 792] >>\nendobj\n\
3 0 obj\n<< /Type /Page /Parent 2 0 R >>\nendobj\n\
4 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 400] >>\nendobj\n\
trailer\n<< /Size 5 /Root 1 0 R >>\nstartxref\n0\n%%EOF\n";

    #[test]
    fn test_pages_with_inherited_media_box() {
        let file = PdfFile::parse(TWO_PAGES).unwrap();
        let pages = file.pages().unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].id, ObjectRef::new(3, 0));
        assert_eq!(pages[0].visible_box(&file), [0.0, 0.0, 612.0, 792.0]);
        assert_eq!(pages[1].visible_box(&file), [0.0, 0.0, 300.0, 400.0]);
        assert_eq!(file.max_object_id(), 4);
    }

    #[test]
    fn test_later_definition_wins() {
        let mut data = TWO_PAGES.to_vec();
        data.extend_from_slice(
            b"4 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 100 100] >>\nendobj\n\
trailer\n<< /Size 5 /Root 1 0 R /Prev 0 >>\n%%EOF\n",
        );
        let file = PdfFile::parse(&data).unwrap();
        let pages = file.pages().unwrap();
        assert_eq!(pages[1].visible_box(&file), [0.0, 0.0, 100.0, 100.0]);
    }

    #[test]
    fn test_rejects_non_pdf_and_encrypted() {
        assert!(PdfFile::parse(b"PK\x03\x04 not a pdf").is_err());
        let encrypted = b"%PDF-1.4\n1 0 obj\n<< >>\nendobj\ntrailer\n<< /Root 1 0 R /Encrypt 5 0 R >>\n";
        assert!(PdfFile::parse(encrypted).is_err());
    }

    #[test]
    fn test_object_stream_members_are_unpacked() {
        let packed = b"3 0 4 32 << /Type /Page /Parent 2 0 R >> << /Type /Page /Parent 2 0 R >>";
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        std::io::Write::write_all(&mut encoder, packed).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut data = b"%PDF-1.5\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>\nendobj\n"
            .to_vec();
        data.extend_from_slice(
            format!(
                "5 0 obj\n<< /Type /ObjStm /N 2 /First 9 /Filter /FlateDecode /Length {} >>\nstream\n",
                compressed.len()
            )
            .as_bytes(),
        );
        data.extend_from_slice(&compressed);
        data.extend_from_slice(b"\nendstream\nendobj\ntrailer\n<< /Size 6 /Root 1 0 R >>\n%%EOF\n");

        let file = PdfFile::parse(&data).unwrap();
        assert_eq!(file.pages().unwrap().len(), 2);
    }
}
