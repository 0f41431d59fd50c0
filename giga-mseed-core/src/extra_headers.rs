//! The path-addressable extra-header store carried by v3 records.
//!
//! The store holds one CBOR document (a map at the root) as raw bytes, the exact
//! form in which it sits in a record. CBOR items are variable length and cannot
//! be edited in place, so every mutation decodes the document, rebuilds the tree
//! and re-encodes into a fresh buffer.
//!
//! Paths are `/`-separated text keys, for example `FDSN/Time/Quality`. Every
//! intermediate path component must be a map; [`ExtraHeaders::set`] synthesizes
//! missing intermediate maps on the way down.
use crate::cbor::{self, CborItem};
use crate::errors::*;

/// The CBOR extra-header document of one record. An empty buffer means the
/// record has no extra headers at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtraHeaders {
    buf: Vec<u8>,
}

impl ExtraHeaders {
    /// An empty store with no headers.
    pub fn new() -> Self {
        ExtraHeaders::default()
    }

    /// Adopt an encoded document, validating that it is well formed CBOR with a
    /// map at the root.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MseedError> {
        if bytes.is_empty() {
            return Ok(ExtraHeaders::new());
        }
        let (root, used) = cbor::decode_item(bytes)?;
        if used != bytes.len() {
            return Err(MseedError::CborError {
                msg: format!("{} trailing bytes after the root item", bytes.len() - used),
            });
        }
        if !matches!(root, CborItem::Map { .. }) {
            return Err(MseedError::CborError {
                msg: "extra headers must be a map at the root".to_string(),
            });
        }
        Ok(ExtraHeaders {
            buf: bytes.to_vec(),
        })
    }

    /// The encoded document.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The encoded length in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Decode the root map. An empty store decodes to an empty map.
    fn root(&self) -> Result<CborItem, MseedError> {
        if self.buf.is_empty() {
            return Ok(CborItem::Map {
                entries: Vec::new(),
                indefinite: false,
            });
        }
        let (root, _) = cbor::decode_item(&self.buf)?;
        Ok(root)
    }

    fn reencode(&mut self, root: &CborItem) {
        let mut buf = Vec::with_capacity(self.buf.len() + 16);
        cbor::encode_item(root, &mut buf);
        self.buf = buf;
    }

    /// Fetch the item at `path`, walking maps by text key.
    ///
    /// Fails with `Unsupported` if the walk passes through an indefinite-length
    /// map, since those documents cannot be faithfully rewritten.
    /// ```
    /// use giga_mseed_core::cbor::CborItem;
    /// use giga_mseed_core::extra_headers::ExtraHeaders;
    ///
    /// let mut eh = ExtraHeaders::new();
    /// eh.set("FDSN/Time/Quality", CborItem::UInt(100)).unwrap();
    /// assert_eq!(eh.fetch("FDSN/Time/Quality").unwrap(), CborItem::UInt(100));
    /// ```
    pub fn fetch(&self, path: &str) -> Result<CborItem, MseedError> {
        let components = split_path(path)?;
        let mut current = self.root()?;
        for (i, component) in components.iter().enumerate() {
            let (entries, indefinite) = match current {
                CborItem::Map { entries, indefinite } => (entries, indefinite),
                _ => {
                    return Err(MseedError::CborError {
                        msg: format!("'{}' is not a map", components[..i].join("/")),
                    });
                }
            };
            if indefinite {
                return Err(MseedError::Unsupported {
                    msg: "cannot traverse an indefinite-length map".to_string(),
                });
            }
            current = entries
                .into_iter()
                .find(|(k, _)| matches!(k, CborItem::Text(t) if t == component))
                .map(|(_, v)| v)
                .ok_or_else(|| MseedError::CborError {
                    msg: format!("no header at '{}'", components[..=i].join("/")),
                })?;
        }
        Ok(current)
    }

    /// Insert or replace the scalar leaf at `path`, synthesizing missing
    /// intermediate maps. The document is re-encoded into a new buffer.
    pub fn set(&mut self, path: &str, item: CborItem) -> Result<(), MseedError> {
        if item.is_container() {
            return Err(MseedError::Unsupported {
                msg: "set() takes a scalar leaf, not a container".to_string(),
            });
        }
        let components = split_path(path)?;
        let mut root = self.root()?;
        if root.contains_indefinite() {
            return Err(MseedError::Unsupported {
                msg: "cannot rewrite a document with indefinite-length containers".to_string(),
            });
        }
        set_in_map(&mut root, &components, item)?;
        self.reencode(&root);
        Ok(())
    }

    /// Extend the array at `path` with a newly built map of the given entries.
    /// The array is created if the path ends at a missing key.
    pub fn append_to_array(
        &mut self,
        path: &str,
        entries: Vec<(String, CborItem)>,
    ) -> Result<(), MseedError> {
        let components = split_path(path)?;
        let mut root = self.root()?;
        if root.contains_indefinite() {
            return Err(MseedError::Unsupported {
                msg: "cannot rewrite a document with indefinite-length containers".to_string(),
            });
        }
        let element = CborItem::Map {
            entries: entries
                .into_iter()
                .map(|(k, v)| (CborItem::Text(k), v))
                .collect(),
            indefinite: false,
        };
        append_in_map(&mut root, &components, element)?;
        self.reencode(&root);
        Ok(())
    }

    /// A recursive JSON-like rendering of the whole document.
    pub fn to_diagnostic_string(&self) -> Result<String, MseedError> {
        let root = self.root()?;
        let mut out = String::with_capacity(self.buf.len() * 2);
        cbor::write_diagnostic(&root, &mut out);
        Ok(out)
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, MseedError> {
    let components: Vec<&str> = path.split('/').collect();
    if path.is_empty() || components.iter().any(|c| c.is_empty()) {
        return Err(MseedError::CborError {
            msg: format!("invalid header path '{}'", path),
        });
    }
    Ok(components)
}

/// Walk `map` down `components`, creating intermediate maps, and put `leaf` at
/// the end. Replaces whatever was there, map or not.
fn set_in_map(map: &mut CborItem, components: &[&str], leaf: CborItem) -> Result<(), MseedError> {
    let entries = match map {
        CborItem::Map { entries, .. } => entries,
        _ => {
            return Err(MseedError::CborError {
                msg: "path component is not a map".to_string(),
            });
        }
    };
    let key = components[0];
    let idx = entries
        .iter()
        .position(|(k, _)| matches!(k, CborItem::Text(t) if t == key));

    if components.len() == 1 {
        match idx {
            Some(i) => entries[i].1 = leaf,
            None => entries.push((CborItem::Text(key.to_string()), leaf)),
        }
        return Ok(());
    }

    let idx = match idx {
        Some(i) => i,
        None => {
            entries.push((CborItem::Text(key.to_string()), empty_map()));
            entries.len() - 1
        }
    };
    let value = &mut entries[idx].1;
    if !matches!(value, CborItem::Map { .. }) {
        // A scalar sits where a map is needed; replace it.
        *value = empty_map();
    }
    set_in_map(value, &components[1..], leaf)
}

/// Walk `map` down `components` to an array (created on demand at the final
/// key) and push `element` onto it.
fn append_in_map(
    map: &mut CborItem,
    components: &[&str],
    element: CborItem,
) -> Result<(), MseedError> {
    let entries = match map {
        CborItem::Map { entries, .. } => entries,
        _ => {
            return Err(MseedError::CborError {
                msg: "path component is not a map".to_string(),
            });
        }
    };
    let key = components[0];
    let idx = entries
        .iter()
        .position(|(k, _)| matches!(k, CborItem::Text(t) if t == key));

    if components.len() == 1 {
        return match idx {
            Some(i) => match &mut entries[i].1 {
                CborItem::Array { items, .. } => {
                    items.push(element);
                    Ok(())
                }
                _ => Err(MseedError::CborError {
                    msg: format!("'{}' exists but is not an array", key),
                }),
            },
            None => {
                entries.push((
                    CborItem::Text(key.to_string()),
                    CborItem::Array {
                        items: vec![element],
                        indefinite: false,
                    },
                ));
                Ok(())
            }
        };
    }

    let idx = match idx {
        Some(i) => i,
        None => {
            entries.push((CborItem::Text(key.to_string()), empty_map()));
            entries.len() - 1
        }
    };
    append_in_map(&mut entries[idx].1, &components[1..], element)
}

fn empty_map() -> CborItem {
    CborItem::Map {
        entries: Vec::new(),
        indefinite: false,
    }
}
