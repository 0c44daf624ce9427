// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity Decoder - On-demand entity parsing
//!
//! Lazily decode STEP entities from byte offsets without parsing the whole DATA section.

use crate::error::{Error, Result};
use crate::parser::{data_section_start, find_record_end, parse_entity, Record};
use crate::schema::{AttributeValue, DecodedEntity, StepType};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Pre-built entity index type
pub type EntityIndex = FxHashMap<u32, (usize, usize)>;

/// Build entity index from content - O(n) scan using SIMD-accelerated search
/// Returns index mapping entity IDs to byte offsets of their records
#[inline]
pub fn build_entity_index(content: &str) -> EntityIndex {
    let bytes = content.as_bytes();
    let len = bytes.len();

    let estimated_entities = len / 50;
    let mut index = FxHashMap::with_capacity_and_hasher(estimated_entities, Default::default());

    let mut pos = data_section_start(content);

    while pos < len {
        let hash_offset = match memchr::memchr(b'#', &bytes[pos..]) {
            Some(offset) => offset,
            None => break,
        };

        let start = pos + hash_offset;
        pos = start + 1;

        let id_start = pos;
        while pos < len && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let id_end = pos;

        // Handles both `#45=` and `#45 = `
        while pos < len && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }

        if id_end > id_start && pos < len && bytes[pos] == b'=' {
            let id = parse_u32_inline(bytes, id_start, id_end);

            match find_record_end(bytes, pos) {
                Some(semicolon) => {
                    pos = semicolon + 1;
                    index.insert(id, (start, pos));
                }
                None => break, // No terminator, malformed tail
            }
        }
    }

    index
}

/// Fast u32 parsing without string allocation
#[inline]
fn parse_u32_inline(bytes: &[u8], start: usize, end: usize) -> u32 {
    let mut result: u32 = 0;
    for &byte in &bytes[start..end] {
        let digit = byte.wrapping_sub(b'0');
        result = result.wrapping_mul(10).wrapping_add(digit as u32);
    }
    result
}

/// Entity decoder for lazy parsing - uses Arc for cheap cache hits
pub struct EntityDecoder<'a> {
    content: &'a str,
    /// Cache of decoded entities (entity_id -> `Arc<DecodedEntity>`)
    cache: FxHashMap<u32, Arc<DecodedEntity>>,
    /// Index of entity offsets (entity_id -> (start, end)), built lazily
    entity_index: Option<Arc<EntityIndex>>,
    /// Cartesian point coordinates resolved through the fast path
    point_cache: FxHashMap<u32, (f64, f64, f64)>,
}

impl<'a> EntityDecoder<'a> {
    /// Create new decoder
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            cache: FxHashMap::default(),
            entity_index: None,
            point_cache: FxHashMap::default(),
        }
    }

    /// Create decoder with pre-built index
    pub fn with_index(content: &'a str, index: EntityIndex) -> Self {
        Self {
            content,
            cache: FxHashMap::default(),
            entity_index: Some(Arc::new(index)),
            point_cache: FxHashMap::default(),
        }
    }

    fn build_index(&mut self) {
        if self.entity_index.is_some() {
            return;
        }
        self.entity_index = Some(Arc::new(build_entity_index(self.content)));
    }

    /// Decode entity at byte offset
    /// Returns cached entity if already decoded
    #[inline]
    pub fn decode_at(&mut self, start: usize, end: usize) -> Result<DecodedEntity> {
        let line = &self.content[start..end];
        let (id, record) = parse_entity(line).map_err(|e| {
            Error::parse(
                start,
                format!("{}, input: {:?}", e, &line[..line.len().min(100)]),
            )
        })?;

        if let Some(entity_arc) = self.cache.get(&id) {
            return Ok(entity_arc.as_ref().clone());
        }

        let entity = match record {
            Record::Simple { type_name, args } => {
                let attributes = args.iter().map(AttributeValue::from_token).collect();
                DecodedEntity::new(id, type_name, attributes)
            }
            Record::Complex(parts) => DecodedEntity::complex(
                id,
                parts
                    .iter()
                    .map(|(name, args)| {
                        (
                            name.to_string(),
                            args.iter().map(AttributeValue::from_token).collect(),
                        )
                    })
                    .collect(),
            ),
        };

        self.cache.insert(id, Arc::new(entity.clone()));
        Ok(entity)
    }

    /// Decode entity by ID - O(1) lookup using entity index
    #[inline]
    pub fn decode_by_id(&mut self, entity_id: u32) -> Result<DecodedEntity> {
        if let Some(entity_arc) = self.cache.get(&entity_id) {
            return Ok(entity_arc.as_ref().clone());
        }

        self.build_index();

        let (start, end) = self
            .entity_index
            .as_ref()
            .and_then(|idx| idx.get(&entity_id).copied())
            .ok_or(Error::EntityNotFound(entity_id))?;

        self.decode_at(start, end)
    }

    /// Decode entity by ID and check its type
    pub fn decode_expecting(
        &mut self,
        entity_id: u32,
        expected: &[StepType],
        expected_name: &'static str,
    ) -> Result<DecodedEntity> {
        let entity = self.decode_by_id(entity_id)?;
        if expected.contains(&entity.step_type) {
            Ok(entity)
        } else {
            Err(Error::UnexpectedType {
                id: entity_id,
                expected: expected_name,
                found: entity.type_name,
            })
        }
    }

    /// Raw record text for an entity
    #[inline]
    fn raw_content(&mut self, entity_id: u32) -> Option<&'a str> {
        self.build_index();
        let (start, end) = self.entity_index.as_ref()?.get(&entity_id).copied()?;
        Some(&self.content[start..end])
    }

    /// CARTESIAN_POINT coordinates straight from the raw record, cached per point.
    /// Falls back to full decoding when the record is not in the expected shape.
    #[inline]
    pub fn get_cartesian_point(&mut self, entity_id: u32) -> Result<(f64, f64, f64)> {
        if let Some(point) = self.point_cache.get(&entity_id) {
            return Ok(*point);
        }

        let fast = self
            .raw_content(entity_id)
            .and_then(|raw| parse_cartesian_point_inline(raw.as_bytes()));

        let point = match fast {
            Some(point) => point,
            None => {
                let entity =
                    self.decode_expecting(entity_id, &[StepType::CartesianPoint], "CARTESIAN_POINT")?;
                entity
                    .get(1)
                    .and_then(|coords| coords.as_point3())
                    .ok_or_else(|| Error::MissingAttribute {
                        id: entity_id,
                        type_name: entity.type_name.clone(),
                        index: 1,
                    })?
            }
        };

        self.point_cache.insert(entity_id, point);
        Ok(point)
    }
}

/// Parse `#n=CARTESIAN_POINT('name',(x,y,z));` without building tokens
#[inline]
fn parse_cartesian_point_inline(bytes: &[u8]) -> Option<(f64, f64, f64)> {
    let len = bytes.len();
    let eq = memchr::memchr(b'=', bytes)?;
    let mut i = eq + 1;

    while i < len && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if !bytes[i..].starts_with(b"CARTESIAN_POINT") {
        return None;
    }
    i += b"CARTESIAN_POINT".len();

    while i < len && bytes[i] != b'(' {
        i += 1;
    }
    i += 1;

    // Name attribute: '' or 'text'
    while i < len && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if i < len && bytes[i] == b'\'' {
        i += 1;
        loop {
            let close = memchr::memchr(b'\'', &bytes[i..])? + i;
            if bytes.get(close + 1) == Some(&b'\'') {
                i = close + 2;
            } else {
                i = close + 1;
                break;
            }
        }
    } else if i < len && bytes[i] == b'$' {
        i += 1;
    } else {
        return None;
    }

    while i < len && bytes[i] != b'(' {
        if !(bytes[i] == b',' || bytes[i].is_ascii_whitespace()) {
            return None;
        }
        i += 1;
    }
    if i >= len {
        return None;
    }
    i += 1;

    let mut offset = i;
    let x = parse_next_float(&bytes[offset..], &mut offset)?;
    let y = parse_next_float(&bytes[offset..], &mut offset)?;
    let z = parse_next_float(&bytes[offset..], &mut offset).unwrap_or(0.0);

    Some((x, y, z))
}

/// Parse next float from bytes, skipping separators
#[inline]
fn parse_next_float(bytes: &[u8], offset: &mut usize) -> Option<f64> {
    let len = bytes.len();
    let mut i = 0;

    while i < len && (bytes[i] == b',' || bytes[i].is_ascii_whitespace()) {
        i += 1;
    }

    if i >= len || bytes[i] == b')' {
        return None;
    }

    match fast_float::parse_partial::<f64, _>(&bytes[i..]) {
        Ok((value, consumed)) if consumed > 0 => {
            *offset += i + consumed;
            Some(value)
        }
        _ => None,
    }
}
