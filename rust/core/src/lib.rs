// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Curiosity Core Parser
//!
//! STEP (ISO 10303-21) physical file parser built with [nom](https://docs.rs/nom).
//! Provides zero-copy tokenization and fast entity scanning for CAD exchange files.
//!
//! ## Overview
//!
//! - **Envelope check**: `ISO-10303-21;` signature, HEADER and DATA sections
//! - **Tokenization**: simple and complex (multi-part) data records
//! - **Entity Scanning**: SIMD-accelerated record discovery using [memchr](https://docs.rs/memchr)
//! - **Lazy Decoding**: On-demand attribute parsing with an entity index
//! - **Units**: length unit scale to millimetres
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use curiosity_core::{parse_header, EntityDecoder, EntityScanner};
//!
//! let header = parse_header(content)?;
//! let mut scanner = EntityScanner::new(content);
//! let mut decoder = EntityDecoder::new(content);
//!
//! while let Some((id, type_name, _, _)) = scanner.next_entity() {
//!     if type_name == "MANIFOLD_SOLID_BREP" {
//!         let solid = decoder.decode_by_id(id)?;
//!         println!("solid #{} -> shell #{:?}", id, solid.get_ref(1));
//!     }
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for parsed data

pub mod decoder;
pub mod error;
pub mod header;
pub mod parser;
pub mod schema;
pub mod units;

pub use decoder::{build_entity_index, EntityDecoder, EntityIndex};
pub use error::{Error, Result};
pub use header::{parse_header, StepHeader};
pub use parser::{parse_entity, EntityScanner, Record, Token};
pub use schema::{AttributeValue, DecodedEntity, StepType};
pub use units::{get_si_prefix_multiplier, length_unit_scale_mm, plane_angle_scale_rad};
