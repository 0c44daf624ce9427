// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HEADER section of a STEP physical file
//!
//! Validates the exchange structure envelope and pulls out the
//! FILE_DESCRIPTION / FILE_NAME / FILE_SCHEMA records.

use crate::error::{Error, Result};
use crate::parser::{find_record_end, parse_header_record, Token};

const MAGIC: &str = "ISO-10303-21;";

/// Metadata from the HEADER section
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepHeader {
    pub description: Vec<String>,
    pub name: Option<String>,
    pub schemas: Vec<String>,
    pub originating_system: Option<String>,
}

/// Check the envelope of an exchange structure and read its header
///
/// Fails with [`Error::NotStep`] when the magic line is missing and with
/// [`Error::Parse`] when the HEADER or DATA section cannot be found.
pub fn parse_header(content: &str) -> Result<StepHeader> {
    let trimmed = content.trim_start_matches('\u{feff}').trim_start();
    if !trimmed.starts_with(MAGIC) {
        return Err(Error::NotStep(format!(
            "missing {} signature",
            MAGIC.trim_end_matches(';')
        )));
    }

    let offset = content.len() - trimmed.len();
    let bytes = content.as_bytes();

    let header_start = memchr::memmem::find(&bytes[offset..], b"HEADER;")
        .map(|pos| offset + pos + "HEADER;".len())
        .ok_or_else(|| Error::parse(offset, "missing HEADER section"))?;

    let mut header = StepHeader::default();
    let mut pos = header_start;

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        if bytes[pos..].starts_with(b"ENDSEC;") {
            pos += "ENDSEC;".len();
            break;
        }

        let end = find_record_end(bytes, pos)
            .ok_or_else(|| Error::parse(pos, "unterminated HEADER section"))?;
        let (type_name, args) = parse_header_record(&content[pos..=end])
            .map_err(|_| Error::parse(pos, "malformed HEADER record"))?;

        match type_name {
            "FILE_DESCRIPTION" => {
                header.description = args.first().map(strings_of).unwrap_or_default();
            }
            "FILE_NAME" => {
                header.name = args.first().and_then(string_of).filter(|s| !s.is_empty());
                header.originating_system =
                    args.get(5).and_then(string_of).filter(|s| !s.is_empty());
            }
            "FILE_SCHEMA" => {
                header.schemas = args.first().map(strings_of).unwrap_or_default();
            }
            _ => {}
        }

        pos = end + 1;
    }

    if memchr::memmem::find(&bytes[pos..], b"DATA;").is_none() {
        return Err(Error::parse(pos, "missing DATA section"));
    }

    Ok(header)
}

fn string_of(token: &Token) -> Option<String> {
    match token {
        Token::String(s) => Some(s.replace("''", "'")),
        _ => None,
    }
}

fn strings_of(token: &Token) -> Vec<String> {
    match token {
        Token::List(items) => items.iter().filter_map(string_of).collect(),
        other => string_of(other).into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = "ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('cube; 10 mm'),'2;1');
FILE_NAME('cube.step','2024-03-01T10:00:00',('designer'),(''),'kernel 1.0','FreeCAD','');
FILE_SCHEMA(('AUTOMOTIVE_DESIGN { 1 0 10303 214 1 1 1 1 }'));
ENDSEC;
DATA;
#1=CARTESIAN_POINT('',(0.,0.,0.));
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn test_parse_header() {
        let header = parse_header(FILE).unwrap();
        assert_eq!(header.description, vec!["cube; 10 mm".to_string()]);
        assert_eq!(header.name.as_deref(), Some("cube.step"));
        assert_eq!(header.originating_system.as_deref(), Some("FreeCAD"));
        assert_eq!(header.schemas.len(), 1);
        assert!(header.schemas[0].starts_with("AUTOMOTIVE_DESIGN"));
    }

    #[test]
    fn test_rejects_non_step() {
        assert!(matches!(
            parse_header("solid cube\nendsolid cube\n"),
            Err(Error::NotStep(_))
        ));
    }

    #[test]
    fn test_requires_data_section() {
        let truncated = "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));\nENDSEC;\n";
        assert!(matches!(parse_header(truncated), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_unterminated_header() {
        let broken = "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('X'))";
        assert!(matches!(parse_header(broken), Err(Error::Parse { .. })));
    }
}
