use std::path::Path;

use anyhow::Context;
use calamine::{open_workbook_auto, Data, Range, Reader};
use log::{debug, error, info};

use crate::types::MacEntry;

/// Zero-based index of the header row, which never holds an entry.
const HEADER_ROW: u32 = 0;
const NAME_COLUMN: u32 = 0;
const MAC_COLUMN: u32 = 1;

/// Read all valid (name, MAC) pairs from the given sheet.
///
/// Failing to open the workbook or the sheet is reported and results in an
/// empty list; callers treat that as "nothing to do".
pub(crate) fn read_entries(path: &str, sheet: &str) -> Vec<MacEntry> {
    match load_sheet(path, sheet) {
        Ok(range) => {
            let entries = extract_entries(&range);
            info!("Found {} MAC addresses in {path:?}", entries.len());
            entries
        }
        Err(err) => {
            error!("Reading spreadsheet failed: {err:#}");
            vec![]
        }
    }
}

fn load_sheet(path: &str, sheet: &str) -> Result<Range<Data>, anyhow::Error> {
    info!("Reading sheet '{sheet}' from {path:?}...");

    let mut workbook = open_workbook_auto(Path::new(path)).context("Opening workbook")?;

    workbook
        .worksheet_range(sheet)
        .with_context(|| format!("Reading sheet '{sheet}'"))
}

fn extract_entries(range: &Range<Data>) -> Vec<MacEntry> {
    let (Some((first_row, _)), Some((last_row, _))) = (range.start(), range.end()) else {
        return vec![];
    };

    (first_row.max(HEADER_ROW + 1)..=last_row)
        .filter_map(|row| {
            let name = range.get_value((row, NAME_COLUMN)).and_then(cell_text);
            // Only textual MAC cells count; numbers are treated as absent.
            let mac = match range.get_value((row, MAC_COLUMN)) {
                Some(Data::String(value)) => non_blank(value),
                _ => None,
            };

            match (name, mac) {
                (Some(name), Some(mac)) => Some(MacEntry { name, mac }),
                _ => {
                    debug!("Skipping row {}", row + 1);
                    None
                }
            }
        })
        .collect()
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(value) => non_blank(value),
        other => non_blank(&other.to_string()),
    }
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use calamine::{Data, Range};

    use crate::read_sheet::{extract_entries, read_entries};
    use crate::types::MacEntry;

    fn sheet(rows: &[(Data, Data)]) -> Range<Data> {
        let mut range = Range::new((0, 0), (rows.len() as u32, 1));
        range.set_value((0, 0), Data::String("Name".to_string()));
        range.set_value((0, 1), Data::String("MAC".to_string()));
        for (i, (name, mac)) in rows.iter().enumerate() {
            range.set_value((i as u32 + 1, 0), name.clone());
            range.set_value((i as u32 + 1, 1), mac.clone());
        }
        range
    }

    fn text(value: &str) -> Data {
        Data::String(value.to_string())
    }

    #[test]
    fn extract_entries_successfully() {
        let range = sheet(&[
            (text("PC1"), text("AA:BB:CC:11:22:33")),
            (text("  PC2 "), text(" AA:BB:CC:44:55:66\t")),
            (text("PC3"), text("AA:BB:CC:77:88:99")),
        ]);

        assert_eq!(
            extract_entries(&range),
            vec![
                MacEntry {
                    name: "PC1".to_string(),
                    mac: "AA:BB:CC:11:22:33".to_string(),
                },
                MacEntry {
                    name: "PC2".to_string(),
                    mac: "AA:BB:CC:44:55:66".to_string(),
                },
                MacEntry {
                    name: "PC3".to_string(),
                    mac: "AA:BB:CC:77:88:99".to_string(),
                },
            ]
        );
    }

    #[test]
    fn extract_entries_skips_header() {
        let range = sheet(&[]);
        assert!(extract_entries(&range).is_empty());
    }

    #[test]
    fn extract_entries_skips_numeric_mac() {
        let range = sheet(&[
            (text("PC1"), Data::Float(112233445566.0)),
            (text("PC2"), Data::Int(42)),
            (text("PC3"), text("AA:BB:CC:44:55:66")),
        ]);

        let entries = extract_entries(&range);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "PC3");
    }

    #[test]
    fn extract_entries_skips_incomplete_rows() {
        let range = sheet(&[
            (Data::Empty, text("AA:BB:CC:11:22:33")),
            (text("PC2"), Data::Empty),
            (text("   "), text("AA:BB:CC:44:55:66")),
            (text("PC4"), text("  ")),
            (text("PC5"), text("AA:BB:CC:77:88:99")),
        ]);

        let entries = extract_entries(&range);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "PC5");
    }

    #[test]
    fn extract_entries_renders_numeric_name() {
        let range = sheet(&[(Data::Int(1001), text("AA:BB:CC:11:22:33"))]);

        assert_eq!(
            extract_entries(&range),
            vec![MacEntry {
                name: "1001".to_string(),
                mac: "AA:BB:CC:11:22:33".to_string(),
            }]
        );
    }

    #[test]
    fn extract_entries_uses_absolute_rows() {
        // Ranges start at the first used cell, row numbers stay absolute.
        let mut range = Range::new((1, 0), (2, 1));
        range.set_value((1, 0), text("PC1"));
        range.set_value((1, 1), text("AA:BB:CC:11:22:33"));
        range.set_value((2, 0), text("PC2"));
        range.set_value((2, 1), text("AA:BB:CC:44:55:66"));

        let entries = extract_entries(&range);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "PC1");

        let mut range = Range::new((0, 0), (1, 1));
        range.set_value((0, 0), text("PC0"));
        range.set_value((0, 1), text("AA:BB:CC:00:00:00"));
        range.set_value((1, 0), text("PC1"));
        range.set_value((1, 1), text("AA:BB:CC:11:22:33"));

        let entries = extract_entries(&range);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "PC1");
    }

    #[test]
    fn read_entries_successfully() {
        let entries = read_entries("testdata/mac_addresses.xlsx", "Sheet1");
        assert_eq!(
            entries,
            vec![
                MacEntry {
                    name: "PC1".to_string(),
                    mac: "AA:BB:CC:11:22:33".to_string(),
                },
                MacEntry {
                    name: "PC2".to_string(),
                    mac: "AA:BB:CC:44:55:66".to_string(),
                },
                MacEntry {
                    name: "Printer".to_string(),
                    mac: "AA:BB:CC:77:88:99".to_string(),
                },
            ]
        );
    }

    #[test]
    fn read_entries_returns_empty_for_missing_file() {
        assert!(read_entries("<missing>.xlsx", "Sheet1").is_empty());
    }

    #[test]
    fn read_entries_returns_empty_for_missing_sheet() {
        assert!(read_entries("testdata/mac_addresses.xlsx", "Devices").is_empty());
    }
}
