use std::io::Write;

use bson::Bson;
use quarry_import::{CursorHandle, RowIter};
use quarry_transform::FieldTransformer;

use crate::Error;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows: u64,
    pub date_warnings: u64,
}

/// Drain `rows` through `transformer`, writing each row to `out` as one
/// relaxed extended JSON object per line.
///
/// The first import or write error stops the export; the iterator is
/// dropped on the way out, which releases its cursor.
pub fn export<C, W>(
    rows: RowIter<C>,
    transformer: &FieldTransformer,
    out: &mut W,
) -> Result<ExportSummary, Error>
where
    C: CursorHandle,
    W: Write,
{
    let mut summary = ExportSummary::default();
    for row in rows {
        let mut row = row?;
        summary.date_warnings += transformer.transform(&mut row).len() as u64;

        let json = Bson::Document(row.into_document()).into_relaxed_extjson();
        serde_json::to_writer(&mut *out, &json).map_err(|e| Error::Output(e.into()))?;
        out.write_all(b"\n").map_err(Error::Output)?;
        summary.rows += 1;
    }
    out.flush().map_err(Error::Output)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use bson::doc;
    use quarry_import::{DocumentSource, FlattenMode, MemorySource, QueryRequest};
    use quarry_transform::FieldRule;

    use super::*;

    #[test]
    fn writes_json_lines() {
        let source = MemorySource::new().with_collection(
            "people",
            vec![
                doc! { "name": "Ada", "address": { "city": "London" } },
                doc! { "name": "Grace", "address": { "city": "Arlington" } },
            ],
        );
        let rows = source
            .get_data(
                &QueryRequest::parse("", "people", None).unwrap(),
                FlattenMode::Flatten,
            )
            .unwrap();
        let transformer =
            FieldTransformer::new(&[FieldRule::new("address.city", "city")]).unwrap();

        let mut out = Vec::new();
        let summary = export(rows, &transformer, &mut out).unwrap();
        assert_eq!(summary.rows, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"name":"Ada","address.city":"London","city":"London"}"#,
                r#"{"name":"Grace","address.city":"Arlington","city":"Arlington"}"#,
            ]
        );
    }
}
