//! Flat tabular export for the labelling and analysis collaborators.
//!
//! One CSV row per posting, stable column order, deterministic row order
//! (by posting_id, guaranteed by `Store::export`). Missing free-text
//! fields export as the "unspecified" sentinel; unparsed salary and
//! dates export as empty cells.

use crate::store::StoredPosting;

/// Column order of the extract. Fixed — downstream consumers index by it.
pub const COLUMNS: [&str; 16] = [
    "posting_id",
    "institution",
    "job_title",
    "vacancies",
    "experience",
    "academic_profile",
    "specialization",
    "knowledge",
    "competencies",
    "salary_amount",
    "posting_start_date",
    "posting_end_date",
    "contract_type",
    "verdict",
    "first_seen_at",
    "last_seen_at",
];

const UNSPECIFIED: &str = "unspecified";

/// Render stored postings as a CSV document, header row included.
pub fn to_csv(rows: &[StoredPosting]) -> String {
    let mut out = String::new();
    write_row(&mut out, COLUMNS.iter().map(|c| c.to_string()));

    for row in rows {
        write_row(&mut out, field_values(row));
    }

    out
}

fn field_values(row: &StoredPosting) -> impl Iterator<Item = String> {
    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| UNSPECIFIED.to_string());
    vec![
        row.posting_id.clone(),
        row.institution.clone().unwrap_or_default(),
        row.job_title.clone().unwrap_or_default(),
        row.vacancies.map(|v| v.to_string()).unwrap_or_default(),
        text(&row.experience),
        text(&row.academic_profile),
        text(&row.specialization),
        text(&row.knowledge),
        text(&row.competencies),
        row.salary_amount.map(|s| format!("{s:.2}")).unwrap_or_default(),
        row.posting_start_date.clone().unwrap_or_default(),
        row.posting_end_date.clone().unwrap_or_default(),
        row.contract_type.as_str().to_string(),
        row.verdict.map(|v| v.as_str().to_string()).unwrap_or_default(),
        row.first_seen_at.clone(),
        row.last_seen_at.clone(),
    ]
    .into_iter()
}

fn write_row(out: &mut String, fields: impl Iterator<Item = String>) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&escape(&field));
    }
    out.push('\n');
}

fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
