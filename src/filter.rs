use crate::record::StudentRecord;

/// Case-insensitive substring match over name, subject and roll number.
/// A blank query keeps everything. Order is preserved.
pub fn filter<'a>(records: &'a [StudentRecord], query: &str) -> Vec<&'a StudentRecord> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return records.iter().collect();
    }
    records.iter().filter(|r| matches(r, &q)).collect()
}

fn matches(record: &StudentRecord, lowered_query: &str) -> bool {
    [&record.name, &record.subject, &record.roll_number]
        .iter()
        .any(|field| field.to_lowercase().contains(lowered_query))
}
