//! Raw CSV export for `download` windows.
//!
//! The buffer is handed to an external HTTP handler that streams it as a
//! file attachment; nothing is written to disk here.

use sf_common::{Result, STORED_TIME_FORMAT, TIME_COLUMN};

use crate::aggregate::Aggregation;

/// Serialize a windowed aggregation into an in-memory CSV buffer.
///
/// Values are already coefficient-scaled by the aggregation step; no
/// denoising is ever applied to exports.
pub fn export_csv(agg: &Aggregation) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        let mut header = vec![TIME_COLUMN.to_string()];
        header.extend(agg.frame.columns.iter().map(|c| c.name.clone()));
        writer.write_record(&header)?;
        for i in 0..agg.frame.len() {
            let mut record = vec![agg.frame.timestamps[i]
                .format(STORED_TIME_FORMAT)
                .to_string()];
            for col in &agg.frame.columns {
                record.push(match col.values[i] {
                    Some(v) => v.to_string(),
                    None => String::new(),
                });
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
    }
    Ok(buf)
}
