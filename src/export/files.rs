//! Discrete-files export: one PNG per capture plus a plain-text manifest.

use crate::capture::CaptureRecord;

/// Separator line closing every manifest entry.
pub const MANIFEST_DELIMITER: &str = "---";
pub const MANIFEST_FILENAME: &str = "index.txt";

/// How exported images are named.
#[derive(Debug, Clone)]
pub struct FileNaming {
    pub prefix: String,
}

impl Default for FileNaming {
    fn default() -> Self {
        Self {
            prefix: "screenshot".to_string(),
        }
    }
}

impl FileNaming {
    /// `<prefix>-<NNN>-<HH-MM-SS>.png`, `index` is 1-based.
    pub fn filename(&self, index: usize, record: &CaptureRecord) -> String {
        format!(
            "{}-{:03}-{}.png",
            self.prefix,
            index,
            record.time_formatted.replace(':', "-")
        )
    }
}

/// One exported image with its manifest fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub filename: String,
    pub timestamp: String,
    pub caption: String,
    pub image: Vec<u8>,
}

/// All files produced by one export, in store order.
#[derive(Debug, Clone, Default)]
pub struct FileBatch {
    pub entries: Vec<FileEntry>,
}

impl FileBatch {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn manifest(&self) -> String {
        manifest_text(
            self.entries
                .iter()
                .map(|e| (e.filename.as_str(), e.timestamp.as_str(), e.caption.as_str())),
        )
    }
}

pub fn build_batch(records: &[CaptureRecord], naming: &FileNaming) -> FileBatch {
    FileBatch {
        entries: records
            .iter()
            .enumerate()
            .map(|(i, record)| FileEntry {
                filename: naming.filename(i + 1, record),
                timestamp: record.time_formatted.clone(),
                caption: record.caption.clone(),
                image: record.image.clone(),
            })
            .collect(),
    }
}

/// Render `(filename, timestamp, caption)` triples as the manifest text.
pub fn manifest_text<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>) -> String {
    entries
        .into_iter()
        .map(|(filename, timestamp, caption)| {
            format!(
                "File: {}\nTimestamp: {}\nCaption: {}\n{}",
                filename, timestamp, caption, MANIFEST_DELIMITER
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::tests::record_at;

    #[test]
    fn one_entry_per_record_in_order() {
        let records = vec![
            record_at(5.0, "opening"),
            record_at(3725.0, ""),
            record_at(90.0, "wrap up"),
        ];
        let batch = build_batch(&records, &FileNaming::default());

        assert_eq!(batch.len(), 3);
        let names: Vec<_> = batch.entries.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "screenshot-001-00-00-05.png",
                "screenshot-002-01-02-05.png",
                "screenshot-003-00-01-30.png",
            ]
        );
        assert_eq!(batch.entries[1].image, records[1].image);
    }

    #[test]
    fn manifest_lists_triples_with_delimiters() {
        let records = vec![record_at(5.0, "opening"), record_at(90.0, "")];
        let batch = build_batch(
            &records,
            &FileNaming {
                prefix: "talk".into(),
            },
        );

        assert_eq!(
            batch.manifest(),
            "File: talk-001-00-00-05.png\nTimestamp: 00:00:05\nCaption: opening\n---\n\
             File: talk-002-00-01-30.png\nTimestamp: 00:01:30\nCaption: \n---"
        );
    }

    #[test]
    fn manifest_of_nothing_is_empty() {
        assert_eq!(FileBatch::default().manifest(), "");
    }
}
