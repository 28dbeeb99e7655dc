use crate::model::ReportRecord;

/// One emitted pairing between a report and a downloaded file, by index
/// into the caller's slices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMatch {
    pub record_index: usize,
    pub file_index: usize,
    /// Phase-1 heuristic score; 0 for fallback pairs.
    pub score: u32,
    pub fallback: bool,
}

/// Pairs report records with downloaded PDF filenames.
///
/// Phase 1 scores every still-unclaimed filename that contains the
/// record's `rd_id` as a literal substring and reserves the best one.
/// Phase 2 hands leftover files to leftover records positionally, with no
/// similarity check at all. Each record and each file appears in at most
/// one pair; given the same input ordering the output is deterministic.
pub fn match_reports_to_files(records: &[ReportRecord], filenames: &[String]) -> Vec<FileMatch> {
    let mut claimed = vec![false; filenames.len()];
    let mut matched = vec![false; records.len()];
    let mut pairs = Vec::new();

    for (record_index, record) in records.iter().enumerate() {
        if record.rd_id.is_empty() {
            continue;
        }

        let mut best: Option<(usize, u32)> = None;
        for (file_index, filename) in filenames.iter().enumerate() {
            if claimed[file_index] || !filename.contains(&record.rd_id) {
                continue;
            }
            let score = score_filename(record, filename);
            // Strictly-greater keeps the first file on ties.
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((file_index, score));
            }
        }

        if let Some((file_index, score)) = best {
            claimed[file_index] = true;
            matched[record_index] = true;
            pairs.push(FileMatch {
                record_index,
                file_index,
                score,
                fallback: false,
            });
        }
    }

    let mut unused = (0..filenames.len()).filter(|&file_index| !claimed[file_index]);
    for record_index in (0..records.len()).filter(|&record_index| !matched[record_index]) {
        let Some(file_index) = unused.next() else {
            break;
        };
        pairs.push(FileMatch {
            record_index,
            file_index,
            score: 0,
            fallback: true,
        });
    }

    pairs
}

fn score_filename(record: &ReportRecord, filename: &str) -> u32 {
    let mut score = 1;

    if !record.id.is_empty() && filename.contains(&record.id) {
        score += 10;
    }

    let site = record.site.to_lowercase().replace(' ', "");
    if !site.is_empty() && filename.to_lowercase().replace(' ', "").contains(&site) {
        score += 5;
    }

    if !record.date.is_empty() && filename.contains(&record.date) {
        score += 3;
    }

    score
}
