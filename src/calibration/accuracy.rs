//! Enhanced accuracy: weighted, outlier-filtered agreement between manual
//! lab reports and scan readings.

use crate::db::SampleRecord;

/// Records whose normalized magnitude exceeds this on any field are discarded
pub const OUTLIER_THRESHOLD: f64 = 2.0;

const WEIGHT_OIL: f64 = 0.4;
const WEIGHT_PROTEIN: f64 = 0.3;
const WEIGHT_FFA: f64 = 0.3;

/// Aggregate accuracy percentage across all manual/scan pairs sharing an id.
///
/// Each field is normalized to a [0,1] scale, outliers are discarded, then a
/// per-field relative accuracy `100 - |manual - scan| / manual * 100` is
/// combined 0.4 oil / 0.3 protein / 0.3 ffa and averaged over matched pairs.
/// Returns 0.0 when no pair matches.
pub fn enhanced_accuracy(manual: &[SampleRecord], scans: &[SampleRecord]) -> f64 {
    let manual = filter_outliers(normalize(manual));
    let scans = filter_outliers(normalize(scans));

    let mut total = 0.0;
    let mut matched = 0u32;

    for entry in &manual {
        if let Some(scan) = scans.iter().find(|s| s.id == entry.id) {
            let pair = WEIGHT_OIL * field_accuracy(entry.oil, scan.oil)
                + WEIGHT_PROTEIN * field_accuracy(entry.protein, scan.protein)
                + WEIGHT_FFA * field_accuracy(entry.ffa, scan.ffa);
            total += pair;
            matched += 1;
        }
    }

    if matched > 0 {
        total / matched as f64
    } else {
        0.0
    }
}

/// Scale percentage fields onto [0,1]
fn normalize(records: &[SampleRecord]) -> Vec<SampleRecord> {
    records
        .iter()
        .map(|r| SampleRecord {
            id: r.id,
            oil: r.oil / 100.0,
            protein: r.protein / 100.0,
            ffa: r.ffa / 100.0,
        })
        .collect()
}

fn filter_outliers(records: Vec<SampleRecord>) -> Vec<SampleRecord> {
    records
        .into_iter()
        .filter(|r| {
            r.oil.abs() < OUTLIER_THRESHOLD
                && r.protein.abs() < OUTLIER_THRESHOLD
                && r.ffa.abs() < OUTLIER_THRESHOLD
        })
        .collect()
}

/// Relative agreement for one field. A zero manual value would divide by
/// zero; it contributes zero accuracy instead.
fn field_accuracy(manual: f64, scan: f64) -> f64 {
    if manual == 0.0 {
        return 0.0;
    }
    100.0 - ((manual - scan) / manual * 100.0).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, oil: f64, protein: f64, ffa: f64) -> SampleRecord {
        SampleRecord {
            id,
            oil,
            protein,
            ffa,
        }
    }

    #[test]
    fn no_records_means_zero_accuracy() {
        assert_eq!(enhanced_accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn unmatched_ids_mean_zero_accuracy() {
        let manual = vec![record(1, 10.0, 50.0, 40.0)];
        let scans = vec![record(2, 10.0, 50.0, 40.0)];
        assert_eq!(enhanced_accuracy(&manual, &scans), 0.0);
    }

    #[test]
    fn weighted_accuracy_for_single_pair() {
        // 10% oil error weighted 0.4, exact protein and ffa:
        // 0.4 * 90 + 0.3 * 100 + 0.3 * 100 = 96
        let manual = vec![record(1, 10.0, 50.0, 40.0)];
        let scans = vec![record(1, 9.0, 50.0, 40.0)];
        let accuracy = enhanced_accuracy(&manual, &scans);
        assert!((accuracy - 96.0).abs() < 1e-9, "got {accuracy}");
    }

    #[test]
    fn perfect_agreement_is_100() {
        let manual = vec![record(1, 10.0, 50.0, 40.0), record(2, 8.0, 45.0, 20.0)];
        let scans = manual.clone();
        let accuracy = enhanced_accuracy(&manual, &scans);
        assert!((accuracy - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_manual_field_contributes_zero_not_a_fault() {
        let manual = vec![record(1, 0.0, 50.0, 40.0)];
        let scans = vec![record(1, 9.0, 50.0, 40.0)];
        // 0.4 * 0 + 0.3 * 100 + 0.3 * 100 = 60
        let accuracy = enhanced_accuracy(&manual, &scans);
        assert!(accuracy.is_finite());
        assert!((accuracy - 60.0).abs() < 1e-9, "got {accuracy}");
    }

    #[test]
    fn outlier_records_are_discarded() {
        // 250% oil normalizes to 2.5, beyond the 2.0 threshold, so the only
        // manual record drops out and nothing matches.
        let manual = vec![record(1, 250.0, 50.0, 40.0)];
        let scans = vec![record(1, 9.0, 50.0, 40.0)];
        assert_eq!(enhanced_accuracy(&manual, &scans), 0.0);
    }

    #[test]
    fn averages_across_matched_pairs() {
        let manual = vec![record(1, 10.0, 50.0, 40.0), record(2, 10.0, 50.0, 40.0)];
        let scans = vec![record(1, 9.0, 50.0, 40.0), record(2, 10.0, 50.0, 40.0)];
        // (96 + 100) / 2
        let accuracy = enhanced_accuracy(&manual, &scans);
        assert!((accuracy - 98.0).abs() < 1e-9, "got {accuracy}");
    }
}
