//! Highest-energy, non-overlapping windows over a dense bucket series.
//!
//! Selection is greedy: candidates are taken in descending total and any
//! that touches an already chosen range is skipped. This does not maximize
//! the combined energy of the K windows; it surfaces the single strongest
//! moments first, in O(N log N).

use crate::models::timeline::{EnergyBucket, PeakWindow};
use chrono::Duration;

/// Window length in buckets for a peak span of `peak_secs`.
pub fn window_len(peak_secs: i64, width_secs: i64) -> usize {
    if width_secs <= 0 {
        return 1;
    }
    (peak_secs / width_secs).max(1) as usize
}

/// `(start_index, total)` of up to `k` disjoint windows of exactly `w`
/// buckets, sorted by descending total. Windows with no energy are skipped.
pub fn top_windows(energies: &[f64], w: usize, k: usize) -> Vec<(usize, f64)> {
    let n = energies.len();
    if w == 0 || k == 0 || n < w {
        return Vec::new();
    }

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    for e in energies {
        prefix.push(prefix[prefix.len() - 1] + e);
    }

    let mut candidates: Vec<(usize, f64)> = (0..=n - w)
        .map(|start| (start, prefix[start + w] - prefix[start]))
        .collect();
    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut chosen: Vec<(usize, f64)> = Vec::with_capacity(k);
    for (start, total) in candidates {
        if chosen.len() == k || total <= 0.0 {
            break;
        }
        let overlaps = chosen
            .iter()
            .any(|&(other, _)| start < other + w && other < start + w);
        if !overlaps {
            chosen.push((start, total));
        }
    }
    chosen
}

pub fn detect_peaks(buckets: &[EnergyBucket], w: usize, k: usize) -> Vec<PeakWindow> {
    let energies: Vec<f64> = buckets.iter().map(|b| b.energy).collect();
    top_windows(&energies, w, k)
        .into_iter()
        .map(|(start, total)| {
            let first = &buckets[start];
            let last = &buckets[start + w - 1];
            PeakWindow {
                start: first.bucket_start,
                end: last.bucket_start + Duration::seconds(last.width_seconds),
                total_energy: total,
                start_index: start,
                end_index: start + w - 1,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn picks_strongest_window_then_skips_overlaps() {
        let energies = [1.0, 1.0, 9.0, 9.0, 1.0, 1.0, 1.0, 1.0];
        let peaks = top_windows(&energies, 2, 3);
        assert_eq!(peaks[0], (2, 18.0));
        // (1, 10) and (3, 10) both touch {2, 3}.
        assert_eq!(peaks[1..], [(0, 2.0), (4, 2.0)]);
    }

    #[test]
    fn results_never_overlap_and_descend() {
        let energies: Vec<f64> = (0..60).map(|i| ((i * 37) % 11) as f64).collect();
        let w = 4;
        let peaks = top_windows(&energies, w, 6);
        assert_eq!(peaks.len(), 6);
        for pair in peaks.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        for (i, a) in peaks.iter().enumerate() {
            for b in &peaks[i + 1..] {
                assert!(a.0 + w <= b.0 || b.0 + w <= a.0);
            }
        }
    }

    #[test]
    fn series_shorter_than_window_is_empty() {
        assert!(top_windows(&[5.0, 5.0], 3, 2).is_empty());
        assert!(top_windows(&[], 1, 2).is_empty());
    }

    #[test]
    fn silent_series_has_no_peaks() {
        assert!(top_windows(&[0.0; 10], 2, 3).is_empty());
    }

    #[test]
    fn window_len_is_at_least_one_bucket() {
        assert_eq!(window_len(120, 60), 2);
        assert_eq!(window_len(30, 60), 1);
        assert_eq!(window_len(150, 60), 2);
    }

    #[test]
    fn peak_spans_cover_whole_buckets() {
        let t0 = Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap();
        let buckets: Vec<EnergyBucket> = [0.0, 4.0, 4.0, 0.0]
            .iter()
            .enumerate()
            .map(|(i, &energy)| EnergyBucket {
                event_id: "ev".into(),
                bucket_start: t0 + Duration::seconds(60 * i as i64),
                width_seconds: 60,
                energy,
            })
            .collect();
        let peaks = detect_peaks(&buckets, 2, 1);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].start, t0 + Duration::seconds(60));
        assert_eq!(peaks[0].end, t0 + Duration::seconds(180));
        assert_eq!((peaks[0].start_index, peaks[0].end_index), (1, 2));
        assert_eq!(peaks[0].total_energy, 8.0);
    }
}
