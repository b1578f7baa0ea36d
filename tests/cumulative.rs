use chrono::Utc;
use metallograph::features::{BoundingBox, Feature};
use metallograph::{
    AnalysisKind, AnalysisResult, CumulativeResultStore, Statistics,
};
use std::sync::Arc;

fn feature(area_px: f64) -> Feature {
    Feature {
        boundary: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]],
        area_px,
        perimeter_px: 12.0,
        circularity: 0.8,
        length_px: 4.0,
        width_px: 3.0,
        bbox: BoundingBox { x: 0, y: 0, w: 4, h: 3 },
        centroid: [1.0, 1.0],
        area_calibrated: None,
        length_calibrated: None,
        selected: true,
        size_class: None,
    }
}

fn result(image_id: &str, areas: &[f64]) -> AnalysisResult {
    let values: Vec<f64> = areas.to_vec();
    AnalysisResult {
        source_image_id: image_id.to_string(),
        kind: AnalysisKind::Porosity,
        features: areas.iter().map(|&a| feature(a)).collect(),
        statistics: if values.is_empty() {
            Statistics::empty()
        } else {
            metallograph::stats::aggregate(&values, 10)
        },
        nodularity: None,
        phase: None,
        calibrated: false,
        created_at: Utc::now(),
    }
}

#[test]
fn add_on_empty_store_yields_one_result_with_matching_totals() {
    let store = CumulativeResultStore::new();
    store.add(result("field-01", &[10.0, 20.0]));

    let session = store.get();
    assert_eq!(session.results.len(), 1);
    assert_eq!(session.totals.result_count, 1);
    assert_eq!(session.totals.feature_count, 2);
    assert_eq!(session.totals.area_sum, 30.0);
}

#[test]
fn totals_are_additive_across_results() {
    let store = CumulativeResultStore::new();
    store.add(result("field-01", &[10.0, 20.0]));
    store.add(result("field-02", &[5.0]));

    let session = store.get();
    assert_eq!(session.totals.result_count, 2);
    assert_eq!(session.totals.feature_count, 3);
    assert_eq!(session.totals.area_sum, 45.0);

    // Totals always equal the sum over the contained results.
    let recomputed: f64 = session.results.iter().map(|r| r.total_feature_area()).sum();
    assert_eq!(session.totals.area_sum, recomputed);
}

#[test]
fn clear_resets_to_an_empty_session() {
    let store = CumulativeResultStore::new();
    store.add(result("field-01", &[10.0]));
    store.clear();

    let session = store.get();
    assert!(session.results.is_empty());
    assert_eq!(session.totals.result_count, 0);
    assert_eq!(session.totals.feature_count, 0);
    assert_eq!(session.totals.area_sum, 0.0);
    assert!(session.totals.size_range_counts.is_empty());
}

#[test]
fn empty_results_accumulate_without_skewing_totals() {
    let store = CumulativeResultStore::new();
    store.add(result("clean-field", &[]));
    store.add(result("field-02", &[7.0]));

    let session = store.get();
    assert_eq!(session.totals.result_count, 2);
    assert_eq!(session.totals.feature_count, 1);
    assert_eq!(session.totals.area_sum, 7.0);
}

#[test]
fn size_range_counts_accumulate_from_classified_results() {
    use metallograph::{NodularityResult, SizeRange};

    let ranges: Vec<SizeRange> = [0.0, 5.0, 10.0, 15.0, 20.0, 30.0, 40.0, 60.0, 120.0]
        .windows(2)
        .map(|e| SizeRange::new(e[0], e[1]))
        .collect();
    let nodularity = |counts: Vec<u64>| NodularityResult {
        circularity_cutoff: 0.6,
        size_ranges: ranges.clone(),
        size_range_counts: counts,
        nodular_count: 1,
        non_nodular_count: 0,
        nodular_size_sum: 10.0,
        total_size_sum: 10.0,
        score: Some(1.0),
    };

    let store = CumulativeResultStore::new();
    let mut r1 = result("field-01", &[10.0]);
    r1.nodularity = Some(nodularity(vec![1, 0, 0, 0, 0, 0, 0, 0]));
    let mut r2 = result("field-02", &[10.0]);
    r2.nodularity = Some(nodularity(vec![0, 0, 1, 0, 0, 0, 0, 0]));
    store.add(r1);
    store.add(r2);

    let session = store.get();
    assert_eq!(session.totals.size_range_counts, vec![1, 0, 1, 0, 0, 0, 0, 0]);
}

#[test]
fn concurrent_adds_never_lose_results_or_totals() {
    let store = Arc::new(CumulativeResultStore::new());
    let mut handles = Vec::new();
    for t in 0..8 {
        let store = Arc::clone(&store);
        handles.push(std::thread::spawn(move || {
            for i in 0..50 {
                store.add(result(&format!("field-{t}-{i}"), &[1.0]));
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let session = store.get();
    assert_eq!(session.totals.result_count, 400);
    assert_eq!(session.totals.feature_count, 400);
    assert_eq!(session.totals.area_sum, 400.0);
    assert_eq!(session.results.len(), 400);
}
