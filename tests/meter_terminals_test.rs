// Clearance analysis over a meter terminal block: three phases and neutral
// in a row, plus a protective earth known only by part reference.
use clearance_engine::clearance::{
    analyze_clearances, AnalysisError, AnalysisOptions, CancellationToken, DistanceSource,
    InsulationClass, MeasurementError, PairwiseClearanceAnalyzer, Terminal, Verdict,
    VerificationContext, VerificationReportBuilder,
};
use clearance_engine::geometry::{GeometryError, Mesh, Point3D};

const SIDE: f64 = 0.005;

/// Closed cube of edge SIDE with its lowest corner at (x, y, 0)
fn cube(x: f64, y: f64) -> Mesh {
    let vertices: Vec<Point3D> = (0..8)
        .map(|i| {
            Point3D::new(
                x + if i & 1 != 0 { SIDE } else { 0.0 },
                y + if i & 2 != 0 { SIDE } else { 0.0 },
                if i & 4 != 0 { SIDE } else { 0.0 },
            )
        })
        .collect();
    let triangles = vec![
        [0, 2, 1], [1, 2, 3],
        [4, 5, 6], [5, 7, 6],
        [0, 1, 4], [1, 5, 4],
        [2, 6, 3], [3, 6, 7],
        [0, 4, 2], [2, 4, 6],
        [1, 3, 5], [3, 7, 5],
    ];
    Mesh::new(vertices, triangles).unwrap()
}

/// L1, L2, L3, N with gaps of 6.0mm, 3.5mm and 8.0mm. L3 is shifted
/// sideways so no vertex pair lines up across the tight gap.
fn terminal_block() -> Vec<Terminal> {
    let l1 = 0.0;
    let l2 = l1 + SIDE + 0.006;
    let l3 = l2 + SIDE + 0.0035;
    let n = l3 + SIDE + 0.008;
    vec![
        Terminal::new("L1", 230.0, 80.0).with_part_ref("P-L1").with_mesh(cube(l1, 0.0)),
        Terminal::new("L2", 230.0, 80.0).with_part_ref("P-L2").with_mesh(cube(l2, 0.0)),
        Terminal::new("L3", 230.0, 80.0).with_part_ref("P-L3").with_mesh(cube(l3, SIDE / 2.0)),
        Terminal::new("N", 230.0, 80.0).with_part_ref("P-N").with_mesh(cube(n, 0.0)),
        Terminal::new("PE", 0.0, 0.0).with_part_ref("P-PE"),
    ]
}

fn analyze(ctx: &VerificationContext<'_>, options: &AnalysisOptions) -> Result<Vec<clearance_engine::ClearancePair>, AnalysisError> {
    PairwiseClearanceAnalyzer::new(ctx, options).analyze(&terminal_block(), options.required_clearance_override_mm)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_terminal_block_verdicts() {
        let ctx = VerificationContext::new();
        let pairs = analyze(&ctx, &AnalysisOptions::default()).unwrap();
        assert_eq!(pairs.len(), 10);

        let find = |a: &str, b: &str| pairs.iter().find(|p| p.terminal_a == a && p.terminal_b == b).unwrap();

        let l1_l2 = find("L1", "L2");
        assert_eq!(l1_l2.verdict, Verdict::Pass);
        assert!((l1_l2.distance_mm.unwrap() - 6.0).abs() < 1e-6);
        assert_eq!(l1_l2.required_clearance_mm, 4.0);
        assert_eq!(l1_l2.distance_source, Some(DistanceSource::MeshGeometry));

        let l2_l3 = find("L2", "L3");
        assert_eq!(l2_l3.verdict, Verdict::Fail);
        assert!((l2_l3.distance_mm.unwrap() - 3.5).abs() < 1e-6);
        assert!((l2_l3.margin_mm.unwrap() + 0.5).abs() < 1e-6);
        assert_eq!(
            l2_l3.requirement,
            "Minimum clearance: 4.00mm for 230V, 80A (worst case of: IEC 61010-1: 4.00mm, IEC 61439-1: 3.00mm)"
        );

        // PE has no geometry and there is no oracle
        for pair in pairs.iter().filter(|p| p.terminal_b == "PE") {
            assert_eq!(pair.verdict, Verdict::Inconclusive);
            assert!(pair.reason.as_deref().unwrap().contains("'PE'"));
        }
    }

    #[test]
    fn test_report_counts_and_tightest() {
        let ctx = VerificationContext::new();
        let report = analyze_clearances(&ctx, &terminal_block(), &AnalysisOptions::default()).unwrap();
        assert_eq!(report.summary.total, 10);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.inconclusive, 4);
        assert_eq!(report.summary.passed, 5);
        assert!(!report.all_passed());

        let tightest = &report.tightest_pairs()[0];
        assert_eq!((tightest.terminal_a.as_str(), tightest.terminal_b.as_str()), ("L2", "L3"));
        assert_eq!(report.inconclusive_pairs().len(), 4);

        let failing = VerificationReportBuilder::new(&report.pairs).failing_only(true).build();
        assert_eq!(failing.pairs.len(), 1);
    }

    #[test]
    fn test_idempotent_output() {
        let oracle = |a: &str, b: &str| -> Result<f64, MeasurementError> {
            if a == "P-PE" || b == "P-PE" {
                Ok(0.012)
            } else {
                Err(MeasurementError::NotFound(format!("{} / {}", a, b)))
            }
        };
        let ctx = VerificationContext::new().with_oracle(&oracle);
        let options = AnalysisOptions::default();
        let first = serde_json::to_string(&analyze(&ctx, &options).unwrap()).unwrap();
        let second = serde_json::to_string(&analyze(&ctx, &options).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sorted_by_distance() {
        let ctx = VerificationContext::new();
        let options = AnalysisOptions {
            sort_by_distance: true,
            ..AnalysisOptions::default()
        };
        let pairs = analyze(&ctx, &options).unwrap();
        assert_eq!((pairs[0].terminal_a.as_str(), pairs[0].terminal_b.as_str()), ("L2", "L3"));
        let known: Vec<f64> = pairs.iter().filter_map(|p| p.distance_mm).collect();
        assert_eq!(known.len(), 6);
        assert!(known.windows(2).all(|w| w[0] <= w[1]));
        assert!(pairs[6..].iter().all(|p| p.verdict == Verdict::Inconclusive));
    }

    #[test]
    fn test_mesh_source_supplies_missing_geometry() {
        let calls = AtomicUsize::new(0);
        let source = |part: &str| -> Result<Mesh, GeometryError> {
            calls.fetch_add(1, Ordering::SeqCst);
            match part {
                "P-PE" => Ok(cube(0.0, 0.020)),
                other => Err(GeometryError::unavailable(other)),
            }
        };
        let ctx = VerificationContext::new().with_mesh_source(&source);
        let pairs = analyze(&ctx, &AnalysisOptions::default()).unwrap();

        let l1_pe = pairs.iter().find(|p| p.terminal_a == "L1" && p.terminal_b == "PE").unwrap();
        assert_eq!(l1_pe.verdict, Verdict::Pass);
        assert!((l1_pe.distance_mm.unwrap() - 15.0).abs() < 1e-6);
        // Only PE lacks an inline mesh
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reinforced_override_tightens_requirement() {
        let ctx = VerificationContext::new();
        let basic = analyze(&ctx, &AnalysisOptions::default()).unwrap();
        let reinforced = analyze(
            &ctx,
            &AnalysisOptions {
                insulation_class_override: Some(InsulationClass::Reinforced),
                ..AnalysisOptions::default()
            },
        )
        .unwrap();
        for (b, r) in basic.iter().zip(&reinforced) {
            assert_eq!(r.insulation_class, InsulationClass::Reinforced);
            assert!(r.required_clearance_mm >= b.required_clearance_mm);
        }
    }

    #[test]
    fn test_cancellation_discards_all_pairs() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        // Cancel from inside the run, after some pairs may have completed
        let oracle = move |_: &str, _: &str| -> Result<f64, MeasurementError> {
            trigger.cancel();
            Err(MeasurementError::Timeout)
        };
        let ctx = VerificationContext::new()
            .with_oracle(&oracle)
            .with_cancellation(token.clone());
        let err = analyze(&ctx, &AnalysisOptions::default()).unwrap_err();
        assert_eq!(err, AnalysisError::Cancelled);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_concurrency_limit_bounds_oracle_calls() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let oracle = |_: &str, _: &str| -> Result<f64, MeasurementError> {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(5));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Err(MeasurementError::Timeout)
        };
        let ctx = VerificationContext::new().with_oracle(&oracle);
        let options = AnalysisOptions {
            max_concurrency: Some(2),
            ..AnalysisOptions::default()
        };
        let bounded = analyze(&ctx, &options).unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 2);

        let unbounded = analyze(&ctx, &AnalysisOptions::default()).unwrap();
        assert_eq!(bounded, unbounded);
    }
}
