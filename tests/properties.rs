use approx::assert_relative_eq;
use nalgebra::{Const, Point2, Point3, Point4};
use nurbskit::prelude::*;

fn knot_vectors() -> Vec<(usize, Vec<f64>)> {
    vec![
        (1, vec![0., 0., 0.5, 1., 1.]),
        (2, vec![0., 0., 0., 1., 2., 3., 4., 4., 4.]),
        (2, vec![0., 0., 0., 1., 1., 2., 3., 3., 3.]),
        (3, vec![0., 0., 0., 0., 0.1, 0.1, 0.1, 0.7, 1., 1., 1., 1.]),
        (3, vec![0., 1., 2., 3., 4., 5., 6., 7., 8., 9.]),
        (4, vec![-2., -2., -2., -2., -2., -1., 0.5, 3., 3., 3., 3., 3.]),
    ]
}

fn curves() -> Vec<NurbsCurve<f64, Const<4>>> {
    knot_vectors()
        .into_iter()
        .map(|(degree, knots)| {
            let count = knots.len() - degree - 1;
            let control_points = (0..count)
                .map(|i| {
                    let t = i as f64;
                    let w = 1. + 0.3 * (i % 3) as f64;
                    Point4::new(t * w, (t * 1.3).sin() * w, (t * 0.7).cos() * w, w)
                })
                .collect();
            NurbsCurve::try_new(degree, control_points, knots).unwrap()
        })
        .collect()
}

fn samples(curve: &NurbsCurve<f64, Const<4>>, count: usize) -> Vec<f64> {
    let (start, end) = curve.knots_domain();
    (0..=count)
        .map(|i| start + (end - start) * i as f64 / count as f64)
        .collect()
}

fn assert_same_curve(a: &NurbsCurve<f64, Const<4>>, b: &NurbsCurve<f64, Const<4>>, epsilon: f64) {
    for u in samples(a, 60) {
        assert_relative_eq!(
            a.point_at(u).unwrap(),
            b.point_at(u).unwrap(),
            epsilon = epsilon
        );
    }
}

#[test]
fn partition_of_unity() {
    for (degree, knots) in knot_vectors() {
        let n = knots.len() - degree - 2;
        let knots = KnotVector::new(knots);
        let (start, end) = knots.domain(degree);
        for i in 0..=50 {
            let u = start + (end - start) * i as f64 / 50.;
            let span = knots.find_span(n, degree, u).unwrap();
            let basis = knots.basis_functions(span, u, degree);
            assert_eq!(basis.len(), degree + 1);
            assert_relative_eq!(basis.iter().sum::<f64>(), 1., epsilon = 1e-12);
            assert!(basis.iter().all(|b| *b >= 0.));
        }
    }
}

#[test]
fn span_brackets_the_parameter() {
    for (degree, knots) in knot_vectors() {
        let n = knots.len() - degree - 2;
        let vector = KnotVector::new(knots.clone());
        let (start, end) = vector.domain(degree);
        for i in 0..=73 {
            let u = start + (end - start) * i as f64 / 73.;
            let span = vector.find_span(n, degree, u).unwrap();
            assert!(span >= degree && span <= n);
            if u == knots[n + 1] {
                assert_eq!(span, n);
            } else {
                assert!(knots[span] <= u && u < knots[span + 1]);
            }
        }
    }
}

#[test]
fn find_span_on_a_clamped_quadratic() {
    let knots = KnotVector::new(vec![0., 0., 0., 1., 2., 3., 4., 4., 4.]);
    assert_eq!(knots.find_span(5, 2, 0.).unwrap(), 2);
    assert_eq!(knots.find_span(5, 2, 4.).unwrap(), 5);
    assert_eq!(knots.find_span(5, 2, 2.5).unwrap(), 4);
    assert!(matches!(
        knots.find_span(5, 2, 4.5),
        Err(NurbsError::OutOfDomain { .. })
    ));
}

#[test]
fn refinement_invariance() {
    for curve in curves() {
        let (start, end) = curve.knots_domain();
        let inserted: Vec<f64> = [0.1, 0.35, 0.35, 0.8]
            .iter()
            .map(|t| start + (end - start) * t)
            .collect();
        let refined = curve.try_refine_knot(&inserted).unwrap();
        assert_same_curve(&curve, &refined, 1e-9);
    }
}

#[test]
fn elevation_invariance() {
    for curve in curves() {
        for t in 0..=2 {
            let elevated = curve.elevate_degree(t);
            assert_eq!(elevated.degree(), curve.degree() + t);
            assert_same_curve(&curve, &elevated, 1e-9);
        }
    }
}

#[test]
fn decomposition_continuity() {
    for curve in curves() {
        let segments = curve.decompose();
        let p = curve.degree();
        for segment in segments.iter() {
            assert_eq!(segment.degree(), p);
            assert_eq!(segment.control_points().len(), p + 1);
        }
        for pair in segments.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert_eq!(a.knots_domain().1, b.knots_domain().0);
            assert_relative_eq!(
                a.control_points()[p],
                b.control_points()[0],
                epsilon = 1e-10
            );
        }
        for segment in segments.iter() {
            let (start, end) = segment.knots_domain();
            for i in 0..=10 {
                let u = start + (end - start) * i as f64 / 10.;
                assert_relative_eq!(
                    segment.point_at(u).unwrap(),
                    curve.point_at(u).unwrap(),
                    epsilon = 1e-9
                );
            }
        }
    }
}

#[test]
fn removal_then_refinement_restores_the_polygon() {
    for curve in curves() {
        let (start, end) = curve.knots_domain();
        let u = start + (end - start) * 0.45;
        let refined = curve.try_refine_knot(&[u]).unwrap();
        let (removed, count) = refined.remove_knot(u, 1, 1e-9);
        assert_eq!(count, 1);
        let restored = removed.try_refine_knot(&[u]).unwrap();
        assert_eq!(restored.knots(), refined.knots());
        for (a, b) in restored
            .control_points()
            .iter()
            .zip(refined.control_points().iter())
        {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }
}

#[test]
fn reduction_of_elevated_curves() {
    for curve in curves().into_iter().filter(|c| c.degree() >= 2) {
        let (reduced, error) = curve
            .elevate_degree(1)
            .try_reduce_degree(Some(DegreeReductionOption::new(1e-7)))
            .unwrap();
        assert_eq!(reduced.degree(), curve.degree());
        assert!(error < 1e-7);
        assert_same_curve(&curve, &reduced, 1e-7);
    }
}

#[test]
fn interpolation_passes_through_points() {
    let points: Vec<Point3<f64>> = (0..9)
        .map(|i| {
            let t = i as f64 * 0.4;
            Point3::new(t.cos(), t.sin(), t * 0.1)
        })
        .collect();
    let parameters = KnotStyle::Centripetal.parameterize(&points).unwrap();
    let (knots, matrix) = interpolation_matrix(&points, &parameters, 3).unwrap();
    assert_eq!(knots.len(), points.len() + 4);
    assert_eq!(matrix.shape(), (9, 9));

    let curve = NurbsCurve3D::try_interpolate(&points, 3, KnotStyle::Centripetal).unwrap();
    assert_eq!(curve.knots(), &knots);
    for (u, p) in parameters.iter().zip(points.iter()) {
        assert_relative_eq!(curve.point_at(*u).unwrap(), *p, epsilon = 1e-9);
    }
}

#[test]
fn bezier_tools_agree_with_curves() {
    let ctrl = vec![
        Point2::new(0., 0.),
        Point2::new(1., 3.),
        Point2::new(3., -1.),
        Point2::new(4., 2.),
    ];
    let curve = NurbsCurve::try_bezier(ctrl.clone()).unwrap();
    let us = [0., 0.2, 0.5, 0.9, 1.];
    let points = bezier_points(&ctrl, &us);
    for (u, p) in us.iter().zip(points.iter()) {
        assert_relative_eq!(curve.point(*u).unwrap(), *p, epsilon = 1e-12);
        let levels = de_casteljau(&ctrl, *u);
        assert_relative_eq!(levels[3][0], *p, epsilon = 1e-12);
    }
}

#[test]
fn surface_iso_curves() {
    let grid: Vec<Vec<Point3<f64>>> = (0..3)
        .map(|r| {
            (0..3)
                .map(|c| Point3::new(r as f64, c as f64, ((r + c) % 2) as f64))
                .collect()
        })
        .collect();
    let knots = vec![0., 0., 0., 1., 1., 1.];
    let surface =
        NurbsSurface::try_new(2, 2, grid.clone(), knots.clone(), knots.clone()).unwrap();
    // the v = 0 boundary is the curve through the first control point of each row
    let boundary = NurbsCurve::try_new(
        2,
        grid.iter().map(|row| row[0]).collect(),
        knots.clone(),
    )
    .unwrap();
    for u in [0., 0.3, 0.6, 1.] {
        assert_relative_eq!(
            surface.point(u, 0.).unwrap(),
            boundary.point(u).unwrap(),
            epsilon = 1e-12
        );
    }
    let ders = surface.derivatives(&[(0.5, 0.5)], 3, 3).unwrap();
    assert_eq!(ders[3][0][0], nalgebra::Vector3::zeros());
    assert_eq!(ders[0][3][0], nalgebra::Vector3::zeros());
}
