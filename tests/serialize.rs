#![cfg(feature = "serde")]

use nurbskit::prelude::KnotVector;

#[test]
fn knot_vector_round_trip() {
    let knots = KnotVector::new(vec![0., 0., 0., 0.25, 0.5, 1., 1., 1.]);
    let json = serde_json::to_string(&knots).unwrap();
    assert_eq!(json, "[0.0,0.0,0.0,0.25,0.5,1.0,1.0,1.0]");
    let restored: KnotVector<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, knots);
}
