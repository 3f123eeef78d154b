use approx::assert_relative_eq;
use chrono::prelude::*;
use orbit_speed::prelude::*;
use uom::si::velocity::meter_per_second;

/// Frames 0..20 of a simulated pass with frame 6 missing, plus recorded
/// matches for every pair within two frames of each other.
fn recording() -> (Vec<Image>, RecordedMatcher) {
    let start_time = "2024-02-19T10:00:00+00:00"
        .parse::<DateTime<Utc>>()
        .expect("valid datetime string");
    let simulation = OrbitSimulation::new(
        OrbitParams {
            frame_count: 20,
            ..Default::default()
        },
        start_time,
    )
    .unwrap();

    let frames: Vec<Image> = simulation
        .frames()
        .unwrap()
        .into_iter()
        .filter(|frame| frame.id() != 6)
        .collect();

    let mut simulated = simulation
        .matcher(
            PipelineConfig::default().ground_sample_distance(),
            MatchNoise::default(),
        )
        .unwrap();
    let mut recorded = RecordedMatcher::new();
    for (i, base) in frames.iter().enumerate() {
        for compare in frames[i.saturating_sub(2)..i].iter() {
            // Store half of the pairs the other way round.
            let pairs = simulated.match_features(base, compare).unwrap();
            match base.id() % 2 {
                0 => recorded.record(base.id(), compare.id(), pairs),
                _ => recorded.record(
                    compare.id(),
                    base.id(),
                    pairs.into_iter().map(CoordinatePair::swapped).collect(),
                ),
            }
        }
    }

    (frames, recorded)
}

#[test]
fn replays_longest_group() {
    let (frames, recorded) = recording();
    let mut camera = ReplayCamera::new(frames, 6, GroupSelection::Index(1)).unwrap();
    assert_eq!(camera.remaining(), 13);

    let mut pipeline = SpeedPipeline::new(PipelineConfig::default(), recorded).unwrap();
    let mut reports = Vec::new();
    loop {
        match camera.capture() {
            Ok(image) => reports.extend(pipeline.ingest(image)),
            Err(CaptureError::Exhausted) => break,
            Err(err) => panic!("unexpected capture error: {err}"),
        }
    }

    assert_eq!(reports.len(), 12);
    assert_eq!(reports[0].image, 8);
    assert_eq!(reports[0].pairs.len(), 1);
    assert!(reports[1..].iter().all(|report| report.pairs.len() == 2));

    // Every pair was recorded in one direction or the other.
    assert!(reports
        .iter()
        .flat_map(|report| &report.pairs)
        .all(|pair| pair.matches.is_ok() && pair.geotag.is_ok()));

    let estimate = reports.last().unwrap().estimate.as_ref().unwrap();
    assert_relative_eq!(
        estimate.speed().get::<meter_per_second>(),
        7660.0,
        max_relative = 0.01
    );
    insta::assert_snapshot!(estimate.to_string(), @"7.6600 km/s");
}

#[test]
fn short_groups_are_skipped() {
    let (frames, _) = recording();
    assert!(matches!(
        ReplayCamera::new(frames, 14, GroupSelection::Index(0)),
        Err(CaptureError::NoUsableGroup { min_group_size: 14 })
    ));
}
