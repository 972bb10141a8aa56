//! Integration tests for the single and combined readers
//!
//! All tests run against scripted engines: planted codes are anchored to
//! marker pixels, so what an engine "detects" is an honest function of the
//! pixel buffer it is handed — the rotated rescan pass sees rotated pixels
//! and therefore different detections.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use duomatrix::synthetic::{PlantedCode, ScanStep, ScriptedEngine, square_quad};
use duomatrix::{
    CodePosition, CodeReader, CombinedReader, ImageView, NativeOrigin, Point, ReaderError,
    SingleBackendReader, matcher,
};

const WIDTH: usize = 200;
const HEIGHT: usize = 120;

fn blank_canvas() -> Vec<u8> {
    vec![255u8; WIDTH * HEIGHT]
}

fn paint(canvas: &mut [u8], x: usize, y: usize, marker: u8) {
    canvas[y * WIDTH + x] = marker;
}

/// Paint a marker so the code is only discoverable in the rotated pass.
fn paint_reflected(canvas: &mut [u8], x: usize, y: usize, marker: u8) {
    paint(canvas, WIDTH - 1 - x, HEIGHT - 1 - y, marker);
}

fn planted(text: &str, x: u32, y: u32, marker: u8) -> PlantedCode {
    PlantedCode::new(text, square_quad(f64::from(x), f64::from(y), 10.0)).anchored(marker)
}

fn texts(results: &[duomatrix::DecodeResult]) -> BTreeSet<Vec<u8>> {
    results.iter().map(|r| r.text.clone()).collect()
}

#[test]
fn combined_decodes_two_planted_codes() {
    let mut canvas = blank_canvas();
    paint(&mut canvas, 20, 20, 1);
    paint(&mut canvas, 120, 60, 2);
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    let accurate = ScriptedEngine::new(vec![
        ScanStep::Code(planted("ABC123", 20, 20, 1)),
        ScanStep::Code(planted("XYZ789", 120, 60, 2)),
    ]);
    let fast = ScriptedEngine::new(vec![
        ScanStep::Code(planted("ABC123", 20, 20, 1)),
        ScanStep::Code(planted("XYZ789", 120, 60, 2)),
    ])
    .without_deadline();

    let mut reader = CombinedReader::new(accurate, fast);
    reader.set_max_codes(2);
    let results = reader.decode(&image).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(
        texts(&results),
        BTreeSet::from([b"ABC123".to_vec(), b"XYZ789".to_vec()])
    );
    for result in &results {
        assert!(!result.position.is_degenerate());
        assert!(result.position.is_within(WIDTH, HEIGHT));
    }
}

#[test]
fn combined_output_has_no_duplicate_positions() {
    let mut canvas = blank_canvas();
    paint(&mut canvas, 50, 40, 3);
    paint(&mut canvas, 52, 41, 4);
    paint(&mut canvas, 150, 80, 5);
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    // Both backends see the code near (50, 40) with slightly different
    // corners; the fast backend also sees one more.
    let accurate = ScriptedEngine::new(vec![ScanStep::Code(planted("DUP", 50, 40, 3))]);
    let fast = ScriptedEngine::new(vec![
        ScanStep::Code(planted("DUP", 52, 41, 4)),
        ScanStep::Code(planted("SOLO", 150, 80, 5)),
    ])
    .without_deadline();

    let reader = CombinedReader::new(accurate, fast);
    let results = reader.decode(&image).unwrap();

    assert_eq!(results.len(), 2);
    for (i, a) in results.iter().enumerate() {
        for b in &results[i + 1..] {
            assert!(
                !matcher::is_duplicate(&a.position, &b.position),
                "entries at {:?} and {:?} are duplicates",
                a.position,
                b.position
            );
        }
    }
}

#[test]
fn arbitration_resolves_text_conflict_in_accurate_backends_favor() {
    let mut canvas = blank_canvas();
    paint(&mut canvas, 60, 30, 6);
    paint(&mut canvas, 61, 31, 7);
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    let accurate = ScriptedEngine::new(vec![ScanStep::Code(planted("RIGHT", 60, 30, 6))]);
    let fast = ScriptedEngine::new(vec![ScanStep::Code(planted("WRONG", 61, 31, 7))])
        .without_deadline();

    let reader = CombinedReader::new(accurate, fast);
    assert!(reader.double_check(), "double-check defaults to on");
    let results = reader.decode(&image).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, b"RIGHT");
}

#[test]
fn double_check_disabled_keeps_first_result_at_a_position() {
    let mut canvas = blank_canvas();
    paint(&mut canvas, 60, 30, 6);
    paint(&mut canvas, 61, 31, 7);
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    // The accurate backend is slowed so the fast batch lands first.
    let accurate =
        ScriptedEngine::new(vec![ScanStep::Code(planted("RIGHT", 60, 30, 6).with_effort(50))]);
    let fast = ScriptedEngine::new(vec![ScanStep::Code(planted("WRONG", 61, 31, 7))])
        .without_deadline();

    let mut reader = CombinedReader::new(accurate, fast);
    reader.set_double_check(false);
    let results = reader.decode(&image).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, b"WRONG");
}

#[test]
fn rotated_pass_maps_positions_back_by_point_reflection() {
    let mut canvas = blank_canvas();
    // Only discoverable in the rotated pass.
    paint_reflected(&mut canvas, 30, 20, 8);
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    let accurate = ScriptedEngine::new(vec![ScanStep::Code(planted("ROT", 30, 20, 8))]);
    let fast = ScriptedEngine::new(vec![]).without_deadline();

    let reader = CombinedReader::new(accurate, fast);
    let results = reader.decode(&image).unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, b"ROT");

    let w = WIDTH as u32;
    let h = HEIGHT as u32;
    let expected = CodePosition::new(
        Point::new(w - 1 - 30, h - 1 - 20),
        Point::new(w - 1 - 40, h - 1 - 20),
        Point::new(w - 1 - 30, h - 1 - 30),
        Point::new(w - 1 - 40, h - 1 - 30),
    );
    assert_eq!(results[0].position, expected);
}

#[test]
fn max_codes_bounds_the_combined_result_set() {
    let mut canvas = blank_canvas();
    for (i, x) in [20usize, 60, 100, 140].into_iter().enumerate() {
        paint(&mut canvas, x, 50, 10 + i as u8);
    }
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    let accurate = ScriptedEngine::new(vec![
        ScanStep::Code(planted("ONE", 20, 50, 10)),
        ScanStep::Code(planted("TWO", 60, 50, 11)),
        ScanStep::Code(planted("THREE", 100, 50, 12)),
        ScanStep::Code(planted("FOUR", 140, 50, 13)),
    ]);
    let fast = ScriptedEngine::new(vec![]).without_deadline();

    let mut reader = CombinedReader::new(accurate, fast);
    reader.set_max_codes(2);
    let results = reader.decode(&image).unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn unbounded_timeout_never_yields_fewer_codes() {
    let canvas = blank_canvas();
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    let script = || {
        vec![
            ScanStep::Code(PlantedCode::new("EASY1", square_quad(10.0, 10.0, 10.0))),
            ScanStep::Code(PlantedCode::new("HARD", square_quad(60.0, 10.0, 10.0)).with_effort(200)),
            ScanStep::Code(PlantedCode::new("EASY2", square_quad(110.0, 10.0, 10.0))),
        ]
    };

    let mut bounded = SingleBackendReader::new(ScriptedEngine::new(script()));
    bounded.set_timeout(50).unwrap();
    let bounded_results = bounded.decode(&image).unwrap();

    let mut unbounded = SingleBackendReader::new(ScriptedEngine::new(script()));
    unbounded.set_timeout(0).unwrap();
    let unbounded_results = unbounded.decode(&image).unwrap();

    // The hard code exceeds the 50 ms attempt budget and ends the bounded
    // scan; an unbounded scan recovers everything.
    assert_eq!(bounded_results.len(), 1);
    assert_eq!(unbounded_results.len(), 3);
    assert!(unbounded_results.len() >= bounded_results.len());
}

#[test]
fn every_detection_attempt_gets_a_fresh_deadline() {
    let canvas = blank_canvas();
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    // Three 40 ms detections under a 60 ms timeout: only a per-attempt
    // budget lets all three finish.
    let reader = {
        let mut r = SingleBackendReader::new(ScriptedEngine::new(vec![
            ScanStep::Code(PlantedCode::new("A", square_quad(10.0, 10.0, 10.0)).with_effort(40)),
            ScanStep::Code(PlantedCode::new("B", square_quad(60.0, 10.0, 10.0)).with_effort(40)),
            ScanStep::Code(PlantedCode::new("C", square_quad(110.0, 10.0, 10.0)).with_effort(40)),
        ]));
        r.set_timeout(60).unwrap();
        r
    };
    let results = reader.decode(&image).unwrap();
    assert_eq!(results.len(), 3);
}

#[test]
fn abandoned_stream_releases_its_context() {
    let canvas = blank_canvas();
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    let reader = SingleBackendReader::new(ScriptedEngine::new(vec![
        ScanStep::Code(PlantedCode::new("A", square_quad(10.0, 10.0, 10.0))),
        ScanStep::Code(PlantedCode::new("B", square_quad(60.0, 10.0, 10.0))),
        ScanStep::Code(PlantedCode::new("C", square_quad(110.0, 10.0, 10.0))),
    ]));

    let mut stream = reader.decode_stream(image).unwrap();
    assert_eq!(reader.engine().live_contexts(), 1);
    assert!(stream.next().is_some());

    // Abandon the stream with two codes still undelivered.
    drop(stream);
    assert_eq!(reader.engine().live_contexts(), 0);
}

#[test]
fn stream_current_tracks_the_last_yielded_result() {
    let canvas = blank_canvas();
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    let reader = SingleBackendReader::new(ScriptedEngine::new(vec![ScanStep::Code(
        PlantedCode::new("ONLY", square_quad(10.0, 10.0, 10.0)),
    )]));

    let mut stream = reader.decode_stream(image).unwrap();
    assert!(stream.current().is_none());
    let first = stream.next().unwrap();
    assert_eq!(stream.current(), Some(&first));
    assert!(stream.next().is_none());
}

#[test]
fn null_region_with_success_cause_does_not_end_the_scan() {
    let canvas = blank_canvas();
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    let reader = SingleBackendReader::new(ScriptedEngine::new(vec![
        ScanStep::NullSuccess,
        ScanStep::NullSuccess,
        ScanStep::Code(PlantedCode::new("LATE", square_quad(10.0, 10.0, 10.0))),
    ]));
    let results = reader.decode(&image).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, b"LATE");
}

#[test]
fn unreadable_regions_are_skipped_and_uncounted() {
    let canvas = blank_canvas();
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    let mut reader = SingleBackendReader::new(ScriptedEngine::new(vec![
        ScanStep::Unreadable(square_quad(5.0, 5.0, 10.0)),
        ScanStep::Code(PlantedCode::new("A", square_quad(40.0, 10.0, 10.0))),
        ScanStep::Code(PlantedCode::new("B", square_quad(90.0, 10.0, 10.0))),
    ]));
    reader.set_max_codes(2);
    let results = reader.decode(&image).unwrap();
    assert_eq!(texts(&results), BTreeSet::from([b"A".to_vec(), b"B".to_vec()]));
}

#[test]
fn bottom_left_origin_engines_get_a_vertical_flip() {
    let canvas = blank_canvas();
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    let reader = SingleBackendReader::new(
        ScriptedEngine::new(vec![ScanStep::Code(PlantedCode::new(
            "FLIP",
            square_quad(5.0, 10.0, 4.0),
        ))])
        .with_origin(NativeOrigin::BottomLeft),
    );
    let results = reader.decode(&image).unwrap();
    let h = HEIGHT as u32;
    assert_eq!(results[0].position.top_left, Point::new(5, h - 1 - 10));
    assert_eq!(results[0].position.bottom_left, Point::new(5, h - 1 - 14));
}

#[test]
fn unsupported_capabilities_fail_explicitly() {
    let mut fast_only =
        SingleBackendReader::new(ScriptedEngine::new(vec![]).without_deadline());
    assert!(!fast_only.is_timeout_supported());
    assert_eq!(
        fast_only.set_timeout(100),
        Err(ReaderError::Unsupported("set_timeout"))
    );

    let canvas = blank_canvas();
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();
    let mut combined = CombinedReader::new(
        ScriptedEngine::new(vec![]),
        ScriptedEngine::new(vec![]).without_deadline(),
    );

    assert!(!combined.is_callback_supported());
    assert!(!combined.is_streaming_supported());
    assert!(matches!(
        combined.decode_with_callback(&image, Arc::new(|_| {})),
        Err(ReaderError::Unsupported("decode_with_callback"))
    ));
    assert!(matches!(
        combined.decode_stream(image),
        Err(ReaderError::Unsupported("decode_stream"))
    ));

    // The timeout capability is present: the accurate constituent honors it.
    assert!(combined.is_timeout_supported());
    combined.set_timeout(100).unwrap();
    assert_eq!(combined.timeout_ms(), 100);
}

#[test]
fn context_rejection_is_fatal_for_the_call() {
    let canvas = blank_canvas();
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    let reader =
        SingleBackendReader::new(ScriptedEngine::new(vec![]).rejecting("unsupported layout"));
    assert!(matches!(
        reader.decode(&image),
        Err(ReaderError::Engine(_))
    ));

    let combined = CombinedReader::new(
        ScriptedEngine::new(vec![]).rejecting("unsupported layout"),
        ScriptedEngine::new(vec![]).without_deadline(),
    );
    assert!(matches!(
        combined.decode(&image),
        Err(ReaderError::Engine(_))
    ));
}

#[test]
fn callbacks_receive_every_result() {
    let canvas = blank_canvas();
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    let reader = SingleBackendReader::new(ScriptedEngine::new(vec![
        ScanStep::Code(PlantedCode::new("CB1", square_quad(10.0, 10.0, 10.0))),
        ScanStep::Code(PlantedCode::new("CB2", square_quad(60.0, 10.0, 10.0))),
    ]));
    assert!(reader.is_callback_supported());

    let (sender, receiver) = mpsc::channel();
    let results = reader
        .decode_with_callback(&image, Arc::new(move |r| sender.send(r.text).unwrap()))
        .unwrap();
    assert_eq!(results.len(), 2);

    let mut delivered = BTreeSet::new();
    for _ in 0..2 {
        delivered.insert(receiver.recv_timeout(Duration::from_secs(5)).unwrap());
    }
    assert_eq!(
        delivered,
        BTreeSet::from([b"CB1".to_vec(), b"CB2".to_vec()])
    );
}

#[test]
fn panicking_callback_does_not_reach_the_caller() {
    let canvas = blank_canvas();
    let image = ImageView::new(WIDTH, HEIGHT, &canvas).unwrap();

    let reader = SingleBackendReader::new(ScriptedEngine::new(vec![ScanStep::Code(
        PlantedCode::new("BOOM", square_quad(10.0, 10.0, 10.0)),
    )]));

    let (sender, receiver) = mpsc::channel();
    let results = reader
        .decode_with_callback(
            &image,
            Arc::new(move |r| {
                sender.send(r.text).unwrap();
                panic!("callback failure");
            }),
        )
        .unwrap();

    assert_eq!(results.len(), 1);
    // The dispatch task ran (and panicked) without crashing the decode.
    assert_eq!(
        receiver.recv_timeout(Duration::from_secs(5)).unwrap(),
        b"BOOM".to_vec()
    );
}
