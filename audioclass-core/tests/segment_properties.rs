use audioclass_core::buffering::window_count;
use audioclass_core::{segment, AudioClassError, AudioFormat, AudioSamples};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn ramp(n: usize, format: AudioFormat) -> AudioSamples {
    AudioSamples::new((0..n).map(|i| i as f32).collect(), format).unwrap()
}

#[test]
fn window_lengths_and_concatenation_hold_for_random_sizes() {
    let mut rng = StdRng::seed_from_u64(0x5eed_a0d1);
    for _ in 0..200 {
        let n = rng.gen_range(0..5_000);
        let w = rng.gen_range(1..700);
        let audio = ramp(n, AudioFormat::default());

        let windows: Vec<_> = segment(&audio, w).unwrap().collect();
        let expected = if n == 0 { 0 } else { (n + w - 1) / w };
        assert_eq!(windows.len(), expected, "n={n} w={w}");
        assert_eq!(window_count(n, w), expected);

        let total: usize = windows.iter().map(|win| win.len()).sum();
        assert_eq!(total, n);

        if let Some((last, rest)) = windows.split_last() {
            assert!(rest.iter().all(|win| win.len() == w));
            assert!(last.len() >= 1 && last.len() <= w);
        }

        let joined: Vec<f32> = windows.iter().flat_map(|win| win.samples().iter().copied()).collect();
        assert_eq!(joined, audio.samples());
    }
}

#[test]
fn windows_are_indexed_in_offset_order() {
    let audio = ramp(10, AudioFormat::default());
    let windows: Vec<_> = segment(&audio, 4).unwrap().collect();
    let layout: Vec<_> = windows.iter().map(|w| (w.index(), w.offset(), w.len())).collect();
    assert_eq!(layout, vec![(0, 0, 4), (1, 4, 4), (2, 8, 2)]);
}

#[test]
fn exact_multiple_has_no_trailing_window() {
    let audio = ramp(12, AudioFormat::default());
    let windows = segment(&audio, 4).unwrap();
    assert_eq!(windows.len(), 3);
}

#[test]
fn zero_window_length_is_invalid() {
    let audio = ramp(12, AudioFormat::default());
    assert!(matches!(
        segment(&audio, 0),
        Err(AudioClassError::InvalidArgument(_))
    ));
}

#[test]
fn stereo_windows_stay_frame_aligned() {
    let stereo = AudioFormat::new(2, 16_000).unwrap();
    let audio = ramp(20, stereo);
    assert!(segment(&audio, 5).is_err());

    let windows: Vec<_> = segment(&audio, 6).unwrap().collect();
    assert_eq!(windows.len(), 4);
    assert_eq!(windows[3].len(), 2);
    assert!(windows.iter().all(|w| w.format() == stereo));
}
