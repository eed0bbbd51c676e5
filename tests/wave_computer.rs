use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::unbounded;
use wavesynth::{
    dsp::{
        oscillator::Oscillator,
        wave::{Shape, Wave},
    },
    engine::WaveComputer,
    wavetable::{spectrum::TABLE_COUNT, SpectrumFiller, SpectrumPlanner, Wavetable},
    SynthConfig,
};

const TIMEOUT: Duration = Duration::from_secs(20);

fn direct_fill(wave: &Wave, size: usize) -> Wavetable {
    let mut wavetable = Wavetable::default();
    SpectrumFiller::new(SpectrumPlanner::new())
        .fill(wave, &mut wavetable, size)
        .unwrap();
    wavetable
}

fn assert_same_tables(a: &Wavetable, b: &Wavetable) {
    assert_eq!(a.len(), b.len());
    for (key_a, key_b) in a.keys().zip(b.keys()) {
        assert_eq!(key_a, key_b);
        let (_, table_a) = a.table_for(key_a).unwrap();
        let (_, table_b) = b.table_for(key_b).unwrap();
        for (x, y) in table_a.iter().zip(table_b.iter()) {
            assert!((x - y).abs() < 1e-6);
        }
    }
}

#[test]
fn published_table_matches_direct_fill() {
    let (sender, finished) = unbounded();
    let computer = WaveComputer::new(&SynthConfig::default(), sender).unwrap();
    let wave = Wave::sawtooth().with_harmonics(&[1.0, 0.0, 0.3]);

    let generation = computer.update(wave.clone());
    assert_eq!(finished.recv_timeout(TIMEOUT).unwrap(), generation);

    let published = computer.wavetable().unwrap();
    assert_same_tables(&published, &direct_fill(&wave, 4096));
}

#[test]
fn burst_of_updates_is_coalesced() {
    let (sender, finished) = unbounded();
    let computer = WaveComputer::new(&SynthConfig::default(), sender).unwrap();

    let mut last = 0;
    for i in 1..=20 {
        let mut wave = Wave::raw(Shape::Pulse);
        wave.set_param(i as f32 / 40.0);
        last = computer.update(wave);
    }
    assert_eq!(last, 20);

    let mut published = Vec::new();
    while published.last() != Some(&last) {
        published.push(finished.recv_timeout(TIMEOUT).unwrap());
    }

    assert!(published.len() < 20, "no coalescing: {published:?}");
    assert!(published.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(computer.generation(), 20);

    let mut latest = Wave::raw(Shape::Pulse);
    latest.set_param(0.5);
    assert_same_tables(&computer.wavetable().unwrap(), &direct_fill(&latest, 4096));
}

#[test]
fn readers_never_see_partial_tables() {
    let (sender, finished) = unbounded();
    let computer = WaveComputer::new(&SynthConfig::default(), sender).unwrap();
    computer.update(Wave::sine());
    finished.recv_timeout(TIMEOUT).unwrap();

    let reader = computer.reader();
    let done = Arc::new(AtomicBool::new(false));
    let audio = {
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut osc = Oscillator::new().with_wavetable(reader.clone());
            osc.set_frequency(0.01);
            let mut block = [0.0f32; 64];
            let mut reads = 0usize;
            while !done.load(Ordering::Acquire) {
                if let Some(len) = reader.read(|table| table.len()) {
                    assert_eq!(len, TABLE_COUNT);
                    reads += 1;
                }
                osc.fill(&mut block);
                assert!(block.iter().all(|s| s.is_finite() && s.abs() <= 1.5));
            }
            reads
        })
    };

    let waves = [Wave::sawtooth(), Wave::square(), Wave::triangle()];
    for round in 0..9 {
        let generation = computer.update(waves[round % waves.len()].clone());
        while finished.recv_timeout(TIMEOUT).unwrap() < generation {}
    }
    done.store(true, Ordering::Release);

    let reads = audio.join().unwrap();
    assert!(reads > 0);
}

#[test]
fn stop_cancels_a_long_fill() {
    let config = SynthConfig::default().with_table_size(1 << 18);
    let (sender, finished) = unbounded();
    let mut computer = WaveComputer::new(&config, sender).unwrap();
    computer.update(Wave::sawtooth().with_harmonics(&[1.0; 8]));

    // Give the worker a moment to start filling
    thread::sleep(Duration::from_millis(20));
    let started = Instant::now();
    computer.stop();
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(!computer.is_running());

    // Either it finished before the stop, or nothing was published
    match finished.try_recv() {
        Ok(generation) => assert_eq!(generation, 1),
        Err(_) => assert!(computer.wavetable().is_none()),
    }
}

#[test]
fn drop_stops_the_worker() {
    let (sender, finished) = unbounded();
    {
        let computer = WaveComputer::new(&SynthConfig::default(), sender).unwrap();
        computer.update(Wave::sine());
    }
    // The listener was dropped with the worker
    let deadline = Instant::now() + TIMEOUT;
    while finished.recv_deadline(deadline).is_ok() {}
    assert!(finished.try_recv().is_err());
}
