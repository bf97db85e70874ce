use super::{engine_on, test_runtime, MockModules};
use crate::pointer_scan::PointerDestinations;
use crate::prefilter::RegionSet;
use crate::process::{ModuleInfo, ProcessId};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const READERS: usize = 8;
const TICKS: usize = 200;
const TICKERS: usize = 3;

/// Module bytes are never a multiple of the 4096-byte pointer window, so a
/// torn set shows up as a byte count that no real state could have.
fn modules() -> Vec<ModuleInfo> {
    vec![
        ModuleInfo::new("libmain.so", 0x1000, 0x200),
        ModuleInfo::new("libc.so", 0x8000, 0x330),
    ]
}

const MODULE_BYTES: u64 = 0x200 + 0x330;

fn assert_consistent(set: &RegionSet) {
    let counted = set.iter().count();
    let summed: u64 = set.iter().map(|region| region.size()).sum();
    assert_eq!(counted, set.region_count());
    assert_eq!(summed, set.byte_count());

    if set.region_count() > 0 {
        let windows = set.region_count() as u64 - 2;
        assert_eq!(set.byte_count(), MODULE_BYTES + windows * 4096);
    }
}

#[test]
fn test_readers_never_observe_torn_state() {
    let rt = test_runtime();
    let dests = Arc::new(PointerDestinations::new());
    let engine = engine_on(rt.handle().clone(), MockModules::with(modules()), dests.clone());
    engine.update(ProcessId(1));

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..READERS)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                let mut last_count = 0;
                let mut reads = 0usize;
                while !done.load(Ordering::Acquire) {
                    let snapshot = if i % 2 == 0 {
                        engine.prefiltered_snapshot()
                    } else {
                        RegionSet::clone(&engine.shared_snapshot())
                    };
                    assert_consistent(&snapshot);
                    assert!(snapshot.region_count() >= last_count);
                    last_count = snapshot.region_count();
                    reads += 1;
                }
                reads
            })
        })
        .collect();

    let mut rng = rand::rng();
    for _ in 0..TICKS {
        let batch = rng.random_range(1..16);
        for _ in 0..batch {
            dests.record(rng.random_range(0x10_0000u64..0x1000_0000) & !0x7);
        }
        engine.tick_now().unwrap();
        if rng.random_bool(0.1) {
            std::thread::sleep(Duration::from_micros(rng.random_range(0..200)));
        }
    }
    done.store(true, Ordering::Release);

    let total_reads: usize = readers.into_iter().map(|reader| reader.join().unwrap()).sum();
    assert!(total_reads > 0);

    let last = engine.prefiltered_snapshot();
    assert_consistent(&last);
    assert_eq!(last.region_count(), dests.len() + 2);
    assert_eq!(engine.progress(), last.region_count() as u64);
}

#[test]
fn test_resets_interleaved_with_ticks() {
    let rt = test_runtime();
    let dests = Arc::new(PointerDestinations::new());
    let engine = engine_on(rt.handle().clone(), MockModules::with(modules()), dests.clone());
    engine.update(ProcessId(1));

    let writer = {
        let engine = Arc::clone(&engine);
        let dests = Arc::clone(&dests);
        std::thread::spawn(move || {
            let mut rng = rand::rng();
            for _ in 0..TICKS {
                dests.record(rng.random_range(0x10_0000u64..0x1000_0000) & !0x7);
                engine.tick_now().unwrap();
            }
        })
    };

    let resetter = {
        let engine = Arc::clone(&engine);
        std::thread::spawn(move || {
            for pid in 2..50 {
                engine.update(ProcessId(pid));
                let snapshot = engine.prefiltered_snapshot();
                assert_consistent(&snapshot);
                std::thread::yield_now();
            }
        })
    };

    writer.join().unwrap();
    resetter.join().unwrap();

    engine.tick_now().unwrap();
    let last = engine.prefiltered_snapshot();
    assert_consistent(&last);
    assert_eq!(engine.target(), Some(ProcessId(49)));
}

#[test]
fn test_concurrent_tickers_only_grow() {
    let rt = test_runtime();
    let dests = Arc::new(PointerDestinations::new());
    let engine = engine_on(rt.handle().clone(), MockModules::with(modules()), dests.clone());
    engine.update(ProcessId(1));
    engine.begin_prefilter();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let engine = Arc::clone(&engine);
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            let mut last_count = 0;
            while !done.load(Ordering::Acquire) {
                let snapshot = engine.shared_snapshot();
                assert_consistent(&snapshot);
                assert!(
                    snapshot.region_count() >= last_count,
                    "region count dropped from {} to {}",
                    last_count,
                    snapshot.region_count()
                );
                last_count = snapshot.region_count();
            }
        })
    };

    let tickers: Vec<_> = (0..TICKERS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let dests = Arc::clone(&dests);
            std::thread::spawn(move || {
                let mut rng = rand::rng();
                for _ in 0..TICKS {
                    dests.record(rng.random_range(0x10_0000u64..0x1000_0000) & !0x7);
                    let report = engine.tick_now().unwrap();
                    assert!(report.region_count >= report.added);
                }
            })
        })
        .collect();

    for ticker in tickers {
        ticker.join().unwrap();
    }
    engine.stop();
    done.store(true, Ordering::Release);
    reader.join().unwrap();

    engine.tick_now().unwrap();
    let last = engine.prefiltered_snapshot();
    assert_consistent(&last);
    assert_eq!(last.region_count(), dests.len() + 2);
    assert_eq!(engine.progress(), last.region_count() as u64);
}
