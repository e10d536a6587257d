use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use uuid_shouter::{BatchFormat, Config, FlushTrigger, Shouter, Tier};

use crate::types::{ids_in, CountingSink, MemorySink, SequentialSource};

fn shouter(tiers: Vec<Tier>, format: BatchFormat, out: Arc<MemorySink>) -> Shouter {
    let config = Config::builder()
        .tiers(tiers)
        .format(format)
        .bursts(false)
        .echo(false)
        .build();

    Shouter::builder()
        .config(config)
        .source(Arc::new(SequentialSource::default()))
        .out(out)
        .build()
        .unwrap()
}

#[test]
fn labelled_batches_name_their_tier() {
    let out = Arc::new(MemorySink::default());
    let shouter = shouter(
        vec![Tier::new(2, "small"), Tier::new(10, "large")],
        BatchFormat::Labelled,
        out.clone(),
    );

    shouter.step(0).unwrap();
    shouter.step(0).unwrap();
    shouter.step(0).unwrap();
    shouter.flush_all(FlushTrigger::Periodic).unwrap();

    let lines = out.lines();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("small\n"));
    // The periodic flush writes tiers in order: "small" holds one, "large" holds three.
    assert!(lines[1].starts_with("small\n"));
    assert!(lines[2].starts_with("large\n"));
    assert_eq!(ids_in(lines[2].trim_start_matches("large\n").as_bytes()).len(), 3);
}

#[test]
fn periodic_flush_ignores_fullness() {
    let out = Arc::new(MemorySink::default());
    let shouter = shouter(vec![Tier::new(1000, "thousand")], BatchFormat::RunOn, out.clone());

    shouter.step(0).unwrap();
    assert_eq!(shouter.flush_all(FlushTrigger::Periodic).unwrap(), 1);
    assert_eq!(shouter.flush_all(FlushTrigger::Periodic).unwrap(), 0);

    // Empty batches are skipped.
    assert_eq!(out.writes().len(), 1);
}

/// Given several threads generating and one thread ticking
/// When they all run concurrently
/// Then every tier writes every identifier exactly once
#[test]
fn concurrent_generation_and_ticks_write_each_id_once_per_tier() {
    let out = Arc::new(MemorySink::default());
    let shouter = shouter(
        vec![Tier::new(7, "seven"), Tier::new(64, "sixty-four")],
        BatchFormat::Labelled,
        out.clone(),
    );
    let workers = 4;
    let steps = 2_000;

    let done = AtomicBool::new(false);
    thread::scope(|s| {
        let generators: Vec<_> = (0..workers)
            .map(|worker| {
                let shouter = shouter.clone();
                s.spawn(move || {
                    for _ in 0..steps {
                        shouter.step(worker).unwrap();
                    }
                })
            })
            .collect();

        s.spawn(|| {
            while !done.load(Ordering::Acquire) {
                shouter.tick().unwrap();
                thread::yield_now();
            }
        });

        for generator in generators {
            generator.join().unwrap();
        }
        done.store(true, Ordering::Release);
    });
    shouter.finish().unwrap();

    let mut seen: HashMap<String, HashMap<String, usize>> = HashMap::new();
    for line in out.lines() {
        let (label, blob) = line.split_once('\n').unwrap();
        let tier = seen.entry(label.to_string()).or_default();
        for id in ids_in(blob.as_bytes()) {
            *tier.entry(id).or_default() += 1;
        }
    }

    assert_eq!(seen.len(), 2);
    for (label, ids) in seen {
        assert_eq!(ids.len(), workers * steps, "tier {label} lost identifiers");
        assert!(
            ids.values().all(|count| *count == 1),
            "tier {label} wrote an identifier twice"
        );
    }
}

#[test]
fn full_flushes_never_exceed_capacity() {
    let out = Arc::new(CountingSink::default());
    let config = Config::builder()
        .tiers(vec![Tier::new(5, "five")])
        .bursts(false)
        .echo(false)
        .build();
    let shouter = Shouter::builder()
        .config(config)
        .source(Arc::new(SequentialSource::default()))
        .out(out.clone())
        .build()
        .unwrap();

    for _ in 0..23 {
        shouter.step(0).unwrap();
        assert!(shouter.tiers()[0].len() < 5);
    }

    assert_eq!(out.writes(), 4);
    assert_eq!(out.ids(), 20);
    assert_eq!(shouter.tiers()[0].len(), 3);
}
