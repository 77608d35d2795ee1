//! Basic usage examples for cardinal-trie.
//!
//! Run with `RUST_LOG=debug` (or `trace`) to see layout changes and teardown.

use cardinal_trie::{Config, SharedSet, TrieMap, TrieSet};

fn main() {
    tracing_subscriber::fmt::init();

    example_set();
    example_map();
    example_memory_limit();
    example_shared();
}

fn example_set() {
    println!("=== TrieSet (Presence) ===\n");

    let mut set = TrieSet::new();
    for k in (2..200).step_by(2) {
        set.set(k).unwrap();
    }

    // Neighbours of a missing key
    println!("first(21) = {:?}", set.first(21));
    println!("next(21)  = {:?}", set.next(21));
    println!("last(21)  = {:?}", set.last(21));
    println!("prev(21)  = {:?}", set.prev(21));
    println!("first(201) = {:?}", set.first(201));

    // Counting without scanning
    println!("count_all() = {}", set.count_all());
    println!("count_range(20, 29) = {}", set.count_range(20, 29));
    println!("by_count(50) = {:?}", set.by_count(50));

    println!("range(10..20) = {:?}", set.range(10..20).collect::<Vec<_>>());
    println!("\n{}\n", set.stats());
}

fn example_map() {
    println!("=== TrieMap (Mapped) ===\n");

    let mut map = TrieMap::new();
    for (k, v) in [(5u64, 50u64), (1, 10), (3, 30)] {
        map.insert(k, v).unwrap();
    }

    for n in 1..=3 {
        println!("by_count({n}) = {:?}", map.by_count(n));
    }
    println!("insert(3, 33) replaced {:?}", map.insert(3, 33).unwrap());
    println!("remove(1) = {:?}", map.remove(1));
    println!("map = {map:?}");
    println!("freed {} bytes\n", map.free());
}

fn example_memory_limit() {
    println!("=== Memory limit ===\n");

    let config = Config::default().with_memory_limit(16 * 1024);
    let mut set = TrieSet::with_config(config).unwrap();

    let mut key = 0x9e37_79b9_7f4a_7c15u64;
    loop {
        match set.set(key) {
            Ok(_) => key = key.rotate_left(13).wrapping_mul(0x2545_f491_4f6c_dd1d),
            Err(err) => {
                println!("stopped after {} keys: {err}", set.count_all());
                break;
            }
        }
    }
    println!("memory_used() = {} bytes\n", set.memory_used());
}

fn example_shared() {
    println!("=== SharedSet (single writer, many readers) ===\n");

    let shared = SharedSet::default();
    std::thread::scope(|s| {
        s.spawn(|| {
            for k in 0..1000 {
                shared.set(k * 7).unwrap();
            }
        });
        s.spawn(|| {
            let seen = shared.read().count_range(0, 700);
            println!("reader saw {seen} keys in [0, 700]");
        });
    });
    println!("count_all() = {}", shared.count_all());
}
