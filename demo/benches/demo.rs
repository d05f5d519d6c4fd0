use benchpress::{black_box, Bench};
use std::collections::HashSet;

fn copy_64kb(b: &mut Bench) {
    let src = vec![1u8; 64 * 1024];
    b.set_bytes(src.len() as u64);
    b.iter(|| src.clone());
}

fn hash_strings(b: &mut Bench) {
    let strings: Vec<_> = (0..1_000).map(|i| format!("key_{}", i)).collect();
    b.reset_timer();

    for _ in 0..b.n() {
        let set: HashSet<&str> = strings.iter().map(String::as_str).collect();
        black_box(&set);
    }
}

fn sort_reversed(b: &mut Bench) {
    for _ in 0..b.n() {
        b.stop_timer();
        let mut data: Vec<u32> = (0..10_000).rev().collect();
        b.start_timer();

        data.sort_unstable();
        black_box(&data);
    }
}

fn fibonacci_20(b: &mut Bench) {
    b.iter(|| fibonacci(black_box(20)));
}

fn fibonacci(n: u32) -> u64 {
    match n {
        0 => 0,
        1 => 1,
        _ => fibonacci(n - 1) + fibonacci(n - 2),
    }
}

fn parse_numbers(b: &mut Bench) -> Result<(), std::num::ParseIntError> {
    let input: Vec<String> = (0..256).map(|i| (i * 7919).to_string()).collect();
    b.reset_timer();

    for _ in 0..b.n() {
        let mut total = 0u64;
        for s in &input {
            total += s.parse::<u64>()?;
        }
        black_box(total);
    }
    Ok(())
}

benchpress::benchpress_main!(
    copy_64kb,
    hash_strings,
    sort_reversed,
    fibonacci_20,
    parse_numbers
);
