//! Rank processes by bytes sent and print the heaviest talkers.
//!
//! Run with `RUST_LOG=rank_index=trace` to see index maintenance events.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rank_index::{IndexConfig, RankIndex};
use std::collections::HashMap;
use tracing_subscriber::EnvFilter;

const PROCESSES: i64 = 64;
const SAMPLES: usize = 20_000;

fn main() -> rank_index::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut rng = StdRng::seed_from_u64(2024);
    let mut index = RankIndex::with_config(IndexConfig::new().seed(1).initial_capacity(64))?;
    let mut sent: HashMap<i64, f64> = HashMap::new();

    for _ in 0..SAMPLES {
        // A few chatty processes dominate.
        let pid = if rng.gen_bool(0.3) {
            rng.gen_range(1..=4)
        } else {
            rng.gen_range(1..=PROCESSES)
        };
        let bytes = f64::from(rng.gen_range(64u32..9_000));

        match sent.get_mut(&pid) {
            Some(total) => {
                let new_total = *total + bytes;
                index.update_score(*total, pid, new_total)?;
                *total = new_total;
            }
            None => {
                index.insert(bytes, pid)?;
                sent.insert(pid, bytes);
            }
        }
    }

    println!("top talkers:");
    for (rank, e) in index.top_n(5).iter().enumerate() {
        println!("  {:>2}. pid {:>3} {:>12.0} bytes", rank + 1, e.id, e.score);
    }

    let quiet = index.collect(0.0, 1_000_000.0)?;
    println!("{} processes sent at most 1 MB", quiet.len());
    if let Some(median) = index.get_by_rank(index.len().div_ceil(2)) {
        println!("median talker: pid {} ({:.0} bytes)", median.id, median.score);
    }

    println!("{}", index.report_diagnostics());
    Ok(())
}
