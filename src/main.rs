//! Demonstration harness for `axiom-atomic`.
//!
//! Runs, in order:
//! 1. each fetch-and-modify primitive once on a single word,
//! 2. `AXIOM_THREADS` contexts each bumping a [`LockFreeCounter`]
//!    `AXIOM_ITERS` times,
//! 3. the same contexts incrementing a plain counter inside a [`SpinLock`],
//! 4. the same again with the racy counter, which usually comes up short.
//!
//! Log level comes from `AXIOM_LOG` (`error`, `warn`, `info`, `debug`,
//! `trace`; default `info`).

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use axiom_atomic::racy::RacyCounter;
use axiom_atomic::{
    atomic_add, atomic_and, atomic_or, atomic_swap, AtomicPrimitive, AtomicWord, AtomicWord64,
    LockFreeCounter, SpinLock,
};
use log::{error, info, Level, LevelFilter, Log, Metadata, Record};

const DEFAULT_THREADS: u32 = 4;
const DEFAULT_ITERS: u32 = 100_000;

/// Writes records to stderr, coloured by level.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!(
            "\u{1B}[{}m[{:>5}] {}\u{1B}[0m",
            level_to_color_code(record.level()),
            record.level(),
            record.args()
        );
    }

    fn flush(&self) {}
}

fn level_to_color_code(level: Level) -> u8 {
    match level {
        Level::Error => 31, // Red
        Level::Warn => 93,  // BrightYellow
        Level::Info => 34,  // Blue
        Level::Debug => 32, // Green
        Level::Trace => 90, // BrightBlack
    }
}

fn init_logging() {
    static LOGGER: StderrLogger = StderrLogger;
    let level = match env::var("AXIOM_LOG").as_deref().map(str::to_ascii_lowercase).as_deref() {
        Ok("error") => LevelFilter::Error,
        Ok("warn") => LevelFilter::Warn,
        Ok("debug") => LevelFilter::Debug,
        Ok("trace") => LevelFilter::Trace,
        Ok("off") => LevelFilter::Off,
        _ => LevelFilter::Info,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// Reads a positive integer from `name`, falling back to `default`.
fn env_count(name: &str, default: u32) -> Result<u32, String> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(0) => Err(format!("{name} must be positive")),
            Ok(n) => Ok(n),
            Err(e) => Err(format!("{name}={raw:?}: {e}")),
        },
    }
}

/// Total increments every counter should end on.
///
/// The racy counter is 32 bits wide, so a run it would wrap is refused rather
/// than reported with a bogus loss.
fn expected_total(threads: u32, iters: u32) -> Result<u64, String> {
    let total = u64::from(threads) * u64::from(iters);
    if total > u64::from(u32::MAX) {
        return Err(format!(
            "AXIOM_THREADS * AXIOM_ITERS = {total} does not fit the 32-bit racy counter"
        ));
    }
    Ok(total)
}

fn demonstrate_primitives() {
    let word = AtomicWord::new(0);

    let old = atomic_add(&word, 5);
    info!("atomic_add(5):           old={:#010x} new={:#010x}", old, word.load());
    let old = atomic_swap(&word, 100);
    info!("atomic_swap(100):        old={:#010x} new={:#010x}", old, word.load());
    let old = atomic_and(&word, 0xFF);
    info!("atomic_and(0xff):        old={:#010x} new={:#010x}", old, word.load());
    let old = atomic_or(&word, 0x8000_0000);
    info!("atomic_or(0x80000000):   old={:#010x} new={:#010x}", old, word.load());
}

/// Spawns `threads` contexts running `body` and waits for all of them.
fn run_contexts<F>(threads: u32, body: F)
where
    F: Fn() + Send + Sync + 'static,
{
    let body = Arc::new(body);
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let body = Arc::clone(&body);
            thread::spawn(move || (*body)())
        })
        .collect();
    for h in handles {
        if h.join().is_err() {
            error!("a context panicked");
        }
    }
}

fn main() -> ExitCode {
    init_logging();

    let sized = env_count("AXIOM_THREADS", DEFAULT_THREADS).and_then(|threads| {
        let iters = env_count("AXIOM_ITERS", DEFAULT_ITERS)?;
        Ok((threads, iters, expected_total(threads, iters)?))
    });
    let (threads, iters, expected) = match sized {
        Ok(sized) => sized,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    info!("{} contexts x {} iterations, expecting {}", threads, iters, expected);

    demonstrate_primitives();

    let counter = Arc::new(LockFreeCounter::from_word(AtomicWord64::new(0)));
    {
        let counter = Arc::clone(&counter);
        run_contexts(threads, move || {
            for _ in 0..iters {
                counter.increment();
            }
        });
    }
    info!("lock-free counter:   {}", counter.get());

    let locked = Arc::new(SpinLock::new(0u64));
    {
        let locked = Arc::clone(&locked);
        run_contexts(threads, move || {
            for _ in 0..iters {
                *locked.lock() += 1;
            }
        });
    }
    let locked_total = *locked.lock();
    info!("spinlock counter:    {}", locked_total);

    let racy = Arc::new(RacyCounter::new(0));
    {
        let racy = Arc::clone(&racy);
        run_contexts(threads, move || {
            for _ in 0..iters {
                racy.increment();
            }
        });
    }
    let racy_total = u64::from(racy.get());
    info!(
        "racy counter:        {} ({} updates lost)",
        racy_total,
        expected.saturating_sub(racy_total)
    );

    if counter.get() != expected || locked_total != expected {
        error!("synchronized counters disagree with {}", expected);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_total_fits_the_racy_counter() {
        assert_eq!(expected_total(4, 100_000), Ok(400_000));
        assert_eq!(expected_total(1, u32::MAX), Ok(u64::from(u32::MAX)));
        assert!(expected_total(2, u32::MAX / 2 + 1).is_err());
        assert!(expected_total(u32::MAX, u32::MAX).is_err());
    }
}
