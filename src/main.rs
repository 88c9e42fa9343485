//! Subdomain finder CLI
//!
//! Usage:
//!   subprobe example.com                              # wordlist.txt, 500 threads
//!   subprobe -w /path/to/wordlist -t 500 -V google.com # print hits as they come
//!   subprobe -r 10 --keep-going example.com           # progress every 10s

use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::warn;

use subprobe::{load_words, telemetry, Config, HttpProber, ProbePool, RunReport, WordSource};

fn main() {
    telemetry::init_logging();
    let config = Config::parse();

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        process::exit(1);
    }

    let words = match load_words(&config.wordlist) {
        Ok(words) => words,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let prober = match HttpProber::new(config.probe_timeout()) {
        Ok(prober) => prober,
        Err(e) => {
            eprintln!("Error: cannot build HTTP client: {}", e);
            process::exit(1);
        }
    };

    let pool = match ProbePool::start(
        config.pool_settings(),
        Arc::new(WordSource::new(words)),
        Arc::new(prober),
    ) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // Ctrl-C stops handing out words; in-flight probes still finish.
    ctrlc_handler(pool.words().clone());

    if let Some(interval) = config.report_every() {
        while !pool.wait(interval) {
            print_progress(&pool);
        }
    }

    let report = pool.join();
    print_report(&report);
}

fn print_report(report: &RunReport) {
    println!("Subdomains found -");
    for url in report.urls() {
        println!("{}", url);
    }
    println!("Total subdomains found: {}", report.count());
    println!("Time taken - {} seconds", report.elapsed_secs_rounded());

    if !report.failures.is_empty() {
        eprintln!();
        eprintln!("Warning: {} worker(s) stopped early:", report.failures.len());
        for failure in &report.failures {
            eprintln!("  {}", failure);
        }
    }
}

fn print_progress(pool: &ProbePool) {
    let claimed = pool.words().claimed();
    let total = pool
        .words()
        .len_hint()
        .map(|n| format_number(n as u64))
        .unwrap_or_else(|| "?".into());

    eprintln!(
        "[{:>4}s] Probed {}/{} words, {} found ({}/s)",
        pool.elapsed().as_secs(),
        format_number(claimed),
        total,
        pool.total_discoveries(),
        format_number(pool.probes_per_second() as u64)
    );
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

fn ctrlc_handler(words: Arc<WordSource>) {
    let result = ctrlc::set_handler(move || {
        eprintln!("\nStopping: waiting for in-flight probes...");
        words.close();
    });

    if let Err(e) = result {
        warn!(error = %e, "cannot install Ctrl-C handler");
    }
}
