use chrono::{Duration as ChronoDuration, Utc};
use colored::*;
use governor::{Quota, RateLimiter};
use hdrhistogram::Histogram;
use reqwest::Client;
use serde_json::json;
use std::env;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use uuid::Uuid;

const DURATION_SECS: u64 = 20;

enum Method {
    Get,
    Post,
}

struct Target {
    name: &'static str,
    method: Method,
    url: String,
    body: Option<serde_json::Value>,
}

#[tokio::main]
async fn main() {
    let base_url = env::var("BENCH_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    println!("{}", "Starting karaoke booking benchmark".bold().green());
    println!("Target URL: {}", base_url);

    let client = Client::builder()
        .pool_max_idle_per_host(1000)
        .timeout(Duration::from_secs(10))
        .build()
        .expect("Failed to build HTTP client");

    if client.get(format!("{}/health", base_url)).send().await.is_err() {
        eprintln!("{}", format!("Server is NOT reachable at {}. Please start it first.", base_url).red().bold());
        return;
    }

    // Two weeks out keeps every probe clear of the notice window.
    let probe_date = (Utc::now() + ChronoDuration::days(14)).date_naive().to_string();
    let probe_email = format!("bench-{}@example.com", Uuid::new_v4());

    let targets = vec![
        Target {
            name: "Health Check",
            method: Method::Get,
            url: format!("{}/health", base_url),
            body: None,
        },
        Target {
            name: "Room Availability (Public Read)",
            method: Method::Post,
            url: format!("{}/api/v1/availability", base_url),
            body: Some(json!({
                "date": probe_date,
                "startTime": "20:00",
                "duration": 2
            })),
        },
        Target {
            name: "Booking Lookup (Indexed Read)",
            method: Method::Post,
            url: format!("{}/api/v1/bookings/lookup", base_url),
            body: Some(json!({ "email": probe_email })),
        },
    ];

    let rps_stages = [10, 50, 200, 1000];

    for target in targets {
        println!("\n{}", "=".repeat(60));
        println!("Benchmarking Endpoint: {}", target.name.cyan().bold());
        println!("URL: {}", target.url);
        println!("{}", "=".repeat(60));

        println!("{:<10} | {:<15} | {:<15} | {:<15}", "RPS", "Mean (ms)", "P99 (ms)", "Success Rate");
        println!("{:-<10}-+-{:-<15}-+-{:-<15}-+-{:-<15}", "", "", "", "");

        for &rps in &rps_stages {
            run_stage(&client, &target, rps).await;
        }
    }
}

async fn run_stage(client: &Client, target: &Target, rps: u32) {
    let Some(per_second) = NonZeroU32::new(rps) else {
        return;
    };
    let limiter = Arc::new(RateLimiter::direct(Quota::per_second(per_second)));

    let (tx, mut rx) = mpsc::channel(50000);
    let started = Instant::now();
    let duration = Duration::from_secs(DURATION_SECS);

    while started.elapsed() <= duration {
        if limiter.check().is_err() {
            tokio::task::yield_now().await;
            continue;
        }

        let request = match target.method {
            Method::Get => client.get(&target.url),
            Method::Post => match &target.body {
                Some(body) => client.post(&target.url).json(body),
                None => client.post(&target.url),
            },
        };
        let tx = tx.clone();

        tokio::spawn(async move {
            let req_start = Instant::now();
            let success = matches!(request.send().await, Ok(r) if r.status().is_success());
            let _ = tx.send((req_start.elapsed(), success)).await;
        });
    }

    drop(tx);

    let mut histogram = Histogram::<u64>::new(3).expect("valid histogram precision");
    let mut successes = 0u64;
    let mut total = 0u64;

    while let Some((latency, success)) = rx.recv().await {
        total += 1;
        if success {
            successes += 1;
        }
        let _ = histogram.record(latency.as_micros() as u64);
    }

    let mean_ms = histogram.mean() / 1000.0;
    let p99_ms = histogram.value_at_quantile(0.99) as f64 / 1000.0;
    let success_rate = if total > 0 { (successes as f64 / total as f64) * 100.0 } else { 0.0 };

    let rate = format!("{:.1}%", success_rate);
    let rate = if success_rate < 99.0 { rate.red() } else { rate.green() };
    println!("{:<10} | {:<15.2} | {:<15.2} | {:<15}", rps, mean_ms, p99_ms, rate);

    tokio::time::sleep(Duration::from_millis(500)).await;
}
