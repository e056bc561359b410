//! # CV → OSC host simulation
//! Stands in for the host module that owns an `OscSender`.
//!
//! - **Tick thread:** max OS priority, optionally pinned to a core, wakes at a
//!   fixed rate (SpinSleeper), samples a slow LFO as the "CV" input and pushes one
//!   bundle per tick with `try_send` (never blocks, drops on backpressure).
//! - **Control path:** stdin lines are endpoint strings (`127.0.0.1:7500`), as a
//!   user would type them into the module's text field. `stats` prints counters,
//!   `clear` unsets the endpoint, `q` quits.
//!
//! Usage: `cv_to_osc [address:port] [osc_address] [rate_hz] [core_id]`

use osc_sender::{Bundle, Message, OscSender, SenderConfig};

use log::{error, info, warn};
use spin_sleep::{SpinSleeper, SpinStrategy};
use std::{
    env,
    io::{stdin, stdout, BufRead, Write},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant, SystemTime},
};
use thread_priority::{ThreadBuilderExt, ThreadPriority};

const DEFAULT_OSC_ADDRESS: &str = "/cv1";
const SPEED_ADDRESS: &str = "/u_speed";
const SPEED_VALUE: f32 = 0.2;
const DEFAULT_RATE_HZ: f64 = 1000.0;
const LFO_HZ: f64 = 0.25;

struct TickSettings {
    osc_address: String,
    rate_hz: f64,
    core: Option<usize>,
}

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();

    let settings = TickSettings {
        osc_address: args
            .get(1)
            .cloned()
            .unwrap_or_else(|| DEFAULT_OSC_ADDRESS.to_string()),
        rate_hz: args
            .get(2)
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|hz| *hz > 0.0)
            .unwrap_or(DEFAULT_RATE_HZ),
        core: args.get(3).and_then(|s| s.parse::<usize>().ok()),
    };

    let sender = Arc::new(OscSender::new(SenderConfig::from_env()));
    if let Some(endpoint) = args.first() {
        if let Err(e) = sender.set_endpoint_str(endpoint) {
            println!("Endpoint {:?} rejected: {}", endpoint, e);
        }
    }
    if let Err(e) = sender.start() {
        error!("[Main] could not start sender: {}", e);
        return;
    }

    info!(
        "[Main] ticking {} at {} Hz, endpoint {:?}",
        settings.osc_address,
        settings.rate_hz,
        sender.endpoint()
    );

    let running = Arc::new(AtomicBool::new(true));
    let rt_drops = Arc::new(AtomicU64::new(0));
    let tick = match spawn_tick_thread(settings, sender.clone(), running.clone(), rt_drops.clone()) {
        Ok(handle) => handle,
        Err(e) => {
            error!("[Main] could not spawn tick thread: {}", e);
            sender.stop();
            return;
        }
    };

    control_loop(&sender);

    running.store(false, Ordering::Release);
    if tick.join().is_err() {
        error!("[Main] tick thread panicked");
    }
    sender.stop();

    println!(
        "Done. {}, tick-side drops: {}",
        stats_json(&sender),
        rt_drops.load(Ordering::Relaxed)
    );
}

fn stats_json(sender: &OscSender) -> String {
    serde_json::to_string(&sender.stats()).unwrap_or_else(|e| format!("<stats unavailable: {}>", e))
}

fn control_loop(sender: &OscSender) {
    println!("Type an endpoint (address:port), 'clear', 'stats' or 'q'.");
    let stdin = stdin();
    loop {
        print!("> ");
        let _ = stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return,
            Ok(_) => {}
            Err(e) => {
                warn!("[Main] stdin: {}", e);
                return;
            }
        }

        match line.trim() {
            "q" | "quit" | "exit" => return,
            "" => {}
            "stats" => println!("{} (queued: {})", stats_json(sender), sender.queue_len()),
            "clear" => sender.clear_endpoint(),
            endpoint => match sender.set_endpoint_str(endpoint) {
                Ok(addr) => println!("Sending to {}", addr),
                Err(e) => println!("Invalid endpoint ({}); sending paused", e),
            },
        }
    }
}

/// Spawns the periodic producer, standing in for the host's audio callback.
fn spawn_tick_thread(
    settings: TickSettings,
    sender: Arc<OscSender>,
    running: Arc<AtomicBool>,
    drops: Arc<AtomicU64>,
) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("rt-tick".to_string())
        .spawn_with_priority(ThreadPriority::Max, move |priority| {
            if let Err(e) = priority {
                warn!("[Tick] running without elevated priority: {:?}", e);
            }
            if let Some(core) = settings.core {
                pin_to_core(core);
            }

            let period = Duration::from_secs_f64(1.0 / settings.rate_hz);
            let sleeper = SpinSleeper::new(100_000).with_spin_strategy(SpinStrategy::YieldThread);
            let started = Instant::now();
            let mut next_deadline = started + period;

            while running.load(Ordering::Acquire) {
                let now = Instant::now();
                if now < next_deadline {
                    sleeper.sleep(next_deadline - now);
                }
                next_deadline += period;

                let t = started.elapsed().as_secs_f64();
                let cv = sample_cv(t);

                let bundle = Bundle::with_capacity(SystemTime::now(), 2)
                    .message(Message::new(settings.osc_address.as_str()).arg(cv))
                    .message(Message::new(SPEED_ADDRESS).arg(SPEED_VALUE));

                if !sender.try_send(bundle) {
                    drops.fetch_add(1, Ordering::Relaxed);
                }
            }
        })
}

/// Normalised 0..1 control voltage (0–12 V input range).
fn sample_cv(t: f64) -> f32 {
    let volts = 6.0 + 6.0 * (std::f64::consts::TAU * LFO_HZ * t).sin();
    (volts.clamp(0.0, 12.0) / 12.0) as f32
}

fn pin_to_core(core: usize) {
    let core_ids = core_affinity::get_core_ids().unwrap_or_default();
    match core_ids.get(core) {
        Some(core_id) if core_affinity::set_for_current(*core_id) => {
            info!("[Tick] pinned to core {}", core)
        }
        Some(_) => error!("[Tick] failed to pin to core {}", core),
        None => error!("[Tick] core {} not found among available cores", core),
    }
}
