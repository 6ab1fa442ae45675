use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Builder, Int64Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

/// Write a synthetic units table with Poisson spike trains.
#[derive(Parser, Debug)]
#[command(name = "generate_sample", long_about = None)]
struct Args {
    /// Number of units
    #[arg(long, default_value_t = 24)]
    num_units: usize,

    /// Recording duration in seconds
    #[arg(long, default_value_t = 600.0)]
    duration_sec: f64,

    /// Seed of the generator
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output Parquet file
    #[arg(short, long, default_value = "sample_units.parquet")]
    output: PathBuf,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Inter-spike interval of a Poisson process with the given rate.
    fn exponential(&mut self, rate_hz: f64) -> f64 {
        -(1.0 - self.next_f64()).ln() / rate_hz
    }
}

/// Spike times of one unit: a baseline rate modulated by slow bursts.
fn generate_spike_train(
    rng: &mut SimpleRng,
    base_rate_hz: f64,
    burst_period_sec: f64,
    duration_sec: f64,
) -> Vec<f64> {
    let peak_rate = base_rate_hz * 4.0;
    let mut times = Vec::new();
    let mut t = 0.0;
    loop {
        // Thinning: draw at the peak rate, keep with probability rate(t) / peak.
        t += rng.exponential(peak_rate);
        if t > duration_sec {
            break;
        }
        let phase = (2.0 * std::f64::consts::PI * t / burst_period_sec).sin();
        let rate = base_rate_hz * (1.0 + 1.5 * phase.max(0.0));
        if rng.next_f64() * peak_rate < rate {
            times.push(t);
        }
    }
    times
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);

    let regions = ["CA1", "CA3", "DG"];

    let mut all_times: Vec<Vec<f64>> = Vec::with_capacity(args.num_units);
    let mut all_id: Vec<i64> = Vec::with_capacity(args.num_units);
    let mut all_region: Vec<&str> = Vec::with_capacity(args.num_units);

    for unit in 0..args.num_units {
        let base_rate = 0.5 + 20.0 * rng.next_f64();
        let burst_period = 5.0 + 55.0 * rng.next_f64();
        let times = generate_spike_train(&mut rng, base_rate, burst_period, args.duration_sec);
        log::debug!("Unit {unit}: {} spikes at ~{base_rate:.1} Hz", times.len());

        all_times.push(times);
        all_id.push(unit as i64);
        all_region.push(regions[unit % regions.len()]);
    }

    // Build Arrow arrays
    let mut times_builder = ListBuilder::new(Float64Builder::new());
    for row in &all_times {
        let values = times_builder.values();
        for &v in row {
            values.append_value(v);
        }
        times_builder.append(true);
    }
    let times_array = times_builder.finish();

    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "spike_times",
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
            false,
        ),
        Field::new("unit_id", DataType::Int64, false),
        Field::new("region", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(times_array),
            Arc::new(Int64Array::from(all_id)),
            Arc::new(StringArray::from(all_region)),
        ],
    )
    .context("building record batch")?;

    // Write Parquet
    let file = std::fs::File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing writer")?;

    let total: usize = all_times.iter().map(Vec::len).sum();
    println!(
        "Wrote {} units ({total} spikes over {} s) to {}",
        args.num_units,
        args.duration_sec,
        args.output.display()
    );
    Ok(())
}
