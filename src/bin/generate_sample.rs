//! Writes `sample_catalog.csv`: a deterministic synthetic catalog in the
//! column layout the dashboard expects, including blank and garbled cells.

use chrono::{Duration, NaiveDate};

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

    fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }

    /// Pick from `(item, weight)` pairs.
    fn weighted<'a>(&mut self, items: &[(&'a str, f64)]) -> &'a str {
        let total: f64 = items.iter().map(|(_, w)| w).sum();
        let mut pick = self.next_f64() * total;
        for (item, w) in items {
            if pick < *w {
                return item;
            }
            pick -= w;
        }
        items[items.len() - 1].0
    }
}

const COUNTRIES: [(&str, f64); 9] = [
    ("United States", 35.0),
    ("India", 12.0),
    ("United Kingdom", 6.0),
    ("Japan", 3.5),
    ("South Korea", 3.0),
    ("Canada", 2.5),
    ("France", 2.5),
    ("Spain", 2.0),
    ("United States, Canada", 1.5),
];

const KINDS: [(&str, f64); 2] = [("Movie", 70.0), ("TV Show", 30.0)];

const WORDS: [&str; 12] = [
    "Midnight", "River", "Echoes", "Crown", "Signal", "Harbor", "Ember", "Atlas", "Falling",
    "Garden", "Static", "Hollow",
];

fn main() {
    let mut rng = SimpleRng::new(42);
    let output_path = "sample_catalog.csv";
    let n_titles = 500;

    let mut writer = csv::Writer::from_path(output_path).expect("Failed to create output file");
    writer
        .write_record([
            "show_id",
            "type",
            "title",
            "country",
            "date_added",
            "release_year",
        ])
        .expect("Failed to write header");

    let first_added = NaiveDate::from_ymd_opt(2008, 1, 1).expect("valid date");

    for i in 1..=n_titles {
        let kind = rng.weighted(&KINDS);
        let title = format!(
            "{} {}",
            WORDS[rng.below(WORDS.len() as u64) as usize],
            WORDS[rng.below(WORDS.len() as u64) as usize]
        );

        // Roughly one in ten titles has no country, as in real catalogs.
        let country = if rng.below(10) == 0 {
            String::new()
        } else {
            rng.weighted(&COUNTRIES).to_string()
        };

        // Catalog growth skews additions towards recent years.
        let skew = rng.next_f64().sqrt();
        let added = first_added + Duration::days((skew * 5000.0) as i64);
        let date_added = match rng.below(40) {
            0 => String::new(),
            1 => "unknown".to_string(),
            _ => added.format("%B %-d, %Y").to_string(),
        };

        let release_year = match rng.below(100) {
            0 => "n/a".to_string(),
            _ => (1960 + ((1.0 - (1.0 - rng.next_f64()).powi(3)) * 62.0) as i32).to_string(),
        };

        writer
            .write_record([
                format!("s{i}"),
                kind.to_string(),
                title,
                country,
                date_added,
                release_year,
            ])
            .expect("Failed to write row");
    }

    writer.flush().expect("Failed to flush output");
    println!("Wrote {n_titles} titles to {output_path}");
}
