use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::{Rng, seq::IndexedRandom};

pub const HEADER: &str = "URL,IP,timeStamp,timeSpent";

const WINDOW_SECS: i64 = 7 * 24 * 3600;

const URLS: [(&str, u8); 6] = [
    ("/", 10),
    ("/login", 10),
    ("/api", 50),
    ("/admin", 5),
    ("/splash", 20),
    ("/gallery", 10),
];

pub fn generate_row<R: Rng + ?Sized>(rng: &mut R, start: DateTime<Utc>) -> String {
    let url = URLS.choose_weighted(rng, |(_, w)| *w).unwrap().0;
    let ip = format!(
        "192.168.{}.{}",
        rng.random_range(0..256),
        rng.random_range(0..256)
    );
    let timestamp = (start + Duration::seconds(rng.random_range(0..WINDOW_SECS)))
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    let duration = rng.random_range(1..600);

    format!("{url},{ip},{timestamp},{duration}")
}
