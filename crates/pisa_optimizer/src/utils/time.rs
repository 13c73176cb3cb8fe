use jiff::{SignedDuration, Timestamp};

pub fn timed<T>(f: impl FnOnce() -> T) -> (T, SignedDuration) {
    let start = Timestamp::now();
    let result = f();
    (result, Timestamp::now().duration_since(start))
}
