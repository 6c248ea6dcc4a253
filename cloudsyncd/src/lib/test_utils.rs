use camino::Utf8PathBuf;

/// Creates an empty folder with a random name in the temp directory.
pub fn temp_dir(prefix: &str) -> Utf8PathBuf {
    use rand::{distributions::Alphanumeric, Rng};

    let rnd: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(char::from)
        .collect();
    let path = std::env::temp_dir().join(format!("{prefix}-{rnd}"));
    std::fs::create_dir(&path).unwrap();
    path.try_into().unwrap()
}
