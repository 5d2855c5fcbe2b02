use indicatif::{ProgressBar, ProgressStyle};

/// A byte-count progress bar for writing an archive of `size` bytes, prefixed with `name`.
pub fn make_progress_bar(size: u64, name: String) -> ProgressBar {
    let pb = ProgressBar::new(size);
    let style = ProgressStyle::with_template(
        "{prefix:.cyan.bold} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})",
    )
    .map(|style| style.progress_chars("=> "))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_prefix(name);
    pb
}
