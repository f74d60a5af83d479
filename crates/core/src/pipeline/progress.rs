use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

fn frame_bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-")
}

fn counter_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} frames ({per_sec})")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn batch_style() -> ProgressStyle {
    ProgressStyle::with_template("[{bar:40.green}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Per-frame progress for one stream item.
///
/// Bounded bar when the source reports a frame count, plain counter for
/// unbounded sources. With `nested` set the bar joins the outer
/// [`MultiProgress`] as a sub-line so it doesn't scroll the batch bar.
pub fn frame_bar(frame_count: Option<usize>, nested: Option<&MultiProgress>) -> ProgressBar {
    let bar = match frame_count {
        Some(total) => ProgressBar::new(total as u64).with_style(frame_bar_style()),
        None => ProgressBar::new_spinner().with_style(counter_style()),
    };
    match nested {
        Some(multi) => multi.add(bar),
        None => bar,
    }
}

/// Batch-level progress over discovered items.
pub fn batch_bars(item_count: usize) -> (MultiProgress, ProgressBar) {
    let multi = MultiProgress::new();
    let outer = multi.add(ProgressBar::new(item_count as u64).with_style(batch_style()));
    (multi, outer)
}
