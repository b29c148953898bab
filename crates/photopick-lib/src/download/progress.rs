use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

const BAR_TEMPLATE: &str = "{spinner:.blue} {wide_bar:.cyan/blue} {bytes}/{total_bytes} {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.blue} Downloading... {bytes} ({bytes_per_sec})";
const PROGRESS_CHARS: &str = "█▓▒░  ";

/// Percent complete and remaining time for a transfer of known size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub percent: f64,
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    pub fn compute(total: u64, downloaded: u64, elapsed: Duration) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            (downloaded as f64 / total as f64 * 100.0).min(100.0)
        };

        let elapsed_secs = elapsed.as_secs_f64();
        let eta = if elapsed_secs > 0.0 && downloaded > 0 {
            let rate = downloaded as f64 / elapsed_secs;
            let remaining = total.saturating_sub(downloaded) as f64;
            Some(Duration::from_secs_f64(remaining / rate))
        } else {
            None
        };

        Self { percent, eta }
    }

    pub fn message(&self) -> String {
        let eta = match self.eta {
            Some(eta) if !eta.is_zero() => {
                let secs = eta.as_secs();
                format!("{}m {}s", secs / 60, secs % 60)
            }
            _ => "N/A".to_string(),
        };
        format!("{:.1}%  ETA: {}", self.percent, eta)
    }
}

/// Transient progress display for one download.
pub struct DownloadProgress {
    bar: ProgressBar,
    total: Option<u64>,
    started: Instant,
    bytes_written: u64,
}

impl DownloadProgress {
    pub fn new(total: Option<u64>, visible: bool) -> Self {
        let bar = match (visible, total) {
            (false, _) => ProgressBar::hidden(),
            (true, Some(len)) => {
                let bar = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
                    bar.set_style(style.progress_chars(PROGRESS_CHARS));
                }
                bar
            }
            (true, None) => {
                let bar = ProgressBar::new_spinner();
                if let Ok(style) = ProgressStyle::with_template(SPINNER_TEMPLATE) {
                    bar.set_style(style);
                }
                bar
            }
        };

        Self {
            bar,
            total,
            started: Instant::now(),
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn advance(&mut self, chunk_len: u64) {
        self.bytes_written += chunk_len;
        self.bar.set_position(self.bytes_written);
        if let Some(total) = self.total {
            let snapshot = ProgressSnapshot::compute(total, self.bytes_written, self.started.elapsed());
            self.bar.set_message(snapshot.message());
        } else {
            self.bar.tick();
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
