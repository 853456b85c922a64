use std::time::{Duration, Instant};

/// Aggregates of one reporting window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowReport {
    /// Pages processed in the epoch so far.
    pub pages_seen: usize,
    /// Pages in this window.
    pub nb_pages: usize,
    pub avg_time: Duration,
    pub avg_loss: f64,
    /// Norm of the most recent applied gradient, if a step happened yet.
    pub latest_grad_norm: Option<f64>,
}

impl WindowReport {
    /// `After 25 graphs: avg time 12.3ms, avg loss 4.2, latest grad norm: 1.7`
    pub fn summary(&self) -> String {
        let grad_norm = match self.latest_grad_norm {
            Some(norm) => format!("{norm:.1}"),
            None => "n/a".to_string(),
        };
        format!(
            "After {} graphs: avg time {:.1}ms, avg loss {:.1}, latest grad norm: {}",
            self.pages_seen,
            self.avg_time.as_secs_f64() * 1000.0,
            self.avg_loss,
            grad_norm
        )
    }
}

/// Running loss, page count and timing for windowed training reports.
///
/// Owned by the training loop; [`take_report`](Self::take_report) returns the
/// window aggregates and starts a new window. The latest gradient norm is kept
/// across windows.
#[derive(Debug)]
pub struct RunningStats {
    running_loss: f64,
    nb_pages: usize,
    window_start: Instant,
    latest_grad_norm: Option<f64>,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningStats {
    pub fn new() -> Self {
        Self {
            running_loss: 0.0,
            nb_pages: 0,
            window_start: Instant::now(),
            latest_grad_norm: None,
        }
    }

    pub fn record_page(&mut self, loss: f64) {
        self.running_loss += loss;
        self.nb_pages += 1;
    }

    pub fn record_grad_norm(&mut self, norm: f64) {
        self.latest_grad_norm = Some(norm);
    }

    pub fn nb_pages(&self) -> usize {
        self.nb_pages
    }

    pub fn running_loss(&self) -> f64 {
        self.running_loss
    }

    pub fn latest_grad_norm(&self) -> Option<f64> {
        self.latest_grad_norm
    }

    /// Clears loss and page count and restarts the window clock.
    pub fn reset(&mut self) {
        self.running_loss = 0.0;
        self.nb_pages = 0;
        self.window_start = Instant::now();
    }

    /// Summarizes the current window and resets it.
    pub fn take_report(&mut self, pages_seen: usize) -> WindowReport {
        let elapsed = self.window_start.elapsed();
        let divisor = self.nb_pages.max(1);
        let report = WindowReport {
            pages_seen,
            nb_pages: self.nb_pages,
            avg_time: elapsed / divisor as u32,
            avg_loss: self.running_loss / divisor as f64,
            latest_grad_norm: self.latest_grad_norm,
        };
        self.reset();
        report
    }
}
