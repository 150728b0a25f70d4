//! Session statistics as the display panel sees them.

use crate::farm::FarmHandle;
use chrono::{DateTime, Local};
use std::fmt;
use std::time::Duration;
use tracing::info;

/// Point-in-time copy of the session counters.
#[derive(Debug, Clone)]
pub struct FarmStats {
    pub running: bool,
    pub xp_earned: u32,
    pub lessons_completed: u32,
    pub correct_answers: u32,
    pub target_xp: u32,
    pub elapsed: Duration,
    pub started_at: DateTime<Local>,
}

impl FarmStats {
    /// Elapsed session time as `HH:MM:SS`.
    pub fn clock(&self) -> String {
        let total = self.elapsed.as_secs();
        format!(
            "{:02}:{:02}:{:02}",
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}

impl fmt::Display for FarmStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} XP, {} lessons, {} confident answers, up {}",
            self.xp_earned,
            self.target_xp,
            self.lessons_completed,
            self.correct_answers,
            self.clock()
        )
    }
}

/// Log the status line at a fixed interval while the farm runs. Fire and
/// forget: the task exits on its own once a started farm stops.
pub fn spawn_status_logger(handle: FarmHandle, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut seen_running = false;
        loop {
            tokio::time::sleep(every).await;
            let stats = handle.stats();
            if stats.running {
                seen_running = true;
                info!("{stats}");
            } else if seen_running {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(elapsed_secs: u64) -> FarmStats {
        FarmStats {
            running: true,
            xp_earned: 120,
            lessons_completed: 12,
            correct_answers: 8,
            target_xp: 1000,
            elapsed: Duration::from_secs(elapsed_secs),
            started_at: Local::now(),
        }
    }

    #[test]
    fn test_clock_zero() {
        assert_eq!(stats(0).clock(), "00:00:00");
    }

    #[test]
    fn test_clock_rollovers() {
        assert_eq!(stats(59).clock(), "00:00:59");
        assert_eq!(stats(60).clock(), "00:01:00");
        assert_eq!(stats(3725).clock(), "01:02:05");
        assert_eq!(stats(36_000).clock(), "10:00:00");
    }

    #[test]
    fn test_display_line() {
        let line = stats(65).to_string();
        assert_eq!(line, "120/1000 XP, 12 lessons, 8 confident answers, up 00:01:05");
    }
}
