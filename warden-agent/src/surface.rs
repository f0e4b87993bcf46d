//! Device-local action surface: lock screen, alarm, message display.
//!
//! [`ActionSurface`] is the seam between the command executor and whatever
//! the host can actually present. The shipped [`ConsoleSurface`] blocks the
//! terminal with a password prompt and sounds the terminal bell; a desktop
//! build would provide a windowed surface behind the same trait. Tests use a
//! recording fake.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

/// Exact, case-sensitive password check in constant time.
pub fn password_matches(attempt: &str, expected: &str) -> bool {
    attempt.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// What the executor drives. Implementations must not block the caller:
/// lock and alarm run on their own threads.
pub trait ActionSurface: Send + Sync {
    /// Present the lock screen. Returns once the surface is up, not once the
    /// device is unlocked.
    fn begin_lock(&self, password: &str, message: Option<&str>) -> Result<(), String>;

    /// Whether the lock screen is still up.
    fn lock_active(&self) -> bool;

    /// Start the audible alert. Idempotent while already alarming.
    fn begin_alarm(&self) -> Result<(), String>;

    /// Stop the audible alert.
    fn end_alarm(&self);

    /// Display owner text without blocking input.
    fn show_message(&self, text: &str) -> Result<(), String>;
}

/// Terminal-based surface: stdin password prompt, bell-loop alarm.
#[derive(Default)]
pub struct ConsoleSurface {
    locked: Arc<AtomicBool>,
    alarming: Arc<AtomicBool>,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionSurface for ConsoleSurface {
    fn begin_lock(&self, password: &str, message: Option<&str>) -> Result<(), String> {
        if self.locked.swap(true, Ordering::SeqCst) {
            // Already locked: keep the existing prompt
            return Ok(());
        }

        let expected = password.to_string();
        let locked = Arc::clone(&self.locked);
        let banner = message.map(str::to_string);

        std::thread::Builder::new()
            .name("warden-lock".to_string())
            .spawn(move || {
                println!("==============================================");
                println!("  THIS DEVICE HAS BEEN LOCKED BY ITS OWNER");
                if let Some(text) = &banner {
                    println!("  {}", text);
                }
                println!("  Enter the unlock password to continue:");
                println!("==============================================");

                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let attempt = match line {
                        Ok(l) => l,
                        Err(e) => {
                            error!("Lock prompt lost stdin: {}", e);
                            break;
                        }
                    };
                    if password_matches(attempt.trim_end_matches(['\r', '\n']), &expected) {
                        info!("Correct password entered, unlocking");
                        break;
                    }
                    warn!("Incorrect unlock password attempt");
                    println!("Incorrect password. Try again:");
                }
                locked.store(false, Ordering::SeqCst);
            })
            .map_err(|e| format!("failed to start lock prompt: {}", e))?;

        Ok(())
    }

    fn lock_active(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    fn begin_alarm(&self) -> Result<(), String> {
        if self.alarming.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let alarming = Arc::clone(&self.alarming);
        std::thread::Builder::new()
            .name("warden-alarm".to_string())
            .spawn(move || {
                info!("Alarm loop started");
                while alarming.load(Ordering::SeqCst) {
                    // Terminal bell; a platform build would play a real sound
                    print!("\x07");
                    use std::io::Write;
                    let _ = std::io::stdout().flush();
                    std::thread::sleep(std::time::Duration::from_millis(300));
                }
                info!("Alarm loop stopped");
            })
            .map_err(|e| format!("failed to start alarm: {}", e))?;

        Ok(())
    }

    fn end_alarm(&self) {
        self.alarming.store(false, Ordering::SeqCst);
    }

    fn show_message(&self, text: &str) -> Result<(), String> {
        println!("==============================================");
        println!("  MESSAGE FROM DEVICE OWNER: {}", text);
        println!("==============================================");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_match_is_case_sensitive() {
        assert!(password_matches("Danish26", "Danish26"));
        assert!(!password_matches("danish26", "Danish26"));
        assert!(!password_matches("Danish26 ", "Danish26"));
        assert!(!password_matches("", "Danish26"));
    }
}
