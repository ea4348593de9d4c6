//! Device peripherals scripts can drive: flash, vibration, camera preview.

use serde::{Deserialize, Serialize};

/// Peripheral state recorded in a backup.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PeripheralBackup {
    pub flash_on: bool,
    /// Remaining vibration time in seconds when the backup was taken.
    pub vibration_remaining: f64,
    pub camera_preview_active: bool,
}

/// Live peripheral state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Peripherals {
    flash_on: bool,
    vibration_remaining: f64,
    vibration_paused: bool,
    camera_preview_active: bool,
    camera_preview_paused: bool,
}

impl Peripherals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_flash(&mut self, on: bool) {
        self.flash_on = on;
    }

    pub fn flash_on(&self) -> bool {
        self.flash_on
    }

    /// Vibrate for `seconds`, replacing any vibration in progress.
    pub fn vibrate(&mut self, seconds: f64) {
        self.vibration_remaining = seconds.max(0.0);
        self.vibration_paused = false;
    }

    pub fn vibration_remaining(&self) -> f64 {
        self.vibration_remaining
    }

    pub fn is_vibrating(&self) -> bool {
        self.vibration_remaining > 0.0 && !self.vibration_paused
    }

    pub fn pause_vibration(&mut self) {
        self.vibration_paused = true;
    }

    pub fn resume_vibration(&mut self) {
        self.vibration_paused = false;
    }

    pub fn set_camera_preview(&mut self, on: bool) {
        self.camera_preview_active = on;
        self.camera_preview_paused = false;
    }

    /// True while the preview is on and not paused.
    pub fn camera_preview_running(&self) -> bool {
        self.camera_preview_active && !self.camera_preview_paused
    }

    /// Count vibration down by `dt` simulated seconds.
    pub fn advance(&mut self, dt: f64) {
        if self.vibration_paused || dt <= 0.0 {
            return;
        }
        self.vibration_remaining = (self.vibration_remaining - dt).max(0.0);
    }

    /// Record the state for a backup and quiesce the devices: flash off,
    /// vibration paused then reset, preview paused.
    pub fn capture(&mut self) -> PeripheralBackup {
        let backup = PeripheralBackup {
            flash_on: self.flash_on,
            vibration_remaining: self.vibration_remaining,
            camera_preview_active: self.camera_preview_running(),
        };
        self.flash_on = false;
        self.vibration_paused = true;
        self.vibration_remaining = 0.0;
        if self.camera_preview_active {
            self.camera_preview_paused = true;
        }
        backup
    }

    /// Bring the devices back to a captured state.
    pub fn restore(&mut self, backup: &PeripheralBackup) {
        self.flash_on = backup.flash_on;
        self.vibration_remaining = backup.vibration_remaining;
        self.vibration_paused = backup.vibration_remaining <= 0.0;
        self.camera_preview_active = backup.camera_preview_active;
        self.camera_preview_paused = false;
    }

    /// Turn everything off.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vibration_counts_down_while_running() {
        let mut p = Peripherals::new();
        p.vibrate(1.0);
        p.advance(0.25);
        assert_eq!(p.vibration_remaining(), 0.75);
        p.pause_vibration();
        p.advance(0.5);
        assert_eq!(p.vibration_remaining(), 0.75);
        p.resume_vibration();
        p.advance(5.0);
        assert_eq!(p.vibration_remaining(), 0.0);
        assert!(!p.is_vibrating());
    }

    #[test]
    fn capture_quiesces_and_restore_resumes() {
        let mut p = Peripherals::new();
        p.set_flash(true);
        p.vibrate(2.0);
        p.set_camera_preview(true);

        let backup = p.capture();
        assert!(!p.flash_on());
        assert!(!p.is_vibrating());
        assert_eq!(p.vibration_remaining(), 0.0);
        assert!(!p.camera_preview_running());

        p.restore(&backup);
        assert!(p.flash_on());
        assert!(p.is_vibrating());
        assert_eq!(p.vibration_remaining(), 2.0);
        assert!(p.camera_preview_running());
    }

    #[test]
    fn restore_without_vibration_keeps_it_paused() {
        let mut p = Peripherals::new();
        let backup = p.capture();
        p.restore(&backup);
        assert!(!p.is_vibrating());
    }
}
