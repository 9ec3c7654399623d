/// Delay and sound countdowns, stepped at 60 Hz by the run loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub delay: u8,
    pub sound: u8,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }

    /// The tone plays for as long as the sound timer is nonzero.
    pub fn sound_active(&self) -> bool {
        self.sound > 0
    }
}

#[cfg(test)]
mod tests {
    use super::Timers;

    #[test]
    fn tick_never_underflows() {
        let mut timers = Timers::new();
        timers.tick();
        assert_eq!(timers, Timers { delay: 0, sound: 0 });
        assert!(!timers.sound_active());
    }

    #[test]
    fn tick_decrements_independently() {
        let mut timers = Timers { delay: 3, sound: 1 };
        assert!(timers.sound_active());

        timers.tick();
        assert_eq!(timers, Timers { delay: 2, sound: 0 });
        assert!(!timers.sound_active());

        timers.tick();
        timers.tick();
        timers.tick();
        assert_eq!(timers, Timers { delay: 0, sound: 0 });
    }
}
