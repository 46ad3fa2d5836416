/// Countdown state machine for Pomodoro sessions
use crate::config::Settings;
use tracing::{debug, info};

pub const IDLE_ICON: &str = "🍅";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    /// Running, but not ticking. Remaining time is retained.
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    LongBreakDue,
    ShortBreakDue,
    BreakOver,
}

impl Alert {
    pub fn title(self) -> &'static str {
        match self {
            Alert::LongBreakDue | Alert::ShortBreakDue => "Pomodoro",
            Alert::BreakOver => "Break",
        }
    }

    pub fn subtitle(self) -> &'static str {
        match self {
            Alert::LongBreakDue => "Time for a long break!",
            Alert::ShortBreakDue => "Time for a break!",
            Alert::BreakOver => "Break's over!",
        }
    }

    pub fn body(self) -> &'static str {
        match self {
            Alert::LongBreakDue => "Great job completing a set!",
            Alert::ShortBreakDue => "Good work!",
            Alert::BreakOver => "Time to focus!",
        }
    }
}

/// What the host has to do once an interval runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub alert: Alert,
    pub play_sound: bool,
    pub pomodoros_completed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not running; nothing changed.
    Ignored,
    /// New `mm:ss` display value.
    Remaining(String),
    /// The interval ended and the controller is back to idle.
    Expired(Expiry),
}

#[derive(Debug)]
pub struct TimerController {
    phase: Phase,
    is_break: bool,
    seconds_remaining: u32,
    pomodoros_completed: u32,
}

impl TimerController {
    pub fn new(settings: &Settings) -> Self {
        Self {
            phase: Phase::Idle,
            is_break: false,
            seconds_remaining: seconds_from_minutes(settings.work_duration),
            pomodoros_completed: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_break(&self) -> bool {
        self.is_break
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.seconds_remaining
    }

    pub fn pomodoros_completed(&self) -> u32 {
        self.pomodoros_completed
    }

    /// Starts a work interval when idle, otherwise toggles pause.
    pub fn start_work(&mut self, settings: &Settings) {
        match self.phase {
            Phase::Idle => {
                self.seconds_remaining = seconds_from_minutes(settings.work_duration);
                self.is_break = false;
                self.phase = Phase::Running;
                info!("work interval started ({} min)", settings.work_duration);
            }
            Phase::Running => {
                self.phase = Phase::Paused;
                info!("paused with {} remaining", self.display());
            }
            Phase::Paused => {
                self.phase = Phase::Running;
                info!("resumed with {} remaining", self.display());
            }
        }
    }

    /// Starts a break right away, discarding whatever was in progress.
    pub fn start_break(&mut self, settings: &Settings, kind: BreakKind) {
        let minutes = match kind {
            BreakKind::Short => settings.break_duration,
            BreakKind::Long => settings.long_break_duration,
        };
        self.seconds_remaining = seconds_from_minutes(minutes);
        self.is_break = true;
        self.phase = Phase::Running;
        info!("{:?} break started ({} min)", kind, minutes);
    }

    pub fn reset(&mut self, settings: &Settings) {
        self.seconds_remaining = seconds_from_minutes(settings.work_duration);
        self.is_break = false;
        self.phase = Phase::Idle;
        debug!("timer reset");
    }

    /// Advances the countdown by one second.
    pub fn tick(&mut self, settings: &Settings) -> TickOutcome {
        if self.phase != Phase::Running {
            return TickOutcome::Ignored;
        }

        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining > 0 {
            return TickOutcome::Remaining(format_remaining(self.seconds_remaining));
        }

        let alert = if self.is_break {
            Alert::BreakOver
        } else {
            self.pomodoros_completed += 1;
            // Settings guarantee a non-zero divisor.
            if self.pomodoros_completed % settings.pomodoros_until_long_break == 0 {
                Alert::LongBreakDue
            } else {
                Alert::ShortBreakDue
            }
        };
        info!(
            "interval expired: {:?}, {} pomodoros completed",
            alert, self.pomodoros_completed
        );

        self.reset(settings);
        TickOutcome::Expired(Expiry {
            alert,
            play_sound: true,
            pomodoros_completed: self.pomodoros_completed,
        })
    }

    /// Status label: the icon when idle, `mm:ss` otherwise.
    pub fn display(&self) -> String {
        match self.phase {
            Phase::Idle => IDLE_ICON.to_string(),
            Phase::Running | Phase::Paused => format_remaining(self.seconds_remaining),
        }
    }

    /// Label of the start action in its current role.
    pub fn start_label(&self) -> &'static str {
        match self.phase {
            Phase::Idle => "Start Pomodoro",
            Phase::Running => "Pause",
            Phase::Paused => "Resume",
        }
    }
}

/// Settings never exceed `MAX_SETTING`, so the multiplication only saturates
/// for hand-built `Settings`.
pub fn seconds_from_minutes(minutes: u32) -> u32 {
    minutes.saturating_mul(60)
}

pub fn format_remaining(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
