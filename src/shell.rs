//! Terminal host for the timer.
//!
//! The ticker thread, the stdin reader and the Ctrl-C handler only produce
//! [`Event`]s. The thread running [`Shell::run`] is the single owner of the
//! settings and the timer and applies every event in arrival order.

use crate::alerts::{Notifier, SoundPlayer};
use crate::config::{Field, SettingsError, SettingsStore};
use crate::timer::{BreakKind, Expiry, TickOutcome, TimerController};
use std::io::{self, BufRead, Write};
use std::str::FromStr;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Tick,
    Input(String),
    InputClosed,
    Interrupt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a pomodoro, or pause/resume the running interval.
    Start,
    Break(BreakKind),
    Reset,
    Settings,
    Set { field: String, value: String },
    Status,
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Err("empty command".to_string());
        };
        let command = match name.to_lowercase().as_str() {
            "start" | "s" | "pause" | "resume" | "p" => Command::Start,
            "short" | "b" => Command::Break(BreakKind::Short),
            "long" | "l" => Command::Break(BreakKind::Long),
            "reset" | "r" => Command::Reset,
            "settings" => Command::Settings,
            "set" => {
                let field = words.next().ok_or("usage: set <field> <value>")?;
                Command::Set {
                    field: field.to_string(),
                    value: words.collect::<Vec<_>>().join(" "),
                }
            }
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "q" | "exit" => Command::Quit,
            other => return Err(format!("unknown command {:?}, type `help`", other)),
        };
        Ok(command)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

const HELP: &str = "\
commands:
  start | s        start a pomodoro, or pause / resume the running timer
  short | b        start a short break
  long  | l        start a long break
  reset | r        stop and reset the timer
  settings         show the current settings
  set <field> <n>  change a setting (work, break, long-break, until-long)
  status           show the timer state
  quit  | q        exit";

pub struct Shell<W: Write> {
    store: SettingsStore,
    timer: TimerController,
    sound: Box<dyn SoundPlayer>,
    notifier: Box<dyn Notifier>,
    out: W,
}

impl<W: Write> Shell<W> {
    pub fn new(
        store: SettingsStore,
        sound: Box<dyn SoundPlayer>,
        notifier: Box<dyn Notifier>,
        out: W,
    ) -> Self {
        let timer = TimerController::new(store.settings());
        Self {
            store,
            timer,
            sound,
            notifier,
            out,
        }
    }

    pub fn timer(&self) -> &TimerController {
        &self.timer
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    /// Applies events until the user quits or every producer is gone.
    pub fn run(&mut self, events: Receiver<Event>) -> io::Result<()> {
        writeln!(self.out, "{}", HELP)?;
        self.render()?;
        for event in events {
            if self.handle(event)? == Flow::Quit {
                break;
            }
        }
        writeln!(
            self.out,
            "\nPomodoros completed this session: {}",
            self.timer.pomodoros_completed()
        )?;
        self.out.flush()
    }

    pub fn handle(&mut self, event: Event) -> io::Result<Flow> {
        match event {
            Event::Tick => {
                match self.timer.tick(self.store.settings()) {
                    TickOutcome::Ignored => return Ok(Flow::Continue),
                    TickOutcome::Remaining(_) => {}
                    TickOutcome::Expired(expiry) => self.on_expired(expiry)?,
                }
                self.render()?;
                Ok(Flow::Continue)
            }
            Event::Input(line) if line.trim().is_empty() => {
                self.render()?;
                Ok(Flow::Continue)
            }
            Event::Input(line) => match line.parse::<Command>() {
                Ok(command) => self.execute(command),
                Err(message) => {
                    self.say(&message)?;
                    Ok(Flow::Continue)
                }
            },
            Event::InputClosed => {
                debug!("input closed");
                Ok(Flow::Quit)
            }
            Event::Interrupt => {
                self.say("Interrupted!")?;
                Ok(Flow::Quit)
            }
        }
    }

    pub fn execute(&mut self, command: Command) -> io::Result<Flow> {
        match command {
            Command::Start => self.timer.start_work(self.store.settings()),
            Command::Break(kind) => self.timer.start_break(self.store.settings(), kind),
            Command::Reset => self.timer.reset(self.store.settings()),
            Command::Settings => {
                let lines = self.settings_lines();
                self.say(&lines)?;
            }
            Command::Set { field, value } => self.set_field(&field, &value)?,
            Command::Status => {
                let status = format!(
                    "{} ({}{}), pomodoros completed: {}\n{}",
                    self.timer.display(),
                    if self.timer.is_break() { "break, " } else { "" },
                    self.timer.start_label(),
                    self.timer.pomodoros_completed(),
                    self.settings_lines()
                );
                self.say(&status)?;
            }
            Command::Help => self.say(HELP)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        self.render()?;
        Ok(Flow::Continue)
    }

    fn set_field(&mut self, name: &str, value: &str) -> io::Result<()> {
        let result = name
            .parse::<Field>()
            .and_then(|field| self.store.set_field(field, value).map(|v| (field, v)));
        match result {
            Ok((field, value)) => self.say(&field.label(value)),
            Err(SettingsError::InvalidValue { .. }) => {
                self.say("Invalid input. Please enter a positive number.")
            }
            Err(e @ SettingsError::ConfigWrite { .. }) => {
                error!("{}", e);
                self.say(&format!(
                    "{}\nThe new value is in effect until you quit but was not saved.",
                    e
                ))
            }
            Err(e) => self.say(&e.to_string()),
        }
    }

    fn on_expired(&mut self, expiry: Expiry) -> io::Result<()> {
        debug!(
            "dispatching {:?} after {} pomodoros",
            expiry.alert, expiry.pomodoros_completed
        );
        if expiry.play_sound {
            if let Err(e) = self.sound.play() {
                warn!("completion sound failed: {}", e);
            }
        }
        if let Err(e) = self.notifier.notify(expiry.alert) {
            warn!("{}", e);
        }
        let alert = expiry.alert;
        self.say(&format!(
            "{}: {} {}",
            alert.title(),
            alert.subtitle(),
            alert.body()
        ))
    }

    fn settings_lines(&self) -> String {
        let settings = self.store.settings();
        Field::ALL
            .iter()
            .map(|field| format!("  {}", field.label(settings.get(*field))))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "\r\x1B[2K{}", message)
    }

    fn render(&mut self) -> io::Result<()> {
        write!(
            self.out,
            "\r\x1B[2K{}  ({})",
            self.timer.display(),
            self.timer.start_label()
        )?;
        self.out.flush()
    }
}

/// Sends a tick every `period` until the receiving side goes away.
pub fn spawn_ticker(events: Sender<Event>, period: Duration) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("ticker".to_string())
        .spawn(move || {
            loop {
                thread::sleep(period);
                if events.send(Event::Tick).is_err() {
                    break;
                }
            }
        })
}

/// Forwards each line read from `input`, then `InputClosed` at end of input.
///
/// Lines that are not valid UTF-8 are skipped; only a real read error stops
/// the reader.
pub fn spawn_input_reader<R>(events: Sender<Event>, mut input: R) -> io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("input".to_string())
        .spawn(move || {
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match input.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        let bytes = buf.strip_suffix(b"\n").unwrap_or(&buf[..]);
                        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
                        match std::str::from_utf8(bytes) {
                            Ok(line) => {
                                if events.send(Event::Input(line.to_string())).is_err() {
                                    return;
                                }
                            }
                            Err(e) => warn!("skipping input line that is not UTF-8: {}", e),
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        warn!("reading input failed: {}", e);
                        break;
                    }
                }
            }
            let _ = events.send(Event::InputClosed);
        })
}
