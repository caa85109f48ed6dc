use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crawldash_core::{update, DashboardState, DashboardView, Msg};
use crawldash_engine::EngineHandle;
use dash_logging::{dash_debug, dash_info};

use super::commands::{self, Command};
use super::effects::EffectRunner;
use super::ui;

/// One dashboard session: the core state plus the engine that runs its
/// effects.
pub struct Session {
    state: DashboardState,
    runner: EffectRunner,
}

impl Session {
    pub fn new(engine: EngineHandle, page_size: u32) -> Self {
        Self {
            state: DashboardState::with_page_size(page_size),
            runner: EffectRunner::new(engine),
        }
    }

    /// Applies `msg` and submits the resulting effects to the engine.
    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.run(effects);
    }

    pub fn view(&self) -> DashboardView {
        self.state.view()
    }

    /// Returns the view if anything changed since the last call.
    pub fn take_render(&mut self) -> Option<DashboardView> {
        if !self.state.consume_dirty() {
            return None;
        }
        Some(self.state.view())
    }

    /// No query or mutation is waiting for the engine.
    pub fn is_idle(&self) -> bool {
        self.state.cache().in_flight_count() == 0 && self.state.view().pending_mutations == 0
    }

    /// Dispatches engine results until the session is idle or `timeout`
    /// elapses. Returns whether it became idle.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_idle() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.runner.next_msg(remaining) {
                Some(msg) => self.dispatch(msg),
                None => return false,
            }
        }
        true
    }

    fn spawn_event_loop(&self, msg_tx: mpsc::Sender<Msg>) {
        // The loop ends on its own when either side goes away.
        let _ = self.runner.spawn_event_loop(msg_tx);
    }
}

enum Input {
    Msg(Msg),
    Help,
    Quit,
}

/// Runs the interactive dashboard until stdin closes or the user quits.
pub fn run_app(engine: EngineHandle, page_size: u32) {
    let mut session = Session::new(engine, page_size);
    let (input_tx, input_rx) = mpsc::channel::<Input>();
    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();

    session.spawn_event_loop(msg_tx.clone());
    spawn_stdin_reader(input_tx);

    // Background tick to coalesce rendering.
    thread::spawn(move || {
        let interval = Duration::from_millis(100);
        while msg_tx.send(Msg::Tick).is_ok() {
            thread::sleep(interval);
        }
    });

    println!("{}", commands::HELP);
    session.dispatch(Msg::Mounted);

    loop {
        while let Ok(input) = input_rx.try_recv() {
            match input {
                Input::Msg(msg) => session.dispatch(msg),
                Input::Help => println!("{}", commands::HELP),
                Input::Quit => {
                    session.dispatch(Msg::Unmounted);
                    dash_info!("Dashboard closed");
                    return;
                }
            }
        }

        match msg_rx.recv() {
            Ok(Msg::Tick) => {
                if let Some(view) = session.take_render() {
                    print!("\n{}> ", ui::render::render(&view));
                    let _ = io::stdout().flush();
                }
            }
            Ok(msg) => session.dispatch(msg),
            Err(_) => return,
        }
    }
}

fn spawn_stdin_reader(input_tx: mpsc::Sender<Input>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let inputs: Vec<Input> = match commands::parse(&line) {
                Ok(Some(Command::Dispatch(msgs))) => msgs.into_iter().map(Input::Msg).collect(),
                Ok(Some(Command::Help)) => vec![Input::Help],
                Ok(Some(Command::Quit)) => vec![Input::Quit],
                Ok(None) => Vec::new(),
                Err(err) => {
                    println!("{err}");
                    Vec::new()
                }
            };
            for input in inputs {
                if input_tx.send(input).is_err() {
                    return;
                }
            }
        }
        dash_debug!("stdin closed");
        let _ = input_tx.send(Input::Quit);
    });
}
