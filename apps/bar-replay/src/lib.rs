mod app;
mod coords;
pub mod headless;
pub mod logging;
mod tasks;
mod toolbar;
mod ui;

use crate::app::App;
use crate::tasks::ChannelFrameSink;
use bar_replay_application::dataset::LoadedDataset;
use bar_replay_application::session::{ReplaySession, SessionOptions};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io;
use std::sync::Arc;
use std::time::Duration;

pub struct TuiOpts {
    pub symbol: String,
    pub dataset: LoadedDataset,
    pub options: SessionOptions,
    pub log_store: logging::SharedLogStore,
}

pub fn run(opts: TuiOpts) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()
        .map_err(|err| format!("failed to init tokio runtime: {err}"))?;
    runtime.block_on(run_async(opts))
}

async fn run_async(opts: TuiOpts) -> Result<(), String> {
    enable_raw_mode().map_err(|err| format!("failed to enable raw mode: {err}"))?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .map_err(|err| format!("failed to enter alternate screen: {err}"))?;
    stdout
        .execute(crossterm::terminal::Clear(
            crossterm::terminal::ClearType::All,
        ))
        .map_err(|err| format!("failed to clear screen: {err}"))?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal =
        Terminal::new(backend).map_err(|err| format!("failed to init terminal: {err}"))?;
    terminal
        .hide_cursor()
        .map_err(|err| format!("failed to hide cursor: {err}"))?;

    let result = run_loop(&mut terminal, opts).await;

    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen, DisableMouseCapture);
    let _ = disable_raw_mode();
    let _ = terminal.show_cursor();

    result
}

async fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    opts: TuiOpts,
) -> Result<(), String> {
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    let sink = Arc::new(ChannelFrameSink::new(event_tx.clone()));
    let session = ReplaySession::new(opts.dataset.bars, opts.options, sink.clone());
    let mut app = App::new(
        opts.symbol,
        session,
        sink,
        opts.dataset.error,
        opts.log_store,
    );
    app.session.redraw();
    app.spawn_input_reader(event_tx);

    let mut tick = tokio::time::interval(Duration::from_millis(100));

    loop {
        if app.dirty {
            terminal
                .draw(|frame| ui::draw(frame, &mut app))
                .map_err(|err| format!("terminal draw failed: {err}"))?;
            app.dirty = false;
        }

        tokio::select! {
            _ = tick.tick() => {
                app.on_tick();
            }
            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else { return Ok(()); };
                if app.on_event(event)? {
                    app.session.stop();
                    return Ok(());
                }
            }
        }
    }
}
