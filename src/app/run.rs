//! Terminal event loop.

use super::{App, DELIVERY_LATENCY, deliver};
use crate::config::Config;
use crate::render::terminal::{PanicHookGuard, Terminal};
use crate::sink::ChannelSink;
use anyhow::{Context, Result};
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Drives deferred focus, debounced resizes and ingestion completion.
const TICK_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
pub struct RunOptions {
    /// Files to pick before the first draw.
    pub attach: Vec<PathBuf>,
    /// JSON-lines log of delivered messages.
    pub transcript: Option<PathBuf>,
}

pub async fn run(config: Config, options: RunOptions) -> Result<()> {
    let _panic_guard = PanicHookGuard::install();
    let mut terminal = Terminal::enter().context("Failed to set up terminal")?;
    let (width, height) = terminal.size();

    let (sink, outgoing) = ChannelSink::channel();
    let (delivery_tx, mut delivery_rx) = mpsc::unbounded_channel();
    let delivery = tokio::spawn(deliver(
        outgoing,
        delivery_tx,
        options.transcript,
        DELIVERY_LATENCY,
    ));

    let mut app = App::new(&config, Box::new(sink), width, height);
    if !options.attach.is_empty() {
        info!(count = options.attach.len(), "Attaching files from command line");
        app.composer.pick_files(options.attach);
    }

    let debug_events = std::env::var("QUILL_DEBUG_EVENTS").is_ok();
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let result = loop {
        if app.take_dirty() {
            let screen = app.build_screen();
            if let Err(e) = terminal.draw(&screen) {
                break Err(e).context("Failed to draw");
            }
        }

        tokio::select! {
            event = events.next() => match event {
                Some(Ok(event)) => {
                    if debug_events {
                        debug!(?event, "Terminal event");
                    }
                    if let Event::Resize(w, h) = event {
                        terminal.update_size(w, h);
                    }
                    app.handle_event(event);
                }
                Some(Err(e)) => break Err(e).context("Failed to read terminal event"),
                None => break Ok(()),
            },
            Some(delivery) = delivery_rx.recv() => app.handle_delivery(delivery),
            _ = ticker.tick() => {}
        }

        app.tick(Instant::now());
        if app.should_quit {
            break Ok(());
        }
    };

    delivery.abort();
    result
}
