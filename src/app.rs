// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::io::Stdout;
use std::time::Duration;

use ratatui::crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{backend::CrosstermBackend, Terminal};
use strum::IntoEnumIterator;
use tokio::signal;
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tracing::{event as tracing_event, Level};

use crate::client::{ClientEvent, ClientHandle, ItemId, Request, Snapshot, Value};
use crate::command::{self, Command, CommandError, Dispatch, ListKind};
use crate::config::{PeerSortColumn, Settings, SortDirection, TorrentSortColumn};
use crate::tui::columns::{file_columns, peer_columns, torrent_columns};
use crate::tui::list::ListView;
use crate::tui::sort::Sorter;
use crate::tui::view;
use crate::units::{DataCountConverter, UnitError};

/// One open list pane. The torrents tab is always index 0 and never closes;
/// file and peer tabs are scoped to a single torrent.
pub struct Tab {
    pub kind: ListKind,
    pub torrent: Option<ItemId>,
    pub view: ListView,
}

pub struct App {
    pub settings: Settings,
    client: ClientHandle,
    client_events: mpsc::Receiver<ClientEvent>,
    pub tabs: Vec<Tab>,
    pub active_tab: usize,
    size_converter: DataCountConverter,
    rate_converter: DataCountConverter,
    should_quit: bool,
    ui_needs_redraw: bool,
}

impl App {
    pub fn new(
        settings: Settings,
        client: ClientHandle,
        client_events: mpsc::Receiver<ClientEvent>,
    ) -> Result<Self, UnitError> {
        let size_converter =
            DataCountConverter::new(settings.size_unit.short(), settings.size_prefix)?;
        let rate_converter =
            DataCountConverter::new(settings.rate_unit.short(), settings.rate_prefix)?;

        let mut app = App {
            settings,
            client,
            client_events,
            tabs: Vec::new(),
            active_tab: 0,
            size_converter,
            rate_converter,
            should_quit: false,
            ui_needs_redraw: true,
        };
        let sort = Sorter::new(
            app.settings.torrent_sort_column.field(),
            app.settings.torrent_sort_direction,
        );
        app.open_list(ListKind::Torrents, None, Some(sort));
        Ok(app)
    }

    fn make_view(&self, kind: ListKind, sort: Option<Sorter>) -> ListView {
        let columns = match kind {
            ListKind::Torrents => torrent_columns(),
            ListKind::Files => file_columns(),
            ListKind::Peers => peer_columns(),
        };
        ListView::new(kind.title(), columns, sort)
            .with_mark_symbol(self.settings.mark_symbol.clone())
            .with_cache_policy(
                Duration::from_secs(self.settings.cache_ttl_secs),
                Duration::from_secs(self.settings.cache_prune_interval_secs),
            )
    }

    /// Creates a new tab and focuses it. The caller is responsible for
    /// issuing the tab's initial poll request.
    fn open_list(&mut self, kind: ListKind, torrent: Option<ItemId>, sort: Option<Sorter>) {
        let sort = match kind {
            ListKind::Torrents => sort,
            ListKind::Peers => sort.or_else(|| {
                Some(Sorter::new(
                    self.settings.peer_sort_column.field(),
                    self.settings.peer_sort_direction,
                ))
            }),
            ListKind::Files => sort,
        };
        let view = self.make_view(kind, sort);
        self.tabs.push(Tab {
            kind,
            torrent,
            view,
        });
        self.active_tab = self.tabs.len() - 1;
        self.ui_needs_redraw = true;
    }

    /// Dropping the tab tears its view down; any snapshot still in flight
    /// for it will find no matching tab and gets discarded.
    fn close_active_tab(&mut self) {
        if self.active_tab == 0 {
            return;
        }
        self.tabs.remove(self.active_tab);
        if self.active_tab >= self.tabs.len() {
            self.active_tab = self.tabs.len() - 1;
        }
        self.ui_needs_redraw = true;
    }

    fn active_view_mut(&mut self) -> &mut ListView {
        &mut self.tabs[self.active_tab].view
    }

    /// Raw backend records carry plain byte counts; data-sized fields are
    /// rebound to the user's configured unit and prefix family here, once,
    /// so every later format pass renders them consistently.
    fn normalize_snapshot(&self, kind: ListKind, mut snapshot: Snapshot) -> Snapshot {
        let size_fields: &[&str] = match kind {
            ListKind::Torrents => &["size"],
            ListKind::Files => &["size"],
            ListKind::Peers => &[],
        };
        let rate_fields: &[&str] = match kind {
            ListKind::Torrents | ListKind::Peers => &["rate-up", "rate-down"],
            ListKind::Files => &[],
        };
        for record in snapshot.values_mut() {
            for field in size_fields {
                Self::rebind_field(record, field, &self.size_converter);
            }
            for field in rate_fields {
                Self::rebind_field(record, field, &self.rate_converter);
            }
        }
        snapshot
    }

    fn rebind_field(
        record: &mut std::collections::HashMap<String, Value>,
        field: &str,
        converter: &DataCountConverter,
    ) {
        let raw = match record.get(field) {
            Some(Value::Int(n)) => converter.convert_raw(*n, None),
            Some(Value::Float(f)) => converter.convert_raw(*f, None),
            _ => return,
        };
        if let Ok(num) = raw {
            record.insert(field.to_string(), Value::Data(num));
        }
    }

    pub fn handle_client_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::TorrentSnapshot(snapshot) => {
                let snapshot = self.normalize_snapshot(ListKind::Torrents, snapshot);
                for tab in &mut self.tabs {
                    if tab.kind == ListKind::Torrents {
                        tab.view.update_items(snapshot.clone());
                    }
                }
                self.ui_needs_redraw = true;
            }
            ClientEvent::FileSnapshot { torrent, files } => {
                self.deliver_scoped(ListKind::Files, torrent, files);
            }
            ClientEvent::PeerSnapshot { torrent, peers } => {
                self.deliver_scoped(ListKind::Peers, torrent, peers);
            }
            ClientEvent::Error(message) => {
                tracing_event!(Level::ERROR, "Backend error: {}", message);
            }
        }
    }

    fn deliver_scoped(&mut self, kind: ListKind, torrent: ItemId, snapshot: Snapshot) {
        let snapshot = self.normalize_snapshot(kind, snapshot);
        let mut delivered = false;
        for tab in &mut self.tabs {
            if tab.kind == kind && tab.torrent.as_ref() == Some(&torrent) {
                tab.view.update_items(snapshot.clone());
                delivered = true;
            }
        }
        if delivered {
            self.ui_needs_redraw = true;
        } else {
            tracing_event!(
                Level::DEBUG,
                "Dropping {:?} snapshot for torrent {} with no open tab",
                kind,
                torrent
            );
        }
    }

    async fn run_command(&mut self, command: Command) {
        let view = &self.tabs[self.active_tab].view;
        match command::dispatch(command, view) {
            Ok(Dispatch::Backend(request)) => {
                if let Err(e) = self.client.send(request).await {
                    tracing_event!(Level::ERROR, "Backend request failed: {}", e);
                }
            }
            Ok(Dispatch::OpenList {
                kind,
                request,
                sort,
            }) => {
                let torrent = match &request {
                    Request::PollFiles { torrent } | Request::PollPeers { torrent } => {
                        Some(torrent.clone())
                    }
                    _ => None,
                };
                self.open_list(kind, torrent, sort);
                if let Err(e) = self.client.send(request).await {
                    tracing_event!(Level::ERROR, "Backend request failed: {}", e);
                }
            }
            Err(CommandError::EmptySelection) => {
                tracing_event!(Level::DEBUG, "Command ignored: nothing selected");
            }
        }
    }

    fn cycle_sort_column(&mut self) {
        let tab = &mut self.tabs[self.active_tab];
        let fields: Vec<&'static str> = match tab.kind {
            ListKind::Torrents | ListKind::Files => {
                TorrentSortColumn::iter().map(|c| c.field()).collect()
            }
            ListKind::Peers => PeerSortColumn::iter().map(|c| c.field()).collect(),
        };
        let direction = tab
            .view
            .sort()
            .map(|s| s.direction())
            .unwrap_or_default();
        let next = match tab.view.sort().map(|s| s.field()) {
            Some(current) => fields
                .iter()
                .position(|f| *f == current)
                .map(|i| fields[(i + 1) % fields.len()])
                .unwrap_or(fields[0]),
            None => fields[0],
        };
        tab.view.set_sort(Some(Sorter::new(next, direction)));
        self.ui_needs_redraw = true;
    }

    fn flip_sort_direction(&mut self) {
        let view = self.active_view_mut();
        let sort = match view.sort() {
            Some(s) => {
                let flipped = match s.direction() {
                    SortDirection::Ascending => SortDirection::Descending,
                    SortDirection::Descending => SortDirection::Ascending,
                };
                Sorter::new(s.field(), flipped)
            }
            None => Sorter::new(Sorter::DEFAULT_FIELD, SortDirection::Descending),
        };
        view.set_sort(Some(sort));
        self.ui_needs_redraw = true;
    }

    pub async fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                if self.active_tab == 0 {
                    self.should_quit = true;
                } else {
                    self.close_active_tab();
                }
            }
            KeyCode::Char('x') => self.close_active_tab(),
            KeyCode::Tab => {
                self.active_tab = (self.active_tab + 1) % self.tabs.len();
                self.ui_needs_redraw = true;
            }
            KeyCode::BackTab => {
                self.active_tab = (self.active_tab + self.tabs.len() - 1) % self.tabs.len();
                self.ui_needs_redraw = true;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.active_view_mut().focus_next();
                self.ui_needs_redraw = true;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.active_view_mut().focus_prev();
                self.ui_needs_redraw = true;
            }
            KeyCode::Char(' ') => {
                let view = self.active_view_mut();
                view.mark(true, false);
                view.focus_next();
                self.ui_needs_redraw = true;
            }
            KeyCode::Char('m') => {
                self.active_view_mut().mark(false, false);
                self.ui_needs_redraw = true;
            }
            KeyCode::Char('M') => {
                self.active_view_mut().mark(false, true);
                self.ui_needs_redraw = true;
            }
            KeyCode::Char('u') => {
                self.active_view_mut().unmark(false, false);
                self.ui_needs_redraw = true;
            }
            KeyCode::Char('U') => {
                self.active_view_mut().unmark(false, true);
                self.ui_needs_redraw = true;
            }
            KeyCode::Char('s') => self.cycle_sort_column(),
            KeyCode::Char('d') => self.flip_sort_direction(),
            KeyCode::Char('S') => {
                self.active_view_mut().reset_sort();
                self.ui_needs_redraw = true;
            }
            KeyCode::Enter => {
                if self.tabs[self.active_tab].kind == ListKind::Torrents {
                    self.run_command(Command::ListFiles).await;
                }
            }
            KeyCode::Char('p') => {
                if self.tabs[self.active_tab].kind == ListKind::Torrents {
                    self.run_command(Command::ListPeers).await;
                }
            }
            KeyCode::Char('n') => {
                self.run_command(Command::ListTorrents { sort: None }).await;
            }
            KeyCode::Char('r') => self.run_command(Command::StartTorrents).await,
            KeyCode::Char('P') => self.run_command(Command::StopTorrents).await,
            KeyCode::Char('v') => self.run_command(Command::VerifyTorrents).await,
            KeyCode::Delete => {
                self.run_command(Command::RemoveTorrents { delete_data: false })
                    .await
            }
            _ => {}
        }
    }

    async fn handle_tui_event(&mut self, event: CrosstermEvent) {
        match event {
            CrosstermEvent::Key(key) => self.handle_key(key).await,
            CrosstermEvent::Resize(_, _) => self.ui_needs_redraw = true,
            _ => {}
        }
    }

    /// Issues the poll request each open tab depends on. Requests are
    /// fire-and-forget; stale responses are reconciled on arrival.
    async fn poll_tabs(&mut self) {
        let requests: Vec<Request> = self
            .tabs
            .iter()
            .map(|tab| match (&tab.kind, &tab.torrent) {
                (ListKind::Files, Some(torrent)) => Request::PollFiles {
                    torrent: torrent.clone(),
                },
                (ListKind::Peers, Some(torrent)) => Request::PollPeers {
                    torrent: torrent.clone(),
                },
                _ => Request::PollTorrents,
            })
            .collect();
        for request in requests {
            if let Err(e) = self.client.send(request).await {
                tracing_event!(Level::ERROR, "Poll request failed: {}", e);
                self.should_quit = true;
                return;
            }
        }
    }

    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        let (tui_event_tx, mut tui_event_rx) = mpsc::channel::<CrosstermEvent>(100);
        let mut input_shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = input_shutdown_rx.recv() => break,

                    result = tokio::task::spawn_blocking(event::read) => {
                        let event = match result {
                            Ok(Ok(e)) => e,
                            Ok(Err(e)) => {
                                tracing_event!(Level::ERROR, "Crossterm event read error: {}", e);
                                break;
                            }
                            Err(e) => {
                                tracing_event!(Level::ERROR, "Blocking TUI read task panicked: {}", e);
                                break;
                            }
                        };
                        if tui_event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        self.poll_tabs().await;

        let mut poll_interval =
            time::interval(Duration::from_millis(self.settings.poll_interval_ms.max(100)));
        let mut draw_interval = time::interval(Duration::from_millis(50));

        while !self.should_quit {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    self.should_quit = true;
                }

                Some(event) = tui_event_rx.recv() => {
                    self.handle_tui_event(event).await;
                }

                Some(client_event) = self.client_events.recv() => {
                    self.handle_client_event(client_event);
                }

                _ = poll_interval.tick() => {
                    self.poll_tabs().await;
                }

                _ = draw_interval.tick() => {
                    if self.ui_needs_redraw {
                        let tab = &self.tabs[self.active_tab];
                        terminal.draw(|frame| {
                            view::draw_list(frame, frame.area(), &tab.view, true);
                        })?;
                        self.ui_needs_redraw = false;
                    }
                }
            }
        }

        let _ = shutdown_tx.send(());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client;
    use crate::client::Record;
    use ratatui::crossterm::event::KeyModifiers;
    use std::collections::HashMap;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn torrent_record(name: &str, size: i64) -> Record {
        let mut record = HashMap::new();
        record.insert("name".to_string(), Value::Text(name.to_string()));
        record.insert("size".to_string(), Value::Int(size));
        record.insert("progress".to_string(), Value::Float(50.0));
        record.insert("rate-up".to_string(), Value::Int(1000));
        record.insert("rate-down".to_string(), Value::Int(2000));
        record.insert("eta".to_string(), Value::Int(90));
        record
    }

    fn torrent_snapshot(names: &[&str]) -> Snapshot {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| (ItemId::Int(i as i64), torrent_record(name, 1536)))
            .collect()
    }

    fn test_app() -> App {
        let (handle, events, _driver) = client::channel(16);
        // The driver is dropped, so sends fail; tests exercising requests
        // build their own channel and keep the driver alive.
        App::new(Settings::default(), handle, events).unwrap()
    }

    #[test]
    fn test_starts_with_torrents_tab() {
        let app = test_app();
        assert_eq!(app.tabs.len(), 1);
        assert_eq!(app.tabs[0].kind, ListKind::Torrents);
        assert_eq!(
            app.tabs[0].view.sort().unwrap().field(),
            TorrentSortColumn::default().field()
        );
    }

    #[test]
    fn test_snapshot_normalization_rebinds_data_fields() {
        let mut app = test_app();
        app.handle_client_event(ClientEvent::TorrentSnapshot(torrent_snapshot(&["alpha"])));

        let row = &app.tabs[0].view.rows()[0];
        match row.record().get("size") {
            Some(Value::Data(num)) => {
                assert_eq!(num.unit(), Some("B"));
                // Default size presentation is binary, so 1536 B is 1.5KiB.
                assert_eq!(num.format(true), "1.5KiB");
            }
            other => panic!("size not normalized: {:?}", other),
        }
        match row.record().get("rate-up") {
            Some(Value::Data(num)) => assert_eq!(num.format(true), "1kB"),
            other => panic!("rate-up not normalized: {:?}", other),
        }
    }

    #[test]
    fn test_scoped_snapshot_for_closed_tab_is_dropped() {
        let mut app = test_app();
        app.handle_client_event(ClientEvent::FileSnapshot {
            torrent: ItemId::Int(7),
            files: torrent_snapshot(&["a.iso"]),
        });
        // No files tab is open for torrent 7.
        assert_eq!(app.tabs.len(), 1);
        assert!(app.tabs[0].view.is_empty());
    }

    #[test]
    fn test_scoped_snapshot_routes_to_matching_tab() {
        let mut app = test_app();
        app.open_list(ListKind::Files, Some(ItemId::Int(7)), None);
        app.handle_client_event(ClientEvent::FileSnapshot {
            torrent: ItemId::Int(7),
            files: torrent_snapshot(&["a.iso", "b.iso"]),
        });
        assert_eq!(app.tabs[1].view.len(), 2);
    }

    #[tokio::test]
    async fn test_enter_opens_files_tab_and_polls() {
        let (handle, events, mut driver) = client::channel(16);
        let mut app = App::new(Settings::default(), handle, events).unwrap();
        app.handle_client_event(ClientEvent::TorrentSnapshot(torrent_snapshot(&["alpha"])));

        app.handle_key(key(KeyCode::Enter)).await;

        assert_eq!(app.tabs.len(), 2);
        assert_eq!(app.tabs[1].kind, ListKind::Files);
        assert_eq!(app.active_tab, 1);
        let request = driver.request_rx.recv().await.unwrap();
        assert!(matches!(request, Request::PollFiles { .. }));
    }

    #[tokio::test]
    async fn test_marked_rows_take_precedence_for_commands() {
        let (handle, events, mut driver) = client::channel(16);
        let mut app = App::new(Settings::default(), handle, events).unwrap();
        app.handle_client_event(ClientEvent::TorrentSnapshot(torrent_snapshot(&[
            "alpha", "beta", "gamma",
        ])));

        app.handle_key(key(KeyCode::Char(' '))).await; // mark row 0, focus 1
        app.handle_key(key(KeyCode::Char(' '))).await; // mark row 1, focus 2
        app.handle_key(key(KeyCode::Char('r'))).await;

        match driver.request_rx.recv().await.unwrap() {
            Request::StartTorrents { torrents } => assert_eq!(torrents.len(), 2),
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sort_cycling_and_reset() {
        let mut app = test_app();
        app.handle_client_event(ClientEvent::TorrentSnapshot(torrent_snapshot(&["b", "a"])));

        app.handle_key(key(KeyCode::Char('s'))).await;
        assert_eq!(app.tabs[0].view.sort().unwrap().field(), "size");

        app.handle_key(key(KeyCode::Char('d'))).await;
        assert_eq!(
            app.tabs[0].view.sort().unwrap().direction(),
            SortDirection::Descending
        );

        app.handle_key(key(KeyCode::Char('S'))).await;
        assert_eq!(app.tabs[0].view.sort().unwrap().field(), "name");
        assert_eq!(
            app.tabs[0].view.sort().unwrap().direction(),
            SortDirection::Ascending
        );
    }

    #[tokio::test]
    async fn test_close_tab_returns_to_torrents() {
        let mut app = test_app();
        app.open_list(ListKind::Peers, Some(ItemId::Int(3)), None);
        assert_eq!(app.active_tab, 1);

        app.handle_key(key(KeyCode::Char('x'))).await;
        assert_eq!(app.tabs.len(), 1);
        assert_eq!(app.active_tab, 0);

        // Closing the torrents tab is a no-op.
        app.handle_key(key(KeyCode::Char('x'))).await;
        assert_eq!(app.tabs.len(), 1);
    }
}
