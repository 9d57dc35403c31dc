// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! User actions and how they resolve against the active list view.
//!
//! Torrent-targeting commands act on the marked rows if any exist,
//! otherwise on the focused row's torrent.

use thiserror::Error;

use crate::client::{ItemId, Request};
use crate::tui::list::ListView;
use crate::tui::sort::Sorter;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddTorrents { uris: Vec<String> },
    ListTorrents { sort: Option<Sorter> },
    ListFiles,
    ListPeers,
    StartTorrents,
    StopTorrents,
    VerifyTorrents,
    RemoveTorrents { delete_data: bool },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("No torrent is marked or focused.")]
    EmptySelection,
}

/// What the app should do with a dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Forward a request to the backend.
    Backend(Request),
    /// Open a new list tab and issue its initial poll.
    OpenList {
        kind: ListKind,
        request: Request,
        sort: Option<Sorter>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ListKind {
    Torrents,
    Files,
    Peers,
}

impl ListKind {
    pub fn title(self) -> &'static str {
        match self {
            ListKind::Torrents => "Torrents",
            ListKind::Files => "Files",
            ListKind::Peers => "Peers",
        }
    }
}

/// The torrents a command should act on: every marked row's torrent, or
/// the focused row's torrent when nothing is marked. Duplicates (several
/// file rows of one torrent) collapse to one id.
pub fn selected_torrents(view: &ListView) -> Vec<ItemId> {
    let mut ids: Vec<ItemId> = view
        .rows()
        .iter()
        .filter(|row| row.is_marked())
        .map(|row| row.torrent_id().clone())
        .collect();
    if ids.is_empty() {
        if let Some(id) = view.focused_torrent_id() {
            ids.push(id.clone());
        }
    }
    ids.sort();
    ids.dedup();
    ids
}

pub fn dispatch(command: Command, view: &ListView) -> Result<Dispatch, CommandError> {
    let targeted = |make: fn(Vec<ItemId>) -> Request| {
        let torrents = selected_torrents(view);
        if torrents.is_empty() {
            Err(CommandError::EmptySelection)
        } else {
            Ok(Dispatch::Backend(make(torrents)))
        }
    };

    match command {
        Command::AddTorrents { uris } => Ok(Dispatch::Backend(Request::AddTorrents { uris })),
        Command::ListTorrents { sort } => Ok(Dispatch::OpenList {
            kind: ListKind::Torrents,
            request: Request::PollTorrents,
            sort,
        }),
        Command::ListFiles => {
            let torrent = selected_torrents(view)
                .into_iter()
                .next()
                .ok_or(CommandError::EmptySelection)?;
            Ok(Dispatch::OpenList {
                kind: ListKind::Files,
                request: Request::PollFiles { torrent },
                sort: None,
            })
        }
        Command::ListPeers => {
            let torrent = selected_torrents(view)
                .into_iter()
                .next()
                .ok_or(CommandError::EmptySelection)?;
            Ok(Dispatch::OpenList {
                kind: ListKind::Peers,
                request: Request::PollPeers { torrent },
                sort: None,
            })
        }
        Command::StartTorrents => targeted(|torrents| Request::StartTorrents { torrents }),
        Command::StopTorrents => targeted(|torrents| Request::StopTorrents { torrents }),
        Command::VerifyTorrents => targeted(|torrents| Request::VerifyTorrents { torrents }),
        Command::RemoveTorrents { delete_data } => {
            let torrents = selected_torrents(view);
            if torrents.is_empty() {
                return Err(CommandError::EmptySelection);
            }
            Ok(Dispatch::Backend(Request::RemoveTorrents {
                torrents,
                delete_data,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Record, Snapshot, Value};
    use crate::tui::columns::torrent_columns;

    fn torrent_snapshot(ids: &[i64]) -> Snapshot {
        ids.iter()
            .map(|id| {
                let mut record = Record::new();
                record.insert("name".to_string(), Value::Text(format!("t{}", id)));
                (ItemId::Int(*id), record)
            })
            .collect()
    }

    fn view_with(ids: &[i64]) -> ListView {
        let mut view = ListView::new("Torrents", torrent_columns(), Some(Sorter::default()));
        view.update_items(torrent_snapshot(ids));
        view
    }

    #[test]
    fn test_selection_prefers_marked_over_focused() {
        let mut view = view_with(&[1, 2, 3]);
        view.set_focus_position(0);
        assert_eq!(selected_torrents(&view), [ItemId::Int(1)]);

        view.set_focus_position(1);
        view.mark(false, false);
        view.set_focus_position(2);
        view.mark(false, false);
        view.set_focus_position(0);
        assert_eq!(
            selected_torrents(&view),
            [ItemId::Int(2), ItemId::Int(3)]
        );
    }

    #[test]
    fn test_selection_empty_on_empty_view() {
        let view = view_with(&[]);
        assert!(selected_torrents(&view).is_empty());
    }

    #[test]
    fn test_start_dispatches_to_backend() {
        let view = view_with(&[5]);
        let dispatch = dispatch(Command::StartTorrents, &view).unwrap();
        assert_eq!(
            dispatch,
            Dispatch::Backend(Request::StartTorrents {
                torrents: vec![ItemId::Int(5)],
            })
        );
    }

    #[test]
    fn test_targeted_command_fails_without_selection() {
        let view = view_with(&[]);
        assert_eq!(
            dispatch(Command::VerifyTorrents, &view),
            Err(CommandError::EmptySelection)
        );
        assert_eq!(
            dispatch(Command::RemoveTorrents { delete_data: true }, &view),
            Err(CommandError::EmptySelection)
        );
    }

    #[test]
    fn test_list_files_targets_focused_torrent() {
        let view = view_with(&[9]);
        let dispatch = dispatch(Command::ListFiles, &view).unwrap();
        assert_eq!(
            dispatch,
            Dispatch::OpenList {
                kind: ListKind::Files,
                request: Request::PollFiles {
                    torrent: ItemId::Int(9),
                },
                sort: None,
            }
        );
    }

    #[test]
    fn test_add_needs_no_selection() {
        let view = view_with(&[]);
        let uris = vec!["magnet:?xt=urn:btih:abc".to_string()];
        let dispatch = dispatch(Command::AddTorrents { uris: uris.clone() }, &view).unwrap();
        assert_eq!(dispatch, Dispatch::Backend(Request::AddTorrents { uris }));
    }
}
