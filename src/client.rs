// SPDX-FileCopyrightText: 2025 The tidemark Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

//! Data model shared with the backend daemon and the channel surface the
//! app talks to it through. The transport itself lives behind
//! [`ClientDriver`]; the app only ever sees complete snapshots.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::units::UnitNumber;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("The backend client has been shut down.")]
    ClientShutdown,
}

/// Opaque identity of a listed item (torrent, file, peer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemId {
    Int(i64),
    Text(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Int(i) => write!(f, "{}", i),
            ItemId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(v: i64) -> Self {
        ItemId::Int(v)
    }
}

impl From<&str> for ItemId {
    fn from(v: &str) -> Self {
        ItemId::Text(v.to_string())
    }
}

impl From<String> for ItemId {
    fn from(v: String) -> Self {
        ItemId::Text(v)
    }
}

/// A single field of a record. Cell renderers decide how each kind is
/// displayed; the list model itself makes no assumptions beyond equality.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Data(UnitNumber),
}

impl Value {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Data(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::None => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) | Value::Data(_) => 2,
            Value::Text(_) => 3,
        }
    }

    /// Total ordering for sorting: numeric kinds compare by value, text
    /// lexically, mixed kinds by kind.
    pub fn compare(&self, other: &Value) -> Ordering {
        if let (Some(a), Some(b)) = (self.as_f64(), other.as_f64()) {
            return a.partial_cmp(&b).unwrap_or(Ordering::Equal);
        }
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    pub fn as_id(&self) -> Option<ItemId> {
        match self {
            Value::Int(i) => Some(ItemId::Int(*i)),
            Value::Text(s) => Some(ItemId::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
            // Data cells render scaled but without the unit tag.
            Value::Data(n) => f.write_str(&n.format(false)),
        }
    }
}

/// Flat field-name -> value mapping for one torrent/file/peer.
pub type Record = HashMap<String, Value>;

/// Complete point-in-time id -> record mapping, replacing any prior view
/// of backend state.
pub type Snapshot = HashMap<ItemId, Record>;

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    PollTorrents,
    PollFiles { torrent: ItemId },
    PollPeers { torrent: ItemId },
    AddTorrents { uris: Vec<String> },
    StartTorrents { torrents: Vec<ItemId> },
    StopTorrents { torrents: Vec<ItemId> },
    VerifyTorrents { torrents: Vec<ItemId> },
    RemoveTorrents { torrents: Vec<ItemId>, delete_data: bool },
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    TorrentSnapshot(Snapshot),
    FileSnapshot { torrent: ItemId, files: Snapshot },
    PeerSnapshot { torrent: ItemId, peers: Snapshot },
    Error(String),
}

/// App-side handle for issuing requests to the backend task.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    request_tx: mpsc::Sender<Request>,
}

impl ClientHandle {
    pub async fn send(&self, request: Request) -> Result<(), ClientError> {
        self.request_tx
            .send(request)
            .await
            .map_err(|_| ClientError::ClientShutdown)
    }
}

/// Transport-side ends: whatever speaks to the daemon consumes requests
/// from `request_rx` and delivers snapshots through `event_tx`.
#[derive(Debug)]
pub struct ClientDriver {
    pub request_rx: mpsc::Receiver<Request>,
    pub event_tx: mpsc::Sender<ClientEvent>,
}

impl ClientDriver {
    /// Disconnected driver: answers every poll with an empty snapshot so
    /// the UI stays live without a backend.
    /// TODO: replace with a Transmission RPC transport against
    /// `Settings::backend_url`.
    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            let event = match request {
                Request::PollTorrents => ClientEvent::TorrentSnapshot(Snapshot::new()),
                Request::PollFiles { torrent } => ClientEvent::FileSnapshot {
                    torrent,
                    files: Snapshot::new(),
                },
                Request::PollPeers { torrent } => ClientEvent::PeerSnapshot {
                    torrent,
                    peers: Snapshot::new(),
                },
                other => {
                    tracing::debug!("Dropping {:?} while disconnected", other);
                    continue;
                }
            };
            if self.event_tx.send(event).await.is_err() {
                break;
            }
        }
    }
}

pub fn channel(capacity: usize) -> (ClientHandle, mpsc::Receiver<ClientEvent>, ClientDriver) {
    let (request_tx, request_rx) = mpsc::channel(capacity);
    let (event_tx, event_rx) = mpsc::channel(capacity);
    (
        ClientHandle { request_tx },
        event_rx,
        ClientDriver {
            request_rx,
            event_tx,
        },
    )
}
