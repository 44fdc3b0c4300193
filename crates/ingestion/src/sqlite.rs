//! SQLite-backed session store.
//!
//! The connection lives on a dedicated worker thread; async callers send
//! closures over a channel and await the reply. Dropping the last handle
//! shuts the worker down and joins it.

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use contracts::{
    ChannelSlice, ChannelSpec, ContractError, LapTimeRow, SampleIndexRange, SectorRow,
    SessionConfig, SessionStore, StoreConfig, TimingTables,
};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tokio::sync::oneshot;
use tracing::instrument;

use crate::error::{IngestionError, Result};
use crate::synthetic::SyntheticSession;

type StoreTask = Box<dyn FnOnce(&Connection) + Send + 'static>;

enum StoreCommand {
    Execute(StoreTask),
    Shutdown,
}

struct StoreInner {
    sender: mpsc::Sender<StoreCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(StoreCommand::Shutdown) {
                tracing::error!(error = %err, "failed to send shutdown to store worker");
            }
            if handle.join().is_err() {
                tracing::error!("store worker panicked");
            }
        }
    }
}

/// Read-only session store over a SQLite database
///
/// Cheap to clone; all clones share one connection and worker thread.
#[derive(Clone)]
pub struct SqliteSessionStore {
    inner: Arc<StoreInner>,
    path: Arc<PathBuf>,
    layout: Arc<StoreConfig>,
    name: String,
}

impl std::fmt::Debug for SqliteSessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSessionStore")
            .field("path", &self.path)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

impl SqliteSessionStore {
    /// Open an existing session database read-only
    ///
    /// # Errors
    /// - Worker thread spawn failure
    /// - Database open failure (missing file, not a database)
    #[instrument(name = "sqlite_store_open", skip(path, layout), fields(path = %path.display()))]
    pub fn open(path: &Path, layout: &StoreConfig) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        Self::spawn(path, layout, flags)
    }

    /// Write `session` as a new database at `path` and open it
    ///
    /// Tables follow `config`: one timing table per `[store]` entry and one
    /// `(ts, value)` table per channel. Existing tables are replaced.
    #[instrument(
        name = "sqlite_store_create",
        skip(path, config, session),
        fields(path = %path.display())
    )]
    pub fn create(path: &Path, config: &SessionConfig, session: &SyntheticSession) -> Result<Self> {
        let mut conn = Connection::open(path)
            .map_err(|e| IngestionError::sqlite("creating session database", e))?;
        write_session(&mut conn, config, session)?;
        drop(conn);
        Self::open(path, &config.store)
    }

    fn spawn(path: &Path, layout: &StoreConfig, flags: OpenFlags) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<StoreCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let path_for_thread = path.to_path_buf();

        let worker = thread::Builder::new()
            .name("lapsync-store".into())
            .spawn(move || {
                let conn = match Connection::open_with_flags(&path_for_thread, flags) {
                    Ok(conn) => conn,
                    Err(err) => {
                        let _ = ready_tx.send(Err(IngestionError::sqlite(
                            format!("opening {}", path_for_thread.display()),
                            err,
                        )));
                        return;
                    }
                };

                // Fail on open rather than on the first query if the file is not a database
                let probe = conn
                    .query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
                        row.get::<_, i64>(0)
                    })
                    .map(|_| ())
                    .map_err(|e| IngestionError::sqlite("reading schema", e));
                let failed = probe.is_err();
                if ready_tx.send(probe).is_err() || failed {
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        StoreCommand::Execute(task) => task(&conn),
                        StoreCommand::Shutdown => break,
                    }
                }
                tracing::debug!("store worker shutting down");
            })
            .map_err(IngestionError::WorkerSpawn)?;

        let ready = ready_rx.recv().map_err(|_| IngestionError::WorkerGone);
        if !matches!(ready, Ok(Ok(()))) {
            let _ = worker.join();
            ready??;
            return Err(IngestionError::WorkerGone);
        }

        tracing::info!(path = %path.display(), "session database opened");

        Ok(Self {
            inner: Arc::new(StoreInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
            path: Arc::new(path.to_path_buf()),
            layout: Arc::new(layout.clone()),
            name: format!("sqlite:{}", path.display()),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Run `task` on the worker thread
    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = StoreCommand::Execute(Box::new(move |conn| {
            if reply_tx.send(task(conn)).is_err() {
                tracing::debug!("store caller dropped before receiving result");
            }
        }));

        self.inner
            .sender
            .send(command)
            .map_err(|_| IngestionError::WorkerGone)?;

        reply_rx.await.map_err(|_| IngestionError::WorkerGone)?
    }

    async fn read_timing_tables(&self) -> Result<TimingTables> {
        let layout = Arc::clone(&self.layout);
        self.execute(move |conn| {
            let key = layout.key_column.as_str();
            let value = layout.value_column.as_str();
            let lap_times = read_pairs(conn, &layout.lap_times_table, key, value)?
                .into_iter()
                .map(|(end_time, duration)| LapTimeRow { end_time, duration })
                .collect();
            let sector = |table: &str| -> Result<Vec<SectorRow>> {
                Ok(read_pairs(conn, table, key, value)?
                    .into_iter()
                    .map(|(lap_key, cumulative)| SectorRow {
                        lap_key,
                        cumulative,
                    })
                    .collect())
            };
            Ok(TimingTables {
                lap_times,
                sector1: sector(&layout.sector1_table)?,
                sector2: sector(&layout.sector2_table)?,
            })
        })
        .await
    }

    async fn read_slice(&self, table: String, range: SampleIndexRange) -> Result<Vec<f64>> {
        let value = self.layout.value_column.clone();
        let limit = to_i64(range.len())?;
        let offset = to_i64(range.start())?;
        self.execute(move |conn| {
            if !table_exists(conn, &table)? {
                tracing::warn!(table = %table, "channel table not found, treating as empty");
                return Ok(Vec::new());
            }
            // Rowids of imported logs may have gaps, so sample k is the k-th row, not rowid k
            let sql = format!(
                "SELECT {} FROM {} ORDER BY rowid LIMIT ?1 OFFSET ?2",
                quote(&value),
                quote(&table)
            );
            let context = || format!("reading slice of '{table}'");
            let mut stmt = conn
                .prepare_cached(&sql)
                .map_err(|e| IngestionError::sqlite(context(), e))?;
            let rows = stmt
                .query_map(params![limit, offset], |row| row.get::<_, Option<f64>>(0))
                .map_err(|e| IngestionError::sqlite(context(), e))?;
            rows.map(|r| {
                r.map(|v| v.unwrap_or(f64::NAN))
                    .map_err(|e| IngestionError::sqlite(context(), e))
            })
            .collect()
        })
        .await
    }

    async fn read_len(&self, table: String) -> Result<u64> {
        self.execute(move |conn| {
            if !table_exists(conn, &table)? {
                return Ok(0);
            }
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", quote(&table)), [], |row| {
                    row.get(0)
                })
                .map_err(|e| IngestionError::sqlite(format!("counting rows of '{table}'"), e))?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}

impl SessionStore for SqliteSessionStore {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "sqlite_store_timing_tables", skip(self))]
    async fn timing_tables(&self) -> std::result::Result<TimingTables, ContractError> {
        Ok(self.read_timing_tables().await?)
    }

    #[instrument(
        name = "sqlite_store_channel_slice",
        skip(self, channel),
        fields(channel = %channel.name, start = range.start(), end = range.end())
    )]
    async fn channel_slice(
        &self,
        channel: &ChannelSpec,
        range: SampleIndexRange,
    ) -> std::result::Result<ChannelSlice, ContractError> {
        let values = self
            .read_slice(channel.table_name().to_string(), range)
            .await?;
        Ok(ChannelSlice::new(channel.name.clone(), range, values))
    }

    async fn channel_len(&self, channel: &ChannelSpec) -> std::result::Result<u64, ContractError> {
        Ok(self.read_len(channel.table_name().to_string()).await?)
    }
}

/// Double-quote an SQL identifier; identifiers are validated to contain no quotes
fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| IngestionError::OutOfRange { value })
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
    .map_err(|e| IngestionError::sqlite(format!("looking up table '{table}'"), e))
}

/// `(key, value)` rows of a timing table in insertion order; NULL reads as NaN
fn read_pairs(conn: &Connection, table: &str, key: &str, value: &str) -> Result<Vec<(f64, f64)>> {
    if !table_exists(conn, table)? {
        return Err(IngestionError::TableNotFound {
            table: table.to_string(),
        });
    }
    let sql = format!(
        "SELECT {}, {} FROM {} ORDER BY rowid",
        quote(key),
        quote(value),
        quote(table)
    );
    let context = || format!("reading timing table '{table}'");
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| IngestionError::sqlite(context(), e))?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Option<f64>>(0)?.unwrap_or(f64::NAN),
                row.get::<_, Option<f64>>(1)?.unwrap_or(f64::NAN),
            ))
        })
        .map_err(|e| IngestionError::sqlite(context(), e))?;
    rows.map(|r| r.map_err(|e| IngestionError::sqlite(context(), e)))
        .collect()
}

fn write_session(
    conn: &mut Connection,
    config: &SessionConfig,
    session: &SyntheticSession,
) -> Result<()> {
    let store = &config.store;
    let tables = session.timing_tables();
    let key = quote(&store.key_column);
    let value = quote(&store.value_column);

    let tx = conn
        .transaction()
        .map_err(|e| IngestionError::sqlite("starting write transaction", e))?;

    let write_table = |table: &str, rows: &mut dyn Iterator<Item = (f64, f64)>| -> Result<()> {
        let context = || format!("writing table '{table}'");
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {t}; CREATE TABLE {t} ({key} REAL, {value} REAL);",
            t = quote(table)
        ))
        .map_err(|e| IngestionError::sqlite(context(), e))?;
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO {} ({key}, {value}) VALUES (?1, ?2)",
                quote(table)
            ))
            .map_err(|e| IngestionError::sqlite(context(), e))?;
        for (k, v) in rows {
            stmt.execute(params![k, v])
                .map_err(|e| IngestionError::sqlite(context(), e))?;
        }
        Ok(())
    };

    write_table(
        &store.lap_times_table,
        &mut tables.lap_times.iter().map(|r| (r.end_time, r.duration)),
    )?;
    write_table(
        &store.sector1_table,
        &mut tables.sector1.iter().map(|r| (r.lap_key, r.cumulative)),
    )?;
    write_table(
        &store.sector2_table,
        &mut tables.sector2.iter().map(|r| (r.lap_key, r.cumulative)),
    )?;
    for channel in &config.channels {
        let values = session.channel_values(channel);
        let hz = channel.sample_rate_hz;
        write_table(
            channel.table_name(),
            &mut values.iter().enumerate().map(|(k, &v)| (k as f64 / hz, v)),
        )?;
        tracing::debug!(channel = %channel.name, samples = values.len(), "channel written");
    }

    tx.commit()
        .map_err(|e| IngestionError::sqlite("committing session database", e))
}
