use std::path::PathBuf;

use eyre::Result;
use tempfile::TempDir;
use ticket_desk_core::{Config, Ticket, TicketList};

mod api;
pub use api::{Api, ApiError, ApiResponse, Payload};

pub struct TestCtxBuilder {
    /// Tickets in the database file before the desk starts
    pub tickets: Vec<Ticket>,
    /// Count of HTTP threads
    pub http_threads: u16,
    /// Whether to start without a database file
    pub missing_database: bool,

    dir: Option<TempDir>,
}

impl TestCtxBuilder {
    /// Create a new test context builder with an empty database
    pub fn new() -> Self {
        TestCtxBuilder {
            tickets: Vec::new(),
            http_threads: 2,
            missing_database: false,
            dir: None,
        }
    }

    /// Seed the database file with `tickets`
    pub fn with_tickets(mut self, tickets: Vec<Ticket>) -> Self {
        self.tickets = tickets;
        self
    }

    /// Set the number of HTTP threads to use
    pub fn with_http_threads(mut self, threads: u16) -> Self {
        assert_ne!(threads, 0);
        self.http_threads = threads;
        self
    }

    /// Start without a database file, letting the desk create one
    pub fn without_database(mut self) -> Self {
        self.missing_database = true;
        self
    }

    /// Build the test context
    pub async fn build(self) -> Result<TestCtx> {
        let dir = match self.dir {
            Some(dir) => dir,
            None => {
                let dir = tempfile::tempdir()?;
                if !self.missing_database {
                    let list = TicketList {
                        tickets: self.tickets,
                    };
                    std::fs::write(
                        dir.path().join("db.json"),
                        serde_json::to_string_pretty(&list)?,
                    )?;
                }
                dir
            }
        };

        let config = Config {
            database: dir.path().join("db.json"),
            create_missing: self.missing_database,
            ..Config::default()
        };
        let (desk, api) = api::mock::start(self.http_threads, config.clone()).await?;

        Ok(TestCtx {
            api,
            desk,
            config,
            http_threads: self.http_threads,
            dir,
            drop_bomb: DropBomb,
        })
    }
}

impl Default for TestCtxBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Test context
pub struct TestCtx {
    /// API allowing to interact with the ticket desk
    pub api: Api,
    desk: api::mock::MockDesk,
    /// Configuration the desk was launched with
    pub config: Config,
    /// Number of HTTP threads
    pub http_threads: u16,

    dir: TempDir,
    drop_bomb: DropBomb,
}

impl TestCtx {
    /// Path of the database file
    pub fn database(&self) -> PathBuf {
        self.config.database.clone()
    }

    /// Wait for pending writes and parse the database file
    pub async fn read_database(&self) -> Result<TicketList> {
        self.desk.flush().await?;
        let contents = std::fs::read_to_string(self.database())?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Wait for pending writes and return the raw database file
    pub async fn read_database_text(&self) -> Result<String> {
        self.desk.flush().await?;
        Ok(std::fs::read_to_string(self.database())?)
    }

    /// Shut the desk down and launch a new one on the same database file
    pub async fn restart(self) -> Result<TestCtx> {
        let http_threads = self.http_threads;
        let missing_database = self.config.create_missing;
        let dir = self.shutdown().await?;
        TestCtxBuilder {
            tickets: Vec::new(),
            http_threads,
            missing_database,
            dir: Some(dir),
        }
        .build()
        .await
    }

    /// Shut the ticket desk down and finish the test
    pub async fn finish(self) -> Result<()> {
        self.shutdown().await?;
        Ok(())
    }

    async fn shutdown(self) -> Result<TempDir> {
        std::mem::forget(self.drop_bomb);
        drop(self.api);
        self.desk.shutdown().await?;
        Ok(self.dir)
    }
}

struct DropBomb;

impl Drop for DropBomb {
    fn drop(&mut self) {
        eprintln!("@TestAuthor: You should call `ctx.finish().await` to shut the ticket desk down");
    }
}
