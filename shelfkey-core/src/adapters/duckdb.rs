//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use duckdb::{params, Connection};
use serde::Serialize;

use crate::domain::result::{Error, Result};
use crate::domain::{LibraryCard, PatronAccount};
use crate::ports::RecordStore;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400, 800ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Which credential table a query targets
#[derive(Debug, Clone, Copy)]
enum CredentialTable {
    Users,
    UserCards,
}

impl CredentialTable {
    fn name(&self) -> &'static str {
        match self {
            CredentialTable::Users => "users",
            CredentialTable::UserCards => "user_cards",
        }
    }
}

/// How the secrets in one table are currently stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecretCounts {
    /// Rows carrying catalog credentials
    pub total: i64,
    pub plaintext: i64,
    pub encrypted: i64,
}

/// DuckDB repository implementation
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Create a new DuckDB repository
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which can occur when another process holds the database open.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[shelfkey] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    /// Attempt to open a database connection (called by new() with retry logic)
    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Disable extension autoloading; nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.lock()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    // === Accounts ===

    /// Insert a patron account
    pub fn insert_account(&self, account: &PatronAccount) -> Result<()> {
        account.validate().map_err(Error::validation)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO users
                (id, username, catalog_username, catalog_password, catalog_password_enc)
             VALUES (?, ?, ?, ?, ?)",
            params![
                account.id,
                &account.username,
                &account.catalog_username,
                &account.catalog_password,
                &account.catalog_password_enc,
            ],
        )?;
        Ok(())
    }

    /// Accounts carrying catalog credentials, ordered by id
    pub fn get_accounts_with_credentials(&self) -> Result<Vec<PatronAccount>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, catalog_username, catalog_password, catalog_password_enc
             FROM users
             WHERE catalog_username IS NOT NULL
             ORDER BY id",
        )?;

        let accounts = stmt
            .query_map([], |row| {
                Ok(PatronAccount {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    catalog_username: row.get(2)?,
                    catalog_password: row.get(3)?,
                    catalog_password_enc: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(accounts)
    }

    pub fn get_account_by_id(&self, id: i64) -> Result<Option<PatronAccount>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, catalog_username, catalog_password, catalog_password_enc
             FROM users WHERE id = ?",
        )?;

        let mut rows = stmt.query_map([id], |row| {
            Ok(PatronAccount {
                id: row.get(0)?,
                username: row.get(1)?,
                catalog_username: row.get(2)?,
                catalog_password: row.get(3)?,
                catalog_password_enc: row.get(4)?,
            })
        })?;

        Ok(rows.next().transpose()?)
    }

    /// Save an account's secret columns
    pub fn update_account_secret(&self, account: &PatronAccount) -> Result<()> {
        self.update_secret(
            CredentialTable::Users,
            account.id,
            &account.catalog_password,
            &account.catalog_password_enc,
        )
    }

    // === Library cards ===

    /// Insert a linked library card
    pub fn insert_card(&self, card: &LibraryCard) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO user_cards
                (id, user_id, card_name, catalog_username, catalog_password, catalog_password_enc)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                card.id,
                card.user_id,
                &card.card_name,
                &card.catalog_username,
                &card.catalog_password,
                &card.catalog_password_enc,
            ],
        )?;
        Ok(())
    }

    /// Cards carrying catalog credentials, ordered by id
    pub fn get_cards_with_credentials(&self) -> Result<Vec<LibraryCard>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, card_name, catalog_username, catalog_password, catalog_password_enc
             FROM user_cards
             WHERE catalog_username IS NOT NULL
             ORDER BY id",
        )?;

        let cards = stmt
            .query_map([], |row| {
                Ok(LibraryCard {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    card_name: row.get(2)?,
                    catalog_username: row.get(3)?,
                    catalog_password: row.get(4)?,
                    catalog_password_enc: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(cards)
    }

    /// Save a card's secret columns
    pub fn update_card_secret(&self, card: &LibraryCard) -> Result<()> {
        self.update_secret(
            CredentialTable::UserCards,
            card.id,
            &card.catalog_password,
            &card.catalog_password_enc,
        )
    }

    // === Shared ===

    /// Single-statement update, so each record is saved atomically
    fn update_secret(
        &self,
        table: CredentialTable,
        id: i64,
        plaintext: &Option<String>,
        encrypted: &Option<String>,
    ) -> Result<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET catalog_password = ?, catalog_password_enc = ? WHERE id = ?",
                table.name()
            ),
            params![plaintext, encrypted, id],
        )?;

        if updated != 1 {
            return Err(Error::not_found(format!("{} row {}", table.name(), id)));
        }
        Ok(())
    }

    fn secret_counts(&self, table: CredentialTable) -> Result<SecretCounts> {
        let conn = self.lock()?;
        let counts = conn.query_row(
            &format!(
                "SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE catalog_password IS NOT NULL AND catalog_password <> ''),
                    COUNT(*) FILTER (
                        WHERE catalog_password_enc IS NOT NULL AND catalog_password_enc <> ''
                    )
                 FROM {}
                 WHERE catalog_username IS NOT NULL",
                table.name()
            ),
            [],
            |row| {
                Ok(SecretCounts {
                    total: row.get(0)?,
                    plaintext: row.get(1)?,
                    encrypted: row.get(2)?,
                })
            },
        )?;
        Ok(counts)
    }

    pub fn account_secret_counts(&self) -> Result<SecretCounts> {
        self.secret_counts(CredentialTable::Users)
    }

    pub fn card_secret_counts(&self) -> Result<SecretCounts> {
        self.secret_counts(CredentialTable::UserCards)
    }
}

/// Record store over the `users` table
#[derive(Clone)]
pub struct AccountStore {
    repository: Arc<DuckDbRepository>,
}

impl AccountStore {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }
}

impl RecordStore for AccountStore {
    type Record = PatronAccount;

    fn list_all(&self) -> Result<Vec<PatronAccount>> {
        self.repository.get_accounts_with_credentials()
    }

    fn persist(&self, record: &PatronAccount) -> Result<()> {
        self.repository.update_account_secret(record)
    }
}

/// Record store over the `user_cards` table
#[derive(Clone)]
pub struct CardStore {
    repository: Arc<DuckDbRepository>,
}

impl CardStore {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }
}

impl RecordStore for CardStore {
    type Record = LibraryCard;

    fn list_all(&self) -> Result<Vec<LibraryCard>> {
        self.repository.get_cards_with_credentials()
    }

    fn persist(&self, record: &LibraryCard) -> Result<()> {
        self.repository.update_card_secret(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_repo(temp_dir: &TempDir) -> Arc<DuckDbRepository> {
        let repo = DuckDbRepository::new(&temp_dir.path().join("test.duckdb")).unwrap();
        repo.ensure_schema().unwrap();
        Arc::new(repo)
    }

    #[test]
    fn test_retryable_error_detection() {
        assert!(is_retryable_error("IO Error: database is locked"));
        assert!(is_retryable_error("The process cannot access the file"));
        assert!(!is_retryable_error("Catalog Error: Table does not exist"));
    }

    #[test]
    fn test_lists_only_rows_with_credentials_in_id_order() {
        let temp_dir = TempDir::new().unwrap();
        let repo = create_test_repo(&temp_dir);

        repo.insert_account(&PatronAccount::new(3, "carol").with_catalog_login("3", "c"))
            .unwrap();
        repo.insert_account(&PatronAccount::new(1, "alice").with_catalog_login("1", "a"))
            .unwrap();
        repo.insert_account(&PatronAccount::new(2, "no-catalog")).unwrap();

        let accounts = AccountStore::new(Arc::clone(&repo)).list_all().unwrap();
        let ids: Vec<i64> = accounts.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(accounts[0].catalog_password.as_deref(), Some("a"));
    }

    #[test]
    fn test_persist_updates_secret_columns() {
        let temp_dir = TempDir::new().unwrap();
        let repo = create_test_repo(&temp_dir);
        repo.insert_card(&LibraryCard::new(5, 1, "branch").with_catalog_login("99", "pw"))
            .unwrap();

        let store = CardStore::new(Arc::clone(&repo));
        let mut card = store.list_all().unwrap().remove(0);
        card.catalog_password = None;
        card.catalog_password_enc = Some("blob".to_string());
        store.persist(&card).unwrap();

        let reloaded = store.list_all().unwrap().remove(0);
        assert!(reloaded.catalog_password.is_none());
        assert_eq!(reloaded.catalog_password_enc.as_deref(), Some("blob"));
        assert_eq!(reloaded.card_name, "branch");
    }

    #[test]
    fn test_persist_missing_row_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let repo = create_test_repo(&temp_dir);

        let err = AccountStore::new(repo)
            .persist(&PatronAccount::new(42, "ghost"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_insert_rejects_invalid_account() {
        let temp_dir = TempDir::new().unwrap();
        let repo = create_test_repo(&temp_dir);

        let err = repo.insert_account(&PatronAccount::new(1, "  ")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_secret_counts() {
        let temp_dir = TempDir::new().unwrap();
        let repo = create_test_repo(&temp_dir);

        repo.insert_account(&PatronAccount::new(1, "alice").with_catalog_login("1", "a"))
            .unwrap();
        let mut encrypted = PatronAccount::new(2, "bob");
        encrypted.catalog_username = Some("2".to_string());
        encrypted.catalog_password_enc = Some("blob".to_string());
        repo.insert_account(&encrypted).unwrap();
        repo.insert_account(&PatronAccount::new(3, "carol")).unwrap();

        let counts = repo.account_secret_counts().unwrap();
        assert_eq!(
            counts,
            SecretCounts {
                total: 2,
                plaintext: 1,
                encrypted: 1
            }
        );
        assert_eq!(repo.card_secret_counts().unwrap(), SecretCounts::default());
    }
}
