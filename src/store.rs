use chrono::NaiveDateTime;
use futures::TryStreamExt;
use sqlx::{
    Connection, FromRow,
    sqlite::{SqliteConnectOptions, SqliteConnection},
};

use std::{env, str::FromStr};

use crate::models::{PersonRecord, ValidationError};

pub const DEFAULT_URL_VAR: &str = "DATABASE_URL";

// SQLite ignores VARCHAR lengths, the CHECKs keep the column bounds enforced
const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS funny_persons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name VARCHAR(40) NOT NULL CHECK (length(first_name) <= 40),
            last_name VARCHAR(40) NOT NULL CHECK (length(last_name) <= 40),
            email VARCHAR(50) NOT NULL CHECK (length(email) <= 50),
            created TIMESTAMP DEFAULT CURRENT_TIMESTAMP)"#;

const INSERT_PERSON_SQL: &str =
    "INSERT INTO funny_persons (first_name, last_name, email) VALUES (?, ?, ?)";

const GET_PERSON_BY_ID_SQL: &str =
    "SELECT id, first_name, last_name, email, created FROM funny_persons WHERE id = ?";

// No ORDER BY: rows come back in whatever order SQLite scans them
const GET_ALL_PERSONS_SQL: &str = "SELECT id, first_name, last_name, email, created FROM funny_persons";

const COUNT_PERSONS_SQL: &str = "SELECT COUNT(*) FROM funny_persons";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{name} is not set: {source}")]
    Environment {
        name: String,
        #[source]
        source: env::VarError,
    },
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
    #[error("Stored person {id} is invalid: {source}")]
    InvalidRow {
        id: i64,
        #[source]
        source: ValidationError,
    },
}

/// Where the store gets its connection URL from.
#[derive(Debug, Clone)]
pub enum ConnectionSource {
    /// Read the named environment variable on every operation.
    Environment(String),
    Url(String),
}

impl ConnectionSource {
    fn url(&self) -> Result<String, StoreError> {
        match self {
            ConnectionSource::Environment(name) => {
                env::var(name).map_err(|source| StoreError::Environment {
                    name: name.clone(),
                    source,
                })
            }
            ConnectionSource::Url(url) => Ok(url.clone()),
        }
    }
}

#[derive(Debug, FromRow)]
struct PersonRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    created: Option<NaiveDateTime>,
}

impl TryFrom<PersonRow> for PersonRecord {
    type Error = StoreError;

    fn try_from(row: PersonRow) -> Result<Self, Self::Error> {
        PersonRecord::new(&row.first_name, &row.last_name, &row.email)
            .map(|person| person.with_identity(row.id, row.created))
            .map_err(|source| StoreError::InvalidRow { id: row.id, source })
    }
}

/// All database access for person records.
///
/// The store keeps no connection around: every operation connects, runs its
/// statement and closes the connection again, whatever the outcome.
#[derive(Debug, Clone)]
pub struct PersonStore {
    source: ConnectionSource,
}

impl PersonStore {
    pub fn new(source: ConnectionSource) -> Self {
        Self { source }
    }

    pub fn from_env() -> Self {
        Self::new(ConnectionSource::Environment(DEFAULT_URL_VAR.to_string()))
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(ConnectionSource::Url(url.into()))
    }

    async fn connect(&self) -> Result<SqliteConnection, StoreError> {
        let url = self.source.url()?;
        let connect_options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
        let connection = SqliteConnection::connect_with(&connect_options).await?;
        Ok(connection)
    }

    #[tracing::instrument(name = "Create persons table", skip(self))]
    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        let mut connection = self.connect().await?;
        let result = sqlx::query(CREATE_TABLE_SQL)
            .execute(&mut connection)
            .await
            .map(|_| ())
            .map_err(StoreError::from);

        release(connection, result).await
    }

    /// Writes the person and returns the id the database assigned to it.
    #[tracing::instrument(name = "Insert person", skip(self, person), fields(first_name = person.first_name()))]
    pub async fn insert(&self, person: &PersonRecord) -> Result<i64, StoreError> {
        let mut connection = self.connect().await?;
        let result = sqlx::query(INSERT_PERSON_SQL)
            .bind(person.first_name().trim())
            .bind(person.last_name().trim())
            .bind(person.email().trim())
            .execute(&mut connection)
            .await
            .map(|done| done.last_insert_rowid())
            .map_err(StoreError::from);

        if let Ok(id) = &result {
            tracing::info!("Person {} stored in database", id);
        }

        release(connection, result).await
    }

    #[tracing::instrument(name = "Fetch person by id", skip(self))]
    pub async fn get_by_id(&self, id: i64) -> Result<Option<PersonRecord>, StoreError> {
        let mut connection = self.connect().await?;
        let result: Result<Option<PersonRecord>, StoreError> = async {
            let row = sqlx::query_as::<_, PersonRow>(GET_PERSON_BY_ID_SQL)
                .bind(id)
                .fetch_optional(&mut connection)
                .await?;
            row.map(PersonRecord::try_from).transpose()
        }
        .await;

        release(connection, result).await
    }

    #[tracing::instrument(name = "Fetch all persons", skip(self))]
    pub async fn get_all(&self) -> Result<Vec<PersonRecord>, StoreError> {
        let mut connection = self.connect().await?;
        let result: Result<Vec<PersonRecord>, StoreError> = async {
            let count = count(&mut connection).await?;
            let mut people = Vec::with_capacity(count);

            let mut rows = sqlx::query_as::<_, PersonRow>(GET_ALL_PERSONS_SQL).fetch(&mut connection);
            while let Some(row) = rows.try_next().await? {
                people.push(PersonRecord::try_from(row)?);
            }

            Ok(people)
        }
        .await;

        release(connection, result).await
    }
}

async fn count(connection: &mut SqliteConnection) -> Result<usize, StoreError> {
    let rows: i64 = sqlx::query_scalar(COUNT_PERSONS_SQL)
        .fetch_one(connection)
        .await?;
    Ok(usize::try_from(rows).unwrap_or_default())
}

// Dropping a SqliteConnection also closes it, so the early returns above are
// covered; this is the path where the close itself gets to report errors.
async fn release<T>(
    connection: SqliteConnection,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    if let Err(e) = connection.close().await {
        tracing::warn!("Closing database connection failed: {:?}", e);
    }
    result
}
