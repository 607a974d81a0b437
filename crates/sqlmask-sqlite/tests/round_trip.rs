use asupersync::runtime::RuntimeBuilder;
use asupersync::{Cx, Outcome};

use sqlmask::prelude::*;
use sqlmask::{QueryErrorKind, Statement, StatementKey};
use sqlmask_sqlite::{MEMORY_DSN, SqliteConnection, SqliteDriver};

fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> std::result::Result<T, String> {
    match outcome {
        Outcome::Ok(v) => Ok(v),
        Outcome::Err(e) => Err(format!("unexpected error: {e}")),
        Outcome::Cancelled(r) => Err(format!("cancelled: {r:?}")),
        Outcome::Panicked(p) => Err(format!("panicked: {p:?}")),
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Account {
    id: i64,
    email: String,
    balance: f64,
    active: bool,
    note: Option<String>,
}

impl Account {
    const ID: FieldMask = FieldMask::bit(0);
    const EMAIL: FieldMask = FieldMask::bit(1);
    const BALANCE: FieldMask = FieldMask::bit(2);
    const ACTIVE: FieldMask = FieldMask::bit(3);
    const NOTE: FieldMask = FieldMask::bit(4);
}

impl Model for Account {
    const TABLE_NAME: &'static str = "accounts";
    const FIELDS: &'static [FieldInfo] = &[
        FieldInfo::new("ID").primary_key(),
        FieldInfo::new("Email"),
        FieldInfo::new("Balance"),
        FieldInfo::new("Active").column("is_active"),
        FieldInfo::new("Note"),
    ];

    fn field_value(&self, index: usize) -> Option<Value> {
        match index {
            0 => Some(self.id.into()),
            1 => Some(self.email.clone().into()),
            2 => Some(self.balance.into()),
            3 => Some(self.active.into()),
            4 => Some(self.note.clone().into()),
            _ => None,
        }
    }

    fn set_field(&mut self, index: usize, value: Value) -> sqlmask::Result<()> {
        match index {
            0 => self.id = value.decode(Some("id"))?,
            1 => self.email = value.decode(Some("email"))?,
            2 => self.balance = value.decode(Some("balance"))?,
            3 => self.active = value.decode(Some("is_active"))?,
            4 => self.note = value.decode(Some("note"))?,
            _ => return Err(Self::unknown_field(index)),
        }
        Ok(())
    }
}

const SCHEMA: &str = "CREATE TABLE accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL DEFAULT '',
    balance REAL NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 0,
    note TEXT
)";

fn config() -> DbConfig {
    DbConfig::new().dialect(Dialect::Sqlite)
}

fn open_db() -> Db<SqliteConnection> {
    let conn = SqliteConnection::open_memory().expect("open sqlite memory db");
    conn.execute_batch(SCHEMA).expect("create schema");
    Db::new(conn, config())
}

fn sample(id: i64) -> Account {
    Account {
        id,
        email: format!("user{id}@example.com"),
        balance: 12.5 * id as f64,
        active: id % 2 == 0,
        note: (id % 3 == 0).then(|| format!("note {id}")),
    }
}

/// Copy of `src` keeping only the fields in `mask`.
fn project(src: &Account, mask: FieldMask) -> Account {
    let mut out = Account::default();
    let vals = field_values(mask, src).expect("read values");
    out.write_values(mask, vals).expect("write values");
    out
}

#[test]
fn insert_then_select_returns_masked_values() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let db = open_db();
        let masks = [
            Account::ID | Account::EMAIL,
            Account::ID | Account::BALANCE | Account::NOTE,
            Account::ID | Account::ACTIVE,
            Account::all_fields(),
        ];

        for (i, mask) in masks.into_iter().enumerate() {
            let original = sample(i as i64 + 3);
            unwrap_outcome(db.insert(&cx, &original, mask, ResultKind::Nothing).await)
                .expect("insert");

            let mut loaded = Account {
                id: original.id,
                ..Account::default()
            };
            unwrap_outcome(db.one(&cx, &mut loaded, mask, Account::ID).await).expect("select");
            assert_eq!(loaded, project(&original, mask), "mask {mask:?}");
        }
    });
}

#[test]
fn autoincrement_id_is_returned() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let db = unwrap_outcome(Db::open(&cx, &SqliteDriver, MEMORY_DSN, config()).await)
            .expect("open");
        db.connection().execute_batch(SCHEMA).expect("create schema");

        let mut acct = sample(0);
        let fields = Account::EMAIL | Account::BALANCE | Account::ACTIVE;
        for expected in 1..=3 {
            let id = unwrap_outcome(db.insert(&cx, &acct, fields, ResultKind::LastInsertId).await)
                .expect("insert");
            assert_eq!(id, expected);
        }

        acct.id = 2;
        let mut loaded = Account {
            id: 2,
            ..Account::default()
        };
        unwrap_outcome(db.one(&cx, &mut loaded, fields, Account::ID).await).expect("select");
        assert_eq!(loaded, project(&acct, Account::ID | fields));
    });
}

#[test]
fn update_count_delete_round_trip() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let db = open_db();
        for id in 1..=6 {
            unwrap_outcome(
                db.insert(&cx, &sample(id), Account::all_fields(), ResultKind::Nothing)
                    .await,
            )
            .expect("insert");
        }

        let active = Account {
            active: true,
            ..Account::default()
        };
        let n = unwrap_outcome(db.count(&cx, &active, Account::ACTIVE).await).expect("count");
        assert_eq!(n, 3);

        let mut four = sample(4);
        four.email = "four@example.com".to_string();
        four.active = false;
        let changed = unwrap_outcome(
            db.update(&cx, &four, Account::EMAIL | Account::ACTIVE, Account::ID)
                .await,
        )
        .expect("update");
        assert_eq!(changed, 1);
        let n = unwrap_outcome(db.count(&cx, &active, Account::ACTIVE).await).expect("count");
        assert_eq!(n, 2);

        let removed =
            unwrap_outcome(db.delete(&cx, &four, Account::ID).await).expect("delete");
        assert_eq!(removed, 1);
        let total =
            unwrap_outcome(db.count(&cx, &Account::default(), FieldMask::EMPTY).await)
                .expect("count all");
        assert_eq!(total, 5);

        let mut gone = Account {
            id: 4,
            ..Account::default()
        };
        match db.one(&cx, &mut gone, Account::EMAIL, Account::ID).await {
            Outcome::Err(e) => assert!(e.is_not_found(), "{e}"),
            _ => panic!("deleted row still found"),
        }
    });
}

#[test]
fn limit_and_all_page_through_rows() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let db = open_db();
        for id in 1..=12 {
            unwrap_outcome(
                db.insert(&cx, &sample(id), Account::all_fields(), ResultKind::Nothing)
                    .await,
            )
            .expect("insert");
        }

        let fields = Account::ID | Account::EMAIL;
        let mut page: Vec<Account> = Vec::new();
        let n = unwrap_outcome(
            db.limit(&cx, &mut page, &Account::default(), fields, FieldMask::EMPTY, 10, 5)
                .await,
        )
        .expect("limit");
        assert_eq!(n, 2);
        assert_eq!(page.iter().map(|a| a.id).collect::<Vec<_>>(), vec![11, 12]);

        let mut actives: Vec<Account> = Vec::new();
        let active = Account {
            active: true,
            ..Account::default()
        };
        let n = unwrap_outcome(
            db.all(&cx, &mut actives, &active, fields, Account::ACTIVE)
                .await,
        )
        .expect("all");
        assert_eq!(n, 6);
        assert!(actives.iter().all(|a| a.id % 2 == 0 && !a.email.is_empty()));

        let mut first: Vec<Account> = Vec::new();
        let n = unwrap_outcome(
            db.args_limit(
                &cx,
                &mut first,
                fields,
                FieldMask::EMPTY,
                &[Value::BigInt(0), Value::BigInt(3)],
            )
            .await,
        )
        .expect("args limit");
        assert_eq!(n, 3);
        assert_eq!(first[2], project(&sample(3), fields));
    });
}

#[test]
fn limit_beyond_available_rows_returns_the_rest() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let db = open_db();
        for id in 1..=4 {
            unwrap_outcome(
                db.insert(&cx, &sample(id), Account::all_fields(), ResultKind::Nothing)
                    .await,
            )
            .expect("insert");
        }

        let fields = Account::ID | Account::EMAIL;
        let mut rest: Vec<Account> = Vec::new();
        let n = unwrap_outcome(
            db.limit(&cx, &mut rest, &Account::default(), fields, FieldMask::EMPTY, 1, usize::MAX)
                .await,
        )
        .expect("limit");
        assert_eq!(n, 3);
        assert_eq!(rest.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2, 3, 4]);

        let mut all: Vec<Account> = Vec::new();
        let n = unwrap_outcome(
            db.args_limit(
                &cx,
                &mut all,
                fields,
                FieldMask::EMPTY,
                &[Value::BigInt(0), Value::BigInt(i64::MAX)],
            )
            .await,
        )
        .expect("args limit");
        assert_eq!(n, 4);

        let mut none: Vec<Account> = Vec::new();
        let n = unwrap_outcome(
            db.limit(&cx, &mut none, &Account::default(), fields, FieldMask::EMPTY, usize::MAX, 10)
                .await,
        )
        .expect("limit past the end");
        assert_eq!(n, 0);
        assert!(none.is_empty());
    });
}

#[test]
fn statements_are_prepared_once_and_closed_with_the_db() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let db = open_db();
        for id in 1..=3 {
            unwrap_outcome(
                db.insert(&cx, &sample(id), Account::all_fields(), ResultKind::Nothing)
                    .await,
            )
            .expect("insert");
        }
        let ti = db.type_info::<Account>().expect("type info");
        assert_eq!(ti.cached_len(), 1);
        assert_eq!(
            ti.columns(),
            ["id", "email", "balance", "is_active", "note"]
        );

        let stmt = ti.cached(&StatementKey::insert(Account::all_fields()))
            .expect("cached insert");
        drop(ti);
        let conn = db.close().expect("close");
        match stmt.execute(&cx, &[]).await {
            Outcome::Err(Error::Query(q)) => assert_eq!(q.kind, QueryErrorKind::Closed),
            _ => panic!("closed statement still usable"),
        }
        conn.execute_batch("DELETE FROM accounts").expect("connection still open");
    });
}
